//! # Payment Gateway Trait
//!
//! Seam between the checkout flow and the remote payment service.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentGateway (trait)                   │
//! │  ├── create_payment()                                       │
//! │  ├── get_payment_status()                                   │
//! │  └── create_checkout_link()                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!          ┌─────────────────┴─────────────────┐
//!  ┌───────┴───────┐                   ┌───────┴───────┐
//!  │ PaymentClient │                   │  test fakes   │
//!  │ (pay-client)  │                   │               │
//!  └───────────────┘                   └───────────────┘
//! ```
//!
//! Credentials are passed explicitly through [`AuthContext`] instead of being
//! read from ambient storage, so every call site states what it is
//! authenticated as.

use crate::error::{PaymentError, PaymentResult};
use crate::request::PaymentRequest;
use crate::session::{PaymentSession, PaymentStatusSnapshot, QrPayment};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Environment variable read by [`EnvCredentials`]
pub const AUTH_TOKEN_ENV: &str = "PAY_AUTH_TOKEN";

/// Authentication context for one payment flow
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    /// Context carrying a session token
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: Some(token).filter(|t| !t.trim().is_empty()),
        }
    }

    /// Context with no credential
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Token or `AuthorizationRequired`
    pub fn require_token(&self) -> PaymentResult<&str> {
        self.token().ok_or(PaymentError::AuthorizationRequired)
    }
}

// Tokens never end up in logs.
impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Where the checkout flow looks up the current credential
pub trait CredentialSource {
    /// Current credential, or an anonymous context
    fn auth_context(&self) -> AuthContext;
}

impl<T: CredentialSource + ?Sized> CredentialSource for Box<T> {
    fn auth_context(&self) -> AuthContext {
        (**self).auth_context()
    }
}

/// Fixed credential (tests, CLI flags)
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub AuthContext);

impl CredentialSource for StaticCredentials {
    fn auth_context(&self) -> AuthContext {
        self.0.clone()
    }
}

/// Credential from the `PAY_AUTH_TOKEN` environment variable
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn auth_context(&self) -> AuthContext {
        std::env::var(AUTH_TOKEN_ENV)
            .map(AuthContext::with_token)
            .unwrap_or_default()
    }
}

/// Remote payment service operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment and return its session.
    ///
    /// # Arguments
    /// * `request` - What to charge
    /// * `auth` - Credential for the calling user
    async fn create_payment(
        &self,
        request: &PaymentRequest,
        auth: &AuthContext,
    ) -> PaymentResult<PaymentSession>;

    /// Fetch the current status of a payment.
    async fn get_payment_status(
        &self,
        payment_id: &str,
        auth: &AuthContext,
    ) -> PaymentResult<PaymentStatusSnapshot>;

    /// Create a payment and return only the checkout URL.
    ///
    /// Default: `create_payment` and take the confirmation URL.
    async fn create_checkout_link(
        &self,
        request: &PaymentRequest,
        auth: &AuthContext,
    ) -> PaymentResult<String> {
        auth.require_token()?;
        let mut session = self.create_payment(request, auth).await?;
        session
            .take_confirmation_url()
            .ok_or(PaymentError::MissingConfirmationUrl)
    }

    /// Create a QR-code (SBP) payment.
    ///
    /// Default: unsupported.
    async fn create_qr_payment(
        &self,
        _request: &PaymentRequest,
        _auth: &AuthContext,
    ) -> PaymentResult<QrPayment> {
        Err(PaymentError::Configuration(format!(
            "QR payments are not supported by {}",
            self.gateway_name()
        )))
    }

    /// Name used in logs
    fn gateway_name(&self) -> &'static str;
}

/// Type alias for a shared payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_context() {
        assert!(AuthContext::with_token("tok_123").is_authenticated());
        assert!(!AuthContext::with_token("  ").is_authenticated());
        assert_eq!(
            AuthContext::anonymous().require_token(),
            Err(PaymentError::AuthorizationRequired)
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let debug = format!("{:?}", AuthContext::with_token("secret-token"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn test_static_credentials() {
        let source = StaticCredentials(AuthContext::with_token("tok"));
        assert_eq!(source.auth_context().token(), Some("tok"));
    }
}
