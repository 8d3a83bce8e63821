//! # Payment Request
//!
//! Immutable description of what the customer is about to pay for.

use crate::error::{PaymentError, PaymentResult};
use crate::money::Amount;
use uuid::Uuid;

/// Maximum description length accepted by the payment provider
pub const MAX_DESCRIPTION_LEN: usize = 128;

/// Maximum idempotency key length accepted by the payment provider
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 64;

/// A validated payment request.
///
/// Fields are private so a request cannot change after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    amount: Amount,
    description: String,
    email: Option<String>,
    phone: Option<String>,
    return_url: Option<String>,
    idempotency_key: String,
}

impl PaymentRequest {
    /// Create a request with only the required fields
    pub fn new(amount: Amount, description: impl Into<String>) -> PaymentResult<Self> {
        Self::builder(amount, description).build()
    }

    /// Start building a request
    pub fn builder(amount: Amount, description: impl Into<String>) -> PaymentRequestBuilder {
        PaymentRequestBuilder {
            amount,
            description: description.into(),
            email: None,
            phone: None,
            return_url: None,
            idempotency_key: None,
        }
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn return_url(&self) -> Option<&str> {
        self.return_url.as_deref()
    }

    /// Key sent with the creation call so retried requests are deduplicated
    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }
}

/// Builder for [`PaymentRequest`]
#[derive(Debug, Clone)]
pub struct PaymentRequestBuilder {
    amount: Amount,
    description: String,
    email: Option<String>,
    phone: Option<String>,
    return_url: Option<String>,
    idempotency_key: Option<String>,
}

impl PaymentRequestBuilder {
    /// Set customer email (receipt)
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set customer phone
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set the URL the provider returns the customer to
    pub fn return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    /// Override the generated idempotency key
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Validate and freeze the request
    pub fn build(self) -> PaymentResult<PaymentRequest> {
        if !self.amount.is_positive() {
            return Err(PaymentError::InvalidRequest(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Description must not be empty".to_string(),
            ));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(PaymentError::InvalidRequest(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        let email = non_blank(self.email);
        if let Some(ref email) = email {
            if !email.contains('@') {
                return Err(PaymentError::InvalidRequest(format!(
                    "Invalid email: {}",
                    email
                )));
            }
        }

        let return_url = non_blank(self.return_url);
        if let Some(ref url) = return_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PaymentError::InvalidRequest(format!(
                    "Return URL must be http(s): {}",
                    url
                )));
            }
        }

        let idempotency_key = match self.idempotency_key {
            Some(key) => validate_idempotency_key(key)?,
            None => Uuid::new_v4().to_string(),
        };

        Ok(PaymentRequest {
            amount: self.amount,
            description,
            email,
            phone: non_blank(self.phone),
            return_url,
            idempotency_key,
        })
    }
}

/// Keys travel as a header value: visible ASCII only
fn validate_idempotency_key(key: String) -> PaymentResult<String> {
    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(PaymentError::InvalidRequest(format!(
            "Idempotency key must be 1 to {} characters",
            MAX_IDEMPOTENCY_KEY_LEN
        )));
    }
    if !key.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(PaymentError::InvalidRequest(
            "Idempotency key must contain only visible ASCII characters".to_string(),
        ));
    }
    Ok(key)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
