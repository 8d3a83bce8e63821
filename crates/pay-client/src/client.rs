//! # Payment Service Client
//!
//! HTTP implementation of [`PaymentGateway`] against the payment endpoint:
//!
//! | Method | URL | Body |
//! |--------|-----|------|
//! | POST | `{payment_endpoint}?action=create` | `{amount, description, email?, phone?, return_url?}` |
//! | GET | `{payment_endpoint}?action=status&payment_id=…` | |
//! | POST | `{checkout_endpoint}` (`X-Auth-Token`) | `{amount, description, return_url}` |
//! | POST | `{qr_endpoint}` (`X-Auth-Token`) | `{amount, description}` |
//!
//! Every call goes through the configured [`RetryPolicy`](crate::RetryPolicy).

use crate::config::ClientConfig;
use crate::retry::fetch_with_retry;
use async_trait::async_trait;
use pay_core::{
    Amount, AuthContext, PaymentError, PaymentGateway, PaymentRequest, PaymentResult,
    PaymentSession, PaymentStatusSnapshot, QrPayment,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// Header carrying the user session token
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Header carrying the request idempotency key
pub const IDEMPOTENCE_KEY_HEADER: &str = "Idempotence-Key";

const CREATE_FAILED_MESSAGE: &str = "Payment creation failed";
const STATUS_FAILED_MESSAGE: &str = "Failed to fetch payment status";

/// Payment service client
pub struct PaymentClient {
    config: ClientConfig,
    client: Client,
}

impl PaymentClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> PaymentResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request built by `build`, retrying per policy.
    ///
    /// A request that cannot be constructed (bad header value, bad URL) is
    /// rejected before the first attempt and never retried.
    async fn send<F>(&self, build: F) -> PaymentResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        build().build().map_err(request_error)?;

        fetch_with_retry(&self.config.retry, || build().send())
            .await
            .map_err(request_error)
    }

    fn authorized(builder: RequestBuilder, auth: &AuthContext) -> RequestBuilder {
        match auth.token() {
            Some(token) => builder.header(AUTH_TOKEN_HEADER, token),
            None => builder,
        }
    }

    fn return_url_for<'a>(&'a self, request: &'a PaymentRequest) -> Option<&'a str> {
        request.return_url().or(self.config.return_url.as_deref())
    }

    async fn read_body(response: Response) -> PaymentResult<(StatusCode, String)> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl PaymentGateway for PaymentClient {
    #[instrument(skip(self, request, auth), fields(amount = %request.amount()))]
    async fn create_payment(
        &self,
        request: &PaymentRequest,
        auth: &AuthContext,
    ) -> PaymentResult<PaymentSession> {
        let body = CreatePaymentBody {
            amount: request.amount(),
            description: request.description(),
            email: request.email(),
            phone: request.phone(),
            return_url: self.return_url_for(request),
        };

        debug!("Creating payment: description={}", request.description());

        let response = self
            .send(|| {
                Self::authorized(self.client.post(&self.config.payment_endpoint), auth)
                    .query(&[("action", "create")])
                    .header(IDEMPOTENCE_KEY_HEADER, request.idempotency_key())
                    .json(&body)
            })
            .await?;

        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            error!("Payment creation error: status={}, body={}", status, body);
            return Err(PaymentError::CreationFailed(
                error_message(&body).unwrap_or_else(|| CREATE_FAILED_MESSAGE.to_string()),
            ));
        }

        let session: PaymentSession = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse payment response: {}", e))
        })?;

        if session.payment_id.is_empty() {
            return Err(PaymentError::Serialization(
                "Payment response has an empty payment_id".to_string(),
            ));
        }

        info!(
            "Created payment: id={}, status={}, amount={:?}",
            session.payment_id, session.status, session.amount
        );

        Ok(session)
    }

    #[instrument(skip(self, auth))]
    async fn get_payment_status(
        &self,
        payment_id: &str,
        auth: &AuthContext,
    ) -> PaymentResult<PaymentStatusSnapshot> {
        if payment_id.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "payment_id must not be empty".to_string(),
            ));
        }

        let response = self
            .send(|| {
                Self::authorized(self.client.get(&self.config.payment_endpoint), auth)
                    .query(&[("action", "status"), ("payment_id", payment_id)])
            })
            .await?;

        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            error!("Payment status error: status={}, body={}", status, body);
            return Err(PaymentError::StatusFetchFailed(
                STATUS_FAILED_MESSAGE.to_string(),
            ));
        }

        let snapshot: PaymentStatusSnapshot = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse status response: {}", e))
        })?;

        debug!(
            "Payment status: id={}, status={}, paid={}",
            snapshot.payment_id, snapshot.status, snapshot.paid
        );

        Ok(snapshot)
    }

    #[instrument(skip(self, request, auth), fields(amount = %request.amount()))]
    async fn create_checkout_link(
        &self,
        request: &PaymentRequest,
        auth: &AuthContext,
    ) -> PaymentResult<String> {
        let token = auth.require_token()?;

        let Some(endpoint) = self.config.checkout_endpoint.as_deref() else {
            let mut session = self.create_payment(request, auth).await?;
            return session
                .take_confirmation_url()
                .ok_or(PaymentError::MissingConfirmationUrl);
        };

        let body = CheckoutLinkBody {
            amount: request.amount(),
            description: request.description(),
            return_url: self.return_url_for(request),
        };

        let response = self
            .send(|| {
                self.client
                    .post(endpoint)
                    .header(AUTH_TOKEN_HEADER, token)
                    .json(&body)
            })
            .await?;

        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            error!("Checkout link error: status={}, body={}", status, body);
            return Err(PaymentError::CreationFailed(
                error_message(&body).unwrap_or_else(|| CREATE_FAILED_MESSAGE.to_string()),
            ));
        }

        let link: CheckoutLinkResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse checkout response: {}", e))
        })?;

        link.confirmation_url
            .filter(|url| !url.is_empty())
            .ok_or(PaymentError::MissingConfirmationUrl)
    }

    #[instrument(skip(self, request, auth), fields(amount = %request.amount()))]
    async fn create_qr_payment(
        &self,
        request: &PaymentRequest,
        auth: &AuthContext,
    ) -> PaymentResult<QrPayment> {
        let token = auth.require_token()?;
        let endpoint = self.config.qr_endpoint.as_deref().ok_or_else(|| {
            PaymentError::Configuration("qr_endpoint is not configured".to_string())
        })?;

        let body = QrPaymentBody {
            amount: request.amount(),
            description: request.description(),
        };

        let response = self
            .send(|| {
                self.client
                    .post(endpoint)
                    .header(AUTH_TOKEN_HEADER, token)
                    .header(IDEMPOTENCE_KEY_HEADER, request.idempotency_key())
                    .json(&body)
            })
            .await?;

        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            error!("QR payment error: status={}, body={}", status, body);
            return Err(PaymentError::CreationFailed(
                error_message(&body).unwrap_or_else(|| CREATE_FAILED_MESSAGE.to_string()),
            ));
        }

        let payment: QrPayment = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse QR payment response: {}", e))
        })?;

        if !payment.has_qr_data() {
            return Err(PaymentError::MissingQrData);
        }

        info!(
            "Created QR payment: id={}, provider_id={:?}, status={}",
            payment.payment_id, payment.provider_payment_id, payment.status
        );

        Ok(payment)
    }

    fn gateway_name(&self) -> &'static str {
        "payment-endpoint"
    }
}

fn request_error(e: reqwest::Error) -> PaymentError {
    if e.is_builder() {
        PaymentError::InvalidRequest(format!("invalid request: {}", e))
    } else {
        PaymentError::NetworkError(e.to_string())
    }
}

/// Extract `error`, else `message`, from a JSON error body
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error
        .filter(|m| !m.is_empty())
        .or(parsed.message.filter(|m| !m.is_empty()))
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct CreatePaymentBody<'a> {
    amount: Amount,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CheckoutLinkBody<'a> {
    amount: Amount,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct QrPaymentBody<'a> {
    amount: Amount,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct CheckoutLinkResponse {
    #[serde(default)]
    confirmation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error": "Invalid amount", "message": "ignored"}"#),
            Some("Invalid amount".to_string())
        );
        assert_eq!(
            error_message(r#"{"message": "Payment system not configured"}"#),
            Some("Payment system not configured".to_string())
        );
        assert_eq!(error_message(r#"{"error": ""}"#), None);
        assert_eq!(error_message("<html>Bad Gateway</html>"), None);
    }

    #[test]
    fn test_create_body_shape() {
        let request = PaymentRequest::builder(Amount::from_major(299), "Premium plan")
            .email("user@example.com")
            .build()
            .unwrap();
        let body = CreatePaymentBody {
            amount: request.amount(),
            description: request.description(),
            email: request.email(),
            phone: request.phone(),
            return_url: Some("https://visitka.site"),
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "amount": 299,
                "description": "Premium plan",
                "email": "user@example.com",
                "return_url": "https://visitka.site"
            })
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = PaymentClient::new(ClientConfig::new("not a url"));
        assert!(matches!(result, Err(PaymentError::Configuration(_))));
    }
}
