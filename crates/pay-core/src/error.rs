//! # Payment Error Types
//!
//! Typed error handling for the card-checkout payment client.
//! All payment operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// No authentication credential was available for the checkout
    #[error("Authorization required")]
    AuthorizationRequired,

    /// Invalid request data (rejected before any network call)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors (missing endpoint, invalid values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payment endpoint refused to create the payment
    #[error("{0}")]
    CreationFailed(String),

    /// Payment endpoint failed to report a status
    #[error("{0}")]
    StatusFetchFailed(String),

    /// Provider reported a terminal negative status
    #[error("Payment canceled or failed (status: {status})")]
    PaymentRejected { status: String },

    /// Polling ran out of attempts without a terminal status
    #[error("Payment wait timeout after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    /// Polling was abandoned by its consumer
    #[error("Payment status polling was cancelled")]
    PollCancelled,

    /// Session carried no confirmation URL to start checkout with
    #[error("Payment link was not returned by the payment service")]
    MissingConfirmationUrl,

    /// QR payment was created without a payload to render
    #[error("QR code was not returned by the payment service")]
    MissingQrData,

    /// Secondary checkout window could not be opened
    #[error("Checkout window was blocked")]
    PopupBlocked,

    /// A checkout for this trigger is already running
    #[error("Checkout already in progress")]
    CheckoutInProgress,

    /// Presentation layer failed to navigate or open the window
    #[error("Presentation error: {0}")]
    Presentation(String),

    /// Network/HTTP error communicating with the payment service
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::NetworkError(_))
    }

    /// Returns true if the provider settled the payment negatively
    pub fn is_rejection(&self) -> bool {
        matches!(self, PaymentError::PaymentRejected { .. })
    }

    /// Single human-readable line for the UI notification channel.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::AuthorizationRequired => "Authorization required".to_string(),
            PaymentError::PaymentRejected { .. } => "Payment canceled or failed".to_string(),
            PaymentError::PollTimeout { .. } => "Payment wait timeout".to_string(),
            PaymentError::NetworkError(_) => {
                "Payment service is unavailable, please try again later".to_string()
            }
            PaymentError::Serialization(_) | PaymentError::Configuration(_) => {
                "Failed to create payment".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PaymentError::NetworkError("connection reset".into()).is_retryable());
        assert!(!PaymentError::CreationFailed("Invalid amount".into()).is_retryable());
        assert!(!PaymentError::PollTimeout { attempts: 60 }.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            PaymentError::CreationFailed("Invalid amount".into()).user_message(),
            "Invalid amount"
        );
        assert_eq!(
            PaymentError::PaymentRejected {
                status: "canceled".into()
            }
            .user_message(),
            "Payment canceled or failed"
        );
        assert_eq!(
            PaymentError::AuthorizationRequired.user_message(),
            "Authorization required"
        );
        assert_eq!(
            PaymentError::PollTimeout { attempts: 3 }.user_message(),
            "Payment wait timeout"
        );
    }

    #[test]
    fn test_rejection_is_distinct_from_transport() {
        assert!(PaymentError::PaymentRejected {
            status: "failed".into()
        }
        .is_rejection());
        assert!(!PaymentError::StatusFetchFailed("status fetch error".into()).is_rejection());
    }
}
