//! # pay-core
//!
//! Core types and traits for the card-checkout payment client.
//!
//! This crate provides:
//! - `PaymentGateway` trait for talking to the payment service
//! - `PaymentRequest`, `PaymentSession` and `PaymentStatusSnapshot` for the payment lifecycle
//! - `Amount` and `Currency` for exact money handling
//! - `CheckoutAdapter` and `CheckoutPresenter` for presenting the checkout page
//!   or a QR code (`QrPayment`)
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{Amount, CheckoutAdapter, PaymentRequest, PresentationMode};
//!
//! // Describe the payment
//! let request = PaymentRequest::builder(Amount::from_major(299), "Premium plan")
//!     .email("user@example.com")
//!     .build()?;
//!
//! // Wire a gateway (e.g. pay_client::PaymentClient) to a presenter
//! let adapter = CheckoutAdapter::new(gateway, presenter).with_mode(PresentationMode::Popup);
//!
//! // Create the payment and open the checkout window
//! let launch = adapter.launch(&request).await?;
//!
//! // Poll launch.payment_id until it settles (pay_client::poll_status)
//! ```

pub mod checkout;
pub mod error;
pub mod gateway;
pub mod money;
pub mod presenter;
pub mod request;
pub mod session;

// Re-exports for convenience
pub use checkout::{CheckoutAdapter, CheckoutLaunch, QrLaunch};
pub use error::{PaymentError, PaymentResult};
pub use gateway::{
    AuthContext, BoxedPaymentGateway, CredentialSource, EnvCredentials, PaymentGateway,
    StaticCredentials, AUTH_TOKEN_ENV,
};
pub use money::{Amount, Currency};
pub use presenter::{
    present_checkout, CheckoutObserver, CheckoutPresenter, LoggingObserver, PresentationMode,
    ScreenSize, WindowFeatures, CHECKOUT_WINDOW_HEIGHT, CHECKOUT_WINDOW_NAME, CHECKOUT_WINDOW_WIDTH,
};
pub use request::{PaymentRequest, PaymentRequestBuilder, MAX_IDEMPOTENCY_KEY_LEN};
pub use session::{PaymentSession, PaymentStatus, PaymentStatusSnapshot, QrPayment};
