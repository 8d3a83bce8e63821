//! # pay-client
//!
//! HTTP client for the payment session endpoint.
//!
//! - **PaymentClient** - [`PaymentGateway`](pay_core::PaymentGateway) over reqwest
//!   - `create_payment` / `get_payment_status` / `create_checkout_link`
//!   - Every call wrapped in a [`RetryPolicy`] (1s, 2s, 3s on network errors and 503)
//! - **poll_status / spawn_poll** - wait for a payment to settle, cancellable
//! - **ClientConfig** - environment or TOML configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_client::{PaymentClient, PollSettings, poll_status};
//! use pay_core::{Amount, EnvCredentials, CredentialSource, PaymentGateway, PaymentRequest};
//!
//! let client = PaymentClient::from_env()?;
//! let auth = EnvCredentials.auth_context();
//!
//! let request = PaymentRequest::new(Amount::from_major(299), "Premium plan")?;
//! let session = client.create_payment(&request, &auth).await?;
//!
//! let settled = poll_status(&client, &session.payment_id, &auth, PollSettings::default(), |s| {
//!     println!("status: {}", s.status);
//! })
//! .await?;
//! ```

pub mod client;
pub mod config;
pub mod poll;
pub mod retry;

// Re-exports
pub use client::{PaymentClient, AUTH_TOKEN_HEADER, IDEMPOTENCE_KEY_HEADER};
pub use config::ClientConfig;
pub use poll::{poll_status, spawn_poll, PollHandle, PollSettings};
pub use retry::{fetch_with_retry, RetryPolicy, RetryableResponse};
