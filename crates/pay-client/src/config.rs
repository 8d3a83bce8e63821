//! # Client Configuration
//!
//! Configuration for the payment service client. Values come from
//! environment variables (optionally via `.env`) or a TOML file such as
//! `config/payment.toml`.

use crate::poll::PollSettings;
use crate::retry::RetryPolicy;
use pay_core::PaymentError;
use reqwest::Url;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Payment client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Payment endpoint (`?action=create` / `?action=status`)
    pub payment_endpoint: String,

    /// Single-call checkout endpoint (returns only a confirmation URL)
    pub checkout_endpoint: Option<String>,

    /// QR-code (SBP) payment endpoint
    pub qr_endpoint: Option<String>,

    /// Return URL for requests that do not set one
    pub return_url: Option<String>,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Retry policy applied to every call
    pub retry: RetryPolicy,

    /// Default polling cadence
    pub poll: PollSettings,
}

impl ClientConfig {
    /// Create config with explicit endpoint and defaults
    pub fn new(payment_endpoint: impl Into<String>) -> Self {
        Self {
            payment_endpoint: payment_endpoint.into(),
            checkout_endpoint: None,
            qr_endpoint: None,
            return_url: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            poll: PollSettings::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PAYMENT_ENDPOINT`
    ///
    /// Optional: `CHECKOUT_ENDPOINT`, `QR_PAYMENT_ENDPOINT`, `PAYMENT_RETURN_URL`,
    /// `PAYMENT_TIMEOUT_SECS`, `PAYMENT_RETRY_ATTEMPTS`,
    /// `PAYMENT_RETRY_BACKOFF_MS`, `PAYMENT_POLL_ATTEMPTS`,
    /// `PAYMENT_POLL_INTERVAL_MS`.
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let payment_endpoint = env::var("PAYMENT_ENDPOINT").map_err(|_| {
            PaymentError::Configuration("PAYMENT_ENDPOINT not set".to_string())
        })?;

        let retry = RetryPolicy::new(
            env_count("PAYMENT_RETRY_ATTEMPTS")?.unwrap_or(RetryPolicy::DEFAULT_MAX_ATTEMPTS),
            env_number("PAYMENT_RETRY_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(RetryPolicy::DEFAULT_BASE_BACKOFF),
        );

        let poll = PollSettings::new(
            env_count("PAYMENT_POLL_ATTEMPTS")?.unwrap_or(PollSettings::DEFAULT_MAX_ATTEMPTS),
            env_number("PAYMENT_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(PollSettings::DEFAULT_INTERVAL),
        );

        let config = Self {
            payment_endpoint,
            checkout_endpoint: env_string("CHECKOUT_ENDPOINT"),
            qr_endpoint: env_string("QR_PAYMENT_ENDPOINT"),
            return_url: env_string("PAYMENT_RETURN_URL"),
            request_timeout: Duration::from_secs(
                env_number("PAYMENT_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            retry,
            poll,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML
    pub fn from_toml_str(content: &str) -> Result<Self, PaymentError> {
        let file: FileConfig = toml::from_str(content)
            .map_err(|e| PaymentError::Configuration(format!("invalid config: {}", e)))?;

        let config = Self {
            payment_endpoint: file.payment_endpoint,
            checkout_endpoint: file.checkout_endpoint,
            qr_endpoint: file.qr_endpoint,
            return_url: file.return_url,
            request_timeout: Duration::from_secs(file.timeout_secs),
            retry: RetryPolicy::new(
                file.retry.max_attempts,
                Duration::from_millis(file.retry.backoff_ms),
            ),
            poll: PollSettings::new(
                file.poll.max_attempts,
                Duration::from_millis(file.poll.interval_ms),
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PaymentError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PaymentError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check endpoint URLs
    pub fn validate(&self) -> Result<(), PaymentError> {
        validate_url("payment_endpoint", &self.payment_endpoint)?;
        if let Some(ref url) = self.checkout_endpoint {
            validate_url("checkout_endpoint", url)?;
        }
        if let Some(ref url) = self.qr_endpoint {
            validate_url("qr_endpoint", url)?;
        }
        if let Some(ref url) = self.return_url {
            validate_url("return_url", url)?;
        }
        if self.request_timeout.is_zero() {
            return Err(PaymentError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder: set the single-call checkout endpoint
    pub fn with_checkout_endpoint(mut self, url: impl Into<String>) -> Self {
        self.checkout_endpoint = Some(url.into());
        self
    }

    /// Builder: set the QR payment endpoint
    pub fn with_qr_endpoint(mut self, url: impl Into<String>) -> Self {
        self.qr_endpoint = Some(url.into());
        self
    }

    /// Builder: set the default return URL
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    /// Builder: set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builder: set the polling cadence
    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Builder: set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    payment_endpoint: String,
    #[serde(default)]
    checkout_endpoint: Option<String>,
    #[serde(default)]
    qr_endpoint: Option<String>,
    #[serde(default)]
    return_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default)]
    retry: FileRetry,
    #[serde(default)]
    poll: FilePoll,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FileRetry {
    max_attempts: u32,
    backoff_ms: u64,
}

impl Default for FileRetry {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            backoff_ms: RetryPolicy::DEFAULT_BASE_BACKOFF.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FilePoll {
    max_attempts: u32,
    interval_ms: u64,
}

impl Default for FilePoll {
    fn default() -> Self {
        Self {
            max_attempts: PollSettings::DEFAULT_MAX_ATTEMPTS,
            interval_ms: PollSettings::DEFAULT_INTERVAL.as_millis() as u64,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_number(key: &str) -> Result<Option<u64>, PaymentError> {
    match env_string(key) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            PaymentError::Configuration(format!("{} must be a non-negative integer", key))
        }),
        None => Ok(None),
    }
}

fn env_count(key: &str) -> Result<Option<u32>, PaymentError> {
    env_number(key)?
        .map(|n| {
            u32::try_from(n).map_err(|_| {
                PaymentError::Configuration(format!("{} must be at most {}", key, u32::MAX))
            })
        })
        .transpose()
}

fn validate_url(name: &str, value: &str) -> Result<(), PaymentError> {
    let url = Url::parse(value)
        .map_err(|e| PaymentError::Configuration(format!("{} is not a valid URL: {}", name, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(PaymentError::Configuration(format!(
            "{} must use http or https, got {}",
            name, scheme
        ))),
    }
}
