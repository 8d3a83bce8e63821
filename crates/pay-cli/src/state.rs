//! # Application State
//!
//! Everything a command needs: the payment gateway, the loaded client
//! configuration and the credential to act with.

use anyhow::Context;
use pay_client::{ClientConfig, PaymentClient, PollSettings};
use pay_core::{
    AuthContext, BoxedPaymentGateway, CredentialSource, EnvCredentials, StaticCredentials,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment service
    pub gateway: BoxedPaymentGateway,
    /// Client configuration
    pub config: ClientConfig,
    /// Explicit session token, if one was given on the command line
    token: Option<String>,
}

impl AppState {
    /// Load configuration from `config_path` or the environment
    pub fn load(config_path: Option<&Path>, token: Option<String>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => ClientConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ClientConfig::from_env().context("loading configuration from environment")?,
        };

        let client = PaymentClient::new(config.clone()).context("creating payment client")?;
        Ok(Self::new(Arc::new(client), config, token))
    }

    /// Create state around an existing gateway
    pub fn new(gateway: BoxedPaymentGateway, config: ClientConfig, token: Option<String>) -> Self {
        Self {
            gateway,
            config,
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Credential source for checkout: the explicit token, else `PAY_AUTH_TOKEN`
    pub fn credentials(&self) -> Box<dyn CredentialSource + Send + Sync> {
        match self.token {
            Some(ref token) => Box::new(StaticCredentials(AuthContext::with_token(token.clone()))),
            None => Box::new(EnvCredentials),
        }
    }

    /// Current credential
    pub fn auth(&self) -> AuthContext {
        self.credentials().auth_context()
    }

    /// Configured polling cadence with command-line overrides
    pub fn poll_settings(&self, attempts: Option<u32>, interval_ms: Option<u64>) -> PollSettings {
        PollSettings::new(
            attempts.unwrap_or(self.config.poll.max_attempts),
            interval_ms
                .map(Duration::from_millis)
                .unwrap_or(self.config.poll.interval),
        )
    }
}
