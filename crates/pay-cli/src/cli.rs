//! # Command Line
//!
//! Argument definitions for `card-pay`.

use clap::{Args, Parser, Subcommand};
use pay_core::{Amount, PaymentRequest, PaymentResult};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "card-pay")]
#[command(version, about = "Create card payments and follow them to completion")]
#[command(
    after_help = "Environment:\n  PAYMENT_ENDPOINT     Payment service URL\n  QR_PAYMENT_ENDPOINT  QR payment service URL\n  PAY_AUTH_TOKEN       Session token sent as X-Auth-Token\n  PAY_LOG_JSON         Emit JSON logs when set to 1\n  RUST_LOG             Log filter"
)]
pub struct Cli {
    /// TOML config file (defaults to environment variables)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Session token (overrides PAY_AUTH_TOKEN)
    #[arg(long, global = true, env = "PAY_AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Suppress the banner
    #[arg(long, global = true, default_value_t = false)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a payment and present its checkout page
    Create {
        #[command(flatten)]
        payment: PaymentArgs,

        /// Contact email for the receipt
        #[arg(long)]
        email: Option<String>,

        /// Contact phone for the receipt
        #[arg(long)]
        phone: Option<String>,

        /// Present as a popup window instead of a redirect
        #[arg(long, default_value_t = false)]
        popup: bool,

        /// Poll until the payment settles
        #[arg(long, default_value_t = false)]
        wait: bool,
    },

    /// Fetch the current status of a payment
    Status {
        payment_id: String,
    },

    /// Poll a payment until it settles
    Poll {
        payment_id: String,

        /// Status checks before giving up
        #[arg(long)]
        attempts: Option<u32>,

        /// Wait between checks in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Fetch a checkout link and open it
    Link {
        #[command(flatten)]
        payment: PaymentArgs,
    },

    /// Create a QR-code (SBP) payment and print the code payload
    Qr {
        #[command(flatten)]
        payment: PaymentArgs,

        /// Poll until the payment settles (every 3s, up to 5 minutes)
        #[arg(long, default_value_t = false)]
        wait: bool,
    },
}

/// Fields shared by every payment-creating command
#[derive(Debug, Args)]
pub struct PaymentArgs {
    /// Amount in major units, e.g. 299 or 299.50
    #[arg(long, value_parser = parse_amount)]
    pub amount: Amount,

    /// What the payment is for
    #[arg(long)]
    pub description: String,

    /// Where the provider sends the user after checkout
    #[arg(long)]
    pub return_url: Option<String>,
}

impl PaymentArgs {
    /// Build a validated request
    pub fn to_request(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> PaymentResult<PaymentRequest> {
        let mut builder = PaymentRequest::builder(self.amount, self.description.clone());
        if let Some(email) = email {
            builder = builder.email(email);
        }
        if let Some(phone) = phone {
            builder = builder.phone(phone);
        }
        if let Some(ref url) = self.return_url {
            builder = builder.return_url(url.clone());
        }
        builder.build()
    }
}

fn parse_amount(raw: &str) -> Result<Amount, String> {
    let amount = Amount::parse_decimal(raw).map_err(|e| e.to_string())?;
    if !amount.is_positive() {
        return Err("amount must be greater than zero".to_string());
    }
    Ok(amount)
}
