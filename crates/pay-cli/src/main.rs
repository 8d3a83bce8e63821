//! # card-pay
//!
//! Command-line checkout client.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export PAYMENT_ENDPOINT=https://functions.example.dev/payment
//! export PAY_AUTH_TOKEN=...
//!
//! # Create a payment and wait for it
//! card-pay create --amount 299 --description "Premium plan" --wait
//! ```

use clap::Parser;
use pay_cli::{handlers, AppState, Cli};
use std::process::ExitCode;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    init_tracing();

    if !cli.quiet {
        print_banner();
    }

    let state = AppState::load(cli.config.as_deref(), cli.token.clone())?;
    debug!(
        "Payment endpoint: {}, retry attempts: {}",
        state.config.payment_endpoint,
        state.config.retry.max_attempts()
    );

    handlers::run(&state, cli.command).await
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("PAY_LOG_JSON").is_ok_and(|v| v == "1");

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

fn print_banner() {
    eprintln!(
        r#"
  💳 card-pay
  ━━━━━━━━━━━━━━━━━━━━━━━
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
