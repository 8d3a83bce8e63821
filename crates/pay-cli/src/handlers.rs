//! # Command Handlers
//!
//! One handler per subcommand. Handlers return the process exit code;
//! checkout failures have already been reported by the observer.

use crate::cli::{Commands, PaymentArgs};
use crate::state::AppState;
use crate::terminal::{TerminalObserver, TerminalPresenter};
use anyhow::Context;
use pay_client::{spawn_poll, PollSettings};
use pay_core::{
    AuthContext, CheckoutAdapter, CheckoutPresenter, PaymentError, PaymentGateway,
    PaymentStatusSnapshot, PresentationMode,
};
use std::process::ExitCode;
use tracing::info;

/// Dispatch a parsed command
pub async fn run(state: &AppState, command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Create {
            payment,
            email,
            phone,
            popup,
            wait,
        } => {
            let mode = if popup {
                PresentationMode::Popup
            } else {
                PresentationMode::Redirect
            };
            create(
                state,
                &payment,
                email.as_deref(),
                phone.as_deref(),
                mode,
                wait,
                TerminalPresenter::stdout(),
            )
            .await
        }
        Commands::Status { payment_id } => status(state, &payment_id).await,
        Commands::Poll {
            payment_id,
            attempts,
            interval_ms,
        } => {
            let settings = state.poll_settings(attempts, interval_ms);
            poll(state, &payment_id, state.auth(), settings).await
        }
        Commands::Link { payment } => link(state, &payment, TerminalPresenter::stdout()).await,
        Commands::Qr { payment, wait } => {
            qr(state, &payment, wait, TerminalPresenter::stdout()).await
        }
    }
}

/// Create a payment, present it, and optionally wait for it to settle
pub async fn create<P: CheckoutPresenter>(
    state: &AppState,
    payment: &PaymentArgs,
    email: Option<&str>,
    phone: Option<&str>,
    mode: PresentationMode,
    wait: bool,
    presenter: P,
) -> anyhow::Result<ExitCode> {
    let request = match payment.to_request(email, phone) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    let adapter = CheckoutAdapter::new(state.gateway.clone(), presenter)
        .with_credentials(state.credentials())
        .with_observer(TerminalObserver)
        .with_mode(mode);

    let launch = match adapter.launch(&request).await {
        Ok(launch) => launch,
        Err(_) => return Ok(ExitCode::FAILURE),
    };

    println!("payment_id: {}", launch.payment_id);

    if !wait {
        return Ok(ExitCode::SUCCESS);
    }

    let settings = state.poll_settings(None, None);
    poll(state, &launch.payment_id, launch.auth, settings).await
}

/// Print one status snapshot as JSON
pub async fn status(state: &AppState, payment_id: &str) -> anyhow::Result<ExitCode> {
    let snapshot = match state.gateway.get_payment_status(payment_id, &state.auth()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    let json = serde_json::to_string_pretty(&snapshot).context("encoding status")?;
    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}

/// Poll until the payment settles; Ctrl+C cancels
pub async fn poll(
    state: &AppState,
    payment_id: &str,
    auth: AuthContext,
    settings: PollSettings,
) -> anyhow::Result<ExitCode> {
    info!(
        "Waiting for payment {}: attempts={}, interval_ms={}",
        payment_id,
        settings.max_attempts,
        settings.interval.as_millis()
    );

    let handle = spawn_poll(
        state.gateway.clone(),
        payment_id,
        auth,
        settings,
        |snapshot: &PaymentStatusSnapshot| eprintln!("  status: {}", snapshot.status),
    );

    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        _ = tokio::signal::ctrl_c() => Err(PaymentError::PollCancelled),
    };

    Ok(report_outcome(outcome))
}

/// Fetch a checkout link and present it
pub async fn link<P: CheckoutPresenter>(
    state: &AppState,
    payment: &PaymentArgs,
    presenter: P,
) -> anyhow::Result<ExitCode> {
    let request = match payment.to_request(None, None) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    let adapter = CheckoutAdapter::new(state.gateway.clone(), presenter)
        .with_credentials(state.credentials())
        .with_observer(TerminalObserver);

    match adapter.redirect_checkout(&request).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

/// Create a QR payment, print its code, and optionally wait on the QR cadence
pub async fn qr<P: CheckoutPresenter>(
    state: &AppState,
    payment: &PaymentArgs,
    wait: bool,
    presenter: P,
) -> anyhow::Result<ExitCode> {
    let request = match payment.to_request(None, None) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    let adapter = CheckoutAdapter::new(state.gateway.clone(), presenter)
        .with_credentials(state.credentials())
        .with_observer(TerminalObserver);

    let launch = match adapter.launch_qr(&request).await {
        Ok(launch) => launch,
        Err(_) => return Ok(ExitCode::FAILURE),
    };

    println!("payment_id: {}", launch.payment.payment_id);

    if !wait {
        return Ok(ExitCode::SUCCESS);
    }

    poll(state, &launch.payment.payment_id, launch.auth, PollSettings::qr()).await
}

fn report_outcome(outcome: Result<PaymentStatusSnapshot, PaymentError>) -> ExitCode {
    match outcome {
        Ok(snapshot) => {
            println!("✓ Payment {} succeeded", snapshot.payment_id);
            ExitCode::SUCCESS
        }
        Err(PaymentError::PollCancelled) => {
            eprintln!("Stopped waiting for the payment");
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
