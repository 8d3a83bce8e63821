//! # Terminal Presentation
//!
//! A terminal cannot navigate or open windows, so presenting a checkout
//! page means printing its URL for the user to open. QR payments print the
//! payload to encode.

use pay_core::{
    CheckoutObserver, CheckoutPresenter, PaymentError, PaymentResult, QrPayment, ScreenSize,
    WindowFeatures,
};
use std::io::{self, Stdout, Write};
use std::sync::Mutex;
use tracing::debug;

/// Prints checkout URLs
pub struct TerminalPresenter<W: Write = Stdout> {
    out: Mutex<W>,
    screen: Option<ScreenSize>,
}

impl TerminalPresenter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            screen: None,
        }
    }

    /// Screen to center popups on
    pub fn with_screen(mut self, screen: ScreenSize) -> Self {
        self.screen = Some(screen);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self, text: &str) -> PaymentResult<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| PaymentError::Presentation("output lock poisoned".to_string()))?;
        writeln!(out, "{}", text)
            .and_then(|_| out.flush())
            .map_err(|e| PaymentError::Presentation(e.to_string()))
    }
}

impl<W: Write> CheckoutPresenter for TerminalPresenter<W> {
    /// The features the page would open with
    type Window = WindowFeatures;

    fn screen_size(&self) -> Option<ScreenSize> {
        self.screen
    }

    fn navigate(&self, url: &str) -> PaymentResult<()> {
        self.write(&format!("Open this link to pay:\n  {}", url))
    }

    fn open_window(
        &self,
        url: &str,
        features: &WindowFeatures,
    ) -> PaymentResult<Option<Self::Window>> {
        debug!("Popup features: {}", features);
        self.write(&format!(
            "Open this link in a {}x{} window to pay:\n  {}",
            features.width, features.height, url
        ))?;
        Ok(Some(*features))
    }

    fn show_qr(&self, qr: &QrPayment) -> PaymentResult<()> {
        self.write(&format!(
            "Scan this code in your banking app (SBP) to pay:\n  {}",
            qr.qr_data
        ))
    }
}

/// Reports checkout progress on stderr
#[derive(Debug, Default)]
pub struct TerminalObserver;

impl CheckoutObserver for TerminalObserver {
    fn loading_changed(&self, loading: bool) {
        if loading {
            eprintln!("Creating payment...");
        }
    }

    fn checkout_started(&self, payment_id: Option<&str>) {
        match payment_id {
            Some(id) => eprintln!("✓ Checkout opened for payment {}", id),
            None => eprintln!("✓ Checkout opened"),
        }
    }

    fn error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }
}
