//! # Checkout Presentation
//!
//! How a confirmation URL reaches the customer. The browser build navigates
//! or opens a window; the CLI prints; tests record.

use crate::error::{PaymentError, PaymentResult};
use crate::session::QrPayment;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info};

/// Checkout window width in CSS pixels
pub const CHECKOUT_WINDOW_WIDTH: u32 = 600;

/// Checkout window height in CSS pixels
pub const CHECKOUT_WINDOW_HEIGHT: u32 = 800;

/// Target name of the checkout window
pub const CHECKOUT_WINDOW_NAME: &str = "PaymentCheckout";

/// How the checkout page is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    /// Navigate the current browsing context (full-page redirect)
    #[default]
    Redirect,
    /// Open a fixed-size secondary window centered on screen
    Popup,
}

/// Screen dimensions used to center the checkout window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Geometry and flags of the checkout window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFeatures {
    pub width: u32,
    pub height: u32,
    pub left: u32,
    pub top: u32,
    pub resizable: bool,
    pub scrollbars: bool,
}

impl WindowFeatures {
    /// 600x800 window centered on `screen`; top-left corner when unknown
    pub fn centered(screen: Option<ScreenSize>) -> Self {
        let (left, top) = match screen {
            Some(screen) => (
                screen.width.saturating_sub(CHECKOUT_WINDOW_WIDTH) / 2,
                screen.height.saturating_sub(CHECKOUT_WINDOW_HEIGHT) / 2,
            ),
            None => (0, 0),
        };

        Self {
            width: CHECKOUT_WINDOW_WIDTH,
            height: CHECKOUT_WINDOW_HEIGHT,
            left,
            top,
            resizable: true,
            scrollbars: true,
        }
    }
}

impl fmt::Display for WindowFeatures {
    /// `window.open` feature string
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        write!(
            f,
            "width={},height={},left={},top={},resizable={},scrollbars={}",
            self.width,
            self.height,
            self.left,
            self.top,
            yes_no(self.resizable),
            yes_no(self.scrollbars)
        )
    }
}

/// Presents the provider's checkout page to the customer.
pub trait CheckoutPresenter {
    /// Handle to an opened checkout window, so the caller can watch it close
    type Window;

    /// Screen size for centering, if known
    fn screen_size(&self) -> Option<ScreenSize>;

    /// Full-page redirect to `url`
    fn navigate(&self, url: &str) -> PaymentResult<()>;

    /// Open `url` in a secondary window. `Ok(None)` means the window was blocked.
    fn open_window(
        &self,
        url: &str,
        features: &WindowFeatures,
    ) -> PaymentResult<Option<Self::Window>>;

    /// Render a QR payment for the customer to scan
    fn show_qr(&self, qr: &QrPayment) -> PaymentResult<()> {
        Err(PaymentError::Presentation(format!(
            "cannot render QR code for payment {}",
            qr.payment_id
        )))
    }
}

/// Hand `url` to `presenter` in `mode`.
///
/// Popups are centered on the presenter's screen; a popup the presenter
/// could not open is `PopupBlocked`.
pub fn present_checkout<P: CheckoutPresenter + ?Sized>(
    presenter: &P,
    mode: PresentationMode,
    url: &str,
) -> PaymentResult<Option<P::Window>> {
    match mode {
        PresentationMode::Redirect => {
            debug!("Redirecting to checkout");
            presenter.navigate(url)?;
            Ok(None)
        }
        PresentationMode::Popup => {
            let features = WindowFeatures::centered(presenter.screen_size());
            debug!("Opening checkout window: {}", features);
            presenter
                .open_window(url, &features)?
                .map(Some)
                .ok_or(PaymentError::PopupBlocked)
        }
    }
}

/// Observer of the checkout affordance (button state and notifications).
///
/// All methods default to logging, so implementors override only what they
/// render. Observer methods cannot fail the checkout.
#[allow(unused_variables)]
pub trait CheckoutObserver {
    /// Loading flag changed; `false` always follows `true`
    fn loading_changed(&self, loading: bool) {}

    /// Checkout page was presented for `payment_id`
    fn checkout_started(&self, payment_id: Option<&str>) {
        info!("Checkout started: payment_id={:?}", payment_id);
    }

    /// One human-readable failure message
    fn error(&self, message: &str) {
        error!("Checkout failed: {}", message);
    }
}

/// Default observer (just logs)
pub struct LoggingObserver;

impl CheckoutObserver for LoggingObserver {}

impl<T: CheckoutObserver + ?Sized> CheckoutObserver for std::sync::Arc<T> {
    fn loading_changed(&self, loading: bool) {
        (**self).loading_changed(loading)
    }

    fn checkout_started(&self, payment_id: Option<&str>) {
        (**self).checkout_started(payment_id)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }
}
