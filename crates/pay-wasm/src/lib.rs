//! # pay-wasm
//!
//! WebAssembly bindings for the card-checkout presentation adapter.
//!
//! This crate provides:
//! - `BrowserPresenter` - redirect via `window.location`, popups via `window.open`
//! - `LocalStorageCredentials` - session token from `localStorage["auth_token"]`
//! - Input validation and amount formatting for the payment form
//! - Request bodies and response parsing for QR-code (SBP) payments
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { validate_payment_input, payment_body, open_checkout } from 'card-checkout-wasm';
//!
//! await init();
//!
//! const problem = validate_payment_input('299', 'Premium plan', email, phone);
//! if (problem) return showError(problem);
//!
//! const res = await fetch(`${endpoint}?action=create`, {
//!   method: 'POST',
//!   body: payment_body('299', 'Premium plan', email, phone, window.location.origin),
//! });
//! const { confirmation_url } = await res.json();
//!
//! open_checkout(confirmation_url, true); // popup
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use pay_core::{
    present_checkout, Amount, AuthContext, CheckoutPresenter, CredentialSource, Currency,
    PaymentError, PaymentRequest, PaymentResult, PresentationMode, QrPayment, ScreenSize,
    WindowFeatures, CHECKOUT_WINDOW_NAME,
};
use serde_json::json;
use wasm_bindgen::prelude::*;

/// `localStorage` key holding the session token
pub const AUTH_TOKEN_STORAGE_KEY: &str = "auth_token";

/// Presents checkout in the current browsing context
pub struct BrowserPresenter {
    window: web_sys::Window,
}

impl BrowserPresenter {
    /// Presenter for the global `window`
    pub fn new() -> PaymentResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| PaymentError::Presentation("no window available".to_string()))?;
        Ok(Self { window })
    }
}

impl CheckoutPresenter for BrowserPresenter {
    type Window = web_sys::Window;

    fn screen_size(&self) -> Option<ScreenSize> {
        let screen = self.window.screen().ok()?;
        let width = screen.width().ok()?;
        let height = screen.height().ok()?;
        Some(ScreenSize::new(
            u32::try_from(width).ok()?,
            u32::try_from(height).ok()?,
        ))
    }

    fn navigate(&self, url: &str) -> PaymentResult<()> {
        self.window
            .location()
            .set_href(url)
            .map_err(|e| PaymentError::Presentation(js_message(&e)))
    }

    fn open_window(
        &self,
        url: &str,
        features: &WindowFeatures,
    ) -> PaymentResult<Option<Self::Window>> {
        self.window
            .open_with_url_and_target_and_features(url, CHECKOUT_WINDOW_NAME, &features.to_string())
            .map_err(|e| PaymentError::Presentation(js_message(&e)))
    }
}

/// Session token stored by the page's sign-in flow
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageCredentials;

impl CredentialSource for LocalStorageCredentials {
    fn auth_context(&self) -> AuthContext {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .and_then(|storage| storage.get_item(AUTH_TOKEN_STORAGE_KEY).ok().flatten())
            .map(AuthContext::with_token)
            .unwrap_or_default()
    }
}

/// Feature string for a checkout window centered on a `width`x`height` screen
#[wasm_bindgen]
pub fn checkout_window_features(screen_width: u32, screen_height: u32) -> String {
    WindowFeatures::centered(Some(ScreenSize::new(screen_width, screen_height))).to_string()
}

/// Format a decimal amount for display, e.g. `"299"` + `"RUB"` -> `"299.00 ₽"`
#[wasm_bindgen]
pub fn format_amount(amount: &str, currency: &str) -> Result<String, JsValue> {
    format_amount_inner(amount, currency).map_err(to_js_error)
}

/// Validate the payment form. Returns the message to show, or `undefined`.
#[wasm_bindgen]
pub fn validate_payment_input(
    amount: &str,
    description: &str,
    email: Option<String>,
    phone: Option<String>,
) -> Option<String> {
    build_request(amount, description, email, phone, None)
        .err()
        .map(|e| e.user_message())
}

/// JSON body for `POST {endpoint}?action=create`
#[wasm_bindgen]
pub fn payment_body(
    amount: &str,
    description: &str,
    email: Option<String>,
    phone: Option<String>,
    return_url: Option<String>,
) -> Result<String, JsValue> {
    build_request(amount, description, email, phone, return_url)
        .map(|request| request_body(&request))
        .map_err(to_js_error)
}

/// JSON body for the QR (SBP) payment endpoint
#[wasm_bindgen]
pub fn qr_payment_body(amount: &str, description: &str) -> Result<String, JsValue> {
    build_request(amount, description, None, None, None)
        .map(|request| {
            json!({
                "amount": request.amount(),
                "description": request.description(),
            })
            .to_string()
        })
        .map_err(to_js_error)
}

/// `qr_data` to render from a QR payment response body
#[wasm_bindgen]
pub fn qr_data_from_response(body: &str) -> Result<String, JsValue> {
    qr_payment_from_body(body)
        .map(|qr| qr.qr_data)
        .map_err(to_js_error)
}

/// Present a confirmation URL: redirect, or a centered popup when `popup`.
///
/// Returns `true` when a popup window was opened. Throws when no session
/// token is stored or the popup was blocked.
#[wasm_bindgen]
pub fn open_checkout(confirmation_url: &str, popup: bool) -> Result<bool, JsValue> {
    if !LocalStorageCredentials.auth_context().is_authenticated() {
        return Err(to_js_error(PaymentError::AuthorizationRequired));
    }
    if confirmation_url.is_empty() {
        return Err(to_js_error(PaymentError::MissingConfirmationUrl));
    }

    let mode = if popup {
        PresentationMode::Popup
    } else {
        PresentationMode::Redirect
    };

    let presenter = BrowserPresenter::new().map_err(to_js_error)?;
    let window = present_checkout(&presenter, mode, confirmation_url).map_err(to_js_error)?;
    log(&format!("Checkout opened: mode={:?}", mode));
    Ok(window.is_some())
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn format_amount_inner(amount: &str, currency: &str) -> PaymentResult<String> {
    let amount = Amount::parse_decimal(amount)?;
    Ok(amount.display_in(&Currency::from_code(currency)))
}

fn build_request(
    amount: &str,
    description: &str,
    email: Option<String>,
    phone: Option<String>,
    return_url: Option<String>,
) -> PaymentResult<PaymentRequest> {
    let amount = Amount::parse_decimal(amount)?;
    let mut builder = PaymentRequest::builder(amount, description);
    if let Some(email) = email {
        builder = builder.email(email);
    }
    if let Some(phone) = phone {
        builder = builder.phone(phone);
    }
    if let Some(url) = return_url {
        builder = builder.return_url(url);
    }
    builder.build()
}

fn request_body(request: &PaymentRequest) -> String {
    let mut body = json!({
        "amount": request.amount(),
        "description": request.description(),
    });
    let optional = [
        ("email", request.email()),
        ("phone", request.phone()),
        ("return_url", request.return_url()),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            body[key] = json!(value);
        }
    }
    body.to_string()
}

fn qr_payment_from_body(body: &str) -> PaymentResult<QrPayment> {
    let qr: QrPayment =
        serde_json::from_str(body).map_err(|e| PaymentError::Serialization(e.to_string()))?;
    if !qr.has_qr_data() {
        return Err(PaymentError::MissingQrData);
    }
    Ok(qr)
}

fn to_js_error(e: PaymentError) -> JsValue {
    JsValue::from_str(&e.user_message())
}

fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_window_features() {
        assert_eq!(
            checkout_window_features(1920, 1080),
            "width=600,height=800,left=660,top=140,resizable=yes,scrollbars=yes"
        );
        assert!(checkout_window_features(400, 300).contains("left=0,top=0"));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount_inner("299", "RUB").unwrap(), "299.00 ₽");
        assert_eq!(format_amount_inner("19.9", "usd").unwrap(), "19.90 $");
        assert!(format_amount_inner("abc", "RUB").is_err());
    }

    #[test]
    fn test_validate_payment_input() {
        assert_eq!(validate_payment_input("299", "Premium plan", None, None), None);
        assert!(validate_payment_input("0", "Premium plan", None, None).is_some());
        assert!(validate_payment_input("299", "   ", None, None).is_some());
        assert!(validate_payment_input(
            "299",
            "Premium plan",
            Some("not-an-email".to_string()),
            None
        )
        .is_some());
    }

    #[test]
    fn test_request_body() {
        let request = build_request(
            "299.50",
            "Premium plan",
            Some("user@example.com".to_string()),
            Some(String::new()),
            Some("https://visitka.site".to_string()),
        )
        .unwrap();

        let body: serde_json::Value = serde_json::from_str(&request_body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "amount": 299.5,
                "description": "Premium plan",
                "email": "user@example.com",
                "return_url": "https://visitka.site"
            })
        );
    }

    #[test]
    fn test_qr_payment_from_body() {
        let qr = qr_payment_from_body(
            r#"{"payment_id": 42, "qr_data": "https://qr.nspk.ru/AS10006", "status": "pending"}"#,
        )
        .unwrap();
        assert_eq!(qr.payment_id, "42");
        assert_eq!(qr.qr_data, "https://qr.nspk.ru/AS10006");

        assert_eq!(
            qr_payment_from_body(r#"{"payment_id": "qr_1", "qr_data": ""}"#),
            Err(PaymentError::MissingQrData)
        );
        assert!(qr_payment_from_body("not json").is_err());
    }
}
