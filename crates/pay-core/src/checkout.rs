//! # Checkout Adapter
//!
//! Bridges a UI trigger (a "Pay" button) to the payment gateway: guards
//! against double submission, requires a credential, creates the payment and
//! hands the confirmation URL to the presenter.
//!
//! The loading flag is raised for the whole attempt and is released by a
//! guard on every exit path.

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{AuthContext, BoxedPaymentGateway, CredentialSource, EnvCredentials};
use crate::presenter::{
    present_checkout, CheckoutObserver, CheckoutPresenter, LoggingObserver, PresentationMode,
};
use crate::request::PaymentRequest;
use crate::session::QrPayment;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument, warn};

/// Result of a launched checkout
#[derive(Debug)]
pub struct CheckoutLaunch<W> {
    /// Payment to poll
    pub payment_id: String,
    /// Secondary window, when presented as a popup
    pub window: Option<W>,
    /// Credential the payment was created with
    pub auth: AuthContext,
}

/// Result of a launched QR checkout
#[derive(Debug)]
pub struct QrLaunch {
    /// Payment as created; poll `payment.payment_id`
    pub payment: QrPayment,
    /// Credential the payment was created with
    pub auth: AuthContext,
}

/// Checkout presentation adapter
pub struct CheckoutAdapter<P: CheckoutPresenter> {
    gateway: BoxedPaymentGateway,
    presenter: P,
    credentials: Box<dyn CredentialSource>,
    observer: Box<dyn CheckoutObserver>,
    mode: PresentationMode,
    in_flight: AtomicBool,
}

impl<P: CheckoutPresenter> CheckoutAdapter<P> {
    /// Create an adapter that redirects, reads `PAY_AUTH_TOKEN` and logs
    pub fn new(gateway: BoxedPaymentGateway, presenter: P) -> Self {
        Self {
            gateway,
            presenter,
            credentials: Box::new(EnvCredentials),
            observer: Box::new(LoggingObserver),
            mode: PresentationMode::Redirect,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Builder: set the credential source
    pub fn with_credentials(mut self, credentials: impl CredentialSource + 'static) -> Self {
        self.credentials = Box::new(credentials);
        self
    }

    /// Builder: set the observer
    pub fn with_observer(mut self, observer: impl CheckoutObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Builder: set the presentation mode
    pub fn with_mode(mut self, mode: PresentationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> PresentationMode {
        self.mode
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// A checkout attempt is running
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Create a payment and present its checkout page.
    ///
    /// Returns `CheckoutInProgress` without side effects while another
    /// attempt is running. Every other failure is reported once to the
    /// observer before it is returned.
    #[instrument(skip(self, request), fields(mode = ?self.mode, amount = %request.amount()))]
    pub async fn launch(
        &self,
        request: &PaymentRequest,
    ) -> PaymentResult<CheckoutLaunch<P::Window>> {
        let _loading = LoadingGuard::acquire(&self.in_flight, self.observer.as_ref())
            .ok_or(PaymentError::CheckoutInProgress)?;

        let result = self.launch_session(request).await;
        if let Err(ref e) = result {
            warn!("Checkout launch failed: {}", e);
            self.observer.error(&e.user_message());
        }
        result
    }

    /// Single-call checkout: fetch a checkout link and redirect the page.
    #[instrument(skip(self, request), fields(amount = %request.amount()))]
    pub async fn redirect_checkout(&self, request: &PaymentRequest) -> PaymentResult<()> {
        let _loading = LoadingGuard::acquire(&self.in_flight, self.observer.as_ref())
            .ok_or(PaymentError::CheckoutInProgress)?;

        let result = self.redirect_with_link(request).await;
        if let Err(ref e) = result {
            warn!("Checkout redirect failed: {}", e);
            self.observer.error(&e.user_message());
        }
        result
    }

    /// Create a QR-code payment and have the presenter render it.
    ///
    /// Same guard and error reporting as [`launch`](Self::launch).
    #[instrument(skip(self, request), fields(amount = %request.amount()))]
    pub async fn launch_qr(&self, request: &PaymentRequest) -> PaymentResult<QrLaunch> {
        let _loading = LoadingGuard::acquire(&self.in_flight, self.observer.as_ref())
            .ok_or(PaymentError::CheckoutInProgress)?;

        let result = self.launch_qr_session(request).await;
        if let Err(ref e) = result {
            warn!("QR checkout failed: {}", e);
            self.observer.error(&e.user_message());
        }
        result
    }

    async fn launch_session(
        &self,
        request: &PaymentRequest,
    ) -> PaymentResult<CheckoutLaunch<P::Window>> {
        let auth = self.authenticate()?;

        let mut session = self.gateway.create_payment(request, &auth).await?;
        let url = session
            .take_confirmation_url()
            .ok_or(PaymentError::MissingConfirmationUrl)?;

        let window = self.present(&url)?;

        info!(
            "Checkout presented: payment_id={}, gateway={}",
            session.payment_id,
            self.gateway.gateway_name()
        );
        self.observer.checkout_started(Some(&session.payment_id));

        Ok(CheckoutLaunch {
            payment_id: session.payment_id,
            window,
            auth,
        })
    }

    async fn redirect_with_link(&self, request: &PaymentRequest) -> PaymentResult<()> {
        let auth = self.authenticate()?;

        let url = self.gateway.create_checkout_link(request, &auth).await?;
        if url.is_empty() {
            return Err(PaymentError::MissingConfirmationUrl);
        }

        self.presenter.navigate(&url)?;
        self.observer.checkout_started(None);
        Ok(())
    }

    async fn launch_qr_session(&self, request: &PaymentRequest) -> PaymentResult<QrLaunch> {
        let auth = self.authenticate()?;

        let payment = self.gateway.create_qr_payment(request, &auth).await?;
        if !payment.has_qr_data() {
            return Err(PaymentError::MissingQrData);
        }

        self.presenter.show_qr(&payment)?;

        info!(
            "QR checkout presented: payment_id={}, gateway={}",
            payment.payment_id,
            self.gateway.gateway_name()
        );
        self.observer.checkout_started(Some(&payment.payment_id));

        Ok(QrLaunch { payment, auth })
    }

    fn authenticate(&self) -> PaymentResult<AuthContext> {
        let auth = self.credentials.auth_context();
        if !auth.is_authenticated() {
            return Err(PaymentError::AuthorizationRequired);
        }
        Ok(auth)
    }

    fn present(&self, url: &str) -> PaymentResult<Option<P::Window>> {
        present_checkout(&self.presenter, self.mode, url)
    }
}

/// Holds the loading flag for one checkout attempt
struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
    observer: &'a dyn CheckoutObserver,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(flag: &'a AtomicBool, observer: &'a dyn CheckoutObserver) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        observer.loading_changed(true);
        Some(Self { flag, observer })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.observer.loading_changed(false);
    }
}
