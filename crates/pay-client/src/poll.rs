//! # Status Polling
//!
//! Polls a payment until it settles. One status request is outstanding at a
//! time; the next tick is scheduled only after the previous result has been
//! processed.
//!
//! ```text
//!   ┌──────────┐   fetch ok    ┌───────────┐  paid / succeeded   ┌─────────┐
//!   │   tick   │ ────────────▶ │ on_update │ ──────────────────▶ │   Ok    │
//!   └──────────┘               └───────────┘                     └─────────┘
//!        ▲                       │      │  canceled / failed     ┌─────────┐
//!        │ sleep(interval)       │      └──────────────────────▶ │Rejected │
//!        │                       │ attempts >= max               ┌─────────┐
//!        └───────────────────────┴─────────────────────────────▶ │ Timeout │
//! ```
//!
//! `poll_status` stops when its future is dropped. `spawn_poll` runs it as a
//! task and returns a [`PollHandle`] for consumers that need to cancel from
//! elsewhere (component teardown, Ctrl+C).

use pay_core::{
    AuthContext, BoxedPaymentGateway, PaymentError, PaymentGateway, PaymentResult,
    PaymentStatusSnapshot,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Polling cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Status checks before giving up
    pub max_attempts: u32,
    /// Wait between checks
    pub interval: Duration,
}

impl PollSettings {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);
    pub const QR_MAX_ATTEMPTS: u32 = 100;
    pub const QR_INTERVAL: Duration = Duration::from_millis(3000);

    /// Create settings; `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Cadence for QR payments: the customer switches to a banking app,
    /// so checks are sparser and the window is five minutes
    pub fn qr() -> Self {
        Self::new(Self::QR_MAX_ATTEMPTS, Self::QR_INTERVAL)
    }

    /// Upper bound on the time spent waiting between checks
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INTERVAL)
    }
}

/// Poll `payment_id` until it succeeds, is rejected, or attempts run out.
///
/// `on_update` sees every snapshot, including the terminal one. A failed
/// status fetch ends polling with that error.
#[instrument(skip(gateway, auth, on_update), fields(gateway = gateway.gateway_name()))]
pub async fn poll_status<G, F>(
    gateway: &G,
    payment_id: &str,
    auth: &AuthContext,
    settings: PollSettings,
    mut on_update: F,
) -> PaymentResult<PaymentStatusSnapshot>
where
    G: PaymentGateway + ?Sized,
    F: FnMut(&PaymentStatusSnapshot),
{
    let mut attempts: u32 = 0;

    loop {
        let snapshot = gateway.get_payment_status(payment_id, auth).await?;
        on_update(&snapshot);

        if snapshot.is_success() {
            info!(
                "Payment succeeded: payment_id={}, status={}",
                payment_id, snapshot.status
            );
            return Ok(snapshot);
        }

        if snapshot.is_rejected() {
            warn!(
                "Payment rejected: payment_id={}, status={}",
                payment_id, snapshot.status
            );
            return Err(PaymentError::PaymentRejected {
                status: snapshot.status.to_string(),
            });
        }

        attempts += 1;
        if attempts >= settings.max_attempts {
            warn!(
                "Payment wait timeout: payment_id={}, attempts={}",
                payment_id, attempts
            );
            return Err(PaymentError::PollTimeout { attempts });
        }

        debug!(
            "Payment still {}: attempt={}/{}",
            snapshot.status, attempts, settings.max_attempts
        );
        tokio::time::sleep(settings.interval).await;
    }
}

/// Run [`poll_status`] as a background task.
pub fn spawn_poll<F>(
    gateway: BoxedPaymentGateway,
    payment_id: impl Into<String>,
    auth: AuthContext,
    settings: PollSettings,
    on_update: F,
) -> PollHandle
where
    F: FnMut(&PaymentStatusSnapshot) + Send + 'static,
{
    let gate = Arc::new(CallbackGate::default());
    let task_gate = Arc::clone(&gate);
    let payment_id = payment_id.into();

    let task = tokio::spawn(async move {
        let mut on_update = on_update;
        poll_status(gateway.as_ref(), &payment_id, &auth, settings, |snapshot| {
            task_gate.run(|| on_update(snapshot));
        })
        .await
    });

    PollHandle {
        gate,
        task: Some(task),
    }
}

/// Serializes `on_update` against `cancel()`.
///
/// A running callback holds `running`, so a cancel from another thread
/// waits for it to finish. A cancel issued by the callback itself only sets
/// the flag.
#[derive(Default)]
struct CallbackGate {
    cancelled: AtomicBool,
    running: Mutex<()>,
    callback_thread: Mutex<Option<ThreadId>>,
}

impl CallbackGate {
    fn run(&self, callback: impl FnOnce()) {
        let _running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }

        self.set_callback_thread(Some(thread::current().id()));
        callback();
        self.set_callback_thread(None);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);

        let in_callback = *self
            .callback_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            == Some(thread::current().id());
        if !in_callback {
            drop(self.running.lock().unwrap_or_else(PoisonError::into_inner));
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn set_callback_thread(&self, id: Option<ThreadId>) {
        *self
            .callback_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = id;
    }
}

/// Handle to a spawned poll. Dropping the handle cancels the poll.
pub struct PollHandle {
    gate: Arc<CallbackGate>,
    task: Option<JoinHandle<PaymentResult<PaymentStatusSnapshot>>>,
}

impl PollHandle {
    /// Stop polling.
    ///
    /// Once this returns, `on_update` is not invoked again and no further
    /// status check is scheduled. May be called from inside `on_update`.
    pub fn cancel(&self) {
        self.gate.cancel();
        if let Some(task) = &self.task {
            task.abort();
        }
        debug!("Payment polling cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.is_cancelled()
    }

    /// The poll has settled (or was cancelled)
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Wait for the outcome. A cancelled poll yields `PollCancelled`.
    ///
    /// Dropping the returned future before it completes cancels the poll.
    pub async fn wait(mut self) -> PaymentResult<PaymentStatusSnapshot> {
        let Some(task) = self.task.as_mut() else {
            return Err(PaymentError::PollCancelled);
        };

        let outcome = task.await;
        self.task = None;
        if self.is_cancelled() {
            return Err(PaymentError::PollCancelled);
        }

        match outcome {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(PaymentError::PollCancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.task.as_ref().is_some_and(|t| !t.is_finished()) {
            self.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pay_core::{PaymentRequest, PaymentSession, PaymentStatus};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    struct ScriptedGateway {
        statuses: Mutex<VecDeque<PaymentResult<(&'static str, bool)>>>,
        fetches: AtomicUsize,
    }

    impl ScriptedGateway {
        fn new(statuses: Vec<PaymentResult<(&'static str, bool)>>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn create_payment(
            &self,
            _request: &PaymentRequest,
            _auth: &AuthContext,
        ) -> PaymentResult<PaymentSession> {
            unreachable!("polling never creates payments")
        }

        async fn get_payment_status(
            &self,
            payment_id: &str,
            _auth: &AuthContext,
        ) -> PaymentResult<PaymentStatusSnapshot> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            let next = if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                statuses.front().cloned().unwrap()
            };
            let (status, paid) = next?;
            Ok(PaymentStatusSnapshot {
                payment_id: payment_id.to_string(),
                status: PaymentStatus::parse(status),
                paid,
                amount: None,
                created_at: None,
            })
        }

        fn gateway_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn settings(max_attempts: u32) -> PollSettings {
        PollSettings::new(max_attempts, Duration::from_millis(2000))
    }

    fn assert_waited(start: Instant, expected_ms: u64) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(expected_ms)
                && elapsed < Duration::from_millis(expected_ms + 50),
            "expected ~{}ms, waited {:?}",
            expected_ms,
            elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_pending_succeeded() {
        let gateway = ScriptedGateway::new(vec![
            Ok(("pending", false)),
            Ok(("pending", false)),
            Ok(("succeeded", true)),
        ]);
        let mut seen = Vec::new();
        let start = Instant::now();

        let snapshot = poll_status(
            &gateway,
            "pay_1",
            &AuthContext::anonymous(),
            settings(60),
            |s| seen.push(s.status.clone()),
        )
        .await
        .unwrap();

        assert_eq!(snapshot.status, PaymentStatus::Succeeded);
        assert_eq!(gateway.fetches(), 3);
        assert_eq!(
            seen,
            vec![
                PaymentStatus::Pending,
                PaymentStatus::Pending,
                PaymentStatus::Succeeded
            ]
        );
        assert_waited(start, 4000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_pending_times_out() {
        let gateway = ScriptedGateway::new(vec![Ok(("pending", false))]);
        let mut updates = 0;

        let err = poll_status(
            &gateway,
            "pay_1",
            &AuthContext::anonymous(),
            settings(3),
            |_| updates += 1,
        )
        .await
        .unwrap_err();

        assert_eq!(err, PaymentError::PollTimeout { attempts: 3 });
        assert_eq!(gateway.fetches(), 3);
        assert_eq!(updates, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_first_fails_without_waiting() {
        let gateway = ScriptedGateway::new(vec![Ok(("canceled", false))]);
        let mut updates = 0;
        let start = Instant::now();

        let err = poll_status(
            &gateway,
            "pay_1",
            &AuthContext::anonymous(),
            settings(60),
            |_| updates += 1,
        )
        .await
        .unwrap_err();

        assert!(err.is_rejection());
        assert_eq!(gateway.fetches(), 1);
        assert_eq!(updates, 1);
        assert_waited(start, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_is_rejection() {
        let gateway = ScriptedGateway::new(vec![Ok(("pending", false)), Ok(("failed", false))]);

        let err = poll_status(
            &gateway,
            "pay_1",
            &AuthContext::anonymous(),
            settings(60),
            |_| {},
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            PaymentError::PaymentRejected {
                status: "failed".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_flag_wins_over_status() {
        let gateway = ScriptedGateway::new(vec![Ok(("waiting_for_capture", true))]);

        let snapshot = poll_status(
            &gateway,
            "pay_1",
            &AuthContext::anonymous(),
            settings(60),
            |_| {},
        )
        .await
        .unwrap();

        assert!(snapshot.paid);
        assert_eq!(gateway.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_keeps_polling() {
        let gateway = ScriptedGateway::new(vec![
            Ok(("refund_pending", false)),
            Ok(("succeeded", false)),
        ]);

        let snapshot = poll_status(
            &gateway,
            "pay_1",
            &AuthContext::anonymous(),
            settings(60),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(snapshot.status, PaymentStatus::Succeeded);
        assert_eq!(gateway.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_settles_immediately() {
        let gateway = ScriptedGateway::new(vec![
            Ok(("pending", false)),
            Err(PaymentError::StatusFetchFailed(
                "Failed to fetch payment status".into(),
            )),
            Ok(("succeeded", true)),
        ]);
        let mut updates = 0;

        let err = poll_status(
            &gateway,
            "pay_1",
            &AuthContext::anonymous(),
            settings(60),
            |_| updates += 1,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PaymentError::StatusFetchFailed(_)));
        assert_eq!(gateway.fetches(), 2);
        assert_eq!(updates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_poll_resolves() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(("pending", false)),
            Ok(("succeeded", true)),
        ]));
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);

        let handle = spawn_poll(
            gateway.clone(),
            "pay_1",
            AuthContext::anonymous(),
            settings(60),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        let snapshot = handle.wait().await.unwrap();
        assert!(snapshot.is_success());
        assert_eq!(updates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks_and_callbacks() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(("pending", false))]));
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);

        let handle = spawn_poll(
            gateway.clone(),
            "pay_1",
            AuthContext::anonymous(),
            settings(60),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        // First tick runs, then the task sleeps for the interval.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(gateway.fetches(), 1);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(gateway.fetches(), 1);
        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert!(handle.is_cancelled());
        assert_eq!(handle.wait().await.unwrap_err(), PaymentError::PollCancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(("pending", false))]));

        let handle = spawn_poll(
            gateway.clone(),
            "pay_1",
            AuthContext::anonymous(),
            settings(60),
            |_| {},
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(gateway.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_wait_cancels() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(("pending", false))]));

        let handle = spawn_poll(
            gateway.clone(),
            "pay_1",
            AuthContext::anonymous(),
            settings(60),
            |_| {},
        );

        let outcome = tokio::time::timeout(Duration::from_millis(100), handle.wait()).await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(gateway.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_from_inside_callback() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(("pending", false))]));
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);
        let slot: Arc<Mutex<Option<PollHandle>>> = Arc::new(Mutex::new(None));
        let callback_slot = Arc::clone(&slot);

        let handle = spawn_poll(
            gateway.clone(),
            "pay_1",
            AuthContext::anonymous(),
            settings(60),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(handle) = callback_slot.lock().unwrap().as_ref() {
                    handle.cancel();
                }
            },
        );
        *slot.lock().unwrap() = Some(handle);

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(gateway.fetches(), 1);
        assert_eq!(updates.load(Ordering::SeqCst), 1);

        let handle = slot.lock().unwrap().take().unwrap();
        assert!(handle.is_cancelled());
        assert_eq!(handle.wait().await.unwrap_err(), PaymentError::PollCancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_from_inside_callback_on_worker_thread() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(("pending", false))]));
        let slot: Arc<Mutex<Option<PollHandle>>> = Arc::new(Mutex::new(None));
        let callback_slot = Arc::clone(&slot);
        let (returned_tx, returned_rx) = tokio::sync::oneshot::channel();
        let mut returned_tx = Some(returned_tx);

        let handle = spawn_poll(
            gateway.clone(),
            "pay_1",
            AuthContext::anonymous(),
            PollSettings::new(60, Duration::from_millis(10)),
            move |_| {
                // Wait until the handle is parked in the slot.
                let handle = loop {
                    if let Some(handle) = callback_slot.lock().unwrap().take() {
                        break handle;
                    }
                    std::thread::yield_now();
                };
                handle.cancel();
                if let Some(tx) = returned_tx.take() {
                    let _ = tx.send(handle.is_cancelled());
                }
            },
        );
        *slot.lock().unwrap() = Some(handle);

        let returned = tokio::time::timeout(Duration::from_secs(5), returned_rx)
            .await
            .expect("cancel() inside on_update did not return")
            .unwrap();

        assert!(returned);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(gateway.fetches(), 1);
    }

    #[test]
    fn test_default_budget() {
        assert_eq!(PollSettings::default().budget(), Duration::from_secs(120));
    }

    #[test]
    fn test_qr_budget() {
        let qr = PollSettings::qr();
        assert_eq!(qr.interval, Duration::from_secs(3));
        assert_eq!(qr.budget(), Duration::from_secs(300));
    }
}
