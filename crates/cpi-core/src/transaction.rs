// ── Install transaction ──
//
// Idle -> Sending -> Succeeded | Failed, or Idle -> Skipped when the durable
// flag says the install was already reported. The flag is checked before
// acting, not compare-and-set: two instances started concurrently can both
// send. One instance never sends twice.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use strum::Display;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::config::TransactionConfig;
use crate::error::Error;
use crate::identifiers::{HostContext, IdentifierCollector};
use crate::payload;
use crate::store::{DurableStore, INSTALL_SENT_KEY};
use crate::transport::{Exchange, HttpTransport, Transport, TransportConfig};

/// Status code reported when no HTTP status was ever obtained.
pub const NO_STATUS: i32 = -1;

/// The only status the endpoint uses to acknowledge an install.
pub const SUCCESS_STATUS: i32 = 201;

/// The only body the endpoint uses to acknowledge an install.
pub const SUCCESS_BODY: &str = "ok";

const WORKER_THREAD_NAME: &str = "cpi-install";

// ── Listener ─────────────────────────────────────────────────────

/// Observer of the terminal outcome of a send.
///
/// Callbacks run on the background task, never on the thread that called
/// [`InstallTransaction::start`]. Nothing is delivered for a skipped send.
pub trait TransactionListener: Send + Sync {
    /// The endpoint acknowledged the install and the durable flag is set.
    fn on_success(&self, txn: &InstallTransaction);

    /// The send failed. `status_code` is [`NO_STATUS`] if no response
    /// status was ever obtained.
    fn on_error(&self, txn: &InstallTransaction, status_code: i32, cause: &Error);
}

// ── State / results ──────────────────────────────────────────────

/// Lifecycle of one [`InstallTransaction`]. `Sending` always ends in
/// `Succeeded` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TransactionState {
    Idle,
    Sending,
    Succeeded,
    Failed,
    /// The durable flag was already set; nothing was sent.
    Skipped,
}

impl TransactionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

/// What one send attempt produced, before it is judged.
#[derive(Debug)]
pub struct TransactionResult {
    /// [`NO_STATUS`] if never obtained.
    pub status_code: i32,
    pub response_body: Option<String>,
    pub error: Option<Error>,
}

impl TransactionResult {
    fn from_exchange(result: Result<Exchange, Error>) -> Self {
        match result {
            Ok(Exchange { status, body }) => Self {
                status_code: i32::from(status),
                response_body: Some(body),
                error: None,
            },
            Err(err) => Self {
                status_code: err.status().map_or(NO_STATUS, i32::from),
                response_body: None,
                error: Some(err),
            },
        }
    }

    /// No error, body exactly `ok`, status exactly `201`.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self.response_body.as_deref() == Some(SUCCESS_BODY)
            && self.status_code == SUCCESS_STATUS
    }

    /// The failure cause; a well-formed but rejected response becomes
    /// [`Error::Protocol`].
    fn into_cause(self) -> Error {
        match self.error {
            Some(err) => err,
            None => Error::Protocol {
                status: u16::try_from(self.status_code).unwrap_or_default(),
                body: self.response_body.unwrap_or_default(),
            },
        }
    }
}

/// Final result of [`InstallTransaction::start`], delivered through the
/// [`TransactionHandle`].
#[derive(Debug)]
pub enum Outcome {
    /// Acknowledged by the endpoint and recorded.
    Sent,
    /// The durable flag was already set; no request was made.
    AlreadySent,
    /// This instance had already been started; no request was made.
    AlreadyStarted,
    Failed { status_code: i32, error: Error },
}

impl Outcome {
    /// `true` when the install is on record, whether by this call or a
    /// previous one.
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Sent | Self::AlreadySent)
    }
}

/// Resolves to the [`Outcome`] of one `start()` call.
///
/// Dropping the handle does not cancel the send.
#[must_use = "dropping the handle is fine, but the outcome is only observable through it or a listener"]
pub struct TransactionHandle {
    rx: oneshot::Receiver<Outcome>,
}

impl TransactionHandle {
    fn ready(outcome: Outcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { rx }
    }

    /// Wait for the background send to finish.
    pub async fn wait(self) -> Outcome {
        self.rx.await.unwrap_or_else(|_| worker_lost())
    }

    /// Blocking variant of [`wait`](Self::wait). Panics if called from
    /// within an async runtime.
    pub fn blocking_wait(self) -> Outcome {
        self.rx.blocking_recv().unwrap_or_else(|_| worker_lost())
    }
}

fn worker_lost() -> Outcome {
    Outcome::Failed {
        status_code: NO_STATUS,
        error: Error::Runtime("install worker exited without reporting".into()),
    }
}

// ── InstallTransaction ───────────────────────────────────────────

/// Reports the install once per installation.
///
/// Cheaply cloneable; clones share state, listener, and the single-use
/// guard.
#[derive(Clone)]
pub struct InstallTransaction {
    inner: Arc<TransactionInner>,
}

struct TransactionInner {
    config: TransactionConfig,
    host: Arc<dyn HostContext>,
    store: Arc<dyn DurableStore>,
    transport: Arc<dyn Transport>,
    listener: RwLock<Option<Arc<dyn TransactionListener>>>,
    state: watch::Sender<TransactionState>,
}

impl InstallTransaction {
    /// Build a transaction that reports over HTTPS.
    pub fn new(
        config: TransactionConfig,
        host: Arc<dyn HostContext>,
        store: Arc<dyn DurableStore>,
    ) -> Result<Self, Error> {
        let transport = HttpTransport::new(&TransportConfig::with_timeout(config.timeout()))?;
        Self::with_transport(config, host, store, Arc::new(transport))
    }

    /// Build a transaction over a caller-supplied transport.
    pub fn with_transport(
        config: TransactionConfig,
        host: Arc<dyn HostContext>,
        store: Arc<dyn DurableStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        if host.device_id().trim().is_empty() {
            return Err(Error::InvalidConfig {
                field: "device_id",
                reason: "host context reported an empty device identifier".into(),
            });
        }

        let (state, _) = watch::channel(TransactionState::Idle);
        Ok(Self {
            inner: Arc::new(TransactionInner {
                config,
                host,
                store,
                transport,
                listener: RwLock::new(None),
                state,
            }),
        })
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.inner.config
    }

    pub fn app_key(&self) -> &str {
        self.inner.config.app_key()
    }

    pub fn state(&self) -> TransactionState {
        *self.inner.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<TransactionState> {
        self.inner.state.subscribe()
    }

    // ── Listener ─────────────────────────────────────────────────

    /// Register `listener`, replacing any previous one. Applies to every
    /// callback not yet dispatched.
    pub fn set_listener(&self, listener: Arc<dyn TransactionListener>) {
        *self
            .inner
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self
            .inner
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn listener(&self) -> Option<Arc<dyn TransactionListener>> {
        self.inner
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Report the install unless it is already on record.
    ///
    /// Returns immediately. The request runs on a dedicated worker thread
    /// with its own runtime, so it finishes even if the caller's runtime
    /// shuts down first.
    pub fn start(&self) -> TransactionHandle {
        if self.install_was_sent() {
            debug!("install already sent, not sending another one");
            self.inner
                .state
                .send_if_modified(|s| transition(s, TransactionState::Skipped));
            return TransactionHandle::ready(Outcome::AlreadySent);
        }

        let claimed = self
            .inner
            .state
            .send_if_modified(|s| transition(s, TransactionState::Sending));
        if !claimed {
            warn!(state = %self.state(), "transaction already started, ignoring start()");
            return TransactionHandle::ready(Outcome::AlreadyStarted);
        }

        debug!(app_key = %self.app_key(), "sending install");

        match self.spawn_worker() {
            Ok(handle) => handle,
            Err(e) => self.worker_unavailable(e),
        }
    }

    fn spawn_worker(&self) -> Result<TransactionHandle, Error> {
        let (tx, rx) = oneshot::channel();
        let txn = self.clone();
        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || {
                let outcome = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt.block_on(txn.send_install()),
                    Err(e) => txn.fail(
                        NO_STATUS,
                        Error::Runtime(format!("failed to build runtime: {e}")),
                    ),
                };
                let _ = tx.send(outcome);
            })
            .map_err(|e| Error::Runtime(format!("failed to spawn worker: {e}")))?;

        Ok(TransactionHandle { rx })
    }

    /// The send could not be scheduled. Listener and handle see the same cause.
    fn worker_unavailable(&self, cause: Error) -> TransactionHandle {
        error!(error = %cause, "could not start install worker");
        TransactionHandle::ready(self.fail(NO_STATUS, cause))
    }

    fn install_was_sent(&self) -> bool {
        match self.inner.store.get_bool(INSTALL_SENT_KEY, false) {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, "could not read install flag, assuming not sent");
                false
            }
        }
    }

    async fn send_install(&self) -> Outcome {
        let ids = IdentifierCollector::collect(self.inner.host.as_ref());
        let body = payload::install_form(self.app_key(), &ids);

        let result = TransactionResult::from_exchange(
            self.inner
                .transport
                .post_form(self.inner.config.endpoint(), body)
                .await,
        );
        debug!(
            app_key = %self.app_key(),
            status = result.status_code,
            "sent install"
        );

        if !result.is_success() {
            let status_code = result.status_code;
            return self.fail(status_code, result.into_cause());
        }

        if let Err(e) = self.inner.store.put_bool(INSTALL_SENT_KEY, true) {
            warn!(error = %e, "install acknowledged but flag could not be persisted");
            return self.fail(SUCCESS_STATUS, e);
        }

        self.inner.state.send_replace(TransactionState::Succeeded);
        info!(host = %self.inner.config.endpoint_host(), "install recorded");
        if let Some(listener) = self.listener() {
            listener.on_success(self);
        }
        Outcome::Sent
    }

    fn fail(&self, status_code: i32, error: Error) -> Outcome {
        self.inner.state.send_replace(TransactionState::Failed);
        warn!(status_code, error = %error, "install transaction failed");
        if let Some(listener) = self.listener() {
            listener.on_error(self, status_code, &error);
        }
        Outcome::Failed { status_code, error }
    }
}

fn transition(state: &mut TransactionState, to: TransactionState) -> bool {
    if *state == TransactionState::Idle {
        *state = to;
        true
    } else {
        false
    }
}

impl fmt::Debug for InstallTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallTransaction")
            .field("endpoint", &self.inner.config.endpoint().as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn exchange(status: u16, body: &str) -> Result<Exchange, Error> {
        Ok(Exchange {
            status,
            body: body.into(),
        })
    }

    #[test]
    fn created_with_ok_body_is_success() {
        assert!(TransactionResult::from_exchange(exchange(201, "ok")).is_success());
    }

    #[test]
    fn body_match_is_case_sensitive() {
        let result = TransactionResult::from_exchange(exchange(201, "OK"));
        assert!(!result.is_success());
        assert!(matches!(
            result.into_cause(),
            Error::Protocol { status: 201, ref body } if body == "OK"
        ));
    }

    #[test]
    fn plain_200_is_not_success() {
        assert!(!TransactionResult::from_exchange(exchange(200, "ok")).is_success());
    }

    #[test]
    fn trailing_whitespace_is_not_success() {
        assert!(!TransactionResult::from_exchange(exchange(201, "ok\n")).is_success());
    }

    #[test]
    fn transport_error_without_status_maps_to_no_status() {
        let result =
            TransactionResult::from_exchange(Err(Error::Timeout { timeout_secs: 60 }));
        assert_eq!(result.status_code, NO_STATUS);
        assert!(result.response_body.is_none());
        assert!(!result.is_success());
    }

    #[test]
    fn transition_only_leaves_idle() {
        let mut state = TransactionState::Idle;
        assert!(transition(&mut state, TransactionState::Sending));
        assert_eq!(state, TransactionState::Sending);
        assert!(!transition(&mut state, TransactionState::Skipped));
        assert_eq!(state, TransactionState::Sending);
    }

    #[test]
    fn terminal_states() {
        assert!(!TransactionState::Idle.is_terminal());
        assert!(!TransactionState::Sending.is_terminal());
        assert!(TransactionState::Skipped.is_terminal());
        assert_eq!(TransactionState::Succeeded.to_string(), "succeeded");
    }

    // ── Worker start failure ─────────────────────────────────────

    struct Unreachable;

    impl Transport for Unreachable {
        fn post_form<'a>(
            &'a self,
            _url: &'a url::Url,
            _body: String,
        ) -> futures::future::BoxFuture<'a, Result<Exchange, Error>> {
            unreachable!("no request is made when the worker cannot start")
        }
    }

    #[derive(Default)]
    struct Causes(std::sync::Mutex<Vec<(i32, String)>>);

    impl TransactionListener for Causes {
        fn on_success(&self, _txn: &InstallTransaction) {}

        fn on_error(&self, _txn: &InstallTransaction, status_code: i32, cause: &Error) {
            self.0.lock().unwrap().push((status_code, cause.to_string()));
        }
    }

    #[test]
    fn unavailable_worker_reports_one_cause_to_handle_and_listener() {
        let txn = InstallTransaction::with_transport(
            TransactionConfig::new("X").unwrap(),
            Arc::new(crate::identifiers::StaticHost::new("Y")),
            Arc::new(crate::store::MemoryStore::new()),
            Arc::new(Unreachable),
        )
        .unwrap();
        let causes = Arc::new(Causes::default());
        txn.set_listener(causes.clone());

        let outcome = txn
            .worker_unavailable(Error::Runtime("failed to spawn worker: no threads".into()))
            .blocking_wait();

        let Outcome::Failed { status_code, error } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(status_code, NO_STATUS);
        assert_eq!(
            *causes.0.lock().unwrap(),
            vec![(NO_STATUS, error.to_string())]
        );
        assert!(error.to_string().contains("no threads"));
        assert_eq!(txn.state(), TransactionState::Failed);
    }
}
