pub mod sanitize;

use crate::shared::errors::BridgeError;
use crate::shared::ids::CorrelationId;
use crate::shared::time::sleep_with_stop;
use crate::store::artifact::ERROR_CODE_KEY;
use crate::store::{CallbackArtifact, SecureStore, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub use sanitize::sanitize_message;

const MAX_ID_ATTEMPTS: u32 = 8;
const STOP_CHECK_STEP: Duration = Duration::from_millis(20);
/// Extra time `wait` allows past the deadline before it stops trusting the
/// poll thread to report the timeout itself.
const WAIT_GRACE: Duration = Duration::from_millis(500);

pub type CallbackPayload = BTreeMap<String, String>;
type Settled = Result<CallbackPayload, BridgeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleReason {
    Resolved,
    Rejected,
    TimedOut,
    Cancelled,
}

impl SettleReason {
    fn event_name(self) -> &'static str {
        match self {
            Self::Resolved => "callback.resolved",
            Self::Rejected => "callback.rejected",
            Self::TimedOut => "callback.timeout",
            Self::Cancelled => "callback.cancelled",
        }
    }
}

struct PendingRequest {
    action: String,
    created_at: Instant,
    outcome_tx: Sender<Settled>,
    poll_stop: Arc<AtomicBool>,
    poll_handle: Option<JoinHandle<()>>,
}

/// Caller's side of a registered request. Consumed by
/// [`CallbackCorrelator::wait`].
#[derive(Debug)]
pub struct PendingCallback {
    id: CorrelationId,
    action: String,
    deadline: Instant,
    outcome_rx: Receiver<Settled>,
}

impl PendingCallback {
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

struct Shared {
    store: SecureStore,
    pending: Mutex<HashMap<CorrelationId, PendingRequest>>,
    timeout: Duration,
    poll_interval: Duration,
}

/// Tracks in-flight requests and resolves each one exactly once: from its
/// callback artifact, by timeout, or by explicit cancel. Whichever
/// transition removes the registry entry first wins; the others are no-ops.
#[derive(Clone)]
pub struct CallbackCorrelator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for CallbackCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackCorrelator")
            .field("store", &self.shared.store.root())
            .field("timeout", &self.shared.timeout)
            .field("poll_interval", &self.shared.poll_interval)
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl CallbackCorrelator {
    pub fn new(store: SecureStore, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                pending: Mutex::new(HashMap::new()),
                timeout,
                poll_interval,
            }),
        }
    }

    pub fn store(&self) -> &SecureStore {
        &self.shared.store
    }

    pub fn timeout(&self) -> Duration {
        self.shared.timeout
    }

    pub fn pending_count(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.shared.lock().contains_key(id)
    }

    /// Issues a fresh correlation id and starts watching the store for its
    /// artifact. The timeout clock starts here.
    pub fn register(&self, action: &str) -> Result<PendingCallback, BridgeError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate =
                CorrelationId::generate(action).map_err(|err| BridgeError::IdGeneration {
                    reason: err.to_string(),
                })?;
            if let Some(pending) = self.register_id(action, candidate) {
                return Ok(pending);
            }
        }
        Err(BridgeError::IdGeneration {
            reason: format!("no unused id after {MAX_ID_ATTEMPTS} attempts"),
        })
    }

    /// Claims `id` unless it is already pending. Store I/O runs before the
    /// registry lock is taken.
    fn register_id(&self, action: &str, id: CorrelationId) -> Option<PendingCallback> {
        if self.shared.lock().contains_key(&id) {
            return None;
        }
        // A leftover file under an unclaimed id can only be debris.
        self.shared.store.delete_artifact(&id);

        let mut pending = self.shared.lock();
        if pending.contains_key(&id) {
            return None;
        }
        let created_at = Instant::now();
        let deadline = created_at + self.shared.timeout;
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let poll_stop = Arc::new(AtomicBool::new(false));

        // The poll thread's first settle attempt blocks on `pending` until
        // the entry below is in place.
        let handle = {
            let shared = Arc::clone(&self.shared);
            let stop = Arc::clone(&poll_stop);
            let id = id.clone();
            thread::spawn(move || poll_for_artifact(&shared, &id, deadline, &stop))
        };
        pending.insert(
            id.clone(),
            PendingRequest {
                action: action.to_string(),
                created_at,
                outcome_tx,
                poll_stop,
                poll_handle: Some(handle),
            },
        );
        drop(pending);

        tracing::debug!(event = "callback.registered", callback_id = %id, action);
        Some(PendingCallback {
            id,
            action: action.to_string(),
            deadline,
            outcome_rx,
        })
    }

    /// Blocks until the request settles.
    pub fn wait(&self, pending: PendingCallback) -> Result<CallbackPayload, BridgeError> {
        let remaining = pending.deadline.saturating_duration_since(Instant::now());
        let budget = remaining + self.shared.poll_interval + WAIT_GRACE;
        match pending.outcome_rx.recv_timeout(budget) {
            Ok(settled) => settled,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                self.shared.settle(
                    &pending.id,
                    SettleReason::TimedOut,
                    Err(self.shared.timeout_error(&pending.action)),
                    true,
                );
                pending
                    .outcome_rx
                    .recv()
                    .unwrap_or_else(|_| Err(self.shared.timeout_error(&pending.action)))
            }
        }
    }

    /// Settles `id` as cancelled. Returns `false` when it had already
    /// settled.
    pub fn cancel(&self, id: &CorrelationId) -> bool {
        self.shared.settle(
            id,
            SettleReason::Cancelled,
            Err(BridgeError::Cancelled {
                callback_id: id.to_string(),
            }),
            true,
        )
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HashMap<CorrelationId, PendingRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timeout_error(&self, action: &str) -> BridgeError {
        BridgeError::CallbackTimeout {
            action: action.to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    /// Compare-and-remove. Only the caller that removes the entry stops the
    /// poll, deletes the artifact, and delivers `outcome`.
    fn settle(
        &self,
        id: &CorrelationId,
        reason: SettleReason,
        outcome: Settled,
        join_poll: bool,
    ) -> bool {
        let Some(mut entry) = self.lock().remove(id) else {
            return false;
        };
        entry.poll_stop.store(true, Ordering::Release);
        if join_poll {
            if let Some(handle) = entry.poll_handle.take() {
                let _ = handle.join();
            }
        }
        self.store.delete_artifact(id);

        let elapsed_ms = entry.created_at.elapsed().as_millis() as u64;
        let event = reason.event_name();
        match reason {
            SettleReason::Resolved | SettleReason::Rejected => {
                tracing::info!(event, callback_id = %id, action = %entry.action, elapsed_ms)
            }
            SettleReason::TimedOut | SettleReason::Cancelled => {
                tracing::warn!(event, callback_id = %id, action = %entry.action, elapsed_ms)
            }
        }
        let _ = entry.outcome_tx.send(outcome);
        true
    }

    fn settle_from_artifact(&self, id: &CorrelationId, artifact: CallbackArtifact) {
        let Some(action) = self.lock().get(id).map(|entry| entry.action.clone()) else {
            return;
        };
        if !artifact.is_error {
            self.settle(id, SettleReason::Resolved, Ok(artifact.data), false);
            return;
        }
        let code = artifact.data.get(ERROR_CODE_KEY);
        let raw = match (artifact.error_message(), code) {
            (Some(message), Some(code)) => format!("{message} (code {code})"),
            (Some(message), None) => message.to_string(),
            (None, Some(code)) => format!("application reported error code {code}"),
            (None, None) => "application reported an error without a message".to_string(),
        };
        let message = sanitize_message(&raw, id.as_str(), self.store.root());
        self.settle(
            id,
            SettleReason::Rejected,
            Err(BridgeError::ExternalError { action, message }),
            false,
        );
    }
}

fn poll_for_artifact(shared: &Shared, id: &CorrelationId, deadline: Instant, stop: &AtomicBool) {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            let action = shared.lock().get(id).map(|entry| entry.action.clone());
            if let Some(action) = action {
                shared.settle(
                    id,
                    SettleReason::TimedOut,
                    Err(shared.timeout_error(&action)),
                    false,
                );
            }
            return;
        }
        if !sleep_with_stop(stop, shared.poll_interval.min(remaining), STOP_CHECK_STEP) {
            return;
        }

        match shared.store.read_artifact(id) {
            Ok(artifact) => {
                shared.settle_from_artifact(id, artifact);
                return;
            }
            Err(StoreError::NotFound { .. })
            | Err(StoreError::SymlinkRejected { .. })
            | Err(StoreError::NotRegularFile { .. }) => {}
            Err(StoreError::Corrupt { reason, .. }) => {
                let action = shared.lock().get(id).map(|entry| entry.action.clone());
                if let Some(action) = action {
                    shared.settle(
                        id,
                        SettleReason::Rejected,
                        Err(BridgeError::ArtifactCorruption { action, reason }),
                        false,
                    );
                }
                return;
            }
            Err(err) => {
                tracing::warn!(event = "callback.read_failed", callback_id = %id, error = %err);
                shared.settle(id, SettleReason::Rejected, Err(BridgeError::Store(err)), false);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::{tempdir, TempDir};

    fn correlator(timeout_ms: u64, poll_ms: u64) -> (TempDir, CallbackCorrelator) {
        let dir = tempdir().expect("tempdir");
        let store = SecureStore::open(dir.path().join("callbacks")).expect("store");
        (
            dir,
            CallbackCorrelator::new(
                store,
                Duration::from_millis(timeout_ms),
                Duration::from_millis(poll_ms),
            ),
        )
    }

    #[test]
    fn artifact_resolves_and_is_deleted() {
        let (_dir, correlator) = correlator(2_000, 10);
        let pending = correlator.register("get-item").expect("register");
        let id = pending.id().clone();
        assert!(correlator.is_pending(&id));

        let mut data = BTreeMap::new();
        data.insert("item".to_string(), "{}".to_string());
        let path = correlator
            .store()
            .write_artifact(&CallbackArtifact::success(id.clone(), data.clone()))
            .expect("write");

        assert_eq!(correlator.wait(pending).expect("resolved"), data);
        assert!(!path.exists());
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn error_artifact_rejects_with_sanitized_message() {
        let (_dir, correlator) = correlator(2_000, 10);
        let pending = correlator.register("trash").expect("register");
        let id = pending.id().clone();

        let mut data = BTreeMap::new();
        data.insert("errorMessage".to_string(), format!("no item for {id}"));
        data.insert("errorCode".to_string(), "8".to_string());
        correlator
            .store()
            .write_artifact(&CallbackArtifact::error(id, data))
            .expect("write");

        match correlator.wait(pending) {
            Err(BridgeError::ExternalError { action, message }) => {
                assert_eq!(action, "trash");
                assert_eq!(message, "no item for <callback-id> (code 8)");
            }
            other => panic!("expected external error, got {other:?}"),
        }
    }

    #[test]
    fn silence_times_out_and_late_artifact_is_cleaned_up() {
        let (_dir, correlator) = correlator(150, 10);
        let pending = correlator.register("get-version").expect("register");
        let id = pending.id().clone();
        let started = Instant::now();

        let err = correlator.wait(pending).expect_err("timeout");
        assert!(matches!(err, BridgeError::CallbackTimeout { timeout_ms: 150, .. }));
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(!correlator.is_pending(&id));

        // A late write after timeout is never consumed.
        let path = correlator
            .store()
            .write_artifact(&CallbackArtifact::success(id.clone(), BTreeMap::new()))
            .expect("late write");
        thread::sleep(Duration::from_millis(50));
        assert!(path.exists());
        assert!(!correlator.cancel(&id));
    }

    #[test]
    fn corrupt_artifact_rejects_with_corruption() {
        let (_dir, correlator) = correlator(2_000, 10);
        let pending = correlator.register("get-item").expect("register");
        let path = correlator.store().path_for(pending.id()).expect("path");
        std::fs::write(&path, b"{not json").expect("write");

        let err = correlator.wait(pending).expect_err("corrupt");
        assert_eq!(err.code(), "artifact_corruption");
        assert!(!path.exists());
    }

    #[test]
    fn cancel_settles_once_and_wakes_waiter() {
        let (_dir, correlator) = correlator(5_000, 10);
        let pending = correlator.register("get-item").expect("register");
        let id = pending.id().clone();

        assert!(correlator.cancel(&id));
        assert!(!correlator.cancel(&id));
        let started = Instant::now();
        let err = correlator.wait(pending).expect_err("cancelled");
        assert!(matches!(err, BridgeError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn concurrent_requests_settle_independently() {
        let (_dir, correlator) = correlator(2_000, 10);
        let first = correlator.register("get-item").expect("first");
        let second = correlator.register("get-item").expect("second");
        assert_ne!(first.id(), second.id());
        assert_eq!(correlator.pending_count(), 2);

        let mut data = BTreeMap::new();
        data.insert("n".to_string(), "2".to_string());
        correlator
            .store()
            .write_artifact(&CallbackArtifact::success(second.id().clone(), data.clone()))
            .expect("write");
        assert_eq!(correlator.wait(second).expect("second resolves"), data);
        assert!(correlator.is_pending(first.id()));

        assert!(correlator.cancel(first.id()));
        assert!(correlator.wait(first).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_artifact_is_never_consumed() {
        let (dir, correlator) = correlator(200, 10);
        let pending = correlator.register("get-item").expect("register");
        let target = dir.path().join("elsewhere.json");
        std::fs::write(
            &target,
            format!(
                r#"{{"callbackId":"{}","isError":false,"data":{{}}}}"#,
                pending.id()
            ),
        )
        .expect("target");
        let link = correlator.store().path_for(pending.id()).expect("path");
        std::os::unix::fs::symlink(&target, &link).expect("symlink");

        let err = correlator.wait(pending).expect_err("timeout");
        assert_eq!(err.code(), "callback_timeout");
        assert!(target.exists());
    }
    #[test]
    fn debris_under_a_fresh_id_is_cleared_and_taken_ids_are_refused() {
        let (_dir, correlator) = correlator(150, 10);
        let id = CorrelationId::parse("get-item-1-debris").expect("id");
        let mut data = BTreeMap::new();
        data.insert("stale".to_string(), "yes".to_string());
        let debris = correlator
            .store()
            .write_artifact(&CallbackArtifact::success(id.clone(), data))
            .expect("debris");

        let pending = correlator
            .register_id("get-item", id.clone())
            .expect("unclaimed id");
        assert!(!debris.exists());
        assert!(correlator.register_id("get-item", id.clone()).is_none());
        assert_eq!(correlator.pending_count(), 1);

        let err = correlator.wait(pending).expect_err("debris never resolves");
        assert_eq!(err.code(), "callback_timeout");
        assert_eq!(correlator.pending_count(), 0);
    }
}
