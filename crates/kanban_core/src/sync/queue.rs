//! Background delivery of remote calls.
//!
//! # Responsibility
//! - Drain enqueued calls in FIFO order on one worker task.
//! - Retry transient failures with doubling backoff.
//! - Report every call's fate on a notice channel.
//!
//! # Invariants
//! - Local state is never touched from here.
//! - A cancellation covers calls enqueued before it, never later ones.
//! - A cancelled in-flight call's result is discarded.
//! - A create is unsent until the worker starts its first attempt.

use super::remote::{EntityKey, RemoteBackend, RemoteCall, RemoteError};
use crate::config::SyncConfig;
use crate::model::id::EntityKind;
use log::{debug, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Enqueue receipt; increases monotonically per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyncTicket(pub u64);

impl Display for SyncTicket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Final outcome of one enqueued call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotice {
    Delivered {
        ticket: SyncTicket,
        attempts: u32,
    },
    Failed {
        ticket: SyncTicket,
        call: RemoteCall,
        error: RemoteError,
        attempts: u32,
    },
    Cancelled {
        ticket: SyncTicket,
        call: RemoteCall,
    },
}

impl SyncNotice {
    pub fn ticket(&self) -> SyncTicket {
        match self {
            Self::Delivered { ticket, .. }
            | Self::Failed { ticket, .. }
            | Self::Cancelled { ticket, .. } => *ticket,
        }
    }
}

/// The worker has stopped and accepts no more calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueClosed;

impl Display for QueueClosed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "sync queue is closed")
    }
}

impl Error for QueueClosed {}

struct Job {
    ticket: SyncTicket,
    call: RemoteCall,
}

/// Per-entity cancellation watermarks and creates not yet sent.
///
/// One lock covers both maps, so a cancel either sees a create still
/// unsent or the worker has already started sending it.
#[derive(Default)]
struct CancelRegistry {
    state: Mutex<CancelState>,
}

#[derive(Default)]
struct CancelState {
    watermarks: HashMap<EntityKey, u64>,
    unsent_creates: HashMap<EntityKey, u64>,
}

impl CancelState {
    fn covers(&self, job: &Job) -> bool {
        job.call.touches().iter().any(|key| {
            self.watermarks
                .get(key)
                .is_some_and(|watermark| job.ticket.0 <= *watermark)
        })
    }
}

impl CancelRegistry {
    fn lock(&self) -> MutexGuard<'_, CancelState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn track_create(&self, job: &Job) {
        if let Some(key) = job.call.created_entity() {
            self.lock().unsent_creates.insert(key, job.ticket.0);
        }
    }

    fn forget_create(&self, job: &Job) {
        if let Some(key) = job.call.created_entity() {
            let mut state = self.lock();
            if state.unsent_creates.get(&key) == Some(&job.ticket.0) {
                state.unsent_creates.remove(&key);
            }
        }
    }

    /// Returns true when the entity's own create was caught before sending.
    fn cancel(&self, key: EntityKey, up_to: u64) -> bool {
        let mut state = self.lock();
        let create_caught = state
            .unsent_creates
            .get(&key)
            .is_some_and(|ticket| *ticket <= up_to);
        if create_caught {
            state.unsent_creates.remove(&key);
        }
        let entry = state.watermarks.entry(key).or_insert(0);
        *entry = (*entry).max(up_to);
        create_caught
    }

    fn is_cancelled(&self, job: &Job) -> bool {
        self.lock().covers(job)
    }

    /// Marks the job as sent unless it is cancelled. Returns false when
    /// cancelled.
    fn begin_attempt(&self, job: &Job) -> bool {
        let mut state = self.lock();
        if state.covers(job) {
            return false;
        }
        if let Some(key) = job.call.created_entity() {
            if state.unsent_creates.get(&key) == Some(&job.ticket.0) {
                state.unsent_creates.remove(&key);
            }
        }
        true
    }
}

#[derive(Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// FIFO queue of remote calls served by one tokio worker.
pub struct SyncQueue {
    sender: UnboundedSender<Job>,
    cancels: Arc<CancelRegistry>,
    last_ticket: AtomicU64,
    worker: JoinHandle<()>,
}

impl SyncQueue {
    /// Spawns the worker on `runtime` and returns the queue with its
    /// notice receiver.
    pub fn start(
        backend: Arc<dyn RemoteBackend>,
        config: &SyncConfig,
        runtime: &Handle,
    ) -> (Self, UnboundedReceiver<SyncNotice>) {
        let (sender, jobs) = mpsc::unbounded_channel();
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let cancels = Arc::new(CancelRegistry::default());
        let policy = RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        };

        let worker = runtime.spawn(run_worker(jobs, notices, backend, cancels.clone(), policy));
        debug!(
            "event=sync_start module=sync status=ok max_attempts={} backoff_ms={}",
            policy.max_attempts, config.retry_backoff_ms
        );

        (
            Self {
                sender,
                cancels,
                last_ticket: AtomicU64::new(0),
                worker,
            },
            notice_rx,
        )
    }

    /// Appends `call` to the queue.
    pub fn enqueue(&self, call: RemoteCall) -> Result<SyncTicket, QueueClosed> {
        let ticket = SyncTicket(self.last_ticket.fetch_add(1, Ordering::SeqCst) + 1);
        let op = call.op();
        let job = Job { ticket, call };
        self.cancels.track_create(&job);
        if let Err(mpsc::error::SendError(job)) = self.sender.send(job) {
            self.cancels.forget_create(&job);
            return Err(QueueClosed);
        }
        debug!("event=sync_enqueue module=sync status=ok ticket={ticket} op={op}");
        Ok(ticket)
    }

    /// Re-enqueues a call from a `SyncNotice::Failed`.
    pub fn retry(&self, call: RemoteCall) -> Result<SyncTicket, QueueClosed> {
        self.enqueue(call)
    }

    /// Cancels every call already enqueued that touches the entity.
    ///
    /// Cancelling a board covers all calls of that board. Returns true when
    /// the entity's own create call was still unsent; the server then never
    /// learns about the entity.
    pub fn cancel_entity(&self, kind: EntityKind, id: &str) -> bool {
        let up_to = self.last_ticket.load(Ordering::SeqCst);
        let create_caught = self.cancels.cancel(EntityKey::new(kind, id), up_to);
        debug!(
            "event=sync_cancel module=sync status=ok kind={kind} id={id} up_to={up_to} create_caught={create_caught}"
        );
        create_caught
    }

    /// Stops accepting calls and waits for queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(err) = self.worker.await {
            warn!("event=sync_shutdown module=sync status=error error={err}");
        }
    }
}

async fn run_worker(
    mut jobs: UnboundedReceiver<Job>,
    notices: UnboundedSender<SyncNotice>,
    backend: Arc<dyn RemoteBackend>,
    cancels: Arc<CancelRegistry>,
    policy: RetryPolicy,
) {
    while let Some(job) = jobs.recv().await {
        let notice = deliver(job, &backend, &cancels, policy).await;
        // Receiver may be gone; delivery continues regardless.
        let _ = notices.send(notice);
    }
}

async fn deliver(
    job: Job,
    backend: &Arc<dyn RemoteBackend>,
    cancels: &CancelRegistry,
    policy: RetryPolicy,
) -> SyncNotice {
    let mut attempts = 0;
    loop {
        if !cancels.begin_attempt(&job) {
            debug!(
                "event=sync_call module=sync status=cancelled ticket={} op={}",
                job.ticket,
                job.call.op()
            );
            return SyncNotice::Cancelled {
                ticket: job.ticket,
                call: job.call,
            };
        }

        attempts += 1;
        let result = send_blocking(backend.clone(), job.call.clone()).await;
        if cancels.is_cancelled(&job) {
            continue;
        }

        match result {
            Ok(()) => {
                debug!(
                    "event=sync_call module=sync status=ok ticket={} op={} attempts={attempts}",
                    job.ticket,
                    job.call.op()
                );
                return SyncNotice::Delivered {
                    ticket: job.ticket,
                    attempts,
                };
            }
            Err(error) if error.retryable && attempts < policy.max_attempts => {
                debug!(
                    "event=sync_call module=sync status=retry ticket={} op={} attempts={attempts}",
                    job.ticket,
                    job.call.op()
                );
                tokio::time::sleep(policy.delay_after(attempts)).await;
            }
            Err(error) => {
                warn!(
                    "event=sync_call module=sync status=error ticket={} op={} attempts={attempts} retryable={}",
                    job.ticket,
                    job.call.op(),
                    error.retryable
                );
                return SyncNotice::Failed {
                    ticket: job.ticket,
                    call: job.call,
                    error,
                    attempts,
                };
            }
        }
    }
}

async fn send_blocking(
    backend: Arc<dyn RemoteBackend>,
    call: RemoteCall,
) -> Result<(), RemoteError> {
    tokio::task::spawn_blocking(move || backend.send(&call))
        .await
        .unwrap_or_else(|err| Err(RemoteError::permanent(format!("backend task failed: {err}"))))
}

#[cfg(test)]
mod tests {
    use super::{CancelRegistry, Job, RetryPolicy, SyncTicket};
    use crate::model::id::EntityKind;
    use crate::sync::remote::{EntityKey, RemoteCall};
    use std::time::Duration;

    fn create_column(ticket: u64) -> Job {
        Job {
            ticket: SyncTicket(ticket),
            call: RemoteCall::CreateColumn {
                board_id: "b1".to_string(),
                column_id: "c1".to_string(),
                title: "Todo".to_string(),
            },
        }
    }

    #[test]
    fn cancel_reports_create_that_was_never_sent() {
        let registry = CancelRegistry::default();
        let job = create_column(1);
        registry.track_create(&job);

        assert!(registry.cancel(EntityKey::new(EntityKind::Column, "c1"), 1));
        assert!(!registry.begin_attempt(&job));
    }

    #[test]
    fn cancel_after_first_attempt_keeps_create_as_sent() {
        let registry = CancelRegistry::default();
        let job = create_column(1);
        registry.track_create(&job);
        assert!(registry.begin_attempt(&job));

        assert!(!registry.cancel(EntityKey::new(EntityKind::Column, "c1"), 1));
        assert!(registry.is_cancelled(&job));
    }

    #[test]
    fn board_cancel_does_not_claim_column_create() {
        let registry = CancelRegistry::default();
        let job = create_column(1);
        registry.track_create(&job);

        assert!(!registry.cancel(EntityKey::new(EntityKind::Board, "b1"), 1));
        assert!(!registry.begin_attempt(&job));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }
}
