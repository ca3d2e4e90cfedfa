//! Fire-and-forget pass trigger.
//!
//! Callers enqueue a [`PassRequest`] and return immediately. A single
//! dispatch loop owns the receiving end and spawns one task per request,
//! bounded by a semaphore. A user whose pass is still running is skipped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::harvest::HarvestWorker;
use crate::models::UserId;

/// Request to run one pass for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassRequest {
    pub user_id: UserId,
}

/// Dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub started: u64,
    pub completed: u64,
    /// Requests dropped because the user already had a pass in flight.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    started: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
}

/// Handle for enqueueing passes. Cloneable; the dispatch loop stops once
/// every handle is dropped and the running passes have finished.
#[derive(Debug, Clone)]
pub struct PassDispatcher {
    tx: mpsc::UnboundedSender<PassRequest>,
    counters: Arc<Counters>,
}

impl PassDispatcher {
    /// Spawn the dispatch loop on the current runtime.
    ///
    /// The returned handle resolves to the final counters once the loop
    /// has stopped.
    pub fn spawn(
        worker: HarvestWorker,
        max_concurrent: usize,
    ) -> (Self, JoinHandle<DispatcherStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

        let handle = tokio::spawn(dispatch_loop(worker, rx, semaphore, counters.clone()));
        (Self { tx, counters }, handle)
    }

    /// Enqueue a pass for `user_id` without waiting for it.
    pub fn start_pass(&self, user_id: UserId) {
        if self.tx.send(PassRequest { user_id }).is_err() {
            warn!(user_id, "dispatcher stopped, pass not queued");
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        self.counters.snapshot()
    }
}

impl Counters {
    fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

type InFlight = Arc<Mutex<HashSet<UserId>>>;

/// Marks a user's pass as running until dropped.
///
/// Dropping releases the user even when the pass panicked or its task was
/// aborted, so later requests for that user are not skipped forever.
struct PassSlot {
    user_id: UserId,
    in_flight: InFlight,
    counters: Arc<Counters>,
}

impl PassSlot {
    fn claim(user_id: UserId, in_flight: &InFlight, counters: &Arc<Counters>) -> Option<Self> {
        let claimed = in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(user_id);
        claimed.then(|| Self {
            user_id,
            in_flight: in_flight.clone(),
            counters: counters.clone(),
        })
    }
}

impl Drop for PassSlot {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.user_id);
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
    }
}

fn log_task_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "pass task failed");
    }
}

async fn dispatch_loop(
    worker: HarvestWorker,
    mut rx: mpsc::UnboundedReceiver<PassRequest>,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
) -> DispatcherStats {
    let in_flight: InFlight = Arc::new(Mutex::new(HashSet::new()));
    let mut tasks = JoinSet::new();

    while let Some(PassRequest { user_id }) = rx.recv().await {
        // Reap finished tasks so the set does not grow unbounded.
        while let Some(result) = tasks.try_join_next() {
            log_task_result(result);
        }

        let Some(slot) = PassSlot::claim(user_id, &in_flight, &counters) else {
            debug!(user_id, "pass already running, skipping");
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            continue;
        };
        counters.started.fetch_add(1, Ordering::Relaxed);

        let worker = worker.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _slot = slot;
            // The semaphore is never closed.
            let _permit = semaphore.acquire_owned().await.ok();
            worker.run_pass(user_id).await;
        });
    }

    info!(running = tasks.len(), "dispatcher closed, waiting for running passes");
    while let Some(result) = tasks.join_next().await {
        log_task_result(result);
    }
    counters.snapshot()
}
