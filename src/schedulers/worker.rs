//! # Dedicated idle worker.
//!
//! [`IdleWorker`] runs deferred jobs on one background task fed by an unbounded queue.
//! Publishers never wait: `schedule_when_idle` only enqueues.
//!
//! ## Architecture
//! ```text
//! schedule_when_idle(job) ──► [unbounded queue] ──► worker task ──► yield ──► job()
//!                                                        │              └──► panic → warn!, continue
//!                                                        └─ cancelled → drain queue, exit
//! ```
//!
//! ## Rules
//! - Jobs run sequentially (FIFO), one yield before each.
//! - A panicking job is caught and logged; the worker keeps going.
//! - After [`shutdown`](IdleWorker::shutdown), jobs are run inline by the caller, so
//!   nothing scheduled is ever lost.
//!
//! **Warning**: `AssertUnwindSafe` is used, so a job that panics while holding a lock
//! may leave state behind that lock inconsistent.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::panic_message;

use super::{IdleScheduler, Job};

/// Background task that runs deferred jobs.
pub struct IdleWorker {
    tx: mpsc::UnboundedSender<Job>,
    cancel: CancellationToken,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl IdleWorker {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime (same contract as `tokio::spawn`).
    #[must_use]
    pub fn spawn() -> Self {
        Self::spawn_on(&Handle::current())
    }

    /// Spawns the worker on the given runtime.
    #[must_use]
    pub fn spawn_on(handle: &Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let cancel = CancellationToken::new();
        let join = handle.spawn(Self::run(rx, cancel.clone()));
        Self {
            tx,
            cancel,
            join: Mutex::new(Some(join)),
        }
    }

    async fn run(mut rx: mpsc::UnboundedReceiver<Job>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                job = rx.recv() => match job {
                    Some(job) => {
                        tokio::task::yield_now().await;
                        Self::run_job(job).await;
                    }
                    None => return,
                }
            }
        }

        rx.close();
        while let Ok(job) = rx.try_recv() {
            Self::run_job(job).await;
        }
    }

    async fn run_job(job: Job) {
        let fut = async move { job() };
        if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            tracing::warn!(panic = %panic_message(panic_err.as_ref()), "idle job panicked");
        }
    }

    /// Returns `true` until the worker has been asked to stop.
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.tx.is_closed()
    }

    /// Stops the worker after draining the jobs already queued, and waits for it.
    ///
    /// Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let join = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(join) = join {
            let _ = join.await;
        }
    }
}

impl IdleScheduler for IdleWorker {
    fn schedule_when_idle(&self, job: Job) {
        if self.cancel.is_cancelled() {
            job();
            return;
        }
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            tracing::trace!("idle worker stopped; running job inline");
            job();
        }
    }
}

impl Drop for IdleWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for IdleWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleWorker")
            .field("running", &self.is_running())
            .finish()
    }
}
