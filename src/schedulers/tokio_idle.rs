//! # Tokio-backed idle scheduling (default).
//!
//! [`TokioIdle`] defers a job by spawning a task that first yields once, so the job
//! runs after the tasks that were already runnable when it was scheduled.
//!
//! ## Runtime selection
//! ```text
//! explicit handle set?  ──yes──► spawn on that runtime
//!        │ no
//!        ▼
//! inside a runtime?     ──yes──► spawn on the current runtime
//!        │ no
//!        ▼
//! run inline (the caller is outside any event loop, so it is idle already)
//! ```
//!
//! The bus only schedules after releasing its locks, so the inline path is safe.

use tokio::runtime::Handle;

use super::{IdleScheduler, Job};

/// Idle scheduler built on the tokio runtime.
#[derive(Clone, Debug, Default)]
pub struct TokioIdle {
    handle: Option<Handle>,
}

impl TokioIdle {
    /// Uses whatever runtime is current at scheduling time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always schedules onto the given runtime, whichever thread asks.
    #[must_use]
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl IdleScheduler for TokioIdle {
    fn schedule_when_idle(&self, job: Job) {
        let handle = self.handle.clone().or_else(|| Handle::try_current().ok());
        match handle {
            Some(handle) => {
                handle.spawn(async move {
                    tokio::task::yield_now().await;
                    job();
                });
            }
            None => job(),
        }
    }
}
