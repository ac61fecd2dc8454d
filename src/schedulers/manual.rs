//! # Manually pumped scheduler.
//!
//! [`ManualIdle`] queues jobs until the host calls [`ManualIdle::run_pending`].
//! Suited to hosts that own a loop of their own (games, UI frames, test harnesses):
//! pump once per iteration, after the frame's work is done.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::{IdleScheduler, Job};

/// FIFO of deferred jobs, run on demand.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use weakbus::{Bus, BusConfig, ManualIdle};
///
/// let idle = Arc::new(ManualIdle::new());
/// let bus = Bus::builder(BusConfig::default())
///     .with_scheduler(idle.clone())
///     .build();
///
/// bus.request_cleanup();
/// bus.request_cleanup(); // coalesced
/// assert_eq!(idle.pending(), 1);
/// assert_eq!(idle.run_pending(), 1);
/// assert!(!bus.cleanup_pending());
/// ```
#[derive(Default)]
pub struct ManualIdle {
    queue: Mutex<VecDeque<Job>>,
}

impl ManualIdle {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued jobs.
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs every job queued so far, in FIFO order, and returns how many ran.
    ///
    /// Jobs queued by the jobs themselves wait for the next call.
    pub fn run_pending(&self) -> usize {
        let jobs: Vec<Job> = {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.drain(..).collect()
        };
        let ran = jobs.len();
        for job in jobs {
            job();
        }
        ran
    }
}

impl IdleScheduler for ManualIdle {
    fn schedule_when_idle(&self, job: Job) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(job);
    }
}

impl fmt::Debug for ManualIdle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualIdle")
            .field("pending", &self.pending())
            .finish()
    }
}
