//! # Deferred-execution collaborator.
//!
//! The bus needs exactly one thing from its host: "run this once, later, when you
//! are idle". [`IdleScheduler`] is that seam. The bus does not care how the host
//! defines idle, only that every scheduled job eventually runs exactly once.
//!
//! Any `Fn(Job) + Send + Sync` closure is a scheduler, which makes ad-hoc hosts trivial:
//! ```rust
//! use std::sync::Arc;
//! use weakbus::{Bus, BusConfig, Job};
//!
//! // Runs every job inline: fine for hosts without an event loop.
//! let bus = Bus::builder(BusConfig::default())
//!     .with_scheduler(Arc::new(|job: Job| job()))
//!     .build();
//! # let _ = bus;
//! ```

/// A unit of deferred work handed to the host.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Host capability: run a job once, at the next idle point.
///
/// ### Implementation requirements
/// - Every job must eventually run exactly once (dropping jobs leaks a pending cleanup).
/// - Jobs may run on any thread.
/// - Must not run the job while holding a lock the job could need.
pub trait IdleScheduler: Send + Sync {
    /// Queues `job` to run when the host is idle.
    fn schedule_when_idle(&self, job: Job);
}

impl<F> IdleScheduler for F
where
    F: Fn(Job) + Send + Sync,
{
    fn schedule_when_idle(&self, job: Job) {
        self(job)
    }
}
