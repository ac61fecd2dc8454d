//! Idle schedulers: where deferred cleanup passes run.
//!
//! ## Contents
//! - [`IdleScheduler`] the host seam (`schedule_when_idle`), also implemented by closures
//! - [`TokioIdle`] default; spawn-and-yield on the current runtime, inline outside one
//! - [`ManualIdle`] queue pumped explicitly by the host (`run_pending`)
//! - [`IdleWorker`] dedicated background task with panic isolation and graceful shutdown
//!
//! ## Quick wiring
//! ```text
//! Bus::request_cleanup()
//!   └─ pending? ──no──► scheduler.schedule_when_idle(job) ──► (later) Bus::cleanup()
//!              └─yes──► coalesced, nothing scheduled
//! ```

mod idle;
mod manual;
mod tokio_idle;
mod worker;

pub use idle::{IdleScheduler, Job};
pub use manual::ManualIdle;
pub use tokio_idle::TokioIdle;
pub use worker::IdleWorker;
