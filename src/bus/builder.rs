use std::sync::Arc;

use crate::config::BusConfig;
use crate::schedulers::{IdleScheduler, TokioIdle};

use super::Bus;

/// Builder for constructing a [`Bus`] with an optional custom idle scheduler.
pub struct BusBuilder {
    cfg: BusConfig,
    scheduler: Option<Arc<dyn IdleScheduler>>,
}

impl BusBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            scheduler: None,
        }
    }

    /// Sets the scheduler deferred cleanup passes are handed to.
    ///
    /// Without one, the bus uses [`TokioIdle`].
    pub fn with_scheduler<S: IdleScheduler + 'static>(mut self, scheduler: Arc<S>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Same as [`with_scheduler`](Self::with_scheduler), for an already erased scheduler.
    pub fn with_dyn_scheduler(mut self, scheduler: Arc<dyn IdleScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Builds and returns the bus.
    pub fn build(self) -> Bus {
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioIdle::new()) as Arc<dyn IdleScheduler>);
        tracing::debug!(bus = %self.cfg.name, policy = ?self.cfg.fault_policy, "bus created");
        Bus::from_parts(self.cfg, scheduler)
    }
}
