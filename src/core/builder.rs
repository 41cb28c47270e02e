use std::sync::Arc;

use super::{config::Config, scheduler::Scheduler, sweep::Harness};
use crate::{error::RunError, events::Bus, subscribers::Subscribe};

/// Builder for constructing a [`Harness`] with optional subscribers.
pub struct HarnessBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl HarnessBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive run events (degree and task lifecycle, alarm)
    /// through dedicated workers with bounded queues. They never see the
    /// report itself.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Validates the configuration and builds the harness.
    ///
    /// Fails before any task runs when the selection pattern does not compile
    /// or a degree is zero.
    pub fn build(self) -> Result<Harness, RunError> {
        self.cfg.validate()?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let scheduler = Scheduler::from_config(&self.cfg, bus.clone())?;

        Ok(Harness::new_internal(
            self.cfg,
            bus,
            scheduler,
            self.subscribers,
        ))
    }
}
