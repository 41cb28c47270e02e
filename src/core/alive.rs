//! # Tracker of task bodies currently running.
//!
//! Runners insert their task on launch and remove it after the body exits.
//! When the alarm fires the harness takes a [`snapshot`](AliveTracker::snapshot)
//! to name the tasks that were still in flight.
//!
//! Parallel tasks waiting on the release gate count as alive: they have been
//! launched and have not exited.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Thread-safe set of running task names.
#[derive(Debug, Default)]
pub struct AliveTracker {
    names: Mutex<BTreeSet<Arc<str>>>,
}

impl AliveTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn started(&self, name: &Arc<str>) {
        self.lock().insert(Arc::clone(name));
    }

    pub(crate) fn stopped(&self, name: &str) {
        self.lock().remove(name);
    }

    /// Sorted names of tasks still running.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().map(|n| n.to_string()).collect()
    }

    /// Reports whether the body of `name` is still running.
    pub fn is_alive(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<Arc<str>>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
