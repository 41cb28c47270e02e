//! # Event subscriber trait.
//!
//! Each subscriber gets a dedicated worker and a bounded FIFO queue; a panic
//! inside [`Subscribe::on_event`] is caught and republished as
//! `EventKind::SubscriberPanicked`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use taskharness::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::TaskFailed | EventKind::TaskFaulted) {
//!             // bump a counter, page someone, ...
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of lifecycle events.
///
/// ### Rules
/// - Called from the subscriber's own worker, never from the scheduler.
/// - Events arrive in publish order per subscriber.
/// - A full queue drops the event for this subscriber only.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
