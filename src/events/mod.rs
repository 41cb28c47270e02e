//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted while a sweep runs.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Harness` (degree boundaries, alarm), `runner::run_task`
//!   (start/terminal), `Ctx::parallel` (detach/admit), `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the per-degree listener spawned by `Harness` (fans out to
//!   `SubscriberSet`), or anyone holding [`Bus::subscribe`].
//!
//! Events are observability only: the PASS/FAIL report never travels over
//! the bus.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
