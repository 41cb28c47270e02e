//! # Task trait.
//!
//! A [`Task`] has a stable [`name`](Task::name) and produces a fresh future
//! per launch through [`spawn`](Task::spawn). The future receives its own
//! [`Ctx`] and resolves to [`TaskResult`]: `Ok(())` for a normal return,
//! `Err(Stop)` after a terminal context operation.
//!
//! # Example
//! ```
//! use taskharness::{BoxTaskFuture, Ctx, Stop, Task};
//!
//! struct Migrate;
//!
//! impl Task for Migrate {
//!     fn name(&self) -> &str { "TaskMigrate" }
//!
//!     fn spawn(&self, ctx: Ctx) -> BoxTaskFuture {
//!         Box::pin(async move {
//!             ctx.log("schema up to date");
//!             Ok::<_, Stop>(())
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Stop;
use crate::tasks::Ctx;

/// Result of a task body.
pub type TaskResult = Result<(), Stop>;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = TaskResult> + Send + 'static>>;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// A named, side-effecting routine.
pub trait Task: Send + Sync + 'static {
    /// Returns the registry name (the degree suffix is added by the scheduler).
    fn name(&self) -> &str;

    /// Creates a new future for one launch.
    fn spawn(&self, ctx: Ctx) -> BoxTaskFuture;
}
