//! # Task abstractions.
//!
//! - [`Task`] - trait for a named routine run once per degree
//! - [`TaskFn`] - closure-backed task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`Ctx`] - the handle a running task uses to log, fail, skip and go parallel

mod context;
mod task;
mod task_fn;

pub use context::Ctx;
pub(crate) use context::TaskEnv;
pub use task::{BoxTaskFuture, Task, TaskRef, TaskResult};
pub use task_fn::TaskFn;
