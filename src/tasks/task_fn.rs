//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(Ctx) -> Fut`, producing a fresh future
//! per launch. There is no hidden state between degrees; share state through
//! an explicit `Arc` captured by the closure.
//!
//! ## Example
//! ```rust
//! use taskharness::{Ctx, Stop, TaskFn, TaskRef};
//!
//! let t: TaskRef = TaskFn::arc("TaskHello", |ctx: Ctx| async move {
//!     ctx.log("Testing \"Hello\" function");
//!     Ok::<_, Stop>(())
//! });
//!
//! assert_eq!(t.name(), "TaskHello");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::tasks::Ctx;
use crate::tasks::task::{BoxTaskFuture, Task, TaskResult};

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(Ctx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: Ctx) -> BoxTaskFuture {
        Box::pin((self.f)(ctx))
    }
}
