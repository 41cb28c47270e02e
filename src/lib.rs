//! # taskharness
//!
//! **Taskharness** runs a registry of named async tasks the way a test
//! runner runs tests: each task executes once, logs into its own buffer,
//! marks itself failed or skipped, and may declare itself parallel. Failures
//! are reported with their log; the run ends in a single `PASS` or `FAIL`.
//!
//! The whole registry can be swept over several concurrency degrees, each
//! degree on its own runtime, under one aggregate timeout.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   TaskRef    │   │   TaskRef    │   │   TaskRef    │
//!     │  (TaskA)     │   │  (TaskB)     │   │  (TaskC)     │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Harness (sweep controller)                                       │
//! │  - Config (pattern, degrees, max_parallel, timeout, verbose)      │
//! │  - Alarm (one deadline for every degree)                          │
//! │  - Bus + SubscriberSet (observability only)                       │
//! └──────┬───────────────────────────────────────────────────────────┘
//!        │ for degree in degrees: runtime(worker_threads = degree)
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler::run_all(tasks, degree, reporter)                      │
//! │  - Selector filters names                                         │
//! │  - serial walk: launch, await handoff                             │
//! │  - drain: admit parallel tasks (≤ max_parallel), collect reports  │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     run_task           run_task           run_task        (worker threads)
//!     body(Ctx)          body(Ctx)          body(Ctx)
//!        │                  │                  │
//!        └── TaskReport ────┴──── handoff / collector ──► Reporter (stdout)
//! ```
//!
//! ### Task lifecycle
//! ```text
//! launch ──► body(ctx)
//!              ├─ ctx.log / ctx.error / ctx.fail / ctx.skip     keep running
//!              ├─ return Err(ctx.fail_now() | ctx.fatal(..))    FAIL, cleanup runs
//!              ├─ return Err(ctx.skip_now() | ctx.skip_with(..)) SKIP
//!              ├─ ctx.parallel().await?                         Detached ─► wait for admission
//!              ├─ panic / Ok(()) after a stop                   fault ─► run aborts
//!              └─ return Ok(())                                 PASS (unless marked)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                      |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------|
//! | **Tasks**         | Define tasks as closures or trait objects.                    | [`Task`], [`TaskFn`], [`TaskRef`]       |
//! | **Context**       | Log, fail, skip, leave early, go parallel.                    | [`Ctx`], [`Stop`]                       |
//! | **Sweep**         | Run the registry per degree under an aggregate deadline.      | [`Harness`], [`Alarm`]                  |
//! | **Scheduling**    | One pass with bounded parallel admission.                     | [`Scheduler`], [`Selector`]             |
//! | **Reporting**     | `=== RUN` / `--- FAIL` blocks and the final verdict.          | [`Reporter`], [`TaskReport`], [`Outcome`] |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, progress).      | [`Subscribe`], [`Event`], [`EventKind`] |
//! | **Errors**        | Typed fatal errors with stable labels and exit codes.         | [`RunError`]                            |
//! | **Configuration** | Plain values with sentinel defaults.                          | [`Config`]                              |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskharness::{Config, Ctx, Harness, Reporter, Stop, TaskFn, TaskRef};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         degrees: vec![1, 2],
//!         ..Config::default()
//!     };
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn taskharness::Subscribe>> = vec![Arc::new(taskharness::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn taskharness::Subscribe>> = Vec::new();
//!
//!     let harness = Harness::builder(cfg).with_subscribers(subs).build()?;
//!
//!     let tasks: Vec<TaskRef> = vec![
//!         TaskFn::arc("TaskAdd", |ctx: Ctx| async move {
//!             if 2 + 2 != 4 {
//!                 ctx.error("arithmetic is broken");
//!             }
//!             Ok::<_, Stop>(())
//!         }),
//!         TaskFn::arc("TaskSlowIo", |ctx: Ctx| async move {
//!             ctx.parallel().await?;
//!             if ctx.short() {
//!                 return Err(ctx.skip_with("skipped in short mode"));
//!             }
//!             Ok::<_, Stop>(())
//!         }),
//!     ];
//!
//!     let mut reporter = Reporter::new(Vec::new(), false);
//!     assert!(harness.run_with(&tasks, &mut reporter)?);
//!     assert_eq!(reporter.into_inner(), b"PASS\n");
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{
    Alarm, AliveTracker, Config, Expired, Harness, HarnessBuilder, Outcome, Reporter, Scheduler, Selector,
    TaskReport, match_name,
};
pub use error::{RunError, Stop};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Ctx, Task, TaskFn, TaskRef, TaskResult};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
