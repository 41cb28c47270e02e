//! # Run one launch of a task.
//!
//! The runner owns the task's side of the completion handoff.
//!
//! ```text
//! run_task()
//!   ├─► alive.started, publish TaskStarting, start instant
//!   ├─► catch_unwind(task.spawn(ctx))          body may send Signal::Detached
//!   ├─► ctx.conclude(result) ─► TaskReport      (Passed/Failed/Skipped/Faulted)
//!   ├─► alive.stopped, publish terminal event
//!   └─► handoff: Signal::Finished(report)       exactly once
//! ```
//!
//! ## Rules
//! - Exactly one `Finished` per launch, sent after every local of the body
//!   has been dropped (cleanup has run).
//! - A panic never escapes the runner; it becomes `Outcome::Faulted`.
//! - `Detached`, if any, always precedes `Finished` on the same channel.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::core::alive::AliveTracker;
use crate::core::report::{Outcome, TaskReport};
use crate::events::{Event, EventKind};
use crate::tasks::{Ctx, TaskRef};

/// Message on a task's completion handoff.
#[derive(Debug)]
pub(crate) enum Signal {
    /// The task declared itself parallel; its report comes later.
    Detached,
    /// The task is done.
    Finished(TaskReport),
}

/// Executes one launch of `task` and signals its completion on `done`.
pub(crate) async fn run_task(
    task: TaskRef,
    ctx: Ctx,
    done: mpsc::Sender<Signal>,
    alive: Arc<AliveTracker>,
    degree: usize,
) {
    let name = ctx.name_arc();
    alive.started(&name);
    ctx.bus().publish(
        Event::new(EventKind::TaskStarting)
            .with_task(name.clone())
            .with_degree(degree),
    );

    ctx.mark_started();
    let body = async { task.spawn(ctx.clone()).await };
    let res = AssertUnwindSafe(body).catch_unwind().await;
    let report = ctx.conclude(res);

    alive.stopped(&name);
    publish_terminal(&ctx, &report);
    let _ = done.send(Signal::Finished(report)).await;
}

fn publish_terminal(ctx: &Ctx, report: &TaskReport) {
    let kind = match report.outcome {
        Outcome::Passed => EventKind::TaskPassed,
        Outcome::Failed => EventKind::TaskFailed,
        Outcome::Skipped => EventKind::TaskSkipped,
        Outcome::Faulted { .. } => EventKind::TaskFaulted,
    };
    let mut ev = Event::new(kind)
        .with_task(report.name.clone())
        .with_elapsed(report.elapsed);
    if let Outcome::Faulted { reason } = &report.outcome {
        ev = ev.with_reason(reason.as_str());
    }
    ctx.bus().publish(ev);
}
