//! # Scheduler: one pass over the registry at one degree.
//!
//! ## Serial walk
//! ```text
//! for task in registry (in order):
//!   ├─ skip unless selector matches
//!   ├─ name = task.name() (+ "-<degree>" when degree != 1)
//!   ├─ spawn run_task(task, Ctx) ──────────────► body runs on a worker thread
//!   └─ await handoff:
//!        ├─ Finished(report) ─► report, fold           (serial task)
//!        ├─ Detached ─► forwarder(handoff → collector), pending += 1
//!        └─ closed   ─► fatal
//! ```
//!
//! ## Drain
//! ```text
//! while pending + running > 0:
//!   ├─ running < max_parallel && pending > 0 ─► gate.add_permits(1), running += 1
//!   └─ else collector.recv() ─► report, fold, running -= 1
//! ```
//!
//! ## Rules
//! - Collector and gate are created per call and never shared across degrees.
//! - The scheduling future never runs a task body.
//! - Serial reports come out in registry order; parallel ones in completion order.
//! - At most `max_parallel` parallel tasks are admitted at once.
//! - A faulted report is written, then the call returns `RunError::TaskFaulted`.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};

use crate::core::alive::AliveTracker;
use crate::core::config::Config;
use crate::core::report::{Outcome, Reporter, TaskReport};
use crate::core::runner::{Signal, run_task};
use crate::core::selector::Selector;
use crate::error::RunError;
use crate::events::Bus;
use crate::tasks::{Ctx, TaskEnv, TaskRef};

/// Runs the selected tasks of a registry once.
///
/// Holds everything a pass needs so several schedulers can coexist in one
/// process. Must be driven inside a tokio runtime; the degree only affects
/// reported names, the caller picks the runtime that realizes it.
pub struct Scheduler {
    selector: Selector,
    max_parallel: usize,
    env: TaskEnv,
}

impl Scheduler {
    /// Creates a scheduler; `max_parallel` is clamped to at least 1.
    fn new(selector: Selector, max_parallel: usize, env: TaskEnv) -> Self {
        Self {
            selector,
            max_parallel: max_parallel.max(1),
            env,
        }
    }

    /// Builds a standalone scheduler from configuration, publishing on `bus`.
    ///
    /// Fails when the selection pattern does not compile.
    pub fn from_config(cfg: &Config, bus: Bus) -> Result<Self, RunError> {
        let env = TaskEnv {
            short: cfg.short,
            args: cfg.shared_args(),
            bus,
        };
        Ok(Self::new(
            Selector::new(&cfg.pattern)?,
            cfg.parallel_limit(),
            env,
        ))
    }

    /// Name a task is reported under at `degree`.
    pub fn display_name(name: &str, degree: usize) -> String {
        if degree == 1 {
            name.to_string()
        } else {
            format!("{name}-{degree}")
        }
    }

    /// Runs every selected task and returns whether none failed.
    pub async fn run_all<W: Write>(
        &self,
        tasks: &[TaskRef],
        degree: usize,
        reporter: &mut Reporter<W>,
    ) -> Result<bool, RunError> {
        let alive = Arc::new(AliveTracker::new());
        self.run_tracked(tasks, degree, &alive, reporter).await
    }

    /// Like [`run_all`](Self::run_all), recording running bodies in `alive`.
    ///
    /// The caller owns the tracker, so it can still name the bodies in flight
    /// after dropping this future (on a deadline, for instance). Use a fresh
    /// tracker per pass: bodies abandoned with their runtime are never removed.
    pub async fn run_tracked<W: Write>(
        &self,
        tasks: &[TaskRef],
        degree: usize,
        alive: &Arc<AliveTracker>,
        reporter: &mut Reporter<W>,
    ) -> Result<bool, RunError> {
        let (collector_tx, mut collector) = mpsc::unbounded_channel::<TaskReport>();
        let gate = Arc::new(Semaphore::new(0));
        let mut ok = true;
        let mut pending = 0usize;

        for task in tasks {
            if !self.selector.matches(task.name()) {
                continue;
            }
            let name: Arc<str> = Arc::from(Self::display_name(task.name(), degree));
            reporter.task_started(&name)?;

            let (tx, mut handoff) = mpsc::channel::<Signal>(1);
            let ctx = Ctx::new(name.clone(), self.env.clone(), tx.clone(), gate.clone());
            tokio::spawn(run_task(
                Arc::clone(task),
                ctx,
                tx,
                Arc::clone(alive),
                degree,
            ));

            let signal = handoff.recv().await;
            match signal {
                Some(Signal::Finished(report)) => ok &= settle(report, reporter)?,
                Some(Signal::Detached) => {
                    pending += 1;
                    let collector_tx = collector_tx.clone();
                    tokio::spawn(async move {
                        let report = match handoff.recv().await {
                            Some(Signal::Finished(report)) => report,
                            _ => TaskReport::lost(name),
                        };
                        let _ = collector_tx.send(report);
                    });
                }
                None => return Err(fault(&TaskReport::lost(name))),
            }
        }

        drop(collector_tx);

        let mut running = 0usize;
        while pending + running > 0 {
            if running < self.max_parallel && pending > 0 {
                gate.add_permits(1);
                running += 1;
                pending -= 1;
                continue;
            }
            let Some(report) = collector.recv().await else {
                return Err(RunError::TaskFaulted {
                    task: "<parallel>".to_string(),
                    reason: "collector closed with tasks outstanding".to_string(),
                });
            };
            running -= 1;
            ok &= settle(report, reporter)?;
        }

        Ok(ok)
    }
}

/// Writes a report and folds it; faults abort the pass.
fn settle<W: Write>(report: TaskReport, reporter: &mut Reporter<W>) -> Result<bool, RunError> {
    reporter.task_finished(&report)?;
    if matches!(report.outcome, Outcome::Faulted { .. }) {
        return Err(fault(&report));
    }
    Ok(!report.outcome.is_failure())
}

fn fault(report: &TaskReport) -> RunError {
    let reason = match &report.outcome {
        Outcome::Faulted { reason } => reason.clone(),
        other => format!("unexpected outcome {other:?}"),
    };
    RunError::TaskFaulted {
        task: report.name.to_string(),
        reason,
    }
}
