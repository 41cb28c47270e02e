//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for per-degree tallies.
//! - Wire the subscriber into [`Harness::builder`].
//!
//! ## Flow
//! ```text
//! Harness::run()
//!     ├─► publish(DegreeStarting)
//!     ├─► run_task() ─► publish(TaskStarting / TaskPassed / TaskFailed / ...)
//!     ├─► publish(DegreeFinished)
//!     └─► degree listener ─► SubscriberSet.emit_arc() ──► Tally.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::{Arc, Mutex};

use taskharness::{Config, Ctx, Event, EventKind, Harness, Stop, Subscribe, TaskFn, TaskRef};

#[derive(Default, Debug)]
struct Counts {
    passed: usize,
    failed: usize,
    skipped: usize,
}

/// Tallies outcomes per degree and prints them when the degree ends.
/// In real life, you could export metrics or ship logs.
#[derive(Default)]
struct Tally {
    current: Mutex<Counts>,
}

#[async_trait::async_trait]
impl Subscribe for Tally {
    async fn on_event(&self, ev: &Event) {
        let mut counts = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match ev.kind {
            EventKind::DegreeStarting => *counts = Counts::default(),
            EventKind::TaskPassed => counts.passed += 1,
            EventKind::TaskFailed | EventKind::TaskFaulted => counts.failed += 1,
            EventKind::TaskSkipped => counts.skipped += 1,
            EventKind::DegreeFinished => {
                println!(
                    "[tally] degree={} {:?} verdict={}",
                    ev.degree.unwrap_or(0),
                    *counts,
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::AlarmFired => {
                println!(
                    "[tally] alarm fired, still running: {}",
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "tally"
    }
}

fn main() -> anyhow::Result<()> {
    let cfg = Config {
        degrees: vec![1, 2],
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Tally::default())];
    let harness = Harness::builder(cfg).with_subscribers(subs).build()?;

    let tasks: Vec<TaskRef> = vec![
        TaskFn::arc("TaskAlpha", |ctx: Ctx| async move {
            ctx.log("alpha ok");
            Ok::<_, Stop>(())
        }),
        TaskFn::arc("TaskBravo", |ctx: Ctx| async move {
            Err::<(), _>(ctx.fatal("boom (demo failure)"))
        }),
        TaskFn::arc("TaskCharlie", |ctx: Ctx| async move {
            Err::<(), _>(ctx.skip_now())
        }),
    ];

    let ok = harness.run(&tasks)?;
    println!("\nfinished, all passed: {ok}");
    Ok(())
}
