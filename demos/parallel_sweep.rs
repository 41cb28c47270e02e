//! # Example: parallel_sweep
//!
//! Sweeps a registry of parallel tasks over degrees 1, 2 and 4 under an
//! aggregate deadline, with the built-in [`LogWriter`] printing events.
//!
//! Shows how to:
//! - Declare tasks parallel with [`Ctx::parallel`].
//! - Bound admissions with `max_parallel`.
//! - Parse a degree list with [`Config::parse_degrees`].
//! - Release resources on early exit through RAII.
//!
//! ## Flow
//! ```text
//! for degree in [1, 2, 4]:
//!     runtime(worker_threads = degree)
//!     ├─► serial walk: every TaskFetch* detaches
//!     ├─► drain: admit ≤ 2 at a time, report as they finish
//!     └─► DegreeFinished
//! PASS / FAIL
//! ```
//!
//! Events go to stderr, the report to stdout.
//!
//! ## Run
//! ```bash
//! cargo run --example parallel_sweep --features logging -- 1,2,4
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use taskharness::{Config, Ctx, Harness, LogWriter, Stop, Subscribe, TaskFn, TaskRef};

/// Counts open "connections" so leaked ones would show up at the end.
struct Connection(Arc<AtomicUsize>);

impl Connection {
    fn open(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(open))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn fetch_task(name: &'static str, work_ms: u64, open: Arc<AtomicUsize>) -> TaskRef {
    TaskFn::arc(name, move |ctx: Ctx| {
        let open = Arc::clone(&open);
        async move {
            ctx.parallel().await?;
            let _conn = Connection::open(&open);

            tokio::time::sleep(Duration::from_millis(work_ms)).await;
            if work_ms > 150 && ctx.short() {
                return Err(ctx.skip_with("too slow for short mode"));
            }
            ctx.log(format!("fetched in {work_ms}ms"));
            Ok::<_, Stop>(())
        }
    })
}

fn main() -> anyhow::Result<ExitCode> {
    let degrees = match std::env::args().nth(1) {
        Some(list) => Config::parse_degrees(&list)?,
        None => vec![1, 2, 4],
    };
    let cfg = Config {
        degrees,
        max_parallel: 2,
        timeout: Duration::from_secs(10),
        verbose: true,
        short: true,
        ..Config::default()
    };

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let harness = Harness::builder(cfg).with_subscribers(subs).build()?;

    let open = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<TaskRef> = vec![
        fetch_task("TaskFetchIndex", 50, open.clone()),
        fetch_task("TaskFetchAssets", 120, open.clone()),
        fetch_task("TaskFetchArchive", 200, open.clone()),
        fetch_task("TaskFetchMirror", 80, open.clone()),
    ];

    let code = harness.main(&tasks);
    println!("open connections after sweep: {}", open.load(Ordering::SeqCst));
    Ok(code)
}
