//! # Harness: the sweep over concurrency degrees.
//!
//! The [`Harness`] owns one [`Scheduler`] and runs it once per configured
//! degree. Each degree gets its own multi-thread runtime whose worker count
//! equals the degree, so the degree is the real parallelism task bodies see.
//!
//! ## Architecture
//! ```text
//! Harness::run_with(tasks, reporter)
//!   ├─► empty registry? ─► warning on stderr, PASS
//!   ├─► Alarm::arm(timeout)                      (one deadline for the whole sweep)
//!   └─► for degree in degrees (strictly one after another):
//!         ├─ runtime = multi_thread(worker_threads = degree)
//!         └─ runtime.block_on:
//!              ├─ listener: Bus ─► SubscriberSet (until DegreeFinished)
//!              ├─ publish DegreeStarting
//!              ├─ alarm.guard(scheduler.run_tracked(tasks, degree, fresh alive, reporter))
//!              │     ├─ Ok(Ok(ok))  ─► fold ok
//!              │     ├─ Ok(Err(e))  ─► fatal (fault, report sink)
//!              │     └─ Err(Expired) ─► publish AlarmFired, TimedOut{running}
//!              ├─ publish DegreeFinished
//!              └─ listener drains and exits (skipped once the alarm fired)
//!         runtime.shutdown_background()           (abandons stragglers on timeout)
//!   ├─► alarm.disarm()
//!   └─► reporter.summary(ok)                      (only when nothing was fatal)
//! ```
//!
//! ## Rules
//! - Degrees never overlap; one runtime is torn down before the next is built.
//! - Subscribers see every event of a degree before the next degree starts,
//!   unless the alarm fired (the run is over; delivery is best effort).
//! - Every degree tracks its running bodies in a fresh [`AliveTracker`], so
//!   bodies abandoned by an aborted run never show up in a later one.
//! - A fatal error stops the sweep; the partial report stays flushed and no
//!   summary line is written.
//! - `run`, `run_with` and `main` block the calling thread and must not be
//!   called from inside a tokio runtime.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::broadcast::error::RecvError;

use super::{
    alarm::{Alarm, Expired},
    alive::AliveTracker,
    builder::HarnessBuilder,
    config::Config,
    report::Reporter,
    scheduler::Scheduler,
};
use crate::{
    error::RunError,
    events::{Bus, Event, EventKind},
    subscribers::{Subscribe, SubscriberSet},
    tasks::TaskRef,
};

/// Runs a task registry across every configured degree.
///
/// Build one with [`Harness::builder`]. A harness holds no state between
/// runs, so it can be run repeatedly and several harnesses can coexist.
pub struct Harness {
    cfg: Config,
    bus: Bus,
    scheduler: Scheduler,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Harness {
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        scheduler: Scheduler,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        Self {
            cfg,
            bus,
            scheduler,
            subscribers,
        }
    }

    /// Creates a builder for the given configuration.
    pub fn builder(cfg: Config) -> HarnessBuilder {
        HarnessBuilder::new(cfg)
    }

    /// The configuration this harness was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns a clone of the event bus (for ad-hoc listeners).
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Runs the sweep reporting to standard output.
    pub fn run(&self, tasks: &[TaskRef]) -> Result<bool, RunError> {
        let mut reporter = Reporter::stdout(self.cfg.verbose);
        self.run_with(tasks, &mut reporter)
    }

    /// Runs the sweep and turns the result into a process exit code.
    ///
    /// `0` when every task passed or skipped, `1` when one failed, `2` on a
    /// fault or timeout. Fatal errors are printed to stderr.
    ///
    /// ```no_run
    /// use std::process::ExitCode;
    /// use taskharness::{Config, Ctx, Harness, Stop, TaskFn, TaskRef};
    ///
    /// fn main() -> ExitCode {
    ///     let tasks: Vec<TaskRef> = vec![TaskFn::arc("TaskHello", |ctx: Ctx| async move {
    ///         ctx.log("hello");
    ///         Ok::<_, Stop>(())
    ///     })];
    ///     match Harness::builder(Config::default()).build() {
    ///         Ok(harness) => harness.main(&tasks),
    ///         Err(e) => {
    ///             eprintln!("taskharness: {e}");
    ///             ExitCode::from(e.exit_code())
    ///         }
    ///     }
    /// }
    /// ```
    pub fn main(&self, tasks: &[TaskRef]) -> ExitCode {
        match self.run(tasks) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(1),
            Err(e) => {
                eprintln!("taskharness: {e}");
                ExitCode::from(e.exit_code())
            }
        }
    }

    /// Runs the sweep writing the report to `reporter`.
    ///
    /// Returns `Ok(true)` when no task failed in any degree. The final
    /// `PASS`/`FAIL` line is written only when the result is `Ok`.
    pub fn run_with<W: Write>(
        &self,
        tasks: &[TaskRef],
        reporter: &mut Reporter<W>,
    ) -> Result<bool, RunError> {
        if tasks.is_empty() {
            eprintln!("taskharness: warning: no tasks to run");
            reporter.summary(true)?;
            return Ok(true);
        }

        let mut alarm = Alarm::arm(self.cfg.alarm_timeout())?;
        let mut ok = true;
        for degree in self.cfg.sweep_degrees() {
            ok &= self.run_degree(tasks, degree, &alarm, reporter)?;
        }
        alarm.disarm();

        reporter.summary(ok)?;
        Ok(ok)
    }

    fn run_degree<W: Write>(
        &self,
        tasks: &[TaskRef],
        degree: usize,
        alarm: &Alarm,
        reporter: &mut Reporter<W>,
    ) -> Result<bool, RunError> {
        let rt = degree_runtime(degree)?;
        let alive = Arc::new(AliveTracker::new());

        let res = rt.block_on(async {
            let listener = self.subscriber_listener();
            self.bus
                .publish(Event::new(EventKind::DegreeStarting).with_degree(degree));

            let pass = self.scheduler.run_tracked(tasks, degree, &alive, reporter);
            let res = match alarm.guard(pass).await {
                Ok(res) => res,
                Err(Expired) => {
                    let running = alive.snapshot();
                    let mut ev = Event::new(EventKind::AlarmFired)
                        .with_degree(degree)
                        .with_reason(running.join(","));
                    if let Some(timeout) = alarm.timeout() {
                        ev = ev.with_timeout(timeout);
                    }
                    self.bus.publish(ev);
                    Err(RunError::TimedOut {
                        timeout: alarm.timeout().unwrap_or_default(),
                        running,
                    })
                }
            };

            let verdict = match &res {
                Ok(true) => "pass",
                Ok(false) => "fail",
                Err(e) => e.as_label(),
            };
            self.bus.publish(
                Event::new(EventKind::DegreeFinished)
                    .with_degree(degree)
                    .with_reason(verdict),
            );
            // Workers may be wedged by the bodies that ran out the clock.
            if let Some(listener) = listener
                && !alarm.has_fired()
            {
                let _ = listener.await;
            }
            res
        });

        rt.shutdown_background();
        res
    }

    /// Forwards bus events to the subscribers until `DegreeFinished`.
    ///
    /// Subscribes before returning, so nothing published afterwards is missed.
    fn subscriber_listener(&self) -> Option<tokio::task::JoinHandle<()>> {
        if self.subscribers.is_empty() {
            return None;
        }
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());

        Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let last = ev.kind == EventKind::DegreeFinished;
                        set.emit_arc(Arc::new(ev));
                        if last {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        }))
    }
}

/// Builds the runtime for one degree: `degree` workers run the task bodies.
fn degree_runtime(degree: usize) -> Result<Runtime, RunError> {
    Builder::new_multi_thread()
        .worker_threads(degree)
        .thread_name(format!("taskharness-d{degree}"))
        .enable_all()
        .build()
        .map_err(|source| RunError::Runtime { degree, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stop;
    use crate::tasks::{Ctx, TaskFn};
    use async_trait::async_trait;
    use regex::Regex;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    fn config(degrees: Vec<usize>) -> Config {
        Config {
            degrees,
            ..Config::default()
        }
    }

    fn run(cfg: Config, tasks: &[TaskRef]) -> (Result<bool, RunError>, String) {
        let harness = Harness::builder(cfg).build().unwrap();
        let mut reporter = Reporter::new(Vec::new(), harness.config().verbose);
        let res = harness.run_with(tasks, &mut reporter);
        (res, String::from_utf8(reporter.into_inner()).unwrap())
    }

    fn counting(name: &'static str, runs: Arc<AtomicUsize>) -> TaskRef {
        TaskFn::arc(name, move |_ctx: Ctx| {
            let runs = runs.clone();
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Stop>(())
            }
        })
    }

    static BOOM_LINE: AtomicU32 = AtomicU32::new(0);

    #[test]
    fn test_fatal_task_report_is_exact() {
        let tasks: Vec<TaskRef> = vec![
            TaskFn::arc("TaskA", |_ctx: Ctx| async { Ok::<_, Stop>(()) }),
            TaskFn::arc("TaskB", |ctx: Ctx| async move {
                BOOM_LINE.store(line!() + 1, Ordering::SeqCst);
                Err::<(), _>(ctx.fatal("boom"))
            }),
        ];

        let (res, out) = run(config(vec![1]), &tasks);
        assert!(!res.unwrap());

        let re = Regex::new(r"^--- FAIL: TaskB \(\d+\.\d{2}s\)\n\tsweep\.rs:(\d+): boom\nFAIL\n$")
            .unwrap();
        let caps = re.captures(&out).unwrap_or_else(|| panic!("unexpected report {out:?}"));
        assert_eq!(caps[1].parse::<u32>().unwrap(), BOOM_LINE.load(Ordering::SeqCst));
    }

    #[test]
    fn test_every_degree_runs_every_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let tasks: Vec<TaskRef> = vec![
            counting("TaskA", runs.clone()),
            TaskFn::arc("TaskB", move |ctx: Ctx| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(ctx.name().to_string());
                    Ok::<_, Stop>(())
                }
            }),
        ];

        let cfg = Config {
            verbose: true,
            ..config(vec![1, 2])
        };
        let (res, out) = run(cfg, &tasks);
        assert!(res.unwrap());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["TaskB", "TaskB-2"]);
        assert!(out.contains("=== RUN TaskA\n"));
        assert!(out.contains("=== RUN TaskA-2\n"));
        assert!(out.ends_with("PASS\n"));
    }

    #[test]
    fn test_failure_in_one_degree_fails_the_sweep() {
        let tasks: Vec<TaskRef> = vec![TaskFn::arc("TaskFlaky", |ctx: Ctx| async move {
            if ctx.name().ends_with("-2") {
                ctx.error("only fails in parallel");
            }
            Ok::<_, Stop>(())
        })];

        let (res, out) = run(config(vec![1, 2]), &tasks);
        assert!(!res.unwrap());
        assert!(out.starts_with("--- FAIL: TaskFlaky-2 ("), "{out}");
        assert!(out.ends_with("FAIL\n"));
    }

    #[test]
    fn test_invalid_pattern_runs_nothing() {
        let cfg = Config {
            pattern: "Task(".to_string(),
            ..config(vec![1])
        };
        let err = Harness::builder(cfg).build().err().unwrap();
        assert_eq!(err.as_label(), "run_invalid_pattern");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_zero_degree_is_rejected() {
        let err = Harness::builder(config(vec![1, 0])).build().err().unwrap();
        assert_eq!(err.as_label(), "run_invalid_degree");
    }

    #[test]
    fn test_pattern_selects_subset() {
        let hits = Arc::new(AtomicUsize::new(0));
        let misses = Arc::new(AtomicUsize::new(0));
        let tasks = vec![
            counting("TaskNetDial", hits.clone()),
            counting("TaskDisk", misses.clone()),
            counting("TaskNetListen", hits.clone()),
        ];
        let cfg = Config {
            pattern: "Net".to_string(),
            ..config(vec![1])
        };

        let (res, _) = run(cfg, &tasks);
        assert!(res.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(misses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_only_skipped_tasks_pass() {
        let tasks: Vec<TaskRef> = vec![TaskFn::arc("TaskSkip", |ctx: Ctx| async move {
            Err::<(), _>(ctx.skip_with("nothing to do here"))
        })];
        let (res, out) = run(config(vec![1]), &tasks);
        assert!(res.unwrap());
        assert_eq!(out, "PASS\n");
    }

    #[test]
    fn test_empty_registry_passes() {
        let (res, out) = run(config(vec![1]), &[]);
        assert!(res.unwrap());
        assert_eq!(out, "PASS\n");
    }

    #[test]
    fn test_timeout_names_running_tasks() {
        let tasks: Vec<TaskRef> = vec![
            TaskFn::arc("TaskQuick", |_ctx: Ctx| async { Ok::<_, Stop>(()) }),
            TaskFn::arc("TaskSlow", |_ctx: Ctx| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, Stop>(())
            }),
        ];
        let cfg = Config {
            timeout: Duration::from_millis(100),
            ..config(vec![1])
        };

        let (res, out) = run(cfg, &tasks);
        let err = res.unwrap_err();
        assert_eq!(err.exit_code(), 2);
        match err {
            RunError::TimedOut { timeout, running } => {
                assert_eq!(timeout, Duration::from_millis(100));
                assert_eq!(running, vec!["TaskSlow".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(out, "");
    }

    #[test]
    fn test_timeout_fires_while_a_body_blocks_its_worker() {
        let tasks: Vec<TaskRef> = vec![TaskFn::arc("TaskBlocking", |_ctx: Ctx| async {
            std::thread::sleep(Duration::from_secs(3));
            Ok::<_, Stop>(())
        })];
        let cfg = Config {
            timeout: Duration::from_millis(200),
            ..config(vec![1])
        };

        let started = std::time::Instant::now();
        let (res, _) = run(cfg, &tasks);
        assert!(started.elapsed() < Duration::from_secs(2));
        match res {
            Err(RunError::TimedOut { running, .. }) => {
                assert_eq!(running, vec!["TaskBlocking".to_string()]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_aborted_run_leaves_no_stale_names() {
        let cfg = Config {
            timeout: Duration::from_millis(300),
            ..config(vec![1])
        };
        let harness = Harness::builder(cfg).build().unwrap();

        let first: Vec<TaskRef> = vec![
            TaskFn::arc("TaskWaiting", |ctx: Ctx| async move {
                ctx.parallel().await?;
                Ok::<_, Stop>(())
            }),
            TaskFn::arc("TaskBoom", |ctx: Ctx| async move {
                if ctx.name() == "TaskBoom" {
                    panic!("boom");
                }
                Ok::<_, Stop>(())
            }),
        ];
        let mut reporter = Reporter::new(Vec::new(), false);
        let err = harness.run_with(&first, &mut reporter).unwrap_err();
        assert_eq!(err.as_label(), "run_task_faulted");

        let second: Vec<TaskRef> = vec![TaskFn::arc("TaskSlow", |_ctx: Ctx| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, Stop>(())
        })];
        let mut reporter = Reporter::new(Vec::new(), false);
        match harness.run_with(&second, &mut reporter) {
            Err(RunError::TimedOut { running, .. }) => {
                assert_eq!(running, vec!["TaskSlow".to_string()]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_fault_stops_the_sweep() {
        let runs = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<TaskRef> = vec![
            TaskFn::arc("TaskSwallow", |ctx: Ctx| async move {
                let _ignored = ctx.fail_now();
                Ok::<_, Stop>(())
            }),
            counting("TaskLater", runs.clone()),
        ];

        let (res, out) = run(config(vec![1, 2]), &tasks);
        let err = res.unwrap_err();
        assert_eq!(err.as_label(), "run_task_faulted");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(out.starts_with("--- FAIL: TaskSwallow ("), "{out}");
        assert!(!out.contains("\nFAIL\n"), "no summary after a fault: {out}");
    }

    #[test]
    fn test_parallel_sweep_respects_limit() {
        const N: usize = 6;
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<TaskRef> = (0..N)
            .map(|i| {
                let (current, peak) = (current.clone(), peak.clone());
                let task: TaskRef = TaskFn::arc(format!("TaskPar{i}"), move |ctx: Ctx| {
                    let (current, peak) = (current.clone(), peak.clone());
                    async move {
                        ctx.parallel().await?;
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        current.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, Stop>(())
                    }
                });
                task
            })
            .collect();

        let cfg = Config {
            max_parallel: 2,
            verbose: true,
            ..config(vec![1, 4])
        };
        let (res, out) = run(cfg, &tasks);
        assert!(res.unwrap());
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(out.matches("--- PASS: ").count(), 2 * N);
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    #[test]
    fn test_subscribers_see_each_degree() {
        let collect = Arc::new(Collect::default());
        let sub: Arc<dyn Subscribe> = collect.clone();
        let tasks: Vec<TaskRef> = vec![TaskFn::arc("TaskA", |_ctx: Ctx| async {
            Ok::<_, Stop>(())
        })];

        let harness = Harness::builder(config(vec![1, 2]))
            .with_subscribers(vec![sub])
            .build()
            .unwrap();
        let mut reporter = Reporter::new(Vec::new(), false);
        assert!(harness.run_with(&tasks, &mut reporter).unwrap());

        let one_degree = [
            EventKind::DegreeStarting,
            EventKind::TaskStarting,
            EventKind::TaskPassed,
            EventKind::DegreeFinished,
        ];
        let expected: Vec<EventKind> = one_degree.iter().chain(one_degree.iter()).copied().collect();
        assert_eq!(*collect.0.lock().unwrap(), expected);
    }
}
