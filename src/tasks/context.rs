//! # Per-launch task context (`Ctx`).
//!
//! Every launch of a task gets a fresh [`Ctx`]. The body uses it to log,
//! mark itself failed or skipped, leave early, and declare itself parallel.
//!
//! ## Terminal operations
//! ```text
//! fail()        mark failed, keep running
//! fail_now()    mark failed, return Err(Stop)        ─┐
//! skip()        mark skipped, keep running             ├─ body must `return Err(..)`
//! skip_now()    mark skipped, return Err(Stop)       ─┘
//! fatal(msg)    log + fail_now
//! skip_with(m)  log + skip_now
//! ```
//!
//! ## Parallel handshake
//! ```text
//! body ──parallel()──► handoff: Signal::Detached ──► scheduler keeps walking
//!        └─ wait on release gate ◄── drain phase adds one permit per admission
//!        └─ start instant reset (queueing time is not counted)
//! ```
//!
//! ## Rules
//! - Log entries are decorated with the caller's `file:line` and kept until the report.
//! - `failed()`/`skipped()` take the same lock as writers and are safe from any thread.
//! - `parallel()` is allowed once, before admission; anything else is a contract
//!   violation and faults the task.
//! - A body that returns `Ok(())` after `fail_now`/`skip_now` faults the task.
//! - The scheduler never reads a `Ctx`; it receives an owned [`TaskReport`]
//!   built by [`Ctx::conclude`] once the body is gone.

use std::any::Any;
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tokio::sync::{Semaphore, mpsc};

use crate::core::{Outcome, Signal, TaskReport};
use crate::error::{Stop, StopKind};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::panic_message;
use crate::tasks::TaskResult;

/// Run-wide values every context exposes to its task.
#[derive(Clone, Debug)]
pub(crate) struct TaskEnv {
    pub(crate) short: bool,
    pub(crate) args: Arc<[String]>,
    pub(crate) bus: Bus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Serial,
    Detached,
    Admitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Exit {
    FailNow,
    SkipNow,
    Violation(String),
}

impl Exit {
    fn describe(&self) -> &str {
        match self {
            Exit::FailNow => "fail_now",
            Exit::SkipNow => "skip_now",
            Exit::Violation(reason) => reason,
        }
    }
}

#[derive(Debug)]
struct State {
    output: String,
    failed: bool,
    skipped: bool,
    exit: Option<Exit>,
    mode: Mode,
    start: Instant,
}

struct Inner {
    name: Arc<str>,
    env: TaskEnv,
    state: RwLock<State>,
    handoff: mpsc::Sender<Signal>,
    gate: Arc<Semaphore>,
}

/// Handle passed to a task body.
///
/// Cheap to clone; all clones refer to the same launch.
#[derive(Clone)]
pub struct Ctx {
    inner: Arc<Inner>,
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("name", &self.inner.name)
            .field("state", &*self.read())
            .finish()
    }
}

impl Ctx {
    pub(crate) fn new(
        name: Arc<str>,
        env: TaskEnv,
        handoff: mpsc::Sender<Signal>,
        gate: Arc<Semaphore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                env,
                state: RwLock::new(State {
                    output: String::new(),
                    failed: false,
                    skipped: false,
                    exit: None,
                    mode: Mode::Serial,
                    start: Instant::now(),
                }),
                handoff,
                gate,
            }),
        }
    }

    /// Reported task name, including the `-<degree>` suffix when present.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// True if the run was configured in short mode.
    ///
    /// The harness attaches no meaning to it; tasks use it to trim their work.
    pub fn short(&self) -> bool {
        self.inner.env.short
    }

    /// Extra arguments from the run configuration.
    pub fn args(&self) -> &[String] {
        &self.inner.env.args
    }

    /// Records a log entry decorated with the caller's file and line.
    ///
    /// The text is printed only in the task's report.
    #[track_caller]
    pub fn log(&self, msg: impl fmt::Display) {
        self.push(Location::caller(), &msg.to_string());
    }

    /// Equivalent to [`log`](Self::log) followed by [`fail`](Self::fail).
    #[track_caller]
    pub fn error(&self, msg: impl fmt::Display) {
        self.push(Location::caller(), &msg.to_string());
        self.fail();
    }

    /// Equivalent to [`log`](Self::log) followed by [`fail_now`](Self::fail_now).
    #[track_caller]
    pub fn fatal(&self, msg: impl fmt::Display) -> Stop {
        self.push(Location::caller(), &msg.to_string());
        self.fail_now()
    }

    /// Equivalent to [`log`](Self::log) followed by [`skip_now`](Self::skip_now).
    #[track_caller]
    pub fn skip_with(&self, msg: impl fmt::Display) -> Stop {
        self.push(Location::caller(), &msg.to_string());
        self.skip_now()
    }

    /// Marks the task as failed; execution continues.
    pub fn fail(&self) {
        self.write().failed = true;
    }

    /// Marks the task as failed and returns the token that ends the body.
    ///
    /// ```
    /// # use taskharness::{Ctx, TaskResult};
    /// async fn body(ctx: Ctx) -> TaskResult {
    ///     if !std::path::Path::new("/etc").exists() {
    ///         return Err(ctx.fail_now());
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn fail_now(&self) -> Stop {
        let mut st = self.write();
        st.failed = true;
        st.exit.get_or_insert(Exit::FailNow);
        Stop::fail()
    }

    /// Marks the task as skipped; execution continues.
    pub fn skip(&self) {
        self.write().skipped = true;
    }

    /// Marks the task as skipped and returns the token that ends the body.
    pub fn skip_now(&self) -> Stop {
        let mut st = self.write();
        st.skipped = true;
        st.exit.get_or_insert(Exit::SkipNow);
        Stop::skip()
    }

    /// Reports whether the task has failed.
    pub fn failed(&self) -> bool {
        self.read().failed
    }

    /// Reports whether the task was skipped.
    pub fn skipped(&self) -> bool {
        self.read().skipped
    }

    /// Declares the task parallel.
    ///
    /// Releases the scheduler to launch the next task, then waits until the
    /// drain phase admits this task. The run time is measured from admission.
    /// Calling it twice is a contract violation: the returned `Stop` must be
    /// handed back and the task faults.
    pub async fn parallel(&self) -> Result<(), Stop> {
        self.enter_detached()?;
        self.inner
            .env
            .bus
            .publish(Event::new(EventKind::TaskDetached).with_task(self.inner.name.clone()));

        if self.inner.handoff.send(Signal::Detached).await.is_err() {
            return Err(self.violate("scheduler dropped the handoff before detach"));
        }
        match self.inner.gate.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_closed) => return Err(self.violate("release gate closed before admission")),
        }

        {
            let mut st = self.write();
            st.mode = Mode::Admitted;
            st.start = Instant::now();
        }
        self.inner
            .env
            .bus
            .publish(Event::new(EventKind::TaskAdmitted).with_task(self.inner.name.clone()));
        Ok(())
    }

    fn enter_detached(&self) -> Result<(), Stop> {
        let mode = {
            let mut st = self.write();
            let mode = st.mode;
            if mode == Mode::Serial {
                st.mode = Mode::Detached;
            }
            mode
        };
        match mode {
            Mode::Serial => Ok(()),
            Mode::Detached | Mode::Admitted => {
                Err(self.violate(format!("parallel called more than once by {}", self.name())))
            }
        }
    }

    fn violate(&self, reason: impl Into<String>) -> Stop {
        let reason = reason.into();
        let mut st = self.write();
        st.failed = true;
        st.exit.get_or_insert(Exit::Violation(reason.clone()));
        Stop::violation(reason)
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.inner.env.bus
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.inner.name)
    }

    pub(crate) fn mark_started(&self) {
        self.write().start = Instant::now();
    }

    /// Turns the body's result into the task's single report.
    ///
    /// `res` is `Err` when the body panicked.
    pub(crate) fn conclude(&self, res: Result<TaskResult, Box<dyn Any + Send>>) -> TaskReport {
        let mut st = self.write();
        let fault = match res {
            Err(payload) => Some(format!("panic: {}", panic_message(payload.as_ref()))),
            Ok(Ok(())) => st
                .exit
                .as_ref()
                .map(|exit| format!("returned normally after {}", exit.describe())),
            Ok(Err(stop)) => match (stop.kind, &st.exit) {
                (StopKind::Violation(reason), _) => Some(reason),
                (_, Some(Exit::Violation(reason))) => Some(reason.clone()),
                (_, Some(_)) => None,
                (_, None) => Some("returned a stop raised by another task".to_string()),
            },
        };

        let outcome = match fault {
            Some(reason) => {
                st.failed = true;
                Outcome::Faulted { reason }
            }
            None if st.failed => Outcome::Failed,
            None if st.skipped => Outcome::Skipped,
            None => Outcome::Passed,
        };

        TaskReport {
            name: self.name_arc(),
            outcome,
            elapsed: st.start.elapsed(),
            output: std::mem::take(&mut st.output),
        }
    }

    fn push(&self, loc: &Location<'_>, msg: &str) {
        let entry = decorate(loc, msg);
        self.write().output.push_str(&entry);
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Prefixes `msg` with the call site and indents it for the report.
///
/// Every line gets one tab; continuation lines get a second one.
fn decorate(loc: &Location<'_>, msg: &str) -> String {
    let path = loc.file();
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let msg = msg.strip_suffix('\n').unwrap_or(msg);

    let mut buf = format!("\t{file}:{}: ", loc.line());
    for (i, line) in msg.split('\n').enumerate() {
        if i > 0 {
            buf.push_str("\n\t\t");
        }
        buf.push_str(line);
    }
    buf.push('\n');
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ctx(name: &str) -> (Ctx, mpsc::Receiver<Signal>, Arc<Semaphore>) {
        let (tx, rx) = mpsc::channel(1);
        let gate = Arc::new(Semaphore::new(0));
        let env = TaskEnv {
            short: true,
            args: Arc::from(vec!["a".to_string(), "b".to_string()]),
            bus: Bus::new(16),
        };
        (Ctx::new(Arc::from(name), env, tx, gate.clone()), rx, gate)
    }

    #[test]
    fn test_decorate_single_and_multi_line() {
        let loc = Location::caller();
        let line = loc.line();

        assert_eq!(decorate(loc, "boom"), format!("\tcontext.rs:{line}: boom\n"));
        assert_eq!(decorate(loc, "boom\n"), format!("\tcontext.rs:{line}: boom\n"));
        assert_eq!(
            decorate(loc, "first\nsecond"),
            format!("\tcontext.rs:{line}: first\n\t\tsecond\n")
        );
    }

    #[test]
    fn test_log_records_caller_location() {
        let (ctx, _rx, _gate) = test_ctx("TaskLog");
        let line = line!() + 1;
        ctx.log(format_args!("value={}", 7));

        let report = ctx.conclude(Ok(Ok(())));
        assert_eq!(report.output, format!("\tcontext.rs:{line}: value=7\n"));
        assert_eq!(report.outcome, Outcome::Passed);
    }

    #[test]
    fn test_env_accessors() {
        let (ctx, _rx, _gate) = test_ctx("TaskEnv");
        assert_eq!(ctx.name(), "TaskEnv");
        assert!(ctx.short());
        assert_eq!(ctx.args(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_fail_is_soft() {
        let (ctx, _rx, _gate) = test_ctx("TaskSoft");
        ctx.error("first problem");
        assert!(ctx.failed());
        ctx.log("still running");

        let report = ctx.conclude(Ok(Ok(())));
        assert_eq!(report.outcome, Outcome::Failed);
        assert!(report.output.contains("first problem"));
        assert!(report.output.contains("still running"));
    }

    #[test]
    fn test_fail_now_then_return_err_is_failed() {
        let (ctx, _rx, _gate) = test_ctx("TaskFatal");
        let stop = ctx.fatal("boom");
        assert!(stop.is_fail());

        let report = ctx.conclude(Ok(Err(stop)));
        assert_eq!(report.outcome, Outcome::Failed);
    }

    #[test]
    fn test_skip_now_is_not_failure() {
        let (ctx, _rx, _gate) = test_ctx("TaskSkip");
        let stop = ctx.skip_with("not applicable");
        assert!(ctx.skipped());
        assert!(!ctx.failed());

        let report = ctx.conclude(Ok(Err(stop)));
        assert_eq!(report.outcome, Outcome::Skipped);
        assert!(!report.outcome.is_failure());
    }

    #[test]
    fn test_swallowed_stop_faults() {
        let (ctx, _rx, _gate) = test_ctx("TaskSwallow");
        let _ignored = ctx.fail_now();

        let report = ctx.conclude(Ok(Ok(())));
        assert!(matches!(report.outcome, Outcome::Faulted { ref reason } if reason.contains("fail_now")));
    }

    #[test]
    fn test_foreign_stop_faults() {
        let (ctx, _rx, _gate) = test_ctx("TaskA");
        let (other, _rx2, _gate2) = test_ctx("TaskB");

        let report = ctx.conclude(Ok(Err(other.fail_now())));
        assert!(matches!(report.outcome, Outcome::Faulted { .. }));
    }

    #[test]
    fn test_panic_faults_and_keeps_log() {
        let (ctx, _rx, _gate) = test_ctx("TaskPanic");
        ctx.log("before panic");
        let payload: Box<dyn Any + Send> = Box::new("index out of bounds");

        let report = ctx.conclude(Err(payload));
        assert_eq!(
            report.outcome,
            Outcome::Faulted {
                reason: "panic: index out of bounds".into()
            }
        );
        assert!(report.output.contains("before panic"));
    }

    #[tokio::test]
    async fn test_parallel_handshake_and_second_call_violation() {
        let (ctx, mut rx, gate) = test_ctx("TaskPar");
        let body = ctx.clone();
        let handle = tokio::spawn(async move {
            body.parallel().await?;
            body.parallel().await
        });

        assert!(matches!(rx.recv().await, Some(Signal::Detached)));
        gate.add_permits(1);

        let stop = handle.await.unwrap().unwrap_err();
        assert!(!stop.is_fail() && !stop.is_skip());

        let report = ctx.conclude(Ok(Err(stop)));
        assert!(
            matches!(report.outcome, Outcome::Faulted { ref reason } if reason.contains("more than once"))
        );
    }
}
