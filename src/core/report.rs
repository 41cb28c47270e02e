//! # Task reports and the line-oriented reporter.
//!
//! Output format:
//! ```text
//! === RUN TaskA               (verbose only)
//! --- PASS: TaskA (0.00s)     (verbose only)
//! --- SKIP: TaskC (0.00s)     (verbose only)
//! --- FAIL: TaskB (0.01s)
//! \tfile.rs:12: boom
//! FAIL
//! ```
//! Each block is flushed as soon as it is written, so a run that aborts
//! leaves everything reported so far on the sink.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::time::Duration;

/// Terminal state of one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Finished without being marked failed or skipped.
    Passed,
    /// Marked failed (`fail`, `error`, `fail_now`, `fatal`).
    Failed,
    /// Marked skipped and not failed.
    Skipped,
    /// Left without a proper terminal operation; aborts the run.
    Faulted {
        /// What went wrong.
        reason: String,
    },
}

impl Outcome {
    /// True for outcomes that make the run fail.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed | Outcome::Faulted { .. })
    }

    /// Report label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASS",
            Outcome::Skipped => "SKIP",
            Outcome::Failed | Outcome::Faulted { .. } => "FAIL",
        }
    }
}

/// Owned result of one launch, handed from the task to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// Reported name (with degree suffix).
    pub name: Arc<str>,
    /// Terminal state.
    pub outcome: Outcome,
    /// Time from start (or admission, for parallel tasks) to exit.
    pub elapsed: Duration,
    /// Decorated log entries.
    pub output: String,
}

impl TaskReport {
    /// Report for a task whose completion signal never arrived.
    pub(crate) fn lost(name: Arc<str>) -> Self {
        Self {
            name,
            outcome: Outcome::Faulted {
                reason: "exited without a completion signal".to_string(),
            },
            elapsed: Duration::ZERO,
            output: String::new(),
        }
    }
}

/// Writes per-task blocks and the final verdict.
#[derive(Debug)]
pub struct Reporter<W = Stdout> {
    out: W,
    verbose: bool,
}

impl Reporter<Stdout> {
    /// Reporter on standard output.
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> Reporter<W> {
    /// Reporter writing to `out`; `verbose` also reports runs, passes and skips.
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    /// Reports whether passes and skips are written.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Gives the sink back (used to inspect captured output).
    pub fn into_inner(self) -> W {
        self.out
    }

    /// `=== RUN <name>`, verbose only.
    pub fn task_started(&mut self, name: &str) -> io::Result<()> {
        if self.verbose {
            writeln!(self.out, "=== RUN {name}")?;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Writes the block for a finished task.
    ///
    /// Failures are always written; passes and skips only when verbose.
    pub fn task_finished(&mut self, report: &TaskReport) -> io::Result<()> {
        if !report.outcome.is_failure() && !self.verbose {
            return Ok(());
        }
        write!(
            self.out,
            "--- {}: {} ({:.2}s)\n{}",
            report.outcome.label(),
            report.name,
            report.elapsed.as_secs_f64(),
            report.output
        )?;
        self.out.flush()
    }

    /// Final `PASS` or `FAIL` line.
    pub fn summary(&mut self, ok: bool) -> io::Result<()> {
        writeln!(self.out, "{}", if ok { "PASS" } else { "FAIL" })?;
        self.out.flush()
    }
}
