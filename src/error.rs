//! Error types used by the harness runtime and by task bodies.
//!
//! This module defines:
//!
//! - [`RunError`]: fatal errors that abort a whole run (bad configuration,
//!   faulted tasks, the aggregate deadline).
//! - [`Stop`]: the token a task body returns to leave early after
//!   `fail_now`/`skip_now` (see [`Ctx`](crate::Ctx)).
//!
//! Soft task failures are **not** errors: they are recorded on the task's
//! context and folded into the run result.

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// # Fatal errors produced by the harness.
///
/// Every variant aborts the run it occurs in; no partial `PASS`/`FAIL`
/// summary is written after one of these.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// The selection pattern is not a valid regular expression.
    #[error("invalid regexp for task selection {pattern:?}: {source}")]
    InvalidPattern {
        /// The pattern as configured.
        pattern: String,
        /// Underlying compile error.
        #[source]
        source: regex::Error,
    },

    /// A concurrency degree is zero or not a number.
    #[error("invalid value {value:?} for concurrency degree")]
    InvalidDegree {
        /// The offending value.
        value: String,
    },

    /// Any other configuration value the harness cannot run with.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },

    /// A task left its body without a proper terminal operation
    /// (panic, swallowed stop, contract violation).
    #[error("task {task} faulted: {reason}")]
    TaskFaulted {
        /// Reported task name (with degree suffix).
        task: String,
        /// Fault description.
        reason: String,
    },

    /// The aggregate deadline expired before the sweep completed.
    #[error("task run timed out after {timeout:?}; still running: {running:?}")]
    TimedOut {
        /// The configured aggregate timeout.
        timeout: Duration,
        /// Tasks that were running when the alarm fired (sorted).
        running: Vec<String>,
    },

    /// The per-degree runtime could not be built.
    #[error("failed to build runtime for degree {degree}: {source}")]
    Runtime {
        /// Degree the runtime was built for.
        degree: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The alarm's watchdog thread could not be started.
    #[error("failed to start the alarm watchdog: {0}")]
    Watchdog(#[source] io::Error),

    /// Writing the report failed.
    #[error("report output failed: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskharness::RunError;
    /// use std::time::Duration;
    ///
    /// let err = RunError::TimedOut { timeout: Duration::from_secs(1), running: vec![] };
    /// assert_eq!(err.as_label(), "run_timed_out");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::InvalidPattern { .. } => "run_invalid_pattern",
            RunError::InvalidDegree { .. } => "run_invalid_degree",
            RunError::InvalidConfig { .. } => "run_invalid_config",
            RunError::TaskFaulted { .. } => "run_task_faulted",
            RunError::TimedOut { .. } => "run_timed_out",
            RunError::Runtime { .. } => "run_runtime",
            RunError::Watchdog(_) => "run_watchdog",
            RunError::Io(_) => "run_io",
        }
    }

    /// Process exit code for this error.
    ///
    /// Configuration problems exit with `1` (like a failed run); faults and
    /// timeouts exit with `2`.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::InvalidPattern { .. }
            | RunError::InvalidDegree { .. }
            | RunError::InvalidConfig { .. } => 1,
            _ => 2,
        }
    }

    /// Indicates whether the error was raised before any task executed.
    pub fn is_config(&self) -> bool {
        self.exit_code() == 1
    }
}

/// Why a task body stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StopKind {
    Fail,
    Skip,
    Violation(String),
}

/// Early-exit token returned by terminal [`Ctx`](crate::Ctx) operations.
///
/// Only a context can create one. A body hands it back with
/// `return Err(ctx.fail_now())`; every local dropped on the way out runs its
/// cleanup.
#[must_use = "a Stop must be returned from the task body"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stop {
    pub(crate) kind: StopKind,
}

impl Stop {
    pub(crate) fn fail() -> Self {
        Self {
            kind: StopKind::Fail,
        }
    }

    pub(crate) fn skip() -> Self {
        Self {
            kind: StopKind::Skip,
        }
    }

    pub(crate) fn violation(reason: impl Into<String>) -> Self {
        Self {
            kind: StopKind::Violation(reason.into()),
        }
    }

    /// True if the stop came from `fail_now`/`fatal`.
    pub fn is_fail(&self) -> bool {
        self.kind == StopKind::Fail
    }

    /// True if the stop came from `skip_now`/`skip_with`.
    pub fn is_skip(&self) -> bool {
        self.kind == StopKind::Skip
    }

    fn describe(&self) -> &str {
        match &self.kind {
            StopKind::Fail => "fail now",
            StopKind::Skip => "skip now",
            StopKind::Violation(reason) => reason,
        }
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task stopped: {}", self.describe())
    }
}

impl std::error::Error for Stop {}
