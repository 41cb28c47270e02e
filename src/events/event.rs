//! # Lifecycle events emitted during a sweep.
//!
//! [`EventKind`] classifies events into three groups:
//! - **Sweep events**: degree boundaries and the aggregate alarm
//! - **Task events**: launch, parallel detach/admission and the terminal outcome
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! [`Event`] carries optional metadata (task name, degree, elapsed time, reason).
//!
//! ## Ordering guarantees
//! Every event gets a process-wide, monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskharness::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("TaskB-2")
//!     .with_degree(2)
//!     .with_elapsed(Duration::from_millis(15));
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("TaskB-2"));
//! assert_eq!(ev.elapsed_ms, Some(15));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Sweep events ===
    /// A degree is about to run.
    ///
    /// Sets: `degree`.
    DegreeStarting,

    /// A degree finished (successfully or not).
    ///
    /// Sets: `degree`, `reason` (`"pass"`, `"fail"` or the fatal error).
    /// Always the last event a degree listener delivers.
    DegreeFinished,

    /// The aggregate deadline expired.
    ///
    /// Sets: `timeout_ms`, `reason` (tasks still running).
    AlarmFired,

    // === Task events ===
    /// A task body was launched.
    ///
    /// Sets: `task`, `degree`.
    TaskStarting,

    /// A task declared itself parallel and released the scheduler.
    ///
    /// Sets: `task`.
    TaskDetached,

    /// A parallel task passed the release gate.
    ///
    /// Sets: `task`.
    TaskAdmitted,

    /// Terminal: normal finish without failure.
    ///
    /// Sets: `task`, `elapsed_ms`.
    TaskPassed,

    /// Terminal: the task was marked failed.
    ///
    /// Sets: `task`, `elapsed_ms`.
    TaskFailed,

    /// Terminal: the task was skipped.
    ///
    /// Sets: `task`, `elapsed_ms`.
    TaskSkipped,

    /// Terminal: the task left without a terminal operation (fatal).
    ///
    /// Sets: `task`, `elapsed_ms`, `reason`.
    TaskFaulted,

    // === Subscriber events ===
    /// Subscriber panicked while processing an event.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`.
    SubscriberOverflow,
}

impl EventKind {
    /// True for the four terminal task outcomes.
    pub fn is_task_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::TaskPassed
                | EventKind::TaskFailed
                | EventKind::TaskSkipped
                | EventKind::TaskFaulted
        )
    }
}

/// Lifecycle event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Reported task name (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Concurrency degree.
    pub degree: Option<usize>,
    /// Task run time in milliseconds.
    pub elapsed_ms: Option<u64>,
    /// Aggregate timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Human-readable detail.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates an event of the given kind stamped with now and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            degree: None,
            elapsed_ms: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches the task (or subscriber) name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches the concurrency degree.
    #[inline]
    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = Some(degree);
        self
    }

    /// Attaches a human-readable detail.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task run time (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(saturating_ms(d));
        self
    }

    /// Attaches the aggregate timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(saturating_ms(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}

fn saturating_ms(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}
