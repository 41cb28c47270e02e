//! # LogWriter: simple event printer
//!
//! Prints incoming [`Event`]s to stderr so they never interleave with the
//! PASS/FAIL report on stdout.
//!
//! ## Example output
//! ```text
//! [degree-starting] degree=Some(2)
//! [starting] task="TaskA-2" degree=Some(2)
//! [detached] task="TaskP-2"
//! [admitted] task="TaskP-2"
//! [failed] task="TaskB-2" elapsed_ms=Some(3)
//! [degree-finished] degree=Some(2) result="fail"
//! [alarm] timeout_ms=Some(500) running="TaskSlow"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn render(e: &Event) -> String {
        let task = e.task.as_deref().unwrap_or("?");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::DegreeStarting => format!("[degree-starting] degree={:?}", e.degree),
            EventKind::DegreeFinished => {
                format!("[degree-finished] degree={:?} result={reason:?}", e.degree)
            }
            EventKind::AlarmFired => {
                format!("[alarm] timeout_ms={:?} running={reason:?}", e.timeout_ms)
            }
            EventKind::TaskStarting => format!("[starting] task={task:?} degree={:?}", e.degree),
            EventKind::TaskDetached => format!("[detached] task={task:?}"),
            EventKind::TaskAdmitted => format!("[admitted] task={task:?}"),
            EventKind::TaskPassed => format!("[passed] task={task:?} elapsed_ms={:?}", e.elapsed_ms),
            EventKind::TaskFailed => format!("[failed] task={task:?} elapsed_ms={:?}", e.elapsed_ms),
            EventKind::TaskSkipped => {
                format!("[skipped] task={task:?} elapsed_ms={:?}", e.elapsed_ms)
            }
            EventKind::TaskFaulted => format!("[faulted] task={task:?} reason={reason:?}"),
            EventKind::SubscriberOverflow => {
                format!("[subscriber-overflow] subscriber={task} reason={reason}")
            }
            EventKind::SubscriberPanicked => {
                format!("[subscriber-panicked] subscriber={task} info={reason}")
            }
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        eprintln!("{}", Self::render(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
