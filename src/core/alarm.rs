//! # Whole-run deadline.
//!
//! One [`Alarm`] is armed before the first degree and shared by all of them,
//! so the timeout bounds the aggregate run, not each pass. Every pass is
//! driven through [`Alarm::guard`]; once the deadline passes the guarded
//! future is dropped and the caller gets `Err(Expired)`.
//!
//! ## Watchdog
//! ```text
//! arm() ──► thread "taskharness-alarm"
//!             └─ recv_timeout(deadline) on the disarm channel
//!                  ├─ timed out     ─► fired.send_replace(true)
//!                  └─ disconnected  ─► exit quietly      (disarm / drop)
//!
//! guard(fut) ──► select { fired == true ─► Err(Expired), fut ─► Ok(out) }
//! ```
//!
//! The deadline is kept on its own OS thread, not on a runtime timer: a task
//! body that blocks every worker of a degree runtime would stall that
//! runtime's timer, but it cannot stop the watchdog or the `block_on` thread
//! the guard is polled on.
//!
//! A disarmed (or never armed) alarm guards nothing: the future runs to
//! completion.

use std::future::Future;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::error::RunError;

/// Returned by [`Alarm::guard`] when the deadline passed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expired;

/// Deadline for the whole run.
#[derive(Debug)]
pub struct Alarm {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    fired: watch::Receiver<bool>,
    disarm: Option<mpsc::Sender<()>>,
}

impl Alarm {
    /// Arms the alarm `timeout` from now; `None` or zero leaves it disarmed.
    ///
    /// Starts the watchdog thread when armed.
    pub fn arm(timeout: Option<Duration>) -> Result<Self, RunError> {
        let timeout = timeout.filter(|d| !d.is_zero());
        let deadline = timeout.and_then(|d| Instant::now().checked_add(d));
        let (fired_tx, fired) = watch::channel(false);

        let Some(deadline) = deadline else {
            return Ok(Self {
                timeout,
                deadline: None,
                fired,
                disarm: None,
            });
        };

        let (disarm, disarmed) = mpsc::channel::<()>();
        thread::Builder::new()
            .name("taskharness-alarm".to_string())
            .spawn(move || {
                let wait = deadline.saturating_duration_since(Instant::now());
                if let Err(RecvTimeoutError::Timeout) = disarmed.recv_timeout(wait) {
                    fired_tx.send_replace(true);
                }
            })
            .map_err(RunError::Watchdog)?;

        Ok(Self {
            timeout,
            deadline: Some(deadline),
            fired,
            disarm: Some(disarm),
        })
    }

    /// Reports whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Reports whether the deadline has passed.
    pub fn has_fired(&self) -> bool {
        *self.fired.borrow()
    }

    /// The configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Time left before the alarm fires.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Runs `fut` until it completes or the deadline passes.
    ///
    /// Must be polled inside a tokio runtime; it needs no time driver.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Expired> {
        if self.deadline.is_none() {
            return Ok(fut.await);
        }
        let mut fired = self.fired.clone();
        tokio::select! {
            biased;
            Ok(_) = fired.wait_for(|fired| *fired) => Err(Expired),
            out = fut => Ok(out),
        }
    }

    /// Cancels the alarm after a run that finished in time.
    pub fn disarm(&mut self) {
        self.deadline = None;
        self.disarm = None;
    }
}
