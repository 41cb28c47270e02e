//! # Event subscribers.
//!
//! [`Subscribe`] is the extension point for observing a sweep (logging,
//! metrics, progress bars). [`SubscriberSet`] fans every event out to each
//! subscriber through its own bounded queue and worker.
//!
//! ```text
//! Bus ──► degree listener ──► SubscriberSet::emit()
//!                                  ├──► [queue 1] ──► worker ──► sub1.on_event()
//!                                  └──► [queue N] ──► worker ──► subN.on_event()
//! ```
//!
//! Built-in:
//! - `LogWriter` (feature `logging`): prints events to stderr.

mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
mod embedded;

pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
pub(crate) use subscriber_set::panic_message;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
