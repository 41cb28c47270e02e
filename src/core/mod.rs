//! Runtime core: selection, scheduling, reporting and the degree sweep.
//!
//! The public entry point is [`Harness`], which runs a task registry once per
//! configured concurrency degree under an aggregate [`Alarm`].
//!
//! Internal modules:
//! - [`config`]: plain configuration values with sentinel accessors;
//! - [`selector`]: regular-expression task selection;
//! - [`runner`]: executes one launch of a task and signals its completion;
//! - [`scheduler`]: walks the registry, collects parallel tasks, bounds admission;
//! - [`sweep`]: repeats the scheduler per degree on a dedicated runtime;
//! - [`alarm`]: the whole-run deadline;
//! - [`report`]: task reports and the line-oriented reporter;
//! - [`alive`]: names of task bodies still running.

mod alarm;
mod alive;
mod builder;
mod config;
mod report;
mod runner;
mod scheduler;
mod selector;
mod sweep;

pub use alarm::{Alarm, Expired};
pub use alive::AliveTracker;
pub use builder::HarnessBuilder;
pub use config::Config;
pub use report::{Outcome, Reporter, TaskReport};
pub(crate) use runner::Signal;
pub use scheduler::Scheduler;
pub use selector::{Selector, match_name};
pub use sweep::Harness;
