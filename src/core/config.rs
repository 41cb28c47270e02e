//! # Run configuration.
//!
//! Provides [`Config`], the plain values a run needs. Parsing flags or
//! environment is left to the caller; [`Config::parse_degrees`] covers the
//! one list-valued setting.
//!
//! ## Sentinel values
//! - `max_parallel = 0` → ambient host concurrency
//! - `degrees = []` → one degree equal to ambient host concurrency
//! - `timeout = 0s` → no aggregate deadline

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::RunError;

/// Configuration for one harness.
///
/// ## Field semantics
/// - `pattern`: regular expression selecting task names (`""` = all)
/// - `max_parallel`: admitted parallel tasks per degree (`0` = ambient)
/// - `degrees`: runtime worker counts to sweep over (`[]` = `[ambient]`)
/// - `timeout`: aggregate deadline over the whole sweep (`0s` = none)
/// - `verbose`: also report `=== RUN`, `--- PASS` and `--- SKIP` lines
/// - `short`: exposed to tasks through [`Ctx::short`](crate::Ctx::short)
/// - `args`: exposed to tasks through [`Ctx::args`](crate::Ctx::args)
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Task selection pattern.
    pub pattern: String,

    /// Maximum number of admitted parallel tasks.
    ///
    /// Serial tasks are never limited by it.
    pub max_parallel: usize,

    /// Concurrency degrees, run strictly one after another.
    pub degrees: Vec<usize>,

    /// One deadline for the entire sweep.
    pub timeout: Duration,

    /// Report passing and skipped tasks too.
    pub verbose: bool,

    /// Ask tasks to run a smaller workload.
    pub short: bool,

    /// Extra arguments for tasks.
    pub args: Vec<String>,

    /// Capacity of the event bus.
    pub bus_capacity: usize,
}

impl Config {
    /// Host concurrency, as reported by the OS (at least 1).
    pub fn ambient_concurrency() -> usize {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    /// Returns the effective parallel admission limit.
    #[inline]
    pub fn parallel_limit(&self) -> usize {
        match self.max_parallel {
            0 => Self::ambient_concurrency(),
            n => n,
        }
    }

    /// Returns the degrees to sweep over, in order.
    pub fn sweep_degrees(&self) -> Vec<usize> {
        if self.degrees.is_empty() {
            vec![Self::ambient_concurrency()]
        } else {
            self.degrees.clone()
        }
    }

    /// Returns the aggregate deadline as an `Option`.
    #[inline]
    pub fn alarm_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    pub(crate) fn shared_args(&self) -> Arc<[String]> {
        Arc::from(self.args.clone())
    }

    /// Checks values the sentinels do not cover.
    pub fn validate(&self) -> Result<(), RunError> {
        if let Some(zero) = self.degrees.iter().find(|d| **d == 0) {
            return Err(RunError::InvalidDegree {
                value: zero.to_string(),
            });
        }
        if let Some(timeout) = self.alarm_timeout()
            && Instant::now().checked_add(timeout).is_none()
        {
            return Err(RunError::InvalidConfig {
                reason: format!("timeout {timeout:?} is out of range"),
            });
        }
        Ok(())
    }

    /// Parses a comma-separated list of degrees such as `"1,2,4"`.
    ///
    /// Blank entries are ignored, so `""` yields an empty list (ambient).
    ///
    /// ```
    /// use taskharness::Config;
    ///
    /// assert_eq!(Config::parse_degrees(" 1, 2,,4 ").unwrap(), vec![1, 2, 4]);
    /// assert!(Config::parse_degrees("1,0").is_err());
    /// ```
    pub fn parse_degrees(list: &str) -> Result<Vec<usize>, RunError> {
        list.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| match v.parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(RunError::InvalidDegree {
                    value: v.to_string(),
                }),
            })
            .collect()
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `pattern = ""` (every task)
    /// - `max_parallel = 0` (ambient)
    /// - `degrees = []` (one ambient degree)
    /// - `timeout = 0s` (no deadline)
    /// - `verbose = false`, `short = false`, `args = []`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            pattern: String::new(),
            max_parallel: 0,
            degrees: Vec::new(),
            timeout: Duration::ZERO,
            verbose: false,
            short: false,
            args: Vec::new(),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fall_back_to_ambient() {
        let cfg = Config::default();
        let ambient = Config::ambient_concurrency();
        assert!(ambient >= 1);
        assert_eq!(cfg.parallel_limit(), ambient);
        assert_eq!(cfg.sweep_degrees(), vec![ambient]);
        assert_eq!(cfg.alarm_timeout(), None);
    }

    #[test]
    fn test_explicit_values_win() {
        let cfg = Config {
            max_parallel: 3,
            degrees: vec![1, 2],
            timeout: Duration::from_secs(2),
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.parallel_limit(), 3);
        assert_eq!(cfg.sweep_degrees(), vec![1, 2]);
        assert_eq!(cfg.alarm_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_parse_degrees() {
        assert_eq!(Config::parse_degrees("").unwrap(), Vec::<usize>::new());
        assert_eq!(Config::parse_degrees("4").unwrap(), vec![4]);

        let err = Config::parse_degrees("1,x").unwrap_err();
        assert!(matches!(err, RunError::InvalidDegree { ref value } if value == "x"));
        assert!(Config::parse_degrees("-1").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_degree() {
        let cfg = Config {
            degrees: vec![1, 0],
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(RunError::InvalidDegree { .. })));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unreachable_deadline() {
        let cfg = Config {
            timeout: Duration::MAX,
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.as_label(), "run_invalid_config");
        assert_eq!(err.exit_code(), 1);
    }
}
