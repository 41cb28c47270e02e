//! # Task selection by pattern.
//!
//! The pattern is a regular expression searched anywhere in the task name
//! (unanchored), so `"Net"` selects `TaskNetDial` and `TaskSubnet` alike;
//! use `^`/`$` to anchor. An empty pattern selects everything.

use regex::Regex;

use crate::error::RunError;

/// Compiled selection pattern.
#[derive(Clone, Debug)]
pub struct Selector {
    regex: Option<Regex>,
}

impl Selector {
    /// Compiles `pattern`; an invalid expression is a fatal configuration error.
    pub fn new(pattern: &str) -> Result<Self, RunError> {
        if pattern.is_empty() {
            return Ok(Self::all());
        }
        let regex = Regex::new(pattern).map_err(|source| RunError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex: Some(regex) })
    }

    /// Selector that matches every name.
    pub fn all() -> Self {
        Self { regex: None }
    }

    /// Reports whether `name` is selected.
    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().is_none_or(|re| re.is_match(name))
    }
}

/// One-shot form: compiles `pattern` and tests `name`.
///
/// ```
/// use taskharness::match_name;
///
/// assert!(match_name("", "TaskAnything").unwrap());
/// assert!(match_name("^TaskB", "TaskBuild").unwrap());
/// assert!(match_name("(", "TaskA").is_err());
/// ```
pub fn match_name(pattern: &str, name: &str) -> Result<bool, RunError> {
    Ok(Selector::new(pattern)?.matches(name))
}
