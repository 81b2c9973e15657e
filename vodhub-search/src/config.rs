//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls per-call timeouts and HTTP request behaviour.
//! Source lists and content-policy terms are supplied separately, per
//! request and per aggregator respectively.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::SearchError;
use crate::types::Source;

/// Per-call deadline used when nothing else is configured.
pub const DEFAULT_PER_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Configuration for the search aggregator.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Deadline for each individual (source, query variant) call.
    pub per_call_timeout: Duration,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
    /// Maximum number of keyword suggestions returned by
    /// [`crate::Aggregator::suggest`].
    pub max_suggestions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            per_call_timeout: DEFAULT_PER_CALL_TIMEOUT,
            user_agent: None,
            max_suggestions: 8,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration.
    ///
    /// Checks:
    /// - `per_call_timeout` must be non-zero
    /// - `max_suggestions` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.per_call_timeout.is_zero() {
            return Err(SearchError::Config(
                "per_call_timeout must be greater than 0".into(),
            ));
        }
        if self.max_suggestions == 0 {
            return Err(SearchError::Config(
                "max_suggestions must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Check that every source key in `sources` is unique.
pub fn validate_sources(sources: &[Source]) -> Result<(), SearchError> {
    let mut seen = HashSet::with_capacity(sources.len());
    for source in sources {
        if source.key.trim().is_empty() {
            return Err(SearchError::Config(format!(
                "source `{}` has an empty key",
                source.name
            )));
        }
        if !seen.insert(source.key.as_str()) {
            return Err(SearchError::Config(format!(
                "duplicate source key `{}`",
                source.key
            )));
        }
    }
    Ok(())
}
