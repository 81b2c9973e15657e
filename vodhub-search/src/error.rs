//! Error types for the vodhub-search crate.
//!
//! Per-call failures ([`SearchError::Timeout`], [`SearchError::Http`],
//! [`SearchError::Parse`]) never reach the caller of a search: the
//! orchestrator downgrades them to "zero results from this call". Only
//! request-level failures are returned from the public entry points.

/// Errors that can occur while aggregating a search.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// No enabled source is available for the request.
    #[error("no sources available: {0}")]
    NoSources(String),

    /// A source call exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// An HTTP request to a source failed or returned a non-2xx status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A source response body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The request itself is unusable (e.g. an empty query).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The requested source or item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The merge/filter/rank pipeline itself failed.
    #[error("pipeline error: {0}")]
    Pipeline(String),
}

impl SearchError {
    /// Returns `true` for failures scoped to a single source call.
    pub fn is_per_call(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Http(_) | Self::Parse(_))
    }
}

/// Convenience type alias for vodhub-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
