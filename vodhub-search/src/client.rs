//! Trait definition for pluggable source clients.
//!
//! A source client performs exactly one query against one upstream
//! [`Source`] and returns the normalized [`CandidateItem`] list. Retry and
//! timeout policy belong to the orchestrator, not the client.

use tokio::time::Instant;

use crate::error::SearchError;
use crate::types::{CandidateItem, Source};

/// A pluggable upstream query backend.
///
/// Implementors must:
///
/// - issue exactly one outbound request per invocation
/// - never retry internally
/// - report any non-2xx status, malformed body or network error as an
///   `Err`, never as a partially-corrupted `Ok`
///
/// All implementations must be `Send + Sync` so one client can serve many
/// concurrent calls.
pub trait SourceClient: Send + Sync {
    /// Query `source` for `text`.
    ///
    /// `deadline` is the instant at which the orchestrator gives up on this
    /// call. Implementations should bound their own I/O by it; the
    /// orchestrator enforces it regardless.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`], [`SearchError::Parse`] or
    /// [`SearchError::Timeout`] for a failed call.
    fn query(
        &self,
        source: &Source,
        text: &str,
        deadline: Instant,
    ) -> impl std::future::Future<Output = Result<Vec<CandidateItem>, SearchError>> + Send;
}
