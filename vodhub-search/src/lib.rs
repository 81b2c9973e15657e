//! # vodhub-search
//!
//! Multi-source media title search aggregation.
//!
//! One query is fanned out to every enabled content-index source at once.
//! The per-source results are merged, filtered through a content policy and
//! ranked by lexical relevance, then delivered either as one batch or as a
//! stream of per-source events.
//!
//! ## Design
//!
//! - Each (source, query variant) call races its own deadline; a slow or
//!   broken source never delays or fails the others
//! - Items are identified by `(source, id)`; the first copy seen wins
//! - The content policy is an injected [`ContentFilter`]; the stock
//!   [`KeywordPolicy`] rejects adult-flagged sources and keyword hits
//! - Ranking is a stable sort over integer relevance tiers
//! - Streaming is a bounded channel written by a single driver task;
//!   dropping the receiver cancels delivery
//! - Nothing is cached or persisted between requests
//!
//! ## Privacy
//!
//! Search queries are logged only at debug level.

pub mod aggregator;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod orchestrator;
pub mod policy;
pub mod sources;
pub mod types;

pub use aggregator::{Aggregator, SearchRequest};
pub use client::SourceClient;
pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use normalize::{CharFoldNormalizer, IdentityNormalizer, QueryNormalizer};
pub use orchestrator::fanout::FanOutStats;
pub use orchestrator::search::{available_sources, BatchOutcome};
pub use orchestrator::stream::SearchEvent;
pub use orchestrator::suggest::{Suggestion, SuggestionKind};
pub use policy::{resolve_policy, ContentFilter, KeywordPolicy};
pub use sources::ApiSourceClient;
pub use types::{CandidateItem, Source};

/// Batch-search `request.sources` over HTTP with the stock client and no
/// keyword terms.
///
/// Builds a throwaway [`Aggregator`]; servers should build one aggregator
/// and share it instead.
///
/// # Errors
///
/// Same as [`Aggregator::search`], plus [`SearchError::Http`] if the HTTP
/// client cannot be built.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> vodhub_search::Result<()> {
/// use vodhub_search::{SearchConfig, SearchRequest, Source};
///
/// let sources = vec![Source::new("demo", "Demo", "https://demo.example/api.php/provide/vod")];
/// let outcome = vodhub_search::search(
///     &SearchRequest::new("Foo", sources),
///     SearchConfig::default(),
/// )
/// .await?;
/// for item in &outcome.results {
///     println!("{} [{}]", item.title, item.source_name);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(request: &SearchRequest, config: SearchConfig) -> Result<BatchOutcome> {
    Aggregator::from_config(config)?.search(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn search_validates_config_zero_timeout() {
        let config = SearchConfig {
            per_call_timeout: Duration::ZERO,
            ..Default::default()
        };
        let sources = vec![Source::new("a", "Alpha", "https://a.example")];
        let err = search(&SearchRequest::new("Foo", sources), config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("per_call_timeout"));
    }

    #[tokio::test]
    async fn search_without_sources_fails() {
        let err = search(&SearchRequest::new("Foo", vec![]), SearchConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NoSources(_)));
    }
}
