//! The [`Aggregator`]: one configured search engine shared across requests.
//!
//! An aggregator owns the source client, the content filter and the query
//! normalizer. It holds no per-request state, so one instance (usually in
//! an `Arc`) serves every request concurrently. The search operations
//! themselves live in [`crate::orchestrator`].

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::normalize::{IdentityNormalizer, QueryNormalizer};
use crate::policy::{ContentFilter, KeywordPolicy};
use crate::sources::ApiSourceClient;
use crate::types::Source;

/// A search request, constructed per call and discarded afterwards.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Query text exactly as the caller sent it.
    pub query: String,
    /// Sources available to this caller. Disabled sources are skipped.
    pub sources: Vec<Source>,
    /// Whether the content policy applies to this request.
    pub policy_active: bool,
}

impl SearchRequest {
    /// A request with the content policy enabled.
    pub fn new(query: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            query: query.into(),
            sources,
            policy_active: true,
        }
    }

    /// Override whether the content policy applies.
    pub fn with_policy(mut self, active: bool) -> Self {
        self.policy_active = active;
        self
    }
}

/// Multi-source search aggregator.
///
/// Generic over the [`SourceClient`](crate::client::SourceClient) so tests
/// and embedders can substitute their own upstream transport.
pub struct Aggregator<C = ApiSourceClient> {
    pub(crate) client: Arc<C>,
    pub(crate) config: SearchConfig,
    pub(crate) filter: Arc<dyn ContentFilter>,
    pub(crate) normalizer: Arc<dyn QueryNormalizer>,
}

impl Aggregator<ApiSourceClient> {
    /// Build an aggregator using the stock HTTP source client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid configuration or
    /// [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let client = ApiSourceClient::new(&config)?;
        Ok(Self::with_client(client, config))
    }
}

impl<C> Aggregator<C> {
    /// Build an aggregator around an arbitrary source client.
    ///
    /// Starts with an empty [`KeywordPolicy`] (only the adult-source check
    /// applies) and the [`IdentityNormalizer`].
    pub fn with_client(client: C, config: SearchConfig) -> Self {
        Self {
            client: Arc::new(client),
            config,
            filter: Arc::new(KeywordPolicy::default()),
            normalizer: Arc::new(IdentityNormalizer),
        }
    }

    /// Replace the content filter.
    pub fn content_filter(mut self, filter: impl ContentFilter + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Replace the query normalizer.
    pub fn normalizer(mut self, normalizer: impl QueryNormalizer + 'static) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}

impl<C> std::fmt::Debug for Aggregator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
