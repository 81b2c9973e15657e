//! Batch delivery: fan out, wait for every call to settle, then
//! merge → filter → rank once.
//!
//! Also hosts the single-source lookup and the source listing, which share
//! the same availability rules.

use serde::Serialize;

use crate::aggregator::{Aggregator, SearchRequest};
use crate::client::SourceClient;
use crate::config::validate_sources;
use crate::error::SearchError;
use crate::normalize::QueryVariants;
use crate::policy::filter_items;
use crate::types::{CandidateItem, Source};

use super::fanout::{call_with_deadline, fan_out, FanOutStats};
use super::refine;

/// Final result of a batch search.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// Deduplicated, filtered, ranked items.
    pub results: Vec<CandidateItem>,
    /// The query after locale normalization (used for ranking).
    #[serde(rename = "normalizedQuery")]
    pub normalized_query: String,
    /// Per-call success/failure counts.
    #[serde(skip)]
    pub stats: FanOutStats,
}

impl BatchOutcome {
    fn empty(normalized_query: String) -> Self {
        Self {
            results: Vec::new(),
            normalized_query,
            stats: FanOutStats::default(),
        }
    }
}

/// Sources a caller may see: enabled, and not adult-flagged while the
/// content policy is active.
pub fn available_sources(sources: &[Source], policy_active: bool) -> Vec<Source> {
    sources
        .iter()
        .filter(|s| !s.disabled && !(policy_active && s.is_adult))
        .cloned()
        .collect()
}

/// Enabled sources, or [`SearchError::NoSources`] when there are none.
pub(crate) fn enabled_sources(sources: &[Source]) -> Result<Vec<Source>, SearchError> {
    validate_sources(sources)?;
    let enabled: Vec<Source> = sources.iter().filter(|s| !s.disabled).cloned().collect();
    if enabled.is_empty() {
        return Err(SearchError::NoSources(if sources.is_empty() {
            "no sources configured".into()
        } else {
            "every configured source is disabled".into()
        }));
    }
    Ok(enabled)
}

impl<C: SourceClient> Aggregator<C> {
    /// Run a batch search across every enabled source.
    ///
    /// # Pipeline
    ///
    /// 1. Normalize the query; build the 1–2 distinct variants
    /// 2. Fan out one call per enabled source × variant, each raced
    ///    against `per_call_timeout`
    /// 3. Discard failed calls (logged, counted in [`FanOutStats`])
    /// 4. Merge by `(source, id)`, first-seen wins
    /// 5. Apply the content filter when the policy is active
    /// 6. Stable-rank by relevance to the normalized query
    ///
    /// A blank query short-circuits to an empty outcome without
    /// dispatching anything.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::NoSources`] when no enabled source exists and
    /// [`SearchError::Config`] for an invalid configuration or duplicate
    /// source keys. Upstream failures never produce an error: a request in
    /// which every call fails yields an empty result list.
    pub async fn search(&self, request: &SearchRequest) -> Result<BatchOutcome, SearchError> {
        self.config.validate()?;
        let enabled = enabled_sources(&request.sources)?;

        let query = request.query.trim();
        if query.is_empty() {
            return Ok(BatchOutcome::empty(String::new()));
        }

        let variants = QueryVariants::build(query, self.normalizer.as_ref());
        tracing::debug!(
            query = %variants.original,
            normalized = %variants.normalized,
            sources = enabled.len(),
            "batch search dispatched"
        );

        let outcomes = fan_out(
            self.client.as_ref(),
            &enabled,
            &variants.variants(),
            self.config.per_call_timeout,
        )
        .await;

        let stats = FanOutStats::from_outcomes(outcomes.iter().flat_map(|o| &o.calls));
        tracing::info!(
            dispatched = stats.dispatched,
            succeeded = stats.succeeded,
            failed = stats.failed,
            timed_out = stats.timed_out,
            "batch fan-out settled"
        );

        let results = refine(
            self.filter.as_ref(),
            outcomes.into_iter().flat_map(|o| o.into_item_lists()),
            request.policy_active,
            &request.sources,
            &variants.normalized,
        );

        Ok(BatchOutcome {
            results,
            normalized_query: variants.normalized,
            stats,
        })
    }

    /// Query one source and keep only items whose title equals `query`.
    ///
    /// The source must be available under the request's policy (see
    /// [`available_sources`]).
    ///
    /// # Errors
    ///
    /// - [`SearchError::NotFound`] if the source is unknown or unavailable,
    ///   or nothing matches exactly
    /// - the per-call failure (HTTP, parse, timeout) when the single
    ///   upstream call fails
    pub async fn search_one(
        &self,
        source_key: &str,
        request: &SearchRequest,
    ) -> Result<Vec<CandidateItem>, SearchError> {
        self.config.validate()?;
        let pool = available_sources(&request.sources, request.policy_active);
        let source = pool
            .iter()
            .find(|s| s.key == source_key)
            .ok_or_else(|| SearchError::NotFound(format!("source `{source_key}`")))?;

        let items = call_with_deadline(
            self.client.as_ref(),
            source,
            &request.query,
            self.config.per_call_timeout,
        )
        .await?;

        let exact: Vec<CandidateItem> = items
            .into_iter()
            .filter(|item| item.title == request.query)
            .collect();
        let accepted = filter_items(
            self.filter.as_ref(),
            exact,
            request.policy_active,
            &request.sources,
        );

        if accepted.is_empty() {
            return Err(SearchError::NotFound(format!(
                "no exact match for the query in `{source_key}`"
            )));
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SearchConfig;
    use crate::normalize::CharFoldNormalizer;
    use crate::orchestrator::test_support::{Behaviour, ScriptedClient};
    use crate::policy::KeywordPolicy;

    fn aggregator(client: ScriptedClient) -> Aggregator<ScriptedClient> {
        Aggregator::with_client(client, SearchConfig::default())
            .content_filter(KeywordPolicy::new(["ethics"], ["casino"]))
    }

    fn abc() -> Vec<Source> {
        vec![
            Source::new("a", "Alpha", "https://a.example"),
            Source::new("b", "Beta", "https://b.example"),
            Source::new("c", "Gamma", "https://c.example"),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn example_scenario_three_items_ranked() {
        let client = ScriptedClient::new()
            .on("a", Behaviour::items(&[("1", "Foo S1"), ("2", "Bar")]))
            .on("b", Behaviour::Hang)
            .on("c", Behaviour::items(&[("1", "Foo S1")]));
        let agg = aggregator(client);

        let outcome = agg
            .search(&SearchRequest::new("Foo", abc()))
            .await
            .expect("search");

        let keys: Vec<_> = outcome
            .results
            .iter()
            .map(|i| (i.source.as_str(), i.title.as_str()))
            .collect();
        assert_eq!(keys, vec![("a", "Foo S1"), ("c", "Foo S1"), ("a", "Bar")]);
        assert_eq!(outcome.normalized_query, "Foo");
        assert_eq!(outcome.stats.timed_out, 1);
        assert_eq!(outcome.stats.succeeded, 2);
    }

    #[tokio::test]
    async fn all_sources_failing_is_empty_not_error() {
        let client = ScriptedClient::new()
            .on("a", Behaviour::Fail)
            .on("b", Behaviour::Fail)
            .on("c", Behaviour::Fail);
        let outcome = aggregator(client)
            .search(&SearchRequest::new("Foo", abc()))
            .await
            .expect("partial failure is not an error");
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.stats.failed, 3);
    }

    #[tokio::test]
    async fn no_sources_is_request_error() {
        let err = aggregator(ScriptedClient::new())
            .search(&SearchRequest::new("Foo", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NoSources(_)));

        let all_disabled = abc().into_iter().map(Source::disabled).collect();
        let err = aggregator(ScriptedClient::new())
            .search(&SearchRequest::new("Foo", all_disabled))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn duplicate_source_keys_rejected() {
        let mut sources = abc();
        sources.push(Source::new("a", "Alpha 2", "https://a2.example"));
        let err = aggregator(ScriptedClient::new())
            .search(&SearchRequest::new("Foo", sources))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[tokio::test]
    async fn blank_query_dispatches_nothing() {
        let client = ScriptedClient::new().on("a", Behaviour::items(&[("1", "Foo")]));
        let agg = aggregator(client);
        let outcome = agg
            .search(&SearchRequest::new("   ", abc()))
            .await
            .expect("search");
        assert!(outcome.results.is_empty());
        assert_eq!(agg.client.call_count(), 0);
    }

    #[tokio::test]
    async fn adult_source_removed_when_policy_active() {
        let client = ScriptedClient::new()
            .on("a", Behaviour::items(&[("1", "Foo")]))
            .on("b", Behaviour::items(&[("1", "Foo"), ("2", "Totally Harmless")]));
        let sources = vec![
            Source::new("a", "Alpha", "https://a.example"),
            Source::new("b", "Beta", "https://b.example").adult(),
        ];
        let agg = aggregator(client);

        let on = agg
            .search(&SearchRequest::new("Foo", sources.clone()))
            .await
            .expect("search");
        assert!(on.results.iter().all(|i| i.source != "b"));
        assert_eq!(on.results.len(), 1);

        let off = agg
            .search(&SearchRequest::new("Foo", sources).with_policy(false))
            .await
            .expect("search");
        assert_eq!(off.results.len(), 3);
        assert!(on.results.len() <= off.results.len());
    }

    #[tokio::test]
    async fn keyword_terms_filter_items() {
        let client = ScriptedClient::new().on(
            "a",
            Behaviour::typed(&[
                ("1", "Foo", "Drama"),
                ("2", "Foo Casino", "Drama"),
                ("3", "Foo Night", "Ethics Films"),
            ]),
        );
        let outcome = aggregator(client)
            .search(&SearchRequest::new("Foo", abc()))
            .await
            .expect("search");
        let ids: Vec<_> = outcome.results.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[tokio::test]
    async fn both_variants_dispatched_and_deduplicated() {
        let client = ScriptedClient::new().on("a", Behaviour::Echo);
        let agg = aggregator(client)
            .normalizer(CharFoldNormalizer::from_pairs([("劇", "剧")]).expect("table"));

        let outcome = agg
            .search(&SearchRequest::new("劇", abc()[..1].to_vec()))
            .await
            .expect("search");

        assert_eq!(agg.client.call_count(), 2);
        assert_eq!(outcome.normalized_query, "剧");
        // Both variants return id "1" from source "a": one item, the first seen.
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].title, "剧");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_within_deadline_still_counted() {
        let client = ScriptedClient::new()
            .on("a", Behaviour::delayed(Duration::from_secs(5), &[("1", "Foo")]))
            .on("b", Behaviour::items(&[("9", "Foo 2")]));
        let outcome = aggregator(client)
            .search(&SearchRequest::new("Foo", abc()[..2].to_vec()))
            .await
            .expect("search");
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].source, "a");
    }

    #[test]
    fn available_sources_respects_policy() {
        let sources = vec![
            Source::new("a", "Alpha", "https://a.example"),
            Source::new("b", "Beta", "https://b.example").adult(),
            Source::new("c", "Gamma", "https://c.example").disabled(),
        ];
        let keys = |v: Vec<Source>| v.into_iter().map(|s| s.key).collect::<Vec<_>>();
        assert_eq!(keys(available_sources(&sources, true)), vec!["a"]);
        assert_eq!(keys(available_sources(&sources, false)), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn search_one_keeps_exact_titles() {
        let client = ScriptedClient::new().on(
            "a",
            Behaviour::items(&[("1", "Foo"), ("2", "Foo S1"), ("3", "Foo")]),
        );
        let items = aggregator(client)
            .search_one("a", &SearchRequest::new("Foo", abc()))
            .await
            .expect("found");
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn search_one_unknown_or_hidden_source_not_found() {
        let sources = vec![Source::new("x", "Adult", "https://x.example").adult()];
        let agg = aggregator(ScriptedClient::new().on("x", Behaviour::items(&[("1", "Foo")])));

        let err = agg
            .search_one("zz", &SearchRequest::new("Foo", sources.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NotFound(_)));

        let err = agg
            .search_one("x", &SearchRequest::new("Foo", sources.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NotFound(_)));

        let found = agg
            .search_one("x", &SearchRequest::new("Foo", sources).with_policy(false))
            .await
            .expect("visible without policy");
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn search_one_surfaces_upstream_failure() {
        let agg = aggregator(ScriptedClient::new().on("a", Behaviour::Fail));
        let err = agg
            .search_one("a", &SearchRequest::new("Foo", abc()))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Http(_)));
    }

    #[tokio::test]
    async fn search_one_without_exact_match_not_found() {
        let agg = aggregator(ScriptedClient::new().on("a", Behaviour::items(&[("1", "Foo S1")])));
        let err = agg
            .search_one("a", &SearchRequest::new("Foo", abc()))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NotFound(_)));
    }
}
