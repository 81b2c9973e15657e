//! Concurrent fan-out of (source × query variant) calls.
//!
//! Every call races its own deadline. A call that fails or times out is
//! recorded as a failed [`CallOutcome`]; it never aborts or delays its
//! siblings, and nothing is raised to the caller.

use std::time::Duration;

use tokio::time::Instant;

use crate::client::SourceClient;
use crate::error::SearchError;
use crate::types::{CandidateItem, Source};

/// Terminal state of one (source, variant) call.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    /// Key of the queried source.
    pub source: String,
    /// Query variant sent to the source.
    pub variant: String,
    /// Items on success; the failure cause otherwise.
    pub result: Result<Vec<CandidateItem>, SearchError>,
}

/// All calls made against a single source, one per variant.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    /// The queried source.
    pub source: Source,
    /// One outcome per distinct variant.
    pub calls: Vec<CallOutcome>,
}

impl SourceOutcome {
    /// Whether every call to this source failed.
    pub fn all_failed(&self) -> bool {
        !self.calls.is_empty() && self.calls.iter().all(|c| c.result.is_err())
    }

    /// Human-readable summary of the failures, `"; "`-separated.
    pub fn error_summary(&self) -> String {
        self.calls
            .iter()
            .filter_map(|c| c.result.as_ref().err())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Successful result lists, in variant order.
    pub fn into_item_lists(self) -> impl Iterator<Item = Vec<CandidateItem>> {
        self.calls.into_iter().filter_map(|c| c.result.ok())
    }
}

/// Aggregate call statistics, the only failure information a caller sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutStats {
    /// Calls dispatched.
    pub dispatched: usize,
    /// Calls that returned items (possibly none).
    pub succeeded: usize,
    /// Calls that failed for a reason other than their deadline.
    pub failed: usize,
    /// Calls that hit their deadline.
    pub timed_out: usize,
}

impl FanOutStats {
    /// Tally a set of call outcomes.
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a CallOutcome>,
    {
        let mut stats = Self::default();
        for outcome in outcomes {
            stats.dispatched += 1;
            match &outcome.result {
                Ok(_) => stats.succeeded += 1,
                Err(SearchError::Timeout(_)) => stats.timed_out += 1,
                Err(_) => stats.failed += 1,
            }
        }
        stats
    }
}

/// Run one call against its deadline.
///
/// Deadline expiry drops the in-flight future and yields
/// [`SearchError::Timeout`].
pub(crate) async fn call_with_deadline<C: SourceClient>(
    client: &C,
    source: &Source,
    variant: &str,
    timeout: Duration,
) -> Result<Vec<CandidateItem>, SearchError> {
    let deadline = Instant::now() + timeout;
    let call = client.query(source, variant, deadline);
    let result = match tokio::time::timeout_at(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(SearchError::Timeout(format!("{} timeout", source.name))),
    };

    match &result {
        Ok(items) => {
            tracing::debug!(
                source = %source.key,
                variant,
                count = items.len(),
                "source call succeeded"
            );
        }
        Err(err) => {
            // Query text stays out of warn-level output.
            tracing::warn!(source = %source.key, error = %err, "source call failed");
            tracing::debug!(source = %source.key, variant, "failed call variant");
        }
    }
    result
}

/// Query one source with every variant concurrently.
pub(crate) async fn query_source<C: SourceClient>(
    client: &C,
    source: &Source,
    variants: &[String],
    timeout: Duration,
) -> SourceOutcome {
    let calls = variants.iter().map(|variant| async move {
        let result = call_with_deadline(client, source, variant, timeout).await;
        CallOutcome {
            source: source.key.clone(),
            variant: variant.clone(),
            result,
        }
    });

    SourceOutcome {
        source: source.clone(),
        calls: futures::future::join_all(calls).await,
    }
}

/// Dispatch one call per enabled source × distinct variant and wait for
/// all of them to settle.
///
/// Disabled sources are skipped. Variants are deduplicated by exact string
/// equality, keeping first-seen order. Total latency is bounded by the
/// slowest single call, i.e. by `per_call_timeout`.
pub async fn fan_out<C: SourceClient>(
    client: &C,
    sources: &[Source],
    variants: &[String],
    per_call_timeout: Duration,
) -> Vec<SourceOutcome> {
    let variants = distinct_variants(variants);
    let per_source = sources
        .iter()
        .filter(|source| !source.disabled)
        .map(|source| query_source(client, source, &variants, per_call_timeout));

    futures::future::join_all(per_source).await
}

/// Deduplicate variants by exact equality, keeping first-seen order.
pub(crate) fn distinct_variants(variants: &[String]) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::with_capacity(variants.len());
    for variant in variants {
        if !distinct.contains(variant) {
            distinct.push(variant.clone());
        }
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{Behaviour, ScriptedClient};

    fn sources() -> Vec<Source> {
        vec![
            Source::new("a", "Alpha", "https://a.example"),
            Source::new("b", "Beta", "https://b.example"),
            Source::new("c", "Gamma", "https://c.example"),
        ]
    }

    fn variants(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_owned()).collect()
    }

    #[tokio::test]
    async fn dispatches_sources_times_variants() {
        let client = ScriptedClient::new()
            .on("a", Behaviour::items(&[("1", "Foo")]))
            .on("b", Behaviour::items(&[("1", "Foo")]))
            .on("c", Behaviour::items(&[]));

        let outcomes = fan_out(
            &client,
            &sources(),
            &variants(&["Foo", "foo"]),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        let stats = FanOutStats::from_outcomes(outcomes.iter().flat_map(|o| &o.calls));
        assert_eq!(stats.dispatched, 6);
        assert_eq!(stats.succeeded, 6);
        assert_eq!(client.call_count(), 6);
    }

    #[tokio::test]
    async fn duplicate_variants_dispatched_once() {
        let client = ScriptedClient::new().on("a", Behaviour::items(&[("1", "Foo")]));
        let outcomes = fan_out(
            &client,
            &sources()[..1],
            &variants(&["Foo", "Foo"]),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcomes[0].calls.len(), 1);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn disabled_sources_not_dispatched() {
        let client = ScriptedClient::new()
            .on("a", Behaviour::items(&[("1", "Foo")]))
            .on("b", Behaviour::items(&[("1", "Foo")]));
        let mut list = sources();
        list[1] = list[1].clone().disabled();

        let outcomes =
            fan_out(&client, &list[..2], &variants(&["Foo"]), Duration::from_secs(1)).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].source.key, "a");
        assert_eq!(client.calls_for("b"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_call_times_out_without_blocking_others() {
        let client = ScriptedClient::new()
            .on("a", Behaviour::items(&[("1", "Foo S1"), ("2", "Bar")]))
            .on("b", Behaviour::Hang)
            .on("c", Behaviour::items(&[("1", "Foo S1")]));
        let timeout = Duration::from_secs(20);
        let started = Instant::now();

        let outcomes = fan_out(&client, &sources(), &variants(&["Foo"]), timeout).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= timeout && elapsed < timeout + Duration::from_secs(1));
        let stats = FanOutStats::from_outcomes(outcomes.iter().flat_map(|o| &o.calls));
        assert_eq!(
            stats,
            FanOutStats {
                dispatched: 3,
                succeeded: 2,
                failed: 0,
                timed_out: 1,
            }
        );
        let b = &outcomes[1];
        assert!(b.all_failed());
        assert!(b.error_summary().contains("Beta timeout"));
        assert_eq!(outcomes[0].calls[0].result.as_ref().map(Vec::len).ok(), Some(2));
    }

    #[tokio::test]
    async fn failures_are_isolated_and_counted() {
        let client = ScriptedClient::new()
            .on("a", Behaviour::Fail)
            .on("b", Behaviour::items(&[("1", "Foo")]))
            .on("c", Behaviour::Fail);

        let outcomes =
            fan_out(&client, &sources(), &variants(&["Foo"]), Duration::from_secs(1)).await;

        let stats = FanOutStats::from_outcomes(outcomes.iter().flat_map(|o| &o.calls));
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.succeeded, 1);
        let items: Vec<_> = outcomes.into_iter().flat_map(SourceOutcome::into_item_lists).collect();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn partial_failure_is_not_all_failed() {
        let outcome = SourceOutcome {
            source: Source::new("a", "Alpha", "https://a.example"),
            calls: vec![
                CallOutcome {
                    source: "a".into(),
                    variant: "Foo".into(),
                    result: Err(SearchError::Http("boom".into())),
                },
                CallOutcome {
                    source: "a".into(),
                    variant: "foo".into(),
                    result: Ok(vec![]),
                },
            ],
        };
        assert!(!outcome.all_failed());
        assert_eq!(outcome.error_summary(), "HTTP error: boom");
    }

    #[test]
    fn distinct_variants_keep_order() {
        assert_eq!(
            distinct_variants(&variants(&["b", "a", "b", "a"])),
            variants(&["b", "a"])
        );
    }
}
