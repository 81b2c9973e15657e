//! Streaming delivery: one event per settled source, then one terminal
//! `complete` event.
//!
//! Each enabled source runs as its own task (all of its variants
//! concurrently). A single driver task owns the output channel, the
//! completion counter and the running result total, so no state is shared
//! between writers. The channel is bounded at `sources + 2`, exactly the
//! number of events a stream can carry, and written with `try_send`: the
//! driver never blocks on a slow consumer. A closed channel is the
//! cancellation signal. Once the consumer is gone the driver detaches the
//! remaining source tasks (they run to completion and their results are
//! dropped) and stops.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::{self, JoinSet};

use crate::aggregator::{Aggregator, SearchRequest};
use crate::client::SourceClient;
use crate::error::SearchError;
use crate::normalize::QueryVariants;
use crate::policy::ContentFilter;
use crate::types::{CandidateItem, Source};

use super::fanout::{query_source, SourceOutcome};
use super::refine;
use super::search::enabled_sources;

/// One frame of a streamed search.
///
/// Serialized with a `type` tag (`start`, `source_result`, `source_error`,
/// `complete`) and camelCase fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SearchEvent {
    /// Sent once, before any source settles.
    Start {
        query: String,
        normalized_query: String,
        total_sources: usize,
        timestamp: u64,
    },
    /// A source settled with at least one successful call.
    SourceResult {
        source: String,
        source_name: String,
        results: Vec<CandidateItem>,
        timestamp: u64,
    },
    /// Every call to a source failed.
    SourceError {
        source: String,
        source_name: String,
        error: String,
        timestamp: u64,
    },
    /// Sent once, after every source has settled. Always the last event.
    Complete {
        total_results: usize,
        completed_sources: usize,
        timestamp: u64,
    },
}

impl SearchEvent {
    /// Whether this is the terminal event.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// How a source task ended.
type Settled = std::thread::Result<SourceOutcome>;

/// Non-blocking emission. Returns `false` once the consumer has gone.
fn emit(tx: &mpsc::Sender<SearchEvent>, event: SearchEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Closed(_)) => false,
        Err(mpsc::error::TrySendError::Full(_)) => {
            // Capacity covers every event; a full channel is a counting bug.
            tracing::error!("search event channel full, dropping stream");
            false
        }
    }
}

impl<C: SourceClient + 'static> Aggregator<C> {
    /// Start a streamed search and return the event receiver.
    ///
    /// The first event is always [`SearchEvent::Start`] and the last is
    /// always [`SearchEvent::Complete`]. In between, each enabled source
    /// contributes exactly one `SourceResult` or `SourceError`, in
    /// settlement order. A source's event carries its items merged across
    /// query variants, filtered and ranked; cross-source dedup is left to
    /// the consumer since identity includes the source key.
    ///
    /// Dropping the receiver cancels delivery. Calls already in flight are
    /// not aborted.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidRequest`] for a blank query
    /// - [`SearchError::NoSources`] when no enabled source exists
    /// - [`SearchError::Config`] for invalid configuration or duplicate
    ///   source keys
    pub fn search_stream(
        &self,
        request: SearchRequest,
    ) -> Result<mpsc::Receiver<SearchEvent>, SearchError> {
        self.config.validate()?;
        let query = request.query.trim().to_owned();
        if query.is_empty() {
            return Err(SearchError::InvalidRequest("query must not be empty".into()));
        }
        let enabled = enabled_sources(&request.sources)?;

        let variants = QueryVariants::build(&query, self.normalizer.as_ref());
        let dispatch = Arc::new(variants.variants());
        let total_sources = enabled.len();
        tracing::debug!(
            query = %variants.original,
            normalized = %variants.normalized,
            sources = total_sources,
            "stream search dispatched"
        );

        let mut tasks: JoinSet<Settled> = JoinSet::new();
        let mut pending = HashMap::with_capacity(total_sources);
        for source in enabled {
            let client = Arc::clone(&self.client);
            let dispatch = Arc::clone(&dispatch);
            let timeout = self.config.per_call_timeout;
            let task_source = source.clone();
            let handle = tasks.spawn(async move {
                AssertUnwindSafe(query_source(
                    client.as_ref(),
                    &task_source,
                    &dispatch,
                    timeout,
                ))
                .catch_unwind()
                .await
            });
            pending.insert(handle.id(), source);
        }

        let (tx, rx) = mpsc::channel(total_sources + 2);
        let driver = StreamDriver {
            filter: Arc::clone(&self.filter),
            request,
            variants,
        };
        tokio::spawn(driver.run(tasks, pending, tx));

        Ok(rx)
    }
}

/// Single writer of a stream's events. Owns the completion counters.
struct StreamDriver {
    filter: Arc<dyn ContentFilter>,
    request: SearchRequest,
    variants: QueryVariants,
}

impl StreamDriver {
    async fn run(
        self,
        mut tasks: JoinSet<Settled>,
        mut pending: HashMap<task::Id, Source>,
        tx: mpsc::Sender<SearchEvent>,
    ) {
        let start = SearchEvent::Start {
            query: self.variants.original.clone(),
            normalized_query: self.variants.normalized.clone(),
            total_sources: pending.len(),
            timestamp: unix_millis(),
        };
        if !emit(&tx, start) {
            tasks.detach_all();
            return;
        }

        let mut completed_sources = 0usize;
        let mut total_results = 0usize;

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, settled) = match joined {
                Ok((id, settled)) => (id, Some(settled)),
                Err(err) => {
                    tracing::error!(error = %err, "source task did not finish");
                    (err.id(), None)
                }
            };
            let Some(source) = pending.remove(&id) else {
                tracing::error!(task = %id, "settled task has no source");
                continue;
            };
            completed_sources += 1;

            let event = match settled {
                Some(Ok(outcome)) if outcome.all_failed() => {
                    source_error(&source, outcome.error_summary())
                }
                Some(Ok(outcome)) => {
                    let results = refine(
                        self.filter.as_ref(),
                        outcome.into_item_lists(),
                        self.request.policy_active,
                        &self.request.sources,
                        &self.variants.normalized,
                    );
                    total_results += results.len();
                    SearchEvent::SourceResult {
                        source: source.key.clone(),
                        source_name: source.name.clone(),
                        results,
                        timestamp: unix_millis(),
                    }
                }
                Some(Err(_)) => {
                    tracing::error!(source = %source.key, "source task panicked");
                    let err = SearchError::Pipeline(format!("{} panicked", source.name));
                    source_error(&source, err.to_string())
                }
                None => {
                    let err = SearchError::Pipeline(format!("{} task cancelled", source.name));
                    source_error(&source, err.to_string())
                }
            };

            if !emit(&tx, event) {
                tracing::debug!(
                    pending = tasks.len(),
                    "stream consumer disconnected, detaching source tasks"
                );
                tasks.detach_all();
                return;
            }
        }

        tracing::info!(completed_sources, total_results, "stream search complete");
        emit(
            &tx,
            SearchEvent::Complete {
                total_results,
                completed_sources,
                timestamp: unix_millis(),
            },
        );
    }
}

fn source_error(source: &Source, error: String) -> SearchEvent {
    SearchEvent::SourceError {
        source: source.key.clone(),
        source_name: source.name.clone(),
        error,
        timestamp: unix_millis(),
    }
}
