//! Search orchestrator: concurrent fan-out, dedup, content policy, ranking.
//!
//! This module fans out queries to every enabled source concurrently,
//! merges results by `(source, id)`, applies the content policy, ranks by
//! lexical relevance, and delivers either one batch or a stream of
//! per-source events.

pub mod dedup;
pub mod fanout;
pub mod scoring;
pub mod search;
pub mod stream;
pub mod suggest;

use crate::policy::{filter_items, ContentFilter};
use crate::types::{CandidateItem, Source};

/// Merge → filter → rank, shared by every delivery mode.
pub(crate) fn refine<I>(
    filter: &dyn ContentFilter,
    per_call_results: I,
    policy_active: bool,
    sources: &[Source],
    query: &str,
) -> Vec<CandidateItem>
where
    I: IntoIterator<Item = Vec<CandidateItem>>,
{
    let merged = dedup::merge(per_call_results);
    let accepted = filter_items(filter, merged, policy_active, sources);
    scoring::rank(accepted, query)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::KeywordPolicy;

    #[test]
    fn refine_pipeline_dedups_filters_and_ranks() {
        let alpha = Source::new("a", "Alpha", "https://a.example");
        let adult = Source::new("x", "Adult", "https://x.example").adult();
        let sources = vec![alpha.clone(), adult.clone()];
        let policy = KeywordPolicy::new(["ethics"], ["casino"]);

        let results = refine(
            &policy,
            vec![
                vec![
                    CandidateItem::new(&alpha, "1", "Bar"),
                    CandidateItem::new(&alpha, "2", "Foo S1"),
                ],
                vec![
                    CandidateItem::new(&alpha, "2", "Foo S1 (dup)"),
                    CandidateItem::new(&adult, "7", "Foo"),
                    CandidateItem::new(&alpha, "3", "Foo Casino"),
                ],
            ],
            true,
            &sources,
            "Foo",
        );

        let titles: Vec<_> = results.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Foo S1", "Bar"]);
    }
}
