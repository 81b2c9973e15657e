//! Result deduplication by `(source, id)` identity.
//!
//! Titles play no part in identity: the same title from two sources is two
//! items, while a repeated id from one source (for example once per query
//! variant) is a single item. The first-seen copy wins and order is
//! otherwise preserved.

use std::collections::HashSet;

use crate::types::CandidateItem;

/// Merge per-call result lists into one list of unique items.
///
/// Single pass with an O(n) membership set; no reordering beyond dropping
/// later duplicates. Running `merge` on its own output is a no-op.
pub fn merge<I>(per_call_results: I) -> Vec<CandidateItem>
where
    I: IntoIterator<Item = Vec<CandidateItem>>,
{
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut merged = Vec::new();

    for item in per_call_results.into_iter().flatten() {
        if seen.insert((item.source.clone(), item.id.clone())) {
            merged.push(item);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;

    fn item(source: &str, id: &str, title: &str) -> CandidateItem {
        CandidateItem::new(&Source::new(source, source, "https://x.example"), id, title)
    }

    #[test]
    fn unique_items_pass_through() {
        let merged = merge(vec![vec![item("a", "1", "Foo"), item("a", "2", "Bar")]]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn same_source_same_id_merged_first_wins() {
        let merged = merge(vec![
            vec![item("a", "1", "Foo (first)")],
            vec![item("a", "1", "Foo (second)")],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "Foo (first)");
    }

    #[test]
    fn same_id_different_sources_kept() {
        let merged = merge(vec![vec![item("a", "1", "Foo")], vec![item("c", "1", "Foo")]]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source, "a");
        assert_eq!(merged[1].source, "c");
    }

    #[test]
    fn same_title_different_ids_kept() {
        let merged = merge(vec![vec![item("a", "1", "Foo"), item("a", "2", "Foo")]]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn first_seen_order_preserved() {
        let merged = merge(vec![
            vec![item("b", "9", "Nine"), item("a", "1", "One")],
            vec![item("a", "1", "One again"), item("c", "3", "Three")],
        ]);
        let keys: Vec<_> = merged.iter().map(|i| (i.source.as_str(), i.id.as_str())).collect();
        assert_eq!(keys, vec![("b", "9"), ("a", "1"), ("c", "3")]);
    }

    #[test]
    fn merge_is_idempotent() {
        let once = merge(vec![
            vec![item("a", "1", "Foo"), item("a", "1", "Foo dup")],
            vec![item("b", "1", "Foo"), item("a", "2", "Bar")],
        ]);
        let twice = merge(vec![once.clone()]);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(merge(Vec::<Vec<CandidateItem>>::new()).is_empty());
        assert!(merge(vec![vec![], vec![]]).is_empty());
    }
}
