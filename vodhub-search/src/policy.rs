//! Content policy filtering.
//!
//! The orchestrator depends only on the [`ContentFilter`] predicate shape.
//! [`KeywordPolicy`] is the stock implementation: adult-flagged sources and
//! two injected term lists, any one of which is sufficient to reject.

use std::collections::HashSet;

use crate::types::{CandidateItem, Source};

/// Acceptance predicate applied to every merged item.
pub trait ContentFilter: Send + Sync {
    /// Whether `item` may be delivered.
    ///
    /// With `policy_active == false` every item must be accepted.
    fn accept(&self, item: &CandidateItem, policy_active: bool, sources: &[Source]) -> bool;
}

/// Keyword-list content policy.
///
/// Terms are stored lower-cased and matched as case-insensitive substrings:
///
/// - *category terms* are matched against `type_name`
/// - *blocked terms* are matched against `title` and `type_name`
#[derive(Debug, Clone, Default)]
pub struct KeywordPolicy {
    category_terms: Vec<String>,
    blocked_terms: Vec<String>,
}

impl KeywordPolicy {
    /// Build a policy from the two term lists. Empty and duplicate terms
    /// are dropped; first-seen order is kept.
    pub fn new<C, B>(category_terms: C, blocked_terms: B) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        Self {
            category_terms: normalize_terms(category_terms),
            blocked_terms: normalize_terms(blocked_terms),
        }
    }

    /// Lower-cased category terms.
    pub fn category_terms(&self) -> &[String] {
        &self.category_terms
    }

    /// Lower-cased blocked terms.
    pub fn blocked_terms(&self) -> &[String] {
        &self.blocked_terms
    }

    fn source_is_adult(item: &CandidateItem, sources: &[Source]) -> bool {
        sources
            .iter()
            .find(|s| s.key == item.source)
            .is_some_and(|s| s.is_adult)
    }
}

fn normalize_terms<I>(terms: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

impl ContentFilter for KeywordPolicy {
    fn accept(&self, item: &CandidateItem, policy_active: bool, sources: &[Source]) -> bool {
        if !policy_active {
            return true;
        }
        if Self::source_is_adult(item, sources) {
            return false;
        }

        let type_name = item.type_name.to_lowercase();
        if self.category_terms.iter().any(|t| type_name.contains(t.as_str())) {
            return false;
        }

        let title = item.title.to_lowercase();
        !self
            .blocked_terms
            .iter()
            .any(|t| title.contains(t.as_str()) || type_name.contains(t.as_str()))
    }
}

/// Keep only the items `filter` accepts, preserving order.
pub fn filter_items(
    filter: &dyn ContentFilter,
    items: Vec<CandidateItem>,
    policy_active: bool,
    sources: &[Source],
) -> Vec<CandidateItem> {
    if !policy_active {
        return items;
    }
    let before = items.len();
    let kept: Vec<CandidateItem> = items
        .into_iter()
        .filter(|item| filter.accept(item, true, sources))
        .collect();
    tracing::debug!(before, after = kept.len(), "content policy applied");
    kept
}

/// Resolve whether the content policy is active for a request.
///
/// Precedence: `adult=1|true` disables, `adult=0|false` enables, then
/// `filter=off|disable` disables and `filter=on|enable` enables. Anything
/// else falls back to `default_active`.
pub fn resolve_policy(adult: Option<&str>, filter: Option<&str>, default_active: bool) -> bool {
    match adult {
        Some("1" | "true") => return false,
        Some("0" | "false") => return true,
        _ => {}
    }
    match filter {
        Some("off" | "disable") => false,
        Some("on" | "enable") => true,
        _ => default_active,
    }
}
