//! Lexical relevance scoring and stable ranking.
//!
//! Scores are integer tiers so that equal relevance compares exactly equal
//! and the stable sort keeps merge order among ties:
//!
//! | match                          | score                |
//! |--------------------------------|----------------------|
//! | exact title                    | 1000                 |
//! | title starts or ends with query| 800                  |
//! | title contains query           | 600                  |
//! | some query tokens in title     | 100 + 300 × share    |
//! | unrelated                      | 0                    |
//!
//! Comparison ignores case and whitespace.

use std::collections::HashSet;

use crate::types::CandidateItem;

/// Exact title match.
pub const EXACT: u32 = 1000;
/// Title starts or ends with the query.
pub const PREFIX_OR_SUFFIX: u32 = 800;
/// Title contains the query.
pub const SUBSTRING: u32 = 600;
/// Floor of the token-overlap tier.
const TOKEN_BASE: u32 = 100;
/// Span of the token-overlap tier; `TOKEN_BASE + TOKEN_SPAN < SUBSTRING`.
const TOKEN_SPAN: u32 = 300;

/// Characters that separate query tokens.
pub(crate) const TOKEN_DELIMITERS: &[char] = &[' ', '-', ':', '：', '·', '、'];

/// Lower-case and drop all whitespace.
fn fold(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Relevance of `title` to `query`.
pub fn score_title(title: &str, query: &str) -> u32 {
    let q = fold(query);
    if q.is_empty() {
        return 0;
    }
    let t = fold(title);

    if t == q {
        return EXACT;
    }
    if t.starts_with(&q) || t.ends_with(&q) {
        return PREFIX_OR_SUFFIX;
    }
    if t.contains(&q) {
        return SUBSTRING;
    }

    let lowered = query.to_lowercase();
    let mut seen = HashSet::new();
    let tokens: Vec<&str> = lowered
        .split(TOKEN_DELIMITERS)
        .map(str::trim)
        .filter(|tok| !tok.is_empty() && seen.insert(*tok))
        .collect();
    if tokens.is_empty() {
        return 0;
    }

    let matched = tokens.iter().filter(|tok| t.contains(&fold(tok))).count() as u32;
    if matched == 0 {
        return 0;
    }
    TOKEN_BASE + TOKEN_SPAN * matched / tokens.len() as u32
}

/// Order `items` by descending relevance to `query`.
///
/// The sort is stable: items with equal scores keep their input order.
pub fn rank(items: Vec<CandidateItem>, query: &str) -> Vec<CandidateItem> {
    let mut scored: Vec<(u32, CandidateItem)> = items
        .into_iter()
        .map(|item| (score_title(&item.title, query), item))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, item)| item).collect()
}
