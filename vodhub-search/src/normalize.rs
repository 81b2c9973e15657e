//! Query locale normalization and query-variant construction.
//!
//! Normalization is a black-box text transform (typically folding
//! traditional Chinese to simplified). A failing normalizer never blocks a
//! search: the original text is used instead.

use std::collections::HashMap;

use crate::error::SearchError;

/// A locale normalization transform.
pub trait QueryNormalizer: Send + Sync {
    /// Return the normalized form of `text`.
    ///
    /// # Errors
    ///
    /// Any error is non-fatal; callers fall back to `text`.
    fn normalize(&self, text: &str) -> Result<String, SearchError>;
}

/// Leaves text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer;

impl QueryNormalizer for IdentityNormalizer {
    fn normalize(&self, text: &str) -> Result<String, SearchError> {
        Ok(text.to_owned())
    }
}

/// Per-character folding table, e.g. traditional → simplified.
#[derive(Debug, Clone, Default)]
pub struct CharFoldNormalizer {
    table: HashMap<char, char>,
}

impl CharFoldNormalizer {
    /// Build from `(from, to)` string pairs. Each side must be exactly one
    /// character.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an entry that is not a single
    /// character on either side.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, SearchError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = HashMap::new();
        for (from, to) in pairs {
            let (Some(f), Some(t)) = (single_char(from), single_char(to)) else {
                return Err(SearchError::Config(format!(
                    "fold entry `{from}` -> `{to}` must map one character to one character"
                )));
            };
            table.insert(f, t);
        }
        Ok(Self { table })
    }

    /// Number of folding entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

impl QueryNormalizer for CharFoldNormalizer {
    fn normalize(&self, text: &str) -> Result<String, SearchError> {
        Ok(text
            .chars()
            .map(|c| self.table.get(&c).copied().unwrap_or(c))
            .collect())
    }
}

/// The original query, its normalized form, and the distinct variants to
/// dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryVariants {
    /// Query exactly as the caller sent it.
    pub original: String,
    /// Normalized query, or `original` when normalization failed.
    pub normalized: String,
}

impl QueryVariants {
    /// Normalize `query`, falling back to the original on failure.
    pub fn build(query: &str, normalizer: &dyn QueryNormalizer) -> Self {
        let normalized = match normalizer.normalize(query) {
            Ok(normalized) => normalized,
            Err(err) => {
                tracing::warn!(error = %err, "query normalization failed, using original text");
                query.to_owned()
            }
        };
        Self {
            original: query.to_owned(),
            normalized,
        }
    }

    /// Distinct variants in dispatch order: normalized first, then the
    /// original when it differs.
    pub fn variants(&self) -> Vec<String> {
        let mut variants = vec![self.normalized.clone()];
        if self.original != self.normalized {
            variants.push(self.original.clone());
        }
        variants
    }
}
