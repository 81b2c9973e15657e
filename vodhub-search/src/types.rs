//! Core types: upstream sources and the candidate items they produce.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One external content-index provider.
///
/// Sources are owned by configuration and read-only for the duration of a
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Unique, stable identity of the source.
    pub key: String,
    /// Human-readable display name.
    pub name: String,
    /// Base URL of the source's query endpoint.
    pub api: String,
    /// Whether the whole site is classified as adult content.
    #[serde(default)]
    pub is_adult: bool,
    /// Disabled sources are never queried.
    #[serde(default)]
    pub disabled: bool,
}

impl Source {
    /// Create an enabled, non-adult source.
    pub fn new(key: impl Into<String>, name: impl Into<String>, api: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            api: api.into(),
            is_adult: false,
            disabled: false,
        }
    }

    /// Mark this source as adult-classified.
    pub fn adult(mut self) -> Self {
        self.is_adult = true;
        self
    }

    /// Mark this source as disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.key)
    }
}

/// A single search hit produced by one source call.
///
/// Identity is the `(source, id)` pair; see [`CandidateItem::dedup_key`].
/// Items are never mutated after a source client produces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Source-local identifier.
    pub id: String,
    /// Title, trimmed with whitespace runs collapsed.
    pub title: String,
    /// Poster image URL.
    #[serde(default)]
    pub poster: String,
    /// Playable episode URLs.
    #[serde(default)]
    pub episodes: Vec<String>,
    /// Episode labels, parallel to `episodes`.
    #[serde(default)]
    pub episodes_titles: Vec<String>,
    /// Key of the [`Source`] that produced this item.
    pub source: String,
    /// Display name of the producing source.
    pub source_name: String,
    /// Free-form class/genre string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Four-digit release year or `"unknown"`.
    pub year: String,
    /// Plain-text description.
    #[serde(default)]
    pub desc: String,
    /// Category label reported by the source.
    #[serde(default)]
    pub type_name: String,
    /// Status remarks such as "updated to ep 12".
    #[serde(default)]
    pub remarks: String,
    /// Douban identifier, when the source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub douban_id: Option<u64>,
}

impl CandidateItem {
    /// Minimal item carrying identity and title; metadata left empty.
    pub fn new(
        source: &Source,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            poster: String::new(),
            episodes: Vec::new(),
            episodes_titles: Vec::new(),
            source: source.key.clone(),
            source_name: source.name.clone(),
            class: None,
            year: "unknown".to_owned(),
            desc: String::new(),
            type_name: String::new(),
            remarks: String::new(),
            douban_id: None,
        }
    }

    /// Set the category label.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// The dedup identity of this item.
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.source, &self.id)
    }
}
