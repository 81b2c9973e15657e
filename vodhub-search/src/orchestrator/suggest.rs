//! Query suggestions mined from one source's live result titles.

use serde::{Deserialize, Serialize};

use crate::aggregator::Aggregator;
use crate::client::SourceClient;
use crate::normalize::QueryVariants;
use crate::policy::filter_items;
use crate::types::Source;

use super::fanout::call_with_deadline;
use super::scoring::TOKEN_DELIMITERS;
use super::search::available_sources;

/// Confidence class of a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Suggestion,
    Related,
    Exact,
}

impl SuggestionKind {
    fn from_score(score: f64) -> Self {
        if score >= 2.0 {
            Self::Exact
        } else if score >= 1.5 {
            Self::Related
        } else {
            Self::Suggestion
        }
    }
}

/// A single completion candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub score: f64,
}

fn score_fragment(fragment: &str, query: &str) -> f64 {
    let f = fragment.to_lowercase();
    let q = query.to_lowercase();
    if f == q {
        2.0
    } else if f.starts_with(&q) || f.ends_with(&q) {
        1.8
    } else if q
        .split(TOKEN_DELIMITERS)
        .filter(|tok| !tok.is_empty())
        .any(|tok| f.contains(tok))
    {
        1.5
    } else {
        1.0
    }
}

/// Distinct title fragments (longer than one character) that contain
/// `query`, in first-seen order, capped at `limit`.
pub(crate) fn fragments<'a, I>(titles: I, query: &str, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let q = query.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for fragment in titles.into_iter().flat_map(|t| t.split(TOKEN_DELIMITERS)) {
        if out.len() == limit {
            break;
        }
        if fragment.chars().count() > 1
            && fragment.to_lowercase().contains(&q)
            && !out.iter().any(|seen| seen == fragment)
        {
            out.push(fragment.to_owned());
        }
    }
    out
}

/// Score, classify and order fragments: score descending, then kind.
pub(crate) fn rank_suggestions(fragments: Vec<String>, query: &str) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = fragments
        .into_iter()
        .map(|text| {
            let score = score_fragment(&text, query);
            Suggestion {
                text,
                kind: SuggestionKind::from_score(score),
                score,
            }
        })
        .collect();
    suggestions.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.kind.cmp(&a.kind))
    });
    suggestions
}

impl<C: SourceClient> Aggregator<C> {
    /// Suggest completions for `query` from the first available source.
    ///
    /// Never fails: a blank query, no available source, or an upstream
    /// failure all yield an empty list.
    pub async fn suggest(
        &self,
        query: &str,
        sources: &[Source],
        policy_active: bool,
    ) -> Vec<Suggestion> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let normalized = QueryVariants::build(query, self.normalizer.as_ref()).normalized;

        let pool = available_sources(sources, policy_active);
        let Some(first) = pool.first() else {
            tracing::debug!("no available source for suggestions");
            return Vec::new();
        };

        let items = match call_with_deadline(
            self.client.as_ref(),
            first,
            &normalized,
            self.config.per_call_timeout,
        )
        .await
        {
            Ok(items) => items,
            Err(_) => return Vec::new(),
        };
        let accepted = filter_items(
            self.filter.as_ref(),
            items,
            policy_active,
            std::slice::from_ref(first),
        );

        let found = fragments(
            accepted.iter().map(|i| i.title.as_str()),
            &normalized,
            self.config.max_suggestions,
        );
        rank_suggestions(found, &normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::normalize::CharFoldNormalizer;
    use crate::orchestrator::test_support::{Behaviour, ScriptedClient};
    use crate::policy::KeywordPolicy;

    fn alpha() -> Source {
        Source::new("a", "Alpha", "https://a.example")
    }

    #[test]
    fn fragments_split_filter_and_dedup() {
        let found = fragments(
            ["Foo Bar", "Foo: Origins", "FooBar·Foo", "f"],
            "foo",
            8,
        );
        assert_eq!(found, vec!["Foo", "FooBar"]);
    }

    #[test]
    fn fragments_capped() {
        let titles: Vec<String> = (0..20).map(|i| format!("Foo{i}")).collect();
        let found = fragments(titles.iter().map(String::as_str), "foo", 8);
        assert_eq!(found.len(), 8);
        assert_eq!(found[0], "Foo0");
    }

    #[test]
    fn single_character_fragments_dropped() {
        assert!(fragments(["剧 场"], "剧", 8).is_empty());
        assert_eq!(fragments(["剧场 版"], "剧", 8), vec!["剧场"]);
    }

    #[test]
    fn scores_and_kinds() {
        let ranked = rank_suggestions(
            vec!["The Foo Show".into(), "foo".into(), "FooBar".into()],
            "Foo",
        );
        let view: Vec<_> = ranked.iter().map(|s| (s.text.as_str(), s.kind)).collect();
        assert_eq!(
            view,
            vec![
                ("foo", SuggestionKind::Exact),
                ("FooBar", SuggestionKind::Related),
                ("The Foo Show", SuggestionKind::Related),
            ]
        );
        assert_eq!(ranked[1].score, 1.8);
        assert_eq!(ranked[2].score, 1.5);
    }

    #[test]
    fn unrelated_fragment_is_plain_suggestion() {
        assert_eq!(score_fragment("Bar", "Foo"), 1.0);
        assert_eq!(SuggestionKind::from_score(1.0), SuggestionKind::Suggestion);
    }

    #[test]
    fn suggestion_serializes_kind_as_type() {
        let s = Suggestion {
            text: "Foo".into(),
            kind: SuggestionKind::Exact,
            score: 2.0,
        };
        let json = serde_json::to_value(&s).expect("serialize");
        assert_eq!(json["type"], "exact");
        assert_eq!(json["text"], "Foo");
    }

    #[tokio::test]
    async fn suggest_uses_first_available_source() {
        let client = ScriptedClient::new()
            .on("x", Behaviour::items(&[("1", "Foo Adult")]))
            .on("a", Behaviour::items(&[("1", "Foo S1"), ("2", "Foo Casino")]));
        let sources = vec![Source::new("x", "Adult", "https://x.example").adult(), alpha()];
        let agg = Aggregator::with_client(client, SearchConfig::default())
            .content_filter(KeywordPolicy::new(Vec::<String>::new(), ["casino"]));

        let suggestions = agg.suggest("Foo", &sources, true).await;

        assert_eq!(agg.client.calls_for("x"), 0);
        let texts: Vec<_> = suggestions.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Foo"]);
        assert_eq!(suggestions[0].kind, SuggestionKind::Exact);
    }

    #[tokio::test]
    async fn suggest_queries_with_normalized_text() {
        let client = ScriptedClient::new().on("a", Behaviour::Echo);
        let agg = Aggregator::with_client(client, SearchConfig::default())
            .normalizer(CharFoldNormalizer::from_pairs([("劇", "剧")]).expect("table"));

        let suggestions = agg.suggest("劇場", &[alpha()], true).await;

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].text, "剧場");
    }

    #[tokio::test]
    async fn suggest_degrades_to_empty() {
        let agg = Aggregator::with_client(
            ScriptedClient::new().on("a", Behaviour::Fail),
            SearchConfig::default(),
        );
        assert!(agg.suggest("Foo", &[alpha()], true).await.is_empty());
        assert!(agg.suggest("  ", &[alpha()], true).await.is_empty());
        assert!(agg.suggest("Foo", &[], true).await.is_empty());
    }
}
