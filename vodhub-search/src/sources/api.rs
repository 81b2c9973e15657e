//! JSON video-list API client.
//!
//! Issues `GET {api}?ac=videolist&wd={query}` and maps each `vod_*` record
//! of the `list` array into a [`CandidateItem`]. A body without a `list`
//! array is a malformed payload and fails the call; individual records
//! missing an id or a name are skipped.

use scraper::Html;
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

use crate::client::SourceClient;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{CandidateItem, Source};

/// Separates play groups (one per player/line) in `vod_play_url`.
const GROUP_SEPARATOR: &str = "$$$";

/// HTTP client for video-list JSON APIs.
#[derive(Debug, Clone)]
pub struct ApiSourceClient {
    http: reqwest::Client,
}

impl ApiSourceClient {
    /// Build a client with its own HTTP connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            http: http::build_client(config)?,
        })
    }

    /// Wrap an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl SourceClient for ApiSourceClient {
    async fn query(
        &self,
        source: &Source,
        text: &str,
        deadline: Instant,
    ) -> Result<Vec<CandidateItem>, SearchError> {
        let url = search_url(&source.api, text)?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(SearchError::Timeout(format!("{} timeout", source.name)));
        }

        tracing::trace!(source = %source.key, query = text, "source query");

        let response = self
            .http
            .get(url)
            .timeout(remaining)
            .send()
            .await
            .map_err(|e| request_error(source, e))?
            .error_for_status()
            .map_err(|e| SearchError::Http(format!("{} HTTP error: {e}", source.name)))?;

        let body = response
            .text()
            .await
            .map_err(|e| request_error(source, e))?;

        tracing::trace!(source = %source.key, bytes = body.len(), "source response received");

        parse_video_list(source, &body)
    }
}

fn request_error(source: &Source, err: reqwest::Error) -> SearchError {
    if err.is_timeout() {
        SearchError::Timeout(format!("{} timeout", source.name))
    } else {
        SearchError::Http(format!("{} request failed: {err}", source.name))
    }
}

/// Build the query URL for `api`, preserving any query string it already has.
pub(crate) fn search_url(api: &str, text: &str) -> Result<Url, SearchError> {
    Url::parse_with_params(api, &[("ac", "videolist"), ("wd", text)])
        .map_err(|e| SearchError::Http(format!("invalid source endpoint `{api}`: {e}")))
}

/// Parse a video-list response body into candidate items.
///
/// Extracted as a separate function for testability with canned payloads.
pub(crate) fn parse_video_list(
    source: &Source,
    body: &str,
) -> Result<Vec<CandidateItem>, SearchError> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("{} returned invalid JSON: {e}", source.name)))?;

    let records = payload
        .get("list")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SearchError::Parse(format!("{} response has no `list` array", source.name))
        })?;

    Ok(records
        .iter()
        .filter_map(|record| parse_record(source, record))
        .collect())
}

fn parse_record(source: &Source, record: &Value) -> Option<CandidateItem> {
    let id = field_string(record, "vod_id").filter(|id| !id.is_empty())?;
    let title = collapse_whitespace(&field_string(record, "vod_name")?);
    if title.is_empty() {
        return None;
    }

    let (episodes, episodes_titles) = field_string(record, "vod_play_url")
        .map(|raw| parse_episodes(&raw))
        .unwrap_or_default();

    Some(CandidateItem {
        id,
        title,
        poster: field_string(record, "vod_pic").unwrap_or_default(),
        episodes,
        episodes_titles,
        source: source.key.clone(),
        source_name: source.name.clone(),
        class: field_string(record, "vod_class").filter(|c| !c.is_empty()),
        year: field_string(record, "vod_year")
            .and_then(|y| extract_year(&y))
            .unwrap_or_else(|| "unknown".to_owned()),
        desc: field_string(record, "vod_content")
            .map(|html| strip_html(&html))
            .unwrap_or_default(),
        type_name: field_string(record, "type_name").unwrap_or_default(),
        remarks: field_string(record, "vod_remarks").unwrap_or_default(),
        douban_id: field_string(record, "vod_douban_id")
            .and_then(|d| d.parse::<u64>().ok())
            .filter(|d| *d != 0),
    })
}

/// Read a string or numeric field as a trimmed `String`.
fn field_string(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First run of exactly four ASCII digits, e.g. `"2023"` from `"2023-05"`.
fn extract_year(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end - start == 4 {
            return Some(raw[start..end].to_owned());
        }
        start = end;
    }
    None
}

fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    collapse_whitespace(&text)
}

/// Split `vod_play_url` into parallel (urls, titles) lists.
///
/// Groups are separated by `$$$`, episodes by `#`, and each episode is
/// `title$url` (the title may be absent). The group with the most `.m3u8`
/// URLs wins; ties keep the earliest group.
fn parse_episodes(raw: &str) -> (Vec<String>, Vec<String>) {
    let mut best: (Vec<String>, Vec<String>) = (Vec::new(), Vec::new());
    let mut best_m3u8 = 0;

    for (index, group) in raw.split(GROUP_SEPARATOR).enumerate() {
        let mut urls = Vec::new();
        let mut titles = Vec::new();
        for episode in group.split('#').map(str::trim).filter(|e| !e.is_empty()) {
            let (title, url) = match episode.split_once('$') {
                Some((title, url)) => (title.trim(), url.trim()),
                None => ("", episode),
            };
            if url.is_empty() {
                continue;
            }
            titles.push(if title.is_empty() {
                (urls.len() + 1).to_string()
            } else {
                title.to_owned()
            });
            urls.push(url.to_owned());
        }

        let m3u8 = urls.iter().filter(|u| u.ends_with(".m3u8")).count();
        if index == 0 || m3u8 > best_m3u8 {
            best_m3u8 = m3u8;
            best = (urls, titles);
        }
    }
    best
}
