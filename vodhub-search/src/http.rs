//! HTTP client construction for source API calls.
//!
//! One [`reqwest::Client`] (and so one connection pool) is built per
//! aggregator and shared by every source call. The client carries no
//! overall timeout: each request is bounded by its own call deadline.

use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use crate::config::SearchConfig;
use crate::error::SearchError;

/// Browser identities presented to sources that reject unknown clients.
const BROWSER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 5;

/// Pick the User-Agent for a new client: the configured one, or a random
/// browser identity.
pub fn user_agent_for(config: &SearchConfig) -> String {
    match &config.user_agent {
        Some(custom) => custom.clone(),
        None => BROWSER_AGENTS[rand::thread_rng().gen_range(0..BROWSER_AGENTS.len())].to_owned(),
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers
}

/// Build the shared client for source API requests.
///
/// Sends JSON `Accept` headers, decompresses gzip and brotli, connects
/// within 10 seconds and follows at most 5 redirects.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .user_agent(user_agent_for(config))
        .default_headers(default_headers())
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_user_agent_wins() {
        let config = SearchConfig {
            user_agent: Some("VodhubBot/1.0".into()),
            ..Default::default()
        };
        assert_eq!(user_agent_for(&config), "VodhubBot/1.0");
    }

    #[test]
    fn rotated_user_agent_is_a_browser() {
        let ua = user_agent_for(&SearchConfig::default());
        assert!(BROWSER_AGENTS.contains(&ua.as_str()));
    }

    #[test]
    fn default_headers_ask_for_json() {
        let headers = default_headers();
        assert!(headers[ACCEPT].to_str().is_ok_and(|v| v.starts_with("application/json")));
    }

    #[test]
    fn client_builds() {
        assert!(build_client(&SearchConfig::default()).is_ok());
    }
}
