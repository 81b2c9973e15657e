//! HTTP surface for the search engine.
//!
//! ## Endpoints
//!
//! - `GET /health` — liveness probe
//! - `GET /api/search?q=&adult=&filter=` — batch search
//! - `GET /api/search/stream?q=` — streamed search as server-sent events
//! - `GET /api/search/one?q=&resourceId=&adult=&filter=` — exact-title
//!   lookup in one source
//! - `GET /api/search/resources?adult=&filter=` — sources visible to the
//!   caller
//! - `GET /api/search/suggestions?q=` — query completions
//!
//! Every request runs inside a span carrying a fresh request id, echoed
//! back in the `x-request-id` header.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, Request, State};
use axum::http::{HeaderName, HeaderValue, header};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use futures_util::stream::Stream;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, info};
use uuid::Uuid;
use vodhub_search::{
    Aggregator, SearchEvent, SearchRequest, Source, available_sources, resolve_policy,
};

use crate::config::{SearchSettings, VodhubConfig};
use crate::error::{Result, ServerError};

const X_ADULT_FILTER: HeaderName = HeaderName::from_static("x-adult-filter");
const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Parameters shared by the policy-aware endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Query text.
    pub q: Option<String>,
    /// `1|true` shows adult content, `0|false` hides it.
    pub adult: Option<String>,
    /// `off|disable` shows adult content, `on|enable` hides it.
    pub filter: Option<String>,
    /// Source key for the single-source lookup.
    #[serde(rename = "resourceId")]
    pub resource_id: Option<String>,
}

impl SearchParams {
    fn query(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or_default()
    }

    fn policy_active(&self, default_active: bool) -> bool {
        resolve_policy(self.adult.as_deref(), self.filter.as_deref(), default_active)
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    aggregator: Arc<Aggregator>,
    sources: Arc<[Source]>,
    settings: Arc<SearchSettings>,
}

impl AppState {
    fn request(&self, query: &str, policy_active: bool) -> SearchRequest {
        SearchRequest::new(query, self.sources.to_vec()).with_policy(policy_active)
    }

    fn cache_control(&self) -> String {
        let secs = self.settings.cache_time_secs;
        format!("public, max-age={secs}, s-maxage={secs}")
    }
}

fn adult_filter_flag(policy_active: bool) -> &'static str {
    if policy_active { "enabled" } else { "disabled" }
}

/// Build the application router for `config`.
///
/// # Errors
///
/// Returns [`ServerError::Config`] for an invalid configuration and
/// [`ServerError::Search`] if the HTTP client cannot be built.
pub fn router(config: &VodhubConfig) -> Result<Router> {
    config.validate()?;
    let aggregator = Aggregator::from_config(config.search_config())?
        .content_filter(config.keyword_policy())
        .normalizer(config.normalizer()?);

    let state = AppState {
        aggregator: Arc::new(aggregator),
        sources: config.sources.clone().into(),
        settings: Arc::new(config.search.clone()),
    };

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/api/search", get(handle_search))
        .route("/api/search/stream", get(handle_stream))
        .route("/api/search/one", get(handle_search_one))
        .route("/api/search/resources", get(handle_resources))
        .route("/api/search/suggestions", get(handle_suggestions))
        .layer(middleware::from_fn(request_span))
        .with_state(state))
}

// ---------------------------------------------------------------------------
// VodhubServer
// ---------------------------------------------------------------------------

/// The search HTTP server running in a background task.
pub struct VodhubServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl VodhubServer {
    /// Start the server.
    ///
    /// Binds to `{server.host}:{server.port}` (use port `0` for auto-assign)
    /// and begins serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration or if the TCP listener
    /// cannot bind.
    pub async fn start(config: &VodhubConfig) -> Result<Self> {
        let app = router(config)?;

        let bind_addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        let addr = listener.local_addr()?;

        info!(sources = config.sources.len(), "vodhub listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("vodhub server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for VodhubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

async fn request_span(request: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /api/search` — batch search.
///
/// A blank query answers `{results: []}` (cacheable). An empty result set
/// carries no caching headers.
async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    let query = params.query();
    if query.is_empty() {
        return Ok((
            [(header::CACHE_CONTROL, state.cache_control())],
            Json(serde_json::json!({ "results": [] })),
        )
            .into_response());
    }

    let policy_active = params.policy_active(state.settings.adult_filter);
    let outcome = state
        .aggregator
        .search(&state.request(query, policy_active))
        .await?;
    let flag = [(X_ADULT_FILTER, adult_filter_flag(policy_active))];

    if outcome.results.is_empty() {
        return Ok((flag, Json(serde_json::json!({ "results": [] }))).into_response());
    }
    Ok((
        [(header::CACHE_CONTROL, state.cache_control())],
        flag,
        Json(outcome),
    )
        .into_response())
}

/// `GET /api/search/stream` — one SSE frame per search event.
///
/// Follows the configured content-policy default. Closing the connection
/// drops the event receiver, which stops delivery.
async fn handle_stream(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    let request = state.request(params.query(), state.settings.adult_filter);
    let rx = state.aggregator.search_stream(request)?;

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Sse::new(event_stream(rx)).keep_alive(KeepAlive::default()),
    )
        .into_response())
}

fn event_stream(
    mut rx: mpsc::Receiver<SearchEvent>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(e) => tracing::error!(error = %e, "failed to encode search event"),
            }
        }
    }
}

/// `GET /api/search/one` — exact-title matches from one source.
async fn handle_search_one(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    let query = params.query();
    let source_key = params.resource_id.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() || source_key.is_empty() {
        return Err(ServerError::BadRequest(
            "missing required parameter: q or resourceId".into(),
        ));
    }

    let policy_active = params.policy_active(state.settings.adult_filter);
    let results = state
        .aggregator
        .search_one(source_key, &state.request(query, policy_active))
        .await?;

    Ok((
        [(header::CACHE_CONTROL, state.cache_control())],
        Json(serde_json::json!({ "results": results })),
    )
        .into_response())
}

/// `GET /api/search/resources` — sources visible under the request's policy.
async fn handle_resources(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let policy_active = params.policy_active(state.settings.adult_filter);
    (
        [(X_ADULT_FILTER, adult_filter_flag(policy_active))],
        Json(available_sources(&state.sources, policy_active)),
    )
        .into_response()
}

/// `GET /api/search/suggestions` — completions from the first available
/// source. Never fails; a blank query yields no suggestions.
async fn handle_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.query();
    if query.is_empty() {
        return Json(serde_json::json!({ "suggestions": [] })).into_response();
    }

    let suggestions = state
        .aggregator
        .suggest(query, &state.sources, state.settings.adult_filter)
        .await;
    (
        [(header::CACHE_CONTROL, state.cache_control())],
        Json(serde_json::json!({ "suggestions": suggestions })),
    )
        .into_response()
}
