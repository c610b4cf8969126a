use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use search_core::{PageId, SearchConfig, SearchEngine, Store};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use time::macros::format_description;
use time::OffsetDateTime;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Keywords listed per result.
const TOP_KEYWORDS: u32 = 5;

#[derive(Deserialize)]
pub struct SearchRequest {
    /// The web frontend posts this as `searchbar`. Missing means empty.
    #[serde(alias = "searchbar", default)]
    pub query: String,
    /// Page whose body weights reinforce the query. Negative means none.
    #[serde(default)]
    pub related_doc: Option<i64>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    /// Whole milliseconds spent answering.
    pub time_taken: u64,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub id: PageId,
    pub title: String,
    pub url: String,
    /// Last modification as `YYYY-MM-DD HH:MM:SS`, UTC.
    #[serde(rename = "time")]
    pub last_modified: String,
    pub size: i64,
    /// `[keyword, count]` pairs, most frequent first.
    pub keywords: Vec<(String, u32)>,
    pub parent_links: Vec<String>,
    pub child_links: Vec<String>,
    pub score: f64,
}

/// Snapshot and store are loaded once at startup. The engine is read-only;
/// the store is only consulted for result decoration.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub store: Arc<Mutex<Store>>,
}

pub fn build_app(db_path: impl AsRef<Path>) -> Result<Router> {
    let store = Store::open(db_path.as_ref())?;
    let engine = SearchEngine::load(&store, SearchConfig::default())?;
    tracing::info!(
        db = %db_path.as_ref().display(),
        pages = engine.snapshot().page_count(),
        "search snapshot loaded"
    );
    let state = AppState { engine: Arc::new(engine), store: Arc::new(Mutex::new(store)) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", post(search_handler))
        .route("/keywords", get(keywords_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// Any failure below a handler surfaces as a 500 with its message.
pub struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let reference = match req.related_doc {
        None => None,
        Some(id) if id < 0 => None,
        Some(id) => match PageId::try_from(id) {
            Ok(id) => Some(id),
            // cannot name a stored page
            Err(_) => return Ok(Json(respond(req.query, Vec::new(), start))),
        },
    };

    let scored = state.engine.search(&req.query, reference)?;
    let store = state.store.lock();
    let mut results = Vec::with_capacity(scored.len());
    for hit in scored {
        let Some(page) = store.page(hit.page_id)? else {
            tracing::warn!(page_id = hit.page_id, "ranked page missing from store");
            continue;
        };
        results.push(SearchHit {
            id: page.page_id,
            title: page.title,
            url: page.url,
            last_modified: format_timestamp(page.last_modified),
            size: page.size,
            keywords: store.top_keywords(hit.page_id, TOP_KEYWORDS)?,
            parent_links: store.parent_urls(hit.page_id)?,
            child_links: store.child_urls(hit.page_id)?,
            score: (hit.score * 10.0).round() / 10.0,
        });
    }
    drop(store);

    let response = respond(req.query, results, start);
    tracing::info!(query = %response.query, hits = response.results.len(), ms = response.time_taken, "search served");
    Ok(Json(response))
}

pub async fn keywords_handler(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let keywords = state.store.lock().keyword_texts()?;
    Ok(Json(keywords))
}

fn respond(query: String, results: Vec<SearchHit>, start: Instant) -> SearchResponse {
    let time_taken = (start.elapsed().as_secs_f64() * 1000.0).round() as u64;
    SearchResponse { query, results, time_taken }
}

/// Unix seconds as `YYYY-MM-DD HH:MM:SS` in UTC; out-of-range values fall back to the raw number.
pub fn format_timestamp(unix: i64) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(unix)
        .ok()
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_else(|| unix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(784_111_777), "1994-11-06 08:49:37");
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }
}
