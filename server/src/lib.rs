use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use search_core::engine::{COMPACT_LIMIT, PRIMARY_LIMIT};
use search_core::index::{BuildStatus, NoDataReason};
use search_core::persist::{load_index, load_index_or_empty, load_meta, save_with_meta, IndexPaths, MetaFile};
use search_core::{CoinRecord, Field, SearchEngine, SearchOutcome, SledCoinStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Deserialize)]
pub struct FieldSearchParams {
    pub field: String,
    #[serde(default)]
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub used_index: bool,
    pub degraded: bool,
    pub results: Vec<CoinRecord>,
}

impl SearchResponse {
    fn new(query: String, took_s: f64, outcome: SearchOutcome) -> Self {
        Self {
            query,
            took_s,
            total_hits: outcome.total,
            used_index: outcome.used_index,
            degraded: outcome.degraded,
            results: outcome.records,
        }
    }
}

#[derive(Serialize)]
pub struct IndexInfo {
    pub loaded: bool,
    pub terms: usize,
    pub meta: Option<MetaFile>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub index_paths: IndexPaths,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, msg: impl std::fmt::Display) -> ApiError {
    (status, Json(serde_json::json!({ "error": msg.to_string() })))
}

pub fn build_app(index_dir: String, db_path: String) -> Result<Router> {
    let store = SledCoinStore::open(&db_path)?;
    tracing::info!(db = %db_path, records = store.len(), "coin store opened");
    // A missing or broken index is not fatal: searches fall back to field scans.
    let index_paths = IndexPaths::new(&index_dir);
    let loaded = load_index_or_empty(&index_paths);
    let engine = SearchEngine::new(Arc::new(store), loaded.into_option());
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState { engine: Arc::new(engine), index_paths, admin_token }))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/search/field", get(field_search_handler))
        .route("/coin/:id", get(coin_handler))
        .route("/index/info", get(index_info))
        .route("/index/rebuild", post(index_rebuild))
        .route("/index/reload", post(index_reload))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let k = state.engine.limit_or(params.k, PRIMARY_LIMIT);
    let outcome = state.engine.search_with_limit(&params.q, k);
    tracing::debug!(q = %params.q, total = outcome.total, used_index = outcome.used_index, "search");
    Json(SearchResponse::new(params.q, start.elapsed().as_secs_f64(), outcome))
}

pub async fn field_search_handler(
    State(state): State<AppState>,
    Query(params): Query<FieldSearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let field: Field = params.field.parse().map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let k = state.engine.limit_or(params.k, COMPACT_LIMIT);
    let outcome = state.engine.search_field(field, &params.q, k);
    Ok(Json(SearchResponse::new(params.q, start.elapsed().as_secs_f64(), outcome)))
}

pub async fn coin_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<CoinRecord>, ApiError> {
    match state.engine.get(&id) {
        Ok(Some(coin)) => Ok(Json(coin)),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "not found")),
        Err(e) if e.is_transient() => Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "coin store unavailable")),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

pub async fn index_info(State(state): State<AppState>) -> Json<IndexInfo> {
    let snapshot = state.engine.snapshot();
    Json(IndexInfo {
        loaded: snapshot.is_some(),
        terms: snapshot.map(|idx| idx.len()).unwrap_or(0),
        meta: load_meta(&state.index_paths).ok(),
    })
}

// --- Admin endpoints ---
async fn index_rebuild(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Result<Json<MetaFile>, ApiError> {
    authorize(&state, &headers)?;
    let engine = state.engine.clone();
    let paths = state.index_paths.clone();
    // The artifact is written before the new index is published, so a failed
    // save leaves both disk and memory on the previous index.
    let (report, meta) = tokio::task::spawn_blocking(move || {
        engine.rebuild_with(|report| save_with_meta(&paths, &report.index, &report.stats))
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?
    .map_err(|e| {
        tracing::error!(error = %e, "index save failed, keeping current index");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
    })?;
    match (report.status, meta) {
        (_, Some(meta)) => Ok(Json(meta)),
        (BuildStatus::NoData(NoDataReason::Unreadable(err)), None) => Err(api_error(StatusCode::SERVICE_UNAVAILABLE, err)),
        (_, None) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "index was not persisted")),
    }
}

async fn index_reload(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Result<Json<IndexInfo>, ApiError> {
    authorize(&state, &headers)?;
    let index = load_index(&state.index_paths).map_err(|e| {
        tracing::warn!(error = %e, "reload failed, keeping current index");
        api_error(StatusCode::CONFLICT, e)
    })?;
    let terms = index.len();
    state.engine.publish(index);
    Ok(Json(IndexInfo { loaded: true, terms, meta: load_meta(&state.index_paths).ok() }))
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(api_error(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(api_error(StatusCode::UNAUTHORIZED, "invalid admin token"))
    }
}
