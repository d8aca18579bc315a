use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use quarry_core::catalog::{DetectLanguage, FixedLanguage, Language, StopWordDetector};
use quarry_core::ingest::{collect_article_files, load_article};
use quarry_core::query::Grammar;
use quarry_core::search::{search, Ranking};
use quarry_core::{BatchIndexer, BatchReport, DocId, SharedCatalog};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub grammar: Grammar,
    pub ranking: Option<Ranking>,
    pub k: Option<usize>,
}
fn default_lang() -> String { "en".to_string() }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub language: Language,
    pub grammar: Grammar,
    pub ranking: Ranking,
    pub took_s: f64,
    pub total_hits: usize,
    pub relevant_terms: Vec<String>,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub path: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    /// Files or directories readable by the server.
    pub paths: Vec<PathBuf>,
    /// `auto` (default) detects the language per article.
    pub language: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: SharedCatalog,
    pub detector: Arc<dyn DetectLanguage>,
    pub admin_token: Option<String>,
    /// Cancel flag of the batch currently running, if any.
    pub running_batch: Arc<Mutex<Option<Arc<AtomicBool>>>>,
}

impl AppState {
    pub fn new(catalog: SharedCatalog, admin_token: Option<String>) -> Self {
        Self {
            catalog,
            detector: Arc::new(StopWordDetector::default()),
            admin_token,
            running_batch: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_env(catalog: SharedCatalog) -> Self { Self::new(catalog, std::env::var("ADMIN_TOKEN").ok()) }
}

pub fn build_app(state: AppState) -> Router {
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

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:lang/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/index/batch", post(index_batch))
        .route("/index/cancel", post(index_cancel))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn parse_language(lang: &str) -> Result<Language, ApiError> {
    lang.parse::<Language>().map_err(|e| api_error(StatusCode::BAD_REQUEST, e))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let language = parse_language(&params.lang)?;

    // Scores and paths are collected under the read lock; article files are read after it is released.
    let (outcome, ranking, paths) = {
        let catalog = state.catalog.read();
        let index = catalog.index(language).ok_or_else(|| {
            api_error(StatusCode::NOT_FOUND, format!("There are no files indexed in the {language} language"))
        })?;
        let ranking = params.ranking.unwrap_or(catalog.config().ranking);
        let k = catalog.config().clamp_top_k(params.k);
        let outcome = search(index, &params.q, params.grammar, ranking, Some(k))
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        let paths: Vec<String> =
            outcome.hits.iter().map(|h| index.file_path(h.doc_id).unwrap_or_default().to_string()).collect();
        (outcome, ranking, paths)
    };

    let results = outcome
        .hits
        .iter()
        .zip(paths)
        .map(|(hit, path)| {
            let article = load_article(&path).ok();
            SearchHit {
                doc_id: hit.doc_id,
                score: hit.score,
                title: article.as_ref().map(|a| a.title.clone()),
                url: article.as_ref().and_then(|a| a.url.clone()),
                snippet: article.as_ref().and_then(|a| snippet(&a.article, &outcome.query_words)),
                path,
            }
        })
        .collect();

    Ok(Json(SearchResponse {
        query: params.q,
        language,
        grammar: params.grammar,
        ranking,
        took_s: outcome.took_s,
        total_hits: outcome.total_hits,
        relevant_terms: outcome.relevant_terms,
        results,
    }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path((lang, doc_id)): Path<(String, DocId)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let language = parse_language(&lang)?;
    let path = {
        let catalog = state.catalog.read();
        let index = catalog.index(language).ok_or_else(|| api_error(StatusCode::NOT_FOUND, "not found"))?;
        index.file_path(doc_id).map_err(|e| api_error(StatusCode::NOT_FOUND, e.to_string()))?.to_string()
    };
    let mut obj = json!({ "doc_id": doc_id, "language": language, "path": path });
    match load_article(&path) {
        Ok(article) => {
            obj["title"] = json!(article.title);
            obj["author"] = json!(article.author);
            obj["datetime"] = json!(article.datetime);
            obj["subject"] = json!(article.subject);
            obj["url"] = json!(article.url);
            obj["article"] = json!(article.article);
        }
        Err(err) => tracing::debug!(%path, error = %format!("{err:#}"), "indexed document is no longer readable"),
    }
    Ok(Json(obj))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.catalog.read().stats();
    Json(json!(stats))
}

/// Text around the first occurrence of any word, with every occurrence wrapped in `<em>`.
fn snippet(text: &str, words: &[String]) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let words: Vec<String> = words.iter().filter(|w| !w.trim().is_empty()).map(|w| regex::escape(w)).collect();
    let pat = if words.is_empty() {
        None
    } else {
        regex::RegexBuilder::new(&words.join("|")).case_insensitive(true).build().ok()
    };
    let snippet = match pat.as_ref().and_then(|p| p.find(text)) {
        Some(m) => {
            let start = floor_char_boundary(text, m.start().saturating_sub(100));
            let end = floor_char_boundary(text, (m.start() + 200).min(text.len()));
            text[start..end].to_string()
        }
        None => text.chars().take(200).collect(),
    };
    Some(match pat {
        Some(p) => p.replace_all(&snippet, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string(),
        None => snippet,
    })
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

// --- Admin endpoints ---
async fn index_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchReport>, ApiError> {
    authorize(&state, &headers)?;

    let detector: Arc<dyn DetectLanguage> = match req.language.as_deref() {
        None | Some("auto") => state.detector.clone(),
        Some(lang) => Arc::new(FixedLanguage(parse_language(lang)?)),
    };
    let mut files = Vec::new();
    for path in &req.paths {
        let found = collect_article_files(path).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        files.extend(found);
    }

    let indexer = BatchIndexer::new(state.catalog.clone(), detector);
    let slot = {
        let mut running = state.running_batch.lock();
        if running.is_some() {
            return Err(api_error(StatusCode::CONFLICT, "a batch is already running"));
        }
        *running = Some(indexer.cancel_handle());
        BatchSlot(state.running_batch.clone())
    };
    tracing::info!(files = files.len(), "starting batch");
    // The slot travels with the blocking job, so it is released when the batch
    // ends even if this request is dropped first.
    let result = tokio::task::spawn_blocking(move || {
        let _slot = slot;
        indexer.run(&files)
    })
    .await;

    result.map(Json).map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Clears the running-batch slot on drop.
struct BatchSlot(Arc<Mutex<Option<Arc<AtomicBool>>>>);

impl Drop for BatchSlot {
    fn drop(&mut self) { *self.0.lock() = None; }
}

async fn index_cancel(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let cancelled = match state.running_batch.lock().as_ref() {
        Some(flag) => {
            flag.store(true, Ordering::Relaxed);
            true
        }
        None => false,
    };
    Ok(Json(json!({ "cancelled": cancelled })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
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
