use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use bookrank_core::chat::ChatSession;
use bookrank_core::persist::{load_all, IndexPaths, StoredIndex};
use bookrank_core::{DocId, DocMeta, Index, IndexHandle, RankOptions, SearchError, DEFAULT_K};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

/// Upper bound on `k` accepted over HTTP.
pub const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub min_score: Option<f32>,
}
fn default_k() -> usize { DEFAULT_K }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    /// Returned results with a positive score.
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub external_id: String,
    pub score: f32,
    pub title: String,
    pub author: String,
    pub year: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// An index together with the catalog used to present its results.
pub struct Loaded {
    pub index: Index,
    pub docs: HashMap<DocId, DocMeta>,
    /// External id (ISBN) to document id.
    pub id_map: HashMap<String, DocId>,
}

impl From<StoredIndex> for Loaded {
    fn from(stored: StoredIndex) -> Self {
        Self { index: stored.index, docs: stored.docs, id_map: stored.id_map }
    }
}

impl AsRef<Index> for Loaded {
    fn as_ref(&self) -> &Index { &self.index }
}

#[derive(Clone)]
pub struct AppState {
    pub index_dir: PathBuf,
    pub current: Arc<IndexHandle<Loaded>>,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, String);

fn search_error(e: SearchError) -> ApiError {
    let status = match e {
        SearchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        SearchError::EmptyIndex => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::InvalidCorpus(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string())
}

fn load(index_dir: &std::path::Path) -> Result<Loaded> {
    let stored = load_all(&IndexPaths::new(index_dir))?;
    let meta = &stored.meta;
    tracing::info!(num_docs = meta.num_docs, num_terms = meta.num_terms, created_at = %meta.created_at, "index loaded");
    Ok(Loaded::from(stored))
}

pub fn build_app(index_dir: String) -> Result<Router> {
    // Load the index at startup
    let loaded = load(std::path::Path::new(&index_dir))?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState { index_dir: PathBuf::from(&index_dir), current: Arc::new(IndexHandle::with(loaded)), admin_token };
    Ok(router(app_state))
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
        .route("/doc/:doc_id", get(doc_handler))
        .route("/book/:external_id", get(book_handler))
        .route("/chat", post(chat_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let loaded = state.current.current().ok_or_else(|| search_error(SearchError::EmptyIndex))?;
    let opts = RankOptions { k: params.k.min(MAX_K), min_score: params.min_score };
    let hits = loaded.index.rank_with(&params.q, opts).map_err(search_error)?;

    let raw_terms: Vec<String> = params
        .q
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    let mut results: Vec<SearchHit> = Vec::with_capacity(hits.len());
    for hit in &hits {
        let meta = loaded.docs.get(&hit.document_id).cloned().unwrap_or_default();
        let snippet = loaded
            .index
            .document(hit.document_id)
            .and_then(|d| snippet(&d.raw_text, &raw_terms));
        let external_id = if meta.external_id.is_empty() { hit.document_id.to_string() } else { meta.external_id };
        results.push(SearchHit { doc_id: hit.document_id, external_id, score: hit.score, title: meta.title, author: meta.author, year: meta.year, snippet });
    }

    let total_hits = hits.iter().filter(|h| h.score > 0.0).count();
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let loaded = state.current.current().ok_or_else(|| search_error(SearchError::EmptyIndex))?;
    doc_json(&loaded, doc_id)
}

/// Look a document up by the id it was ingested with, e.g. its ISBN.
pub async fn book_handler(State(state): State<AppState>, Path(external_id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    let loaded = state.current.current().ok_or_else(|| search_error(SearchError::EmptyIndex))?;
    let doc_id = *loaded.id_map.get(&external_id).ok_or((StatusCode::NOT_FOUND, "not found".to_string()))?;
    doc_json(&loaded, doc_id)
}

fn doc_json(loaded: &Loaded, doc_id: DocId) -> Result<Json<serde_json::Value>, ApiError> {
    let doc = loaded.index.document(doc_id).ok_or((StatusCode::NOT_FOUND, "not found".to_string()))?;
    let meta = loaded.docs.get(&doc_id).cloned().unwrap_or_default();
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "external_id": doc.external_id,
        "title": meta.title,
        "author": meta.author,
        "year": meta.year,
        "publisher": meta.publisher,
        "text": doc.raw_text,
    })))
}

pub async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Result<Json<ChatResponse>, ApiError> {
    let loaded = state.current.current().ok_or_else(|| search_error(SearchError::EmptyIndex))?;
    let mut session = ChatSession::new(req.k.min(MAX_K));
    let reply = session.handle_message(&loaded.index, &loaded.docs, &req.message).map_err(search_error)?;
    Ok(Json(ChatResponse { reply }))
}

/// Reload the index from disk and swap it in; searches already running keep the old one.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let dir = state.index_dir.clone();
    let loaded = tokio::task::spawn_blocking(move || load(&dir))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {e:#}")))?;
    let num_docs = loaded.index.len();
    state.current.publish(loaded);
    tracing::info!(num_docs, "index reloaded");
    Ok(Json(serde_json::json!({ "num_docs": num_docs })))
}

fn snippet(text: &str, raw_terms: &[String]) -> Option<String> {
    if text.is_empty() { return None; }
    let clipped: String = text.chars().take(200).collect();
    Some(highlight_terms(&clipped, raw_terms))
}

/// Wrap every query word in `<em>` and HTML-escape the rest.
///
/// All words go into one case-insensitive alternation, longest first, and the
/// text is rewritten in a single pass so inserted markup is never re-matched.
fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut words: Vec<&str> = terms.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    words.dedup();
    let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    let pattern = if alternation.is_empty() {
        HTML_SPECIAL.to_string()
    } else {
        format!("(?P<term>{alternation})|{HTML_SPECIAL}")
    };
    let Ok(pat) = regex::RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return escape_html(snippet);
    };
    pat.replace_all(snippet, |caps: &regex::Captures| match caps.name("term") {
        Some(term) => format!("<em>{}</em>", escape_html(term.as_str())),
        None => escape_html(&caps[0]),
    })
    .into_owned()
}

const HTML_SPECIAL: &str = r#"[&<>"']"#;

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_case_insensitively() {
        let out = highlight_terms("The Great Gatsby", &["great".to_string()]);
        assert_eq!(out, "The <em>Great</em> Gatsby");
    }

    #[test]
    fn overlapping_words_do_not_touch_markup() {
        let out = highlight_terms("The Great Gatsby", &["great".to_string(), "em".to_string()]);
        assert_eq!(out, "The <em>Great</em> Gatsby");
        let out = highlight_terms("Great Expectations", &["great".to_string(), "greatex".to_string(), "<em>".to_string()]);
        assert_eq!(out, "<em>Great</em> Expectations");
    }

    #[test]
    fn longer_words_win_over_their_prefixes() {
        let out = highlight_terms("Hobbits and a hobbit", &["hobbit".to_string(), "hobbits".to_string()]);
        assert_eq!(out, "<em>Hobbits</em> and a <em>hobbit</em>");
    }

    #[test]
    fn document_text_is_escaped() {
        let out = highlight_terms("Tom & Jerry <script>\"x\"</script>", &["jerry".to_string()]);
        assert_eq!(out, "Tom &amp; <em>Jerry</em> &lt;script&gt;&quot;x&quot;&lt;/script&gt;");
        let out = highlight_terms("AT&T history", &["at&t".to_string()]);
        assert_eq!(out, "<em>AT&amp;T</em> history");
        assert_eq!(highlight_terms("a<b", &[]), "a&lt;b");
    }

    #[test]
    fn empty_text_has_no_snippet() {
        assert_eq!(snippet("", &["x".to_string()]), None);
    }
}
