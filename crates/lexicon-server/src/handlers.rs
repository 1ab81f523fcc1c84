use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lexicon_db::{Engine, LoadOutcome, LoadReport, SourceKind, normalize};
use lexicon_types::{FrequencyRecord, Record};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub source: String,
    pub key: String,
}

#[derive(Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

#[derive(Deserialize)]
pub struct SourceQuery {
    pub source: String,
}

#[derive(Serialize)]
pub struct SourceView {
    name: String,
    kind: SourceKind,
    active: bool,
    priority: i32,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keys: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<usize>,
    discarded: usize,
    files: usize,
    elapsed_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct LookupResponse {
    source: String,
    key: String,
    normalized: String,
    records: Vec<Arc<Record>>,
}

#[derive(Serialize)]
pub struct SourceHitsView {
    source: String,
    priority: i32,
    records: Vec<Arc<Record>>,
}

#[derive(Serialize)]
pub struct LookupAllResponse {
    key: String,
    normalized: String,
    sources: Vec<SourceHitsView>,
}

#[derive(Serialize)]
pub struct FrequencyResponse {
    source: String,
    key: String,
    normalized: String,
    best: Option<FrequencyRecord>,
    items: Vec<FrequencyRecord>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/sources", get(sources))
        .route("/v1/lookup", get(lookup))
        .route("/v1/lookup_all", get(lookup_all))
        .route("/v1/frequency", get(frequency))
        .route("/v1/reload", post(reload))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn sources(State(state): State<AppState>) -> Json<Vec<SourceView>> {
    let views = state
        .engine
        .reports()
        .into_iter()
        .map(|report| source_view(&state.engine, report))
        .collect();
    Json(views)
}

async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, ApiError> {
    let key = required_key(&params.key)?;
    let kind = source_kind(&state.engine, &params.source)?;
    if kind.is_frequency() {
        return Err(ApiError::bad_request(format!(
            "source `{}` is a frequency list; use /v1/frequency",
            params.source
        )));
    }
    let records = state.engine.lookup(&params.source, key);
    Ok(Json(LookupResponse {
        source: params.source,
        key: key.to_string(),
        normalized: normalize(key).into_owned(),
        records,
    }))
}

async fn lookup_all(
    State(state): State<AppState>,
    Query(params): Query<KeyQuery>,
) -> Result<Json<LookupAllResponse>, ApiError> {
    let key = required_key(&params.key)?;
    let sources = state
        .engine
        .lookup_all(key)
        .into_iter()
        .map(|hits| SourceHitsView {
            source: hits.source,
            priority: hits.priority,
            records: hits.records,
        })
        .collect();
    Ok(Json(LookupAllResponse {
        key: key.to_string(),
        normalized: normalize(key).into_owned(),
        sources,
    }))
}

async fn frequency(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<FrequencyResponse>, ApiError> {
    let key = required_key(&params.key)?;
    let kind = source_kind(&state.engine, &params.source)?;
    if !kind.is_frequency() {
        return Err(ApiError::bad_request(format!(
            "source `{}` is not a frequency list",
            params.source
        )));
    }
    let (best, items) = match state.engine.frequencies(&params.source) {
        Some(container) => (container.best(key).cloned(), container.lookup(key).to_vec()),
        None => (None, Vec::new()),
    };
    Ok(Json(FrequencyResponse {
        source: params.source,
        key: key.to_string(),
        normalized: normalize(key).into_owned(),
        best,
        items,
    }))
}

async fn reload(
    State(state): State<AppState>,
    Query(params): Query<SourceQuery>,
) -> Result<Json<SourceView>, ApiError> {
    let report = state
        .engine
        .reload_source(&params.source)
        .await
        .ok_or_else(|| ApiError::not_found(format!("unknown source `{}`", params.source)))?;
    Ok(Json(source_view(&state.engine, report)))
}

fn required_key(raw: &str) -> Result<&str, ApiError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(ApiError::bad_request("key is required"));
    }
    Ok(key)
}

fn source_kind(engine: &Engine, name: &str) -> Result<SourceKind, ApiError> {
    engine
        .descriptor(name)
        .map(|d| d.kind)
        .ok_or_else(|| ApiError::not_found(format!("unknown source `{name}`")))
}

fn source_view(engine: &Engine, report: LoadReport) -> SourceView {
    let descriptor = engine.descriptor(&report.source);
    let (records, keys, skipped, error) = match &report.outcome {
        LoadOutcome::Loaded { records, keys } => (Some(*records), Some(*keys), None, None),
        LoadOutcome::Partial {
            records,
            keys,
            skipped,
        } => (Some(*records), Some(*keys), Some(*skipped), None),
        LoadOutcome::Failed { error, records } => {
            (Some(*records), None, None, Some(error.to_string()))
        }
        LoadOutcome::NotFound | LoadOutcome::Inactive | LoadOutcome::Superseded => {
            (None, None, None, None)
        }
    };
    SourceView {
        active: descriptor.as_ref().is_some_and(|d| d.active),
        priority: descriptor.as_ref().map_or(0, |d| d.priority),
        name: report.source,
        kind: report.kind,
        outcome: report.outcome.label(),
        records,
        keys,
        skipped,
        discarded: report.discarded,
        files: report.files,
        elapsed_ms: report.elapsed.as_millis(),
        error,
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn not_found<T: Into<String>>(msg: T) -> Self {
        ApiError::NotFound(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
