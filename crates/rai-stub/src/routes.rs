//! Route definitions for the compliance API stub.
//!
//! Every handler delegates to [`MemoryBackend`], so the HTTP surface and
//! the in-process backend cannot drift apart. Paths and bodies are the ones
//! `rai-client`'s `HttpBackend` sends and expects.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use rai_client::{ClientError, ComplianceBackend, UploadDocument, UploadRequest};
use rai_core::{
    ChunkQuery, NewSession, OverrideRequest, ReanalyzeRequest, ResultsQuery, SessionId,
    SessionPatch, SessionQuery,
};

use crate::backend::MemoryBackend;

/// Build the complete router with all compliance API stub routes.
pub fn router(backend: MemoryBackend) -> Router {
    Router::new()
        .route("/health", get(health))
        // sessions
        .route("/api/v1/sessions", post(session_create).get(session_list))
        .route(
            "/api/v1/sessions/:id",
            get(session_get).patch(session_patch).delete(session_delete),
        )
        .route("/api/v1/sessions/:id/upload", post(upload))
        .route("/api/v1/sessions/:id/chunks", get(chunks))
        // standards
        .route("/api/v1/standards", get(standards_list))
        .route("/api/v1/standards/search", get(standards_search))
        .route("/api/v1/standards/:key", get(standard_detail))
        .route("/api/v1/standards/reload", post(standards_reload))
        // analysis
        .route("/api/v1/sessions/:id/analyze-stream", post(analyze_stream))
        .route("/api/v1/sessions/:id/re-analyze", post(reanalyze))
        // review
        .route("/api/v1/sessions/:id/override", post(override_apply))
        .route("/api/v1/sessions/:id/overrides", get(overrides_list))
        .route("/api/v1/sessions/:id/results", get(results_list))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(backend)
}

/// A backend error rendered as an HTTP response.
struct ApiError(ClientError);

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            ClientError::NotFound { endpoint } => {
                (StatusCode::NOT_FOUND, format!("not found: {endpoint}"))
            }
            ClientError::Conflict { body, .. } => (StatusCode::CONFLICT, body.clone()),
            ClientError::Upload(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ClientError::Api { status, body, .. } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body.clone(),
            ),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": "no such endpoint" })),
    )
        .into_response()
}

// ── Sessions ────────────────────────────────────────────────────────

async fn session_create(
    State(backend): State<MemoryBackend>,
    Json(body): Json<NewSession>,
) -> ApiResult<Response> {
    let session = backend.create_session(&body).await?;
    Ok((StatusCode::CREATED, Json(session)).into_response())
}

async fn session_list(
    State(backend): State<MemoryBackend>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Response> {
    Ok(Json(backend.list_sessions(&query).await?).into_response())
}

async fn session_get(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = backend.get_session(SessionId(id)).await?;
    Ok(Json(session).into_response())
}

async fn session_patch(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SessionPatch>,
) -> ApiResult<Response> {
    let session = backend.patch_session(SessionId(id), &patch).await?;
    Ok(Json(session).into_response())
}

async fn session_delete(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    backend.delete_session(SessionId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut request = UploadRequest::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Ok(bad_request(e.to_string())),
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or(&name).to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => return Ok(bad_request(e.to_string())),
        };
        let doc = UploadDocument::new(file_name, bytes);
        match name.as_str() {
            "financial_statements" => request.financial_statements = Some(doc),
            "notes" => request.notes = Some(doc),
            other => tracing::debug!(field = other, "ignoring unknown upload field"),
        }
    }
    let receipt = backend.upload_documents(SessionId(id), &request).await?;
    Ok(Json(receipt).into_response())
}

fn bad_request(detail: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
}

async fn chunks(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
    Query(query): Query<ChunkQuery>,
) -> ApiResult<Response> {
    let page = backend.list_chunks(SessionId(id), &query).await?;
    Ok(Json(page).into_response())
}

// ── Standards ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn standards_list(State(backend): State<MemoryBackend>) -> ApiResult<Response> {
    Ok(Json(backend.list_standards().await?).into_response())
}

async fn standard_detail(
    State(backend): State<MemoryBackend>,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    Ok(Json(backend.get_standard(&key).await?).into_response())
}

async fn standards_search(
    State(backend): State<MemoryBackend>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    Ok(Json(backend.search_standards(&params.q).await?).into_response())
}

async fn standards_reload(State(backend): State<MemoryBackend>) -> ApiResult<Response> {
    Ok(Json(backend.reload_standards().await?).into_response())
}

// ── Analysis ────────────────────────────────────────────────────────

async fn analyze_stream(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let channel = backend.start_analysis(SessionId(id)).await?;
    let stream = futures::stream::unfold(channel, |mut channel| async move {
        match channel.next_fragment().await {
            Ok(Some(fragment)) => Some((Ok::<_, std::io::Error>(fragment), channel)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "analysis stream aborted");
                None
            }
        }
    });
    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn reanalyze(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReanalyzeRequest>,
) -> ApiResult<Response> {
    Ok(Json(backend.reanalyze(SessionId(id), &body).await?).into_response())
}

// ── Review ──────────────────────────────────────────────────────────

async fn override_apply(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
    Json(body): Json<OverrideRequest>,
) -> ApiResult<Response> {
    Ok(Json(backend.apply_override(SessionId(id), &body).await?).into_response())
}

async fn overrides_list(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    Ok(Json(backend.list_overrides(SessionId(id)).await?).into_response())
}

async fn results_list(
    State(backend): State<MemoryBackend>,
    Path(id): Path<Uuid>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Response> {
    Ok(Json(backend.list_results(SessionId(id), &query).await?).into_response())
}
