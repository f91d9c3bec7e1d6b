//! HTTP API server.
//!
//! Exposes the upload/ask/export surface as a JSON API for UI front ends.
//! Every endpoint except `/health` is gated by the `x-access-secret`
//! header; a missing or wrong secret yields 401 and nothing else.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/documents` | List stored documents |
//! | `POST` | `/documents/{filename}` | Upload raw document bytes |
//! | `POST` | `/ask` | Ask a question against the corpus |
//! | `POST` | `/export` | Export session history (snapshot or report) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Codes: `unauthorized` (401), `bad_request` (400), `generation_failed`
//! (502), `export_failed` (500), `internal` (500).
//!
//! # Concurrency
//!
//! One session per server process, serialized behind a mutex: requests are
//! handled one at a time from the session's point of view, matching the
//! single-active-session model.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::auth::{self, AccessGate};
use crate::config::Config;
use crate::export;
use crate::llm::{self, ChatBackend};
use crate::session::Session;
use crate::store::DocumentStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<DocumentStore>,
    gate: Arc<dyn AccessGate>,
    backend: Arc<dyn ChatBackend>,
    session: Arc<tokio::sync::Mutex<Session>>,
}

/// Start the API server on the configured bind address.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let gate: Arc<dyn AccessGate> = Arc::from(auth::gate_from_config(config)?);
    let store = Arc::new(DocumentStore::open(
        &config.storage.docs_dir,
        config.ingest.on_parse_error,
    )?);
    let backend: Arc<dyn ChatBackend> = Arc::from(llm::create_backend(&config.llm)?);

    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        gate,
        backend,
        session: Arc::new(tokio::sync::Mutex::new(Session::new())),
    };

    let app = router(state);

    info!(bind = %bind_addr, "API server listening");
    println!("API server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents", get(handle_list_documents))
        .route("/documents/{filename}", post(handle_upload))
        .route("/ask", post(handle_ask))
        .route("/export", post(handle_export))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn unauthorized() -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: "missing or invalid access secret".to_string(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn generation_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "generation_failed".to_string(),
        message: message.into(),
    }
}

fn export_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "export_failed".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Check the `x-access-secret` header against the gate. Fails closed.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let supplied = headers
        .get("x-access-secret")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;
    if !state.gate.authorize(supplied) {
        return Err(unauthorized());
    }
    Ok(())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /documents ============

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<String>,
}

async fn handle_list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DocumentListResponse>, AppError> {
    authorize(&state, &headers)?;
    let documents = state
        .store
        .list_documents()
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(DocumentListResponse { documents }))
}

// ============ POST /documents/{filename} ============

#[derive(Serialize)]
struct UploadResponse {
    saved: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    authorize(&state, &headers)?;
    if body.is_empty() {
        return Err(bad_request("upload body must not be empty"));
    }
    let path = state
        .store
        .save_upload(&filename, &body)
        .map_err(|e| bad_request(e.to_string()))?;
    let saved = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or(filename);
    Ok(Json(UploadResponse { saved }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    grounded: bool,
}

async fn handle_ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    authorize(&state, &headers)?;
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let mut session = state.session.lock().await;
    let answer = session
        .ask(
            &state.config,
            &state.store,
            state.backend.as_ref(),
            request.question.trim(),
        )
        .await
        .map_err(|e| generation_failed(format!("{:#}", e)))?;
    let grounded = session.has_index();

    Ok(Json(AskResponse { answer, grounded }))
}

// ============ POST /export ============

#[derive(Deserialize)]
struct ExportRequest {
    format: String,
}

#[derive(Serialize)]
struct ExportResponse {
    path: String,
    turns: usize,
}

async fn handle_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ExportRequest>,
) -> Result<Json<ExportResponse>, AppError> {
    authorize(&state, &headers)?;

    let session = state.session.lock().await;
    if session.history().is_empty() {
        return Err(bad_request("session history is empty"));
    }

    let dir = &state.config.storage.history_dir;
    let path = match request.format.as_str() {
        "snapshot" => export::export_snapshot(session.history(), dir),
        "report" => export::export_report(session.history(), dir),
        other => {
            return Err(bad_request(format!(
                "unknown export format: '{}' (use snapshot or report)",
                other
            )))
        }
    }
    .map_err(|e| export_failed(format!("{:#}", e)))?;

    Ok(Json(ExportResponse {
        path: path.display().to_string(),
        turns: session.history().len(),
    }))
}
