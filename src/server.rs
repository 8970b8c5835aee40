//! HTTP chat server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a question through the pipeline |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! chat clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use context_gate_core::{Answer, Confidence, Pipeline, Policy, Section};

use crate::answer::build_pipeline;
use crate::config::Config;
use crate::sqlite_index::SqliteIndex;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Start the server on `[server].bind` with the configured providers.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let index = SqliteIndex::open(config).await?;
    let pipeline = build_pipeline(config, Arc::new(index))?;
    serve(Arc::new(pipeline), &config.server.bind).await
}

/// Serve `pipeline` on `bind` until the process is terminated.
pub async fn serve(pipeline: Arc<Pipeline>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "chat server listening");
    println!("Chat server listening on http://{}", bind);
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { pipeline })
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
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "chat request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
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

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    /// Overrides the configured policy for this request.
    #[serde(default)]
    policy: Option<Policy>,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    confidence: Confidence,
    sources: Vec<ChatSource>,
}

#[derive(Serialize)]
struct ChatSource {
    id: String,
    source_id: String,
    section: Section,
    /// Relevance for re-ranked fragments, vector similarity for fallback.
    score: f64,
}

impl From<Answer> for ChatResponse {
    fn from(answer: Answer) -> Self {
        let sources = answer
            .fragments
            .into_iter()
            .map(|f| ChatSource {
                score: f.relevance.unwrap_or(f.fragment.vector_score),
                id: f.fragment.id,
                source_id: f.fragment.metadata.source_id,
                section: f.fragment.metadata.section,
            })
            .collect();
        Self {
            reply: answer.text,
            confidence: answer.confidence,
            sources,
        }
    }
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let question = req.message.trim();
    if question.is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let policy = req.policy.unwrap_or(state.pipeline.policy());
    let answer = state
        .pipeline
        .answer_with_policy(question, policy)
        .await
        .map_err(internal)?;

    Ok(Json(answer.into()))
}
