//! HTTP service boundary for the labeling UI.
//!
//! The presentation layer (pages, sessions) lives elsewhere; this module
//! only exposes the data operations it needs as JSON.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/actor` | Validate and normalize an actor id (handshake) |
//! | `GET`  | `/api/next_qna` | Fetch a random unlabeled item |
//! | `POST` | `/api/label_qna` | Label an item: `{ "qna_id": 1, "label": true }` |
//! | `GET`  | `/api/stats` | Per-actor and overall counts |
//! | `GET`  | `/api/qna/{id}` | Fetch one item with its label state |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Actor attribution
//!
//! After the handshake the client sends the returned id on every call in
//! the `x-actor-id` header. Calls without a valid header get `401`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "No more unlabeled QnA pairs available" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `not_found` (404),
//! `conflict` (409), `store_unavailable` (503), `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, LabelingConfig};
use crate::db;
use crate::error::Error;
use crate::get::get_item;
use crate::labeling;
use crate::migrate;
use crate::models::{LabelOutcome, NextItem, QnaItem, Stats};

/// Header carrying the actor id on every `/api` call after the handshake.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    labeling: Arc<LabelingConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, labeling: LabelingConfig) -> Self {
        Self {
            pool,
            labeling: Arc::new(labeling),
        }
    }
}

/// Builds the router without binding; tests drive it directly.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/actor", post(handle_actor))
        .route("/api/next_qna", get(handle_next))
        .route("/api/label_qna", post(handle_label))
        .route("/api/stats", get(handle_stats))
        .route("/api/qna/{id}", get(handle_get))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let app = build_router(AppState::new(pool, config.labeling.clone()));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        bind = %config.server.bind,
        reservation_secs = config.labeling.reservation_secs,
        allow_relabel = config.labeling.allow_relabel,
        "labeling server listening"
    );
    println!("Labeling server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
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

pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
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

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::NotFound(_) => AppError::new(StatusCode::NOT_FOUND, "not_found", message),
            Error::AlreadyLabeled { .. } => {
                AppError::new(StatusCode::CONFLICT, "conflict", message)
            }
            Error::InvalidActor(_) | Error::MalformedFilename { .. } | Error::MalformedRecord(_) => {
                AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
            }
            Error::StoreUnavailable(_) => {
                tracing::error!(error = %message, "store error while serving request");
                AppError::new(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", message)
            }
            Error::UnreadableSource { .. } | Error::Io(_) | Error::Json(_) => {
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::new(StatusCode::BAD_REQUEST, "bad_request", rejection.body_text())
    }
}

// ============ Actor extraction ============

/// The validated actor id from the `x-actor-id` header.
pub struct Actor(pub String);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::new(StatusCode::UNAUTHORIZED, "unauthorized", "Actor not identified")
            })?;

        labeling::validate_actor(raw)
            .map(Actor)
            .map_err(|e| AppError::new(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string()))
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

// ============ POST /api/actor ============

#[derive(Deserialize)]
struct ActorRequest {
    actor_id: String,
}

#[derive(Serialize)]
struct ActorResponse {
    actor_id: String,
}

/// Handshake: the returned id is what the client must send in
/// `x-actor-id` from now on.
async fn handle_actor(
    payload: Result<Json<ActorRequest>, JsonRejection>,
) -> Result<Json<ActorResponse>, AppError> {
    let Json(req) = payload?;
    let actor_id = labeling::validate_actor(&req.actor_id)?;
    Ok(Json(ActorResponse { actor_id }))
}

// ============ GET /api/next_qna ============

async fn handle_next(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<NextItem>, AppError> {
    match labeling::fetch_next(&state.pool, &state.labeling, &actor).await? {
        Some(item) => Ok(Json(item)),
        None => Err(AppError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "No more unlabeled QnA pairs available",
        )),
    }
}

// ============ POST /api/label_qna ============

#[derive(Deserialize)]
struct LabelRequest {
    qna_id: Option<i64>,
    label: Option<bool>,
}

async fn handle_label(
    State(state): State<AppState>,
    Actor(actor): Actor,
    payload: Result<Json<LabelRequest>, JsonRejection>,
) -> Result<Json<LabelOutcome>, AppError> {
    let Json(req) = payload?;
    let (qna_id, label) = match (req.qna_id, req.label) {
        (Some(id), Some(label)) => (id, label),
        _ => {
            return Err(AppError::new(
                StatusCode::BAD_REQUEST,
                "bad_request",
                "Missing qna_id or label",
            ))
        }
    };

    let outcome = labeling::label(&state.pool, &state.labeling, qna_id, label, &actor).await?;
    Ok(Json(outcome))
}

// ============ GET /api/stats ============

async fn handle_stats(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Stats>, AppError> {
    Ok(Json(labeling::stats(&state.pool, &actor).await?))
}

// ============ GET /api/qna/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<QnaItem>, AppError> {
    Ok(Json(get_item(&state.pool, id).await?))
}
