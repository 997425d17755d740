//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::sse::sse_stream;
use super::types::{ChatRequest, ErrorResponse, QueuedResponse, StartersResponse, SuccessResponse};
use super::AppState;
use crate::prompts::STARTERS;
use crate::runtime::{RuntimeError, SseEvent};
use crate::session::SessionSnapshot;
use crate::speech::AudioClip;
use crate::state_machine::Event;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::{headers::ContentType, TypedHeader};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the chat page
        .route("/", get(serve_page))
        // Static assets
        .route("/assets/*path", get(serve_static))
        .route("/api/starters", get(list_starters))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/end", post(end_session))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/sessions/:id/chat", post(send_chat))
        .route("/api/sessions/:id/voice", post(send_voice))
        .route(
            "/api/sessions/:id/turns/:turn/translation",
            post(toggle_translation),
        )
        // Synthesized audio
        .route("/api/sessions/:id/audio/:file", get(serve_audio))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Page
// ============================================================

async fn serve_page() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - UI not found</h1>".to_string()),
        )
            .into_response(),
    }
}

async fn list_starters() -> Json<StartersResponse> {
    Json(StartersResponse {
        starters: STARTERS.to_vec(),
    })
}

// ============================================================
// Session lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.runtime.create().await)
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.runtime.snapshot(&id).await?))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.runtime.end(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (snapshot, broadcast_rx) = state.runtime.subscribe(&id).await?;
    Ok(sse_stream(SseEvent::Snapshot(Box::new(snapshot)), broadcast_rx))
}

// ============================================================
// User actions
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message is empty".to_string()));
    }

    state
        .runtime
        .send_event(&id, Event::UserMessage { text: req.text })
        .await?;
    Ok(Json(QueuedResponse { queued: true }))
}

/// The body is the recorded clip; its media type comes from `Content-Type`
async fn send_voice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    TypedHeader(content_type): TypedHeader<ContentType>,
    body: Bytes,
) -> Result<Json<QueuedResponse>, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("Recording is empty".to_string()));
    }

    let clip = AudioClip {
        bytes: body.to_vec(),
        media_type: content_type.to_string(),
    };
    tracing::debug!(
        session_id = %id,
        media_type = %clip.media_type,
        bytes = clip.bytes.len(),
        "Voice clip received"
    );

    state
        .runtime
        .send_event(&id, Event::VoiceClip { clip })
        .await?;
    Ok(Json(QueuedResponse { queued: true }))
}

async fn toggle_translation(
    State(state): State<AppState>,
    Path((id, turn)): Path<(String, usize)>,
) -> Result<Json<QueuedResponse>, AppError> {
    let snapshot = state.runtime.snapshot(&id).await?;
    let translatable = snapshot.turns.get(turn).is_some_and(|t| t.translatable);
    if !translatable {
        return Err(AppError::BadRequest(format!(
            "Turn {turn} cannot be translated"
        )));
    }

    state
        .runtime
        .send_event(&id, Event::ToggleTranslation { turn })
        .await?;
    Ok(Json(QueuedResponse { queued: true }))
}

// ============================================================
// Audio
// ============================================================

async fn serve_audio(
    State(state): State<AppState>,
    Path((id, file)): Path<(String, String)>,
) -> Result<Response, AppError> {
    if !is_plain_file_name(&file) {
        return Err(AppError::BadRequest("Invalid audio file name".to_string()));
    }
    if !state.runtime.contains(&id).await {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }

    let path = state.runtime.audio_dir(&id).join(&file);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::NotFound(format!("No audio named {file}")))?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    Ok(([(header::CONTENT_TYPE, mime.as_ref().to_string())], bytes).into_response())
}

/// A single file name with no directory parts and no leading dot
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

async fn get_version() -> &'static str {
    concat!("woezor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::NotFound(_) => AppError::NotFound(e.to_string()),
            RuntimeError::Busy => AppError::Conflict(e.to_string()),
            RuntimeError::Closed(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
