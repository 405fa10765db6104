//! Axum route handlers for the session lifecycle API.
//!
//! Each handler is one UI interaction from the original surface: model
//! dropdown, job-description text area, zoom slider, reset button, plus
//! session creation and the view the front-end polls after each action.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gemini::SUPPORTED_MODELS;
use crate::session::store::SharedSession;
use crate::session::transcript::TranscriptEntry;
use crate::session::{validate_model, validate_zoom, Phase, UserSession};
use crate::state::AppState;

async fn fetch_session(state: &AppState, id: Uuid) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub file_name: Option<String>,
    pub uri: String,
    pub page_count: usize,
    /// Pixel dimensions per page so the viewer can lay out before images load.
    pub pages: Vec<PageSize>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub phase: Phase,
    pub document: Option<DocumentView>,
    pub model: Option<String>,
    pub job_description: String,
    pub zoom_level: u32,
    pub transcript: Vec<TranscriptEntry>,
}

impl SessionView {
    fn from_session(session: &UserSession) -> Self {
        let document = session.files.first().map(|file| DocumentView {
            file_name: file.display_name.clone(),
            uri: file.uri.clone(),
            page_count: session.pages.len(),
            pages: session
                .pages
                .iter()
                .map(|p| PageSize {
                    width: p.width,
                    height: p.height,
                })
                .collect(),
        });

        Self {
            session_id: session.id,
            created_at: session.created_at,
            phase: session.phase(),
            document,
            model: session.selected_model.clone(),
            job_description: session.job_description.clone(),
            zoom_level: session.zoom_level,
            transcript: session.transcript.entries().to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetJobDescriptionRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct SetJobDescriptionResponse {
    pub job_description: String,
    /// True when a chat session already exists: the edit is stored but the
    /// seeded history keeps the job description it was created with.
    pub chat_already_seeded: bool,
}

#[derive(Debug, Deserialize)]
pub struct SelectModelRequest {
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct SetZoomRequest {
    pub zoom_level: u32,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<&'static str>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/models
///
/// The fixed model set backing the dropdown.
pub async fn handle_list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: SUPPORTED_MODELS.to_vec(),
    })
}

/// POST /api/v1/sessions
pub async fn handle_create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session_id = state.sessions.create().await;
    Json(CreateSessionResponse { session_id })
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = fetch_session(&state, session_id).await?;
    let session = session.lock().await;
    Ok(Json(SessionView::from_session(&session)))
}

/// PUT /api/v1/sessions/:id/job-description
///
/// Blank text is a valid "unset" value; the chat gate checks for it.
pub async fn handle_set_job_description(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SetJobDescriptionRequest>,
) -> Result<Json<SetJobDescriptionResponse>, AppError> {
    let session = fetch_session(&state, session_id).await?;
    let mut session = session.lock().await;

    session.job_description = request.job_description.clone();

    Ok(Json(SetJobDescriptionResponse {
        job_description: request.job_description,
        chat_already_seeded: session.chat.is_some(),
    }))
}

/// PUT /api/v1/sessions/:id/model
///
/// Accepts one of the two supported model ids. A change after the chat
/// session exists is stored but never rebinds the running chat.
pub async fn handle_select_model(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectModelRequest>,
) -> Result<Json<Value>, AppError> {
    validate_model(&request.model)?;

    let session = fetch_session(&state, session_id).await?;
    let mut session = session.lock().await;
    session.selected_model = Some(request.model.clone());

    Ok(Json(json!({ "model": request.model })))
}

/// PUT /api/v1/sessions/:id/zoom
pub async fn handle_set_zoom(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SetZoomRequest>,
) -> Result<Json<Value>, AppError> {
    let zoom_level = validate_zoom(request.zoom_level)?;

    let session = fetch_session(&state, session_id).await?;
    session.lock().await.zoom_level = zoom_level;

    Ok(Json(json!({ "zoom_level": zoom_level })))
}

/// POST /api/v1/sessions/:id/reset
///
/// Clears the whole session context. A session that never saw an upload
/// reports a no-op error instead.
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let session = fetch_session(&state, session_id).await?;
    let mut session = session.lock().await;

    session.reset()?;
    info!("Session state deleted successfully.");

    Ok(Json(json!({ "status": "reset" })))
}
