//! Axum route handler for the chat API.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::run_exchange;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub reply: String,
    pub transcript_len: usize,
}

/// POST /api/v1/sessions/:id/messages
///
/// The session mutex is held across the model call: prompts for one session
/// are processed one at a time, in submission order.
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
    let mut session = session.lock().await;

    let reply = run_exchange(&mut session, &state.gemini, &request.prompt).await?;

    Ok(Json(SendMessageResponse {
        reply,
        transcript_len: session.transcript.len(),
    }))
}
