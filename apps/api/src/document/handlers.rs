//! Axum route handlers for document upload and the page viewer.

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::document::render::render_pages;
use crate::errors::AppError;
use crate::gemini::files::await_activation;
use crate::state::AppState;

const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    pub uri: String,
    pub page_count: usize,
}

/// Single-file PDF uploads only: a declared PDF content type, or a `.pdf`
/// filename when the browser omits the type.
fn is_pdf_upload(content_type: Option<&str>, file_name: &str) -> bool {
    match content_type {
        Some(ct) => ct == PDF_MIME,
        None => file_name.to_ascii_lowercase().ends_with(".pdf"),
    }
}

/// Strips any client-supplied directory components from the filename.
fn safe_file_name(raw: &str) -> String {
    std::path::Path::new(raw)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string())
}

/// POST /api/v1/sessions/:id/document
///
/// Upload → hosted-service upload → page rasterization → blocking wait for
/// activation. The session mutex is held throughout, so a second upload for
/// the same session queues behind this one and is then rejected as a
/// conflict.
pub async fn handle_upload_document(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
    let mut session = session.lock().await;

    if session.has_document() {
        return Err(AppError::Conflict(
            "a document is already uploaded for this session; reset it first".to_string(),
        ));
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
        .ok_or_else(|| AppError::Validation("expected a 'file' field".to_string()))?;

    let file_name = safe_file_name(field.file_name().unwrap_or("document.pdf"));
    let content_type = field.content_type().map(|s| s.to_string());
    if !is_pdf_upload(content_type.as_deref(), &file_name) {
        return Err(AppError::Validation(
            "only PDF uploads are supported".to_string(),
        ));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("could not read upload: {e}")))?;

    // Scratch dir per upload; deleted when this handler returns.
    let temp_dir = tempfile::tempdir().map_err(anyhow::Error::from)?;
    let temp_path = temp_dir.path().join(&file_name);
    tokio::fs::write(&temp_path, &data)
        .await
        .map_err(anyhow::Error::from)?;
    info!("File saved to temporary path: {}", temp_path.display());

    let handle = state.gemini.upload_file(&temp_path, PDF_MIME).await?;

    // Pages render regardless of whether activation later succeeds.
    let pages = render_pages(data.to_vec()).await?;

    await_activation(&state.gemini, std::slice::from_ref(&handle), &state.activation).await?;

    let response = UploadResponse {
        file_name: handle.display_name.clone().unwrap_or(file_name),
        uri: handle.uri.clone(),
        page_count: pages.len(),
    };

    session.files = vec![handle];
    session.pages = pages;

    Ok(Json(response))
}

/// GET /api/v1/sessions/:id/pages/:page
///
/// Returns one rendered page as PNG. Pages are numbered from 1.
pub async fn handle_get_page(
    State(state): State<AppState>,
    Path((session_id, page)): Path<(Uuid, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
    let session = session.lock().await;

    let index = page
        .checked_sub(1)
        .ok_or_else(|| AppError::Validation("pages are numbered from 1".to_string()))?;
    let image = session
        .pages
        .get(index)
        .ok_or_else(|| AppError::NotFound(format!("Page {page} not found")))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], image.png.clone()))
}
