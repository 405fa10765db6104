pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post, put},
    Router,
};

use crate::chat;
use crate::document;
use crate::session::handlers;
use crate::state::AppState;

/// Uploads are single PDFs; 32 MiB covers scanned résumés comfortably.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/models", get(handlers::handle_list_models))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route("/api/v1/sessions/:id", get(handlers::handle_get_session))
        .route(
            "/api/v1/sessions/:id/document",
            post(document::handlers::handle_upload_document),
        )
        .route(
            "/api/v1/sessions/:id/pages/:page",
            get(document::handlers::handle_get_page),
        )
        .route(
            "/api/v1/sessions/:id/job-description",
            put(handlers::handle_set_job_description),
        )
        .route(
            "/api/v1/sessions/:id/model",
            put(handlers::handle_select_model),
        )
        .route("/api/v1/sessions/:id/zoom", put(handlers::handle_set_zoom))
        .route(
            "/api/v1/sessions/:id/messages",
            post(chat::handlers::handle_send_message),
        )
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
