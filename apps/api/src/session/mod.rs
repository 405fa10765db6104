//! The per-user session context.
//!
//! The original UI kept this state as loose keys in a re-run-persistent
//! dictionary; here it is one typed struct with explicit fields and an
//! atomic `reset`. Every route handler reads and writes the same context,
//! fetched from the registry in `store`.

pub mod handlers;
pub mod store;
pub mod transcript;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::chat::ChatSession;
use crate::document::render::PageImage;
use crate::errors::AppError;
use crate::gemini::files::FileHandle;
use crate::gemini::SUPPORTED_MODELS;
use transcript::Transcript;

pub const DEFAULT_ZOOM: u32 = 700;
pub const ZOOM_MIN: u32 = 100;
pub const ZOOM_MAX: u32 = 1000;
pub const ZOOM_STEP: u32 = 50;

/// Where the session sits in its lifecycle. Computed from the fields, never
/// stored; the fields are the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Empty,
    AwaitingJobDescription,
    Ready,
    Chatting,
}

pub struct UserSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Hosted-service handles for the uploaded document. At most one file
    /// today; the seeding loop already handles several.
    pub files: Vec<FileHandle>,
    /// Rendered page images, document order.
    pub pages: Vec<PageImage>,
    pub selected_model: Option<String>,
    /// Raw text as entered. Blank means "not provided yet".
    pub job_description: String,
    pub zoom_level: u32,
    /// Created lazily, exactly once per document lifecycle. Immutable until
    /// reset: later model or job-description edits never reseed it.
    pub chat: Option<ChatSession>,
    pub transcript: Transcript,
}

impl UserSession {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            files: Vec::new(),
            pages: Vec::new(),
            selected_model: None,
            job_description: String::new(),
            zoom_level: DEFAULT_ZOOM,
            chat: None,
            transcript: Transcript::new(),
        }
    }

    pub fn has_document(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn phase(&self) -> Phase {
        if !self.has_document() {
            Phase::Empty
        } else if self.chat.is_none() {
            Phase::AwaitingJobDescription
        } else if self.transcript.is_empty() {
            Phase::Ready
        } else {
            Phase::Chatting
        }
    }

    /// Names every precondition still missing before a chat can start.
    pub fn missing_for_chat(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_document() {
            missing.push("an uploaded document");
        }
        if self.selected_model.is_none() {
            missing.push("a selected model");
        }
        if self.job_description.trim().is_empty() {
            missing.push("a job description");
        }
        missing
    }

    /// Creates the chat session once all preconditions hold. Idempotent: a
    /// session that already exists is left untouched. A missing precondition
    /// is a named validation error, not a silent gate.
    pub fn ensure_chat_session(&mut self) -> Result<(), AppError> {
        if self.chat.is_some() {
            return Ok(());
        }

        let missing = self.missing_for_chat();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "cannot start chat yet; missing: {}",
                missing.join(", ")
            )));
        }

        let Some(model) = self.selected_model.clone() else {
            return Err(AppError::Validation(
                "cannot start chat yet; missing: a selected model".to_string(),
            ));
        };

        self.chat = Some(ChatSession::seeded(
            &model,
            &self.files,
            &self.job_description,
        ));
        info!("Chat session created (model: {model})");
        Ok(())
    }

    /// Clears every field set since creation, atomically. Afterwards the
    /// session is indistinguishable from a freshly created one. Resetting a
    /// session that never saw an upload is a user-visible no-op error.
    pub fn reset(&mut self) -> Result<(), AppError> {
        if !self.has_document() {
            return Err(AppError::Validation("no session to delete".to_string()));
        }

        self.files.clear();
        self.pages.clear();
        self.selected_model = None;
        self.job_description.clear();
        self.zoom_level = DEFAULT_ZOOM;
        self.chat = None;
        self.transcript.clear();
        Ok(())
    }
}

pub fn validate_model(model: &str) -> Result<(), AppError> {
    if SUPPORTED_MODELS.contains(&model) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "unsupported model '{model}'; expected one of: {}",
            SUPPORTED_MODELS.join(", ")
        )))
    }
}

pub fn validate_zoom(zoom: u32) -> Result<u32, AppError> {
    if !(ZOOM_MIN..=ZOOM_MAX).contains(&zoom) || zoom % ZOOM_STEP != 0 {
        return Err(AppError::Validation(format!(
            "zoom_level must be between {ZOOM_MIN} and {ZOOM_MAX} in steps of {ZOOM_STEP}"
        )));
    }
    Ok(zoom)
}
