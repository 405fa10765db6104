//! The chat transcript: an ordered, append-only record of user/assistant
//! turns, cleared only by session reset.
//!
//! A user turn whose reply never arrived is marked `failed` rather than left
//! silently unmatched, so the UI can show the question with an error badge
//! and the user can retry it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub status: EntryStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a user turn and returns its index, so a failed exchange can
    /// mark exactly this entry.
    pub fn push_user(&mut self, content: impl Into<String>) -> usize {
        self.entries.push(TranscriptEntry {
            role: Role::User,
            content: content.into(),
            status: EntryStatus::Ok,
            at: Utc::now(),
        });
        self.entries.len() - 1
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role: Role::Assistant,
            content: content.into(),
            status: EntryStatus::Ok,
            at: Utc::now(),
        });
    }

    pub fn mark_failed(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.status = EntryStatus::Failed;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
