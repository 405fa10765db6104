//! File upload and activation against the Gemini Files API.
//!
//! Uploaded files are processed server-side before they can be referenced in
//! a conversation. `await_activation` polls each file strictly sequentially
//! until it leaves `PROCESSING`; the poll count is bounded so a file stuck in
//! processing surfaces as a timeout instead of hanging the upload handler.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part as MultipartPart};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use super::{GeminiClient, GeminiError};

/// Server-side processing state of an uploaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    /// Catch-all for states this client does not know about.
    #[default]
    #[serde(other)]
    StateUnspecified,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileState::StateUnspecified => "STATE_UNSPECIFIED",
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Opaque reference to a file owned by the hosted service. The local copy is
/// never mutated; activation waiting re-fetches the resource each poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHandle {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: FileState,
}

#[derive(Debug, Deserialize)]
struct UploadFileResponse {
    file: FileHandle,
}

impl GeminiClient {
    /// Uploads a file from disk with a declared MIME type. The handle comes
    /// back immediately; server-side processing continues asynchronously and
    /// is observed via `get_file` / `await_activation`.
    pub async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<FileHandle, GeminiError> {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let bytes = tokio::fs::read(path).await?;

        let metadata = serde_json::json!({ "file": { "display_name": display_name } });
        let form = Form::new()
            .part(
                "metadata",
                MultipartPart::text(metadata.to_string()).mime_str("application/json")?,
            )
            .part(
                "file",
                MultipartPart::bytes(bytes)
                    .file_name(display_name.clone())
                    .mime_str(mime_type)?,
            );

        let response = self
            .http()
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), body));
        }

        let uploaded: UploadFileResponse = serde_json::from_str(&body)?;
        info!(
            "Uploaded file '{}' as: {}",
            uploaded.file.display_name.as_deref().unwrap_or(&uploaded.file.name),
            uploaded.file.uri
        );

        Ok(uploaded.file)
    }

    /// Re-fetches the file resource, including its current `state`.
    pub async fn get_file(&self, name: &str) -> Result<FileHandle, GeminiError> {
        let response = self.http().get(self.url(name)).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Activation waiting
// ────────────────────────────────────────────────────────────────────────────

/// Where activation polls read file state from. `GeminiClient` is the only
/// production implementation; tests script state sequences through it.
#[async_trait]
pub trait FileStatusSource: Send + Sync {
    async fn file_state(&self, name: &str) -> Result<FileHandle, GeminiError>;
}

#[async_trait]
impl FileStatusSource for GeminiClient {
    async fn file_state(&self, name: &str) -> Result<FileHandle, GeminiError> {
        self.get_file(name).await
    }
}

/// Poll cadence and ceiling for activation waiting.
#[derive(Debug, Clone, Copy)]
pub struct ActivationPolicy {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for ActivationPolicy {
    fn default() -> Self {
        // 10s cadence, 5 minute ceiling.
        Self {
            poll_interval: Duration::from_secs(10),
            max_polls: 30,
        }
    }
}

/// Waits for every handle to reach `ACTIVE`, strictly sequentially.
///
/// While a file reports `PROCESSING`, sleeps one interval and re-polls. Any
/// other non-`ACTIVE` state fails immediately, naming the file. Exceeding
/// `max_polls` for a single file fails with a timeout.
pub async fn await_activation(
    source: &dyn FileStatusSource,
    handles: &[FileHandle],
    policy: &ActivationPolicy,
) -> Result<(), GeminiError> {
    info!("Waiting for {} file(s) to be processed...", handles.len());

    for handle in handles {
        let mut polls = 0u32;
        loop {
            let current = source.file_state(&handle.name).await?;
            match current.state {
                FileState::Active => break,
                FileState::Processing => {
                    if polls >= policy.max_polls {
                        return Err(GeminiError::ActivationTimeout {
                            name: handle.name.clone(),
                            waited_secs: policy.poll_interval.as_secs() * u64::from(polls),
                        });
                    }
                    polls += 1;
                    debug!("file {} still processing (poll {polls})", handle.name);
                    sleep(policy.poll_interval).await;
                }
                state => {
                    return Err(GeminiError::FileProcessing {
                        name: handle.name.clone(),
                        state,
                    });
                }
            }
        }
    }

    info!("... {} file(s) ready", handles.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn handle(name: &str) -> FileHandle {
        FileHandle {
            name: name.to_string(),
            uri: format!("https://example.invalid/v1beta/{name}"),
            display_name: Some("resume.pdf".to_string()),
            mime_type: "application/pdf".to_string(),
            state: FileState::Processing,
        }
    }

    fn policy(interval_secs: u64, max_polls: u32) -> ActivationPolicy {
        ActivationPolicy {
            poll_interval: Duration::from_secs(interval_secs),
            max_polls,
        }
    }

    /// Replays a scripted state sequence; repeats the last state when the
    /// script runs out. Counts polls.
    struct ScriptedStatusSource {
        states: Mutex<VecDeque<FileState>>,
        last: FileState,
        polls: AtomicUsize,
    }

    impl ScriptedStatusSource {
        fn new(states: &[FileState]) -> Self {
            Self {
                states: Mutex::new(states.to_vec().into()),
                last: *states.last().unwrap_or(&FileState::Processing),
                polls: AtomicUsize::new(0),
            }
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FileStatusSource for ScriptedStatusSource {
        async fn file_state(&self, name: &str) -> Result<FileHandle, GeminiError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let state = self
                .states
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.last);
            Ok(FileHandle { state, ..handle(name) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_succeeds_after_exactly_two_intervals() {
        use FileState::*;
        let source = ScriptedStatusSource::new(&[Processing, Processing, Active]);
        let start = tokio::time::Instant::now();

        await_activation(&source, &[handle("files/a1")], &policy(10, 30))
            .await
            .unwrap();

        assert_eq!(source.polls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_immediate_active_never_sleeps() {
        let source = ScriptedStatusSource::new(&[FileState::Active]);
        let start = tokio::time::Instant::now();

        await_activation(&source, &[handle("files/a1")], &policy(10, 30))
            .await
            .unwrap();

        assert_eq!(source.polls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_terminal_failure_names_the_file() {
        use FileState::*;
        let source = ScriptedStatusSource::new(&[Processing, Failed]);

        let err = await_activation(&source, &[handle("files/bad")], &policy(10, 30))
            .await
            .unwrap_err();

        match err {
            GeminiError::FileProcessing { name, state } => {
                assert_eq!(name, "files/bad");
                assert_eq!(state, Failed);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_times_out_after_poll_ceiling() {
        let source = ScriptedStatusSource::new(&[FileState::Processing]);

        let err = await_activation(&source, &[handle("files/stuck")], &policy(10, 2))
            .await
            .unwrap_err();

        match err {
            GeminiError::ActivationTimeout { name, waited_secs } => {
                assert_eq!(name, "files/stuck");
                assert_eq!(waited_secs, 20);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Ceiling of 2 sleeps means exactly 3 polls before giving up.
        assert_eq!(source.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_polls_handles_sequentially() {
        let source = ScriptedStatusSource::new(&[FileState::Active]);
        let handles = [handle("files/a1"), handle("files/a2")];

        await_activation(&source, &handles, &policy(10, 30))
            .await
            .unwrap();

        assert_eq!(source.polls(), 2);
    }

    #[test]
    fn test_file_state_deserializes_screaming_case() {
        let state: FileState = serde_json::from_str(r#""ACTIVE""#).unwrap();
        assert_eq!(state, FileState::Active);
        let state: FileState = serde_json::from_str(r#""PROCESSING""#).unwrap();
        assert_eq!(state, FileState::Processing);
    }

    #[test]
    fn test_unknown_file_state_maps_to_unspecified() {
        let state: FileState = serde_json::from_str(r#""SOMETHING_NEW""#).unwrap();
        assert_eq!(state, FileState::StateUnspecified);
    }

    #[test]
    fn test_file_handle_deserializes_upload_envelope_fields() {
        let json = r#"{
            "name": "files/abc123",
            "displayName": "resume.pdf",
            "mimeType": "application/pdf",
            "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
            "state": "PROCESSING",
            "sizeBytes": "123456"
        }"#;
        let file: FileHandle = serde_json::from_str(json).unwrap();
        assert_eq!(file.name, "files/abc123");
        assert_eq!(file.display_name.as_deref(), Some("resume.pdf"));
        assert_eq!(file.state, FileState::Processing);
    }
}
