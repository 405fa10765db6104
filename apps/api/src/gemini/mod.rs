/// Gemini Client — the single point of entry for all Gemini API calls in Fitchat.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All hosted-model interactions MUST go through this module.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod files;
pub mod prompts;

use files::{FileHandle, FileState};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";

/// The two models offered in the UI dropdown. Selection outside this set is
/// rejected at the handler layer.
pub const SUPPORTED_MODELS: [&str; 2] = ["gemini-1.5-pro", "gemini-1.5-flash"];

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file {name} failed to process (state: {state})")]
    FileProcessing { name: String, state: FileState },

    #[error("file {name} still processing after {waited_secs}s")]
    ActivationTimeout { name: String, waited_secs: u64 },
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types — generateContent
// ────────────────────────────────────────────────────────────────────────────

/// One conversation turn. Also the persistent history element of a chat
/// session, so it is Clone + Deserialize, not just a request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::text(text)])
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn file(handle: &FileHandle) -> Self {
        Part::FileData {
            file_data: FileData {
                mime_type: handle.mime_type.clone(),
                file_uri: handle.uri.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

/// Generation parameters sent with every chat call.
/// Temperature 1.0: the app wants inference on top of the document, not
/// pure retrieval. Lower it if answers should stick to the source text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    error: GeminiApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Generation seam
// ────────────────────────────────────────────────────────────────────────────

/// The text-generation seam used by the chat layer. `GeminiClient` is the
/// only production implementation; tests script replies through it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        contents: &[Content],
        config: &GenerationConfig,
    ) -> Result<String, GeminiError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single Gemini client used by all handlers in Fitchat.
/// Wraps the file upload/status endpoints and stateless generateContent.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Overrides the API origin after construction. Used by tests pointed at
    /// a local stub server.
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}?key={}",
            self.base_url, API_VERSION, path, self.api_key
        )
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/{}/files?key={}",
            self.base_url, API_VERSION, self.api_key
        )
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Turns a non-2xx response body into a typed API error, pulling the
    /// message out of the standard `{"error": {...}}` envelope when present.
    fn api_error(status: u16, body: String) -> GeminiError {
        let message = serde_json::from_str::<GeminiApiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        GeminiError::Api { status, message }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    /// Makes a stateless generateContent call with the full conversation so
    /// far. Returns the first text part of the first candidate; if the
    /// response carries no text part, falls back to the raw response body so
    /// the caller still sees what the service said.
    async fn generate(
        &self,
        model: &str,
        contents: &[Content],
        config: &GenerationConfig,
    ) -> Result<String, GeminiError> {
        let request_body = GenerateContentRequest {
            contents,
            generation_config: config,
        };

        let response = self
            .client
            .post(self.url(&format!("models/{model}:generateContent")))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;

        debug!("generateContent succeeded (model: {model})");

        match extract_text(parsed) {
            Some(text) => Ok(text),
            None => {
                warn!("generateContent returned no text part; falling back to raw body");
                Ok(body)
            }
        }
    }
}

fn extract_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .and_then(|mut candidates| {
            if candidates.is_empty() {
                None
            } else {
                Some(candidates.remove(0))
            }
        })
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
}
