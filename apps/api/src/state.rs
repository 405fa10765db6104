use crate::gemini::files::ActivationPolicy;
use crate::gemini::GeminiClient;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub gemini: GeminiClient,
    /// In-memory session registry, one typed context per browser session.
    pub sessions: SessionStore,
    /// Poll cadence and ceiling for file activation after upload.
    pub activation: ActivationPolicy,
}
