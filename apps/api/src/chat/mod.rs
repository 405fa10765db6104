//! Chat sessions: seeded history plus per-exchange transcript bookkeeping.

pub mod handlers;

use tracing::info;

use crate::errors::AppError;
use crate::gemini::files::FileHandle;
use crate::gemini::prompts::{
    job_description_block, DOCUMENT_ANALYSIS_INSTRUCTION, SUITABILITY_INSTRUCTION,
};
use crate::gemini::{Content, GeminiError, GenerationConfig, Part, TextGenerator};
use crate::session::UserSession;

/// Stateful handle to a multi-turn exchange with one model.
///
/// The hosted generateContent endpoint is stateless, so the session owns the
/// history and ships all of it with every call, the REST equivalent of the
/// SDK's `start_chat` / `send_message`.
#[derive(Debug, Clone)]
pub struct ChatSession {
    model: String,
    config: GenerationConfig,
    history: Vec<Content>,
}

impl ChatSession {
    /// Seeds the history: one user turn per uploaded file (file reference +
    /// analysis instruction), then one user turn framing the job description
    /// and asking for a suitability assessment.
    pub fn seeded(model: &str, files: &[FileHandle], job_description: &str) -> Self {
        let mut history = Vec::with_capacity(files.len() + 1);
        for file in files {
            history.push(Content::user(vec![
                Part::file(file),
                Part::text(DOCUMENT_ANALYSIS_INSTRUCTION),
            ]));
        }
        history.push(Content::user(vec![
            Part::text(job_description_block(job_description)),
            Part::text(SUITABILITY_INSTRUCTION),
        ]));

        Self {
            model: model.to_string(),
            config: GenerationConfig::default(),
            history,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Sends one user message verbatim and returns the reply text. The user
    /// turn stays in the wire history only when a reply arrived, so a failed
    /// call leaves the history exactly as before.
    pub async fn send_message(
        &mut self,
        llm: &dyn TextGenerator,
        text: &str,
    ) -> Result<String, GeminiError> {
        self.history.push(Content::user_text(text));

        match llm.generate(&self.model, &self.history, &self.config).await {
            Ok(reply) => {
                self.history.push(Content::model_text(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }
}

/// Runs one full prompt/reply exchange against the session.
///
/// Lazily creates the chat session (exactly once per document lifecycle),
/// appends the user turn, and forwards the prompt. A failed reply marks the
/// user turn failed in the transcript and surfaces the error; the transcript
/// gains no assistant entry in that case.
pub async fn run_exchange(
    session: &mut UserSession,
    llm: &dyn TextGenerator,
    prompt: &str,
) -> Result<String, AppError> {
    session.ensure_chat_session()?;

    info!("Processing question: {prompt}");
    let user_idx = session.transcript.push_user(prompt);

    let Some(chat) = session.chat.as_mut() else {
        session.transcript.mark_failed(user_idx);
        return Err(AppError::Internal(anyhow::anyhow!(
            "chat session missing after creation"
        )));
    };

    match chat.send_message(llm, prompt).await {
        Ok(reply) => {
            session.transcript.push_assistant(&reply);
            info!("Question processed and response generated");
            Ok(reply)
        }
        Err(e) => {
            session.transcript.mark_failed(user_idx);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::files::FileState;
    use crate::session::transcript::{EntryStatus, Role};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn file_handle() -> FileHandle {
        FileHandle {
            name: "files/abc123".to_string(),
            uri: "https://generativelanguage.googleapis.com/v1beta/files/abc123".to_string(),
            display_name: Some("resume.pdf".to_string()),
            mime_type: "application/pdf".to_string(),
            state: FileState::Active,
        }
    }

    fn ready_session() -> UserSession {
        let mut s = UserSession::new(Uuid::new_v4());
        s.files = vec![file_handle()];
        s.selected_model = Some("gemini-1.5-flash".to_string());
        s.job_description = "Senior Rust Engineer, distributed systems".to_string();
        s
    }

    /// Replays scripted replies and records every request it sees.
    struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, String>>>,
        requests: Mutex<Vec<Vec<Content>>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last_request(&self) -> Vec<Content> {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _model: &str,
            contents: &[Content],
            _config: &GenerationConfig,
        ) -> Result<String, GeminiError> {
            self.requests.lock().unwrap().push(contents.to_vec());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(GeminiError::Api {
                    status: 500,
                    message,
                }),
                None => panic!("generator called more times than scripted"),
            }
        }
    }

    fn part_text(part: &Part) -> Option<&str> {
        match part {
            Part::Text { text } => Some(text),
            Part::FileData { .. } => None,
        }
    }

    #[test]
    fn test_seeded_history_has_one_turn_per_file_plus_jd_turn() {
        let chat = ChatSession::seeded(
            "gemini-1.5-pro",
            &[file_handle()],
            "Backend engineer, Go and Rust",
        );

        let history = chat.history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|c| c.role == "user"));

        // file turn: file reference then the analysis instruction
        assert_eq!(history[0].parts.len(), 2);
        assert!(matches!(history[0].parts[0], Part::FileData { .. }));
        assert_eq!(
            part_text(&history[0].parts[1]),
            Some(DOCUMENT_ANALYSIS_INSTRUCTION)
        );

        // JD turn: framed text then the suitability instruction
        let jd_block = part_text(&history[1].parts[0]).unwrap();
        assert!(jd_block.contains("Backend engineer, Go and Rust"));
        assert_eq!(part_text(&history[1].parts[1]), Some(SUITABILITY_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_send_message_forwards_prompt_verbatim_and_appends_reply() {
        let generator = ScriptedGenerator::new(vec![Ok("a strong match".to_string())]);
        let mut chat = ChatSession::seeded("gemini-1.5-flash", &[file_handle()], "SRE role");
        let seeded_len = chat.history().len();

        let reply = chat
            .send_message(&generator, "How well does this résumé fit?")
            .await
            .unwrap();

        assert_eq!(reply, "a strong match");
        // user turn + model turn appended
        assert_eq!(chat.history().len(), seeded_len + 2);

        let sent = generator.last_request();
        let last = sent.last().unwrap();
        assert_eq!(last.role, "user");
        assert_eq!(
            part_text(&last.parts[0]),
            Some("How well does this résumé fit?")
        );
    }

    #[tokio::test]
    async fn test_send_message_failure_leaves_history_unchanged() {
        let generator = ScriptedGenerator::new(vec![Err("backend unavailable".to_string())]);
        let mut chat = ChatSession::seeded("gemini-1.5-flash", &[file_handle()], "SRE role");
        let seeded_len = chat.history().len();

        let err = chat.send_message(&generator, "anyone home?").await.unwrap_err();
        assert!(matches!(err, GeminiError::Api { .. }));
        assert_eq!(chat.history().len(), seeded_len);
    }

    #[tokio::test]
    async fn test_exchange_appends_alternating_user_and_assistant_entries() {
        let generator = ScriptedGenerator::new(vec![
            Ok("reply 0".to_string()),
            Ok("reply 1".to_string()),
            Ok("reply 2".to_string()),
        ]);
        let mut session = ready_session();

        for i in 0..3 {
            let reply = run_exchange(&mut session, &generator, &format!("question {i}"))
                .await
                .unwrap();
            assert_eq!(reply, format!("reply {i}"));
        }

        let entries = session.transcript.entries();
        assert_eq!(entries.len(), 6);
        for (i, entry) in entries.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(entry.role, expected);
            assert_eq!(entry.status, EntryStatus::Ok);
        }
    }

    #[tokio::test]
    async fn test_failed_exchange_marks_user_turn_and_adds_no_reply() {
        let generator = ScriptedGenerator::new(vec![
            Ok("fine so far".to_string()),
            Err("rate limited".to_string()),
        ]);
        let mut session = ready_session();

        run_exchange(&mut session, &generator, "first").await.unwrap();
        let err = run_exchange(&mut session, &generator, "second").await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));

        let entries = session.transcript.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].role, Role::User);
        assert_eq!(entries[2].status, EntryStatus::Failed);
        assert_eq!(
            entries.iter().filter(|e| e.role == Role::Assistant).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_exchange_without_preconditions_names_whats_missing() {
        let generator = ScriptedGenerator::new(vec![]);
        let mut session = ready_session();
        session.job_description.clear();

        let err = run_exchange(&mut session, &generator, "hello").await.unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("a job description")),
            other => panic!("unexpected error: {other:?}"),
        }
        // gate fails before anything is appended
        assert!(session.transcript.is_empty());
        assert!(session.chat.is_none());
    }

    #[tokio::test]
    async fn test_first_exchange_seeds_chat_exactly_once() {
        let generator = ScriptedGenerator::new(vec![
            Ok("seeded reply".to_string()),
            Ok("second reply".to_string()),
        ]);
        let mut session = ready_session();

        run_exchange(&mut session, &generator, "first").await.unwrap();
        let model = session.chat.as_ref().unwrap().model().to_string();

        // model edits between prompts do not rebind the chat
        session.selected_model = Some("gemini-1.5-pro".to_string());
        run_exchange(&mut session, &generator, "second").await.unwrap();

        assert_eq!(session.chat.as_ref().unwrap().model(), model);
    }
}
