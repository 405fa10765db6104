// Prompt fragments used to seed a chat session. The seeded history carries
// one turn per uploaded file followed by one turn framing the job
// description, so every later prompt is answered against both.

/// Instruction attached to each uploaded document in the seed history.
pub const DOCUMENT_ANALYSIS_INSTRUCTION: &str =
    "Please analyze the document above for reference in the questions to follow.\n\n";

/// Template for the job-description turn. `{jd_text}` is the raw text as
/// entered; no normalization beyond what the user typed.
pub const JOB_DESCRIPTION_TEMPLATE: &str = "JOB DESCRIPTION:\n{jd_text}\n";

/// Instruction that closes the seed history and frames the whole session.
pub const SUITABILITY_INSTRUCTION: &str =
    "Please assess the strengths and weaknesses for suitability to the job description provided above.";

pub fn job_description_block(jd_text: &str) -> String {
    JOB_DESCRIPTION_TEMPLATE.replace("{jd_text}", jd_text)
}
