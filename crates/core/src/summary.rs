//! Summarization prompt and fallback.

/// Stored in place of a summary when the inference call fails. Submission
/// never fails on summarization alone.
pub const SUMMARY_PLACEHOLDER: &str = "Summary unavailable";

/// Prompt for condensing a raw update into standup bullet points.
pub fn build_prompt(input: &str) -> String {
    format!(
        "You are an assistant summarizing team member updates.\n\
         Input: {input}\n\n\
         Task:\n\
         - Summarize into 2-3 bullet points\n\
         - Include what's done, what's in progress, any blockers\n\
         - Be concise and skip filler words\n\n\
         Output format:\n\
         - Completed: ...\n\
         - In Progress: ...\n\
         - Blocked: ...\n"
    )
}
