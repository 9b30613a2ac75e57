//! Critique instructions for the AI feedback collaborator.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tightening a rule or reshaping the
//!    response format is a one-place edit.
//! 2. **Testability** — unit tests inspect the built instructions directly
//!    without calling a model.
//!
//! Callers can override the whole instruction string via
//! [`crate::config::SubmissionConfig::instructions`]; these constants are
//! used only when no override is provided.

/// JSON shape the model must answer with. Kept as a literal so the prompt
/// and the parser stay visibly in sync.
pub const FEEDBACK_RESPONSE_FORMAT: &str = r#"{
  "overallScore": number (0-100),
  "ATS": {
    "score": number (0-100),
    "tips": [{ "type": "good" | "improve", "tip": string }]
  },
  "toneAndStyle": {
    "score": number (0-100),
    "tips": [{ "type": "good" | "improve", "tip": string, "explanation": string }]
  },
  "content": {
    "score": number (0-100),
    "tips": [{ "type": "good" | "improve", "tip": string, "explanation": string }]
  },
  "structure": {
    "score": number (0-100),
    "tips": [{ "type": "good" | "improve", "tip": string, "explanation": string }]
  },
  "skills": {
    "score": number (0-100),
    "tips": [{ "type": "good" | "improve", "tip": string, "explanation": string }]
  }
}"#;

/// Build the critique instructions for one submission.
///
/// The résumé itself travels alongside these instructions (as the stored
/// document the collaborator reads); the instructions carry the job
/// context and the required response shape.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    format!(
        r#"You are an expert in ATS (Applicant Tracking Systems) and resume review.
Analyze and rate the provided resume, and suggest how to improve it.

Follow these rules precisely:

1. BE HONEST
   - The rating can be low if the resume is weak; do not inflate scores
   - Be thorough and detailed; vague praise helps nobody

2. USE THE JOB CONTEXT
   - The candidate is applying for the job title: {job_title}
   - Judge the resume against this job description:
     {job_description}
   - Call out missing keywords and skills the description asks for

3. OUTPUT FORMAT
   - Answer with a single JSON object in exactly this shape:
     {format}
   - Output ONLY the JSON object
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary before or after the JSON"#,
        job_title = job_title,
        job_description = job_description,
        format = FEEDBACK_RESPONSE_FORMAT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_embed_job_context() {
        let instructions = prepare_instructions("Staff Engineer", "Ship Rust services.");
        assert!(instructions.contains("Staff Engineer"));
        assert!(instructions.contains("Ship Rust services."));
    }

    #[test]
    fn instructions_embed_the_response_format() {
        let instructions = prepare_instructions("a", "b");
        assert!(instructions.contains("overallScore"));
        assert!(instructions.contains("\"ATS\""));
        assert!(instructions.contains("ONLY the JSON object"));
    }
}
