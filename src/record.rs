//! The persisted submission record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a results view needs about one submission, persisted to the
/// key-value collaborator as JSON (camelCase wire names).
///
/// `feedback` is JSON `null` until the critique has been parsed, and is set
/// exactly once; the record is written twice under the same key — once
/// right after both uploads succeed, once after feedback is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    pub resume_path: String,
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub feedback: Value,
}

impl SubmissionRecord {
    pub fn new(
        id: impl Into<String>,
        resume_path: impl Into<String>,
        image_path: impl Into<String>,
        company_name: impl Into<String>,
        job_title: impl Into<String>,
        job_description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resume_path: resume_path.into(),
            image_path: image_path.into(),
            company_name: company_name.into(),
            job_title: job_title.into(),
            job_description: job_description.into(),
            feedback: Value::Null,
        }
    }

    /// Stable key this record is persisted under.
    pub fn kv_key(&self, prefix: &str) -> String {
        format!("{prefix}:{}", self.id)
    }

    pub fn has_feedback(&self) -> bool {
        !self.feedback.is_null()
    }

    /// Attach the parsed critique. Called once per record, after a
    /// successful parse.
    pub fn attach_feedback(&mut self, feedback: Value) {
        self.feedback = feedback;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> SubmissionRecord {
        SubmissionRecord::new(
            "abc-123",
            "/store/resume.pdf",
            "/store/resume.png",
            "Acme",
            "Staff Engineer",
            "Build things.",
        )
    }

    #[test]
    fn feedback_starts_null() {
        let r = record();
        assert!(!r.has_feedback());
        assert_eq!(r.feedback, Value::Null);
    }

    #[test]
    fn kv_key_is_prefix_colon_id() {
        assert_eq!(record().kv_key("resume"), "resume:abc-123");
    }

    #[test]
    fn serialises_with_camel_case_wire_names() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["resumePath"], "/store/resume.pdf");
        assert_eq!(json["imagePath"], "/store/resume.png");
        assert_eq!(json["companyName"], "Acme");
        assert_eq!(json["jobTitle"], "Staff Engineer");
        assert_eq!(json["jobDescription"], "Build things.");
        assert_eq!(json["feedback"], Value::Null);
    }

    #[test]
    fn round_trips_with_feedback_attached() {
        let mut r = record();
        r.attach_feedback(json!({"overallScore": 81}));
        assert!(r.has_feedback());

        let text = serde_json::to_string(&r).unwrap();
        let back: SubmissionRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, r);
        assert_eq!(back.feedback["overallScore"], 81);
    }
}
