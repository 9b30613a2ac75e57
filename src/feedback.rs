//! Feedback response model and critique-payload parsing.
//!
//! AI collaborators answer in one of two shapes: a plain string, or a
//! sequence of content parts where the first element carries a `text`
//! field. Rather than probing shapes at runtime, [`MessageContent`] models
//! the two cases as an explicit (serde-untagged) union with one extraction
//! function per variant, so both arrive at the same place: a non-empty
//! critique string that must parse as JSON.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope returned by the AI feedback collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub message: FeedbackMessage,
}

impl FeedbackResponse {
    /// Wrap a plain completion string in the response envelope.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            message: FeedbackMessage {
                content: MessageContent::Text(text.into()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub content: MessageContent,
}

/// The two wire shapes of feedback content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// `"content": "…"`
    Text(String),
    /// `"content": [{"text": "…", …}, …]`
    Parts(Vec<ContentPart>),
}

/// One element of a content-part sequence. Unknown sibling fields (role,
/// type markers) are ignored on deserialisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    pub text: String,
}

impl MessageContent {
    /// Extract the critique text, or `None` when the content carries no
    /// non-empty text.
    pub fn extract_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => text_of_string(text),
            MessageContent::Parts(parts) => text_of_parts(parts),
        }
    }
}

fn text_of_string(text: &str) -> Option<&str> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn text_of_parts(parts: &[ContentPart]) -> Option<&str> {
    parts.first().and_then(|part| text_of_string(&part.text))
}

// ── Critique parsing ─────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n?(.*?)\n?```\s*$").unwrap());

/// Parse the extracted critique text as structured JSON.
///
/// Models occasionally wrap the payload in a markdown fence despite being
/// told not to; one outer fence is stripped before parsing so the error
/// path stays reserved for genuinely malformed payloads.
pub fn parse_feedback(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(strip_outer_fence(text))
}

fn strip_outer_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str()),
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_from_plain_string() {
        let content = MessageContent::Text("abc".into());
        assert_eq!(content.extract_text(), Some("abc"));
    }

    #[test]
    fn extract_from_parts_sequence() {
        let content = MessageContent::Parts(vec![ContentPart { text: "abc".into() }]);
        assert_eq!(content.extract_text(), Some("abc"));
    }

    #[test]
    fn both_shapes_yield_identical_text() {
        let plain = MessageContent::Text("abc".into());
        let parts = MessageContent::Parts(vec![ContentPart { text: "abc".into() }]);
        assert_eq!(plain.extract_text(), parts.extract_text());
    }

    #[test]
    fn empty_content_extracts_nothing() {
        assert_eq!(MessageContent::Text(String::new()).extract_text(), None);
        assert_eq!(MessageContent::Parts(vec![]).extract_text(), None);
        assert_eq!(
            MessageContent::Parts(vec![ContentPart { text: String::new() }]).extract_text(),
            None
        );
    }

    #[test]
    fn deserialises_both_wire_shapes() {
        let plain: FeedbackResponse =
            serde_json::from_value(json!({"message": {"content": "abc"}})).unwrap();
        assert_eq!(plain.message.content.extract_text(), Some("abc"));

        let parts: FeedbackResponse = serde_json::from_value(json!({
            "message": {"content": [{"text": "abc", "type": "output_text"}]}
        }))
        .unwrap();
        assert_eq!(parts.message.content.extract_text(), Some("abc"));
    }

    #[test]
    fn parse_feedback_accepts_bare_json() {
        let value = parse_feedback(r#"{"overallScore": 72}"#).unwrap();
        assert_eq!(value["overallScore"], 72);
    }

    #[test]
    fn parse_feedback_strips_one_outer_fence() {
        let fenced = "```json\n{\"overallScore\": 72}\n```";
        let value = parse_feedback(fenced).unwrap();
        assert_eq!(value["overallScore"], 72);

        let plain_fence = "```\n{\"overallScore\": 5}\n```";
        assert_eq!(parse_feedback(plain_fence).unwrap()["overallScore"], 5);
    }

    #[test]
    fn parse_feedback_rejects_prose() {
        assert!(parse_feedback("Here is your feedback!").is_err());
    }
}
