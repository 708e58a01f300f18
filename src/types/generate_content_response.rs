use serde::{Deserialize, Serialize};

use crate::types::Content;

/// One candidate reply within a response chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The generated content, absent on some terminal chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    /// Why generation stopped, e.g. `STOP` or `SAFETY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Index of the candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// Token accounting attached to (usually the last) response chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt, including history and system instruction.
    #[serde(default)]
    pub prompt_token_count: u32,

    /// Tokens generated across candidates.
    #[serde(default)]
    pub candidates_token_count: u32,

    /// Total tokens billed.
    #[serde(default)]
    pub total_token_count: u32,
}

/// Feedback about the prompt, present when the prompt was blocked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// A full response, or one chunk of a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate replies.
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Prompt feedback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,

    /// Token usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,

    /// The model version that served the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Returns the reply text of the first candidate, or `None` when it carries no text.
    pub fn text(&self) -> Option<String> {
        let text = self.candidates.first()?.content.as_ref()?.text();
        if text.is_empty() { None } else { Some(text) }
    }

    /// Returns the finish reason of the first candidate.
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunk_deserialization() {
        let chunk: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Methodias builds "}], "role": "model"},
                "index": 0
            }],
            "usageMetadata": {"promptTokenCount": 412, "totalTokenCount": 416},
            "modelVersion": "gemini-2.5-flash"
        }))
        .unwrap();

        assert_eq!(chunk.text().as_deref(), Some("Methodias builds "));
        assert_eq!(chunk.finish_reason(), None);
        let usage = chunk.usage_metadata.unwrap();
        assert_eq!(usage.prompt_token_count, 412);
        assert_eq!(usage.candidates_token_count, 0);
        assert_eq!(chunk.model_version.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn terminal_chunk_without_text() {
        let chunk: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": ""}], "role": "model"}, "finishReason": "STOP"}]
        }))
        .unwrap();
        assert_eq!(chunk.text(), None);
        assert_eq!(chunk.finish_reason(), Some("STOP"));
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let chunk: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(chunk.text(), None);
        assert_eq!(
            chunk.prompt_feedback.and_then(|f| f.block_reason).as_deref(),
            Some("SAFETY")
        );
    }
}
