use serde::{Deserialize, Serialize};

/// The author of a turn in a Gemini conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The model side of the conversation.
    Model,
}

/// A single piece of content within a turn.
///
/// Only text parts are produced or consumed here; other part kinds the API may send are
/// ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Text carried by this part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Set by the API when the part is model reasoning rather than reply text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }

    /// Returns true if this part is reasoning output.
    pub fn is_thought(&self) -> bool {
        self.thought.unwrap_or(false)
    }
}

/// One turn of a conversation: a role and its parts.
///
/// The system instruction is also expressed as `Content`, with no role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// The author of the turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// The parts of the turn, in order.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user turn holding a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some(Role::User),
            parts: vec![Part::text(text)],
        }
    }

    /// Create a model turn holding a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Some(Role::Model),
            parts: vec![Part::text(text)],
        }
    }

    /// Create role-less content, as used for system instructions.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenate the reply text of every non-thought part.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|part| !part.is_thought())
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn user_content_serialization() {
        let content = Content::user("What are your skills?");
        assert_eq!(
            to_value(&content).unwrap(),
            json!({
                "role": "user",
                "parts": [{"text": "What are your skills?"}]
            })
        );
    }

    #[test]
    fn instruction_has_no_role() {
        let content = Content::instruction("Be concise.");
        assert_eq!(
            to_value(&content).unwrap(),
            json!({"parts": [{"text": "Be concise."}]})
        );
    }

    #[test]
    fn text_skips_thoughts_and_non_text_parts() {
        let content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                {"text": "planning...", "thought": true},
                {"text": "Hel"},
                {"inlineData": {"mimeType": "image/png", "data": ""}},
                {"text": "lo"}
            ]
        }))
        .unwrap();
        assert_eq!(content.role, Some(Role::Model));
        assert_eq!(content.text(), "Hello");
    }
}
