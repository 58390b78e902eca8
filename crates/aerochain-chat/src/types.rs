//! Chat types: prompt messages, content parts, uploads and response chunks.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Literal prefix of the in-band failure chunk.
pub const FAILURE_PREFIX: &str = "ANTIGRAVITY_FAILURE:";

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LLMProvider {
    Google,
    OpenAICompatible,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::Google => write!(f, "google"),
            LLMProvider::OpenAICompatible => write!(f, "openai_compatible"),
        }
    }
}

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Data URL wrapper, shaped like the OpenAI `image_url` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One part of a message's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::ImageUrl { .. } => None,
        }
    }
}

/// Chat message sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::text(text)],
        }
    }

    pub fn user(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    /// Concatenation of all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect()
    }
}

/// A file uploaded alongside the chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    /// Declared media type, as sent by the client.
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Incoming chat request, after form decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub attachment: Option<Attachment>,
}

impl ChatRequest {
    /// A request needs at least a non-empty message or an attachment.
    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.attachment.is_none()
    }
}

/// Format the in-band failure chunk for an error message.
pub fn failure_chunk(detail: &str) -> String {
    format!("{} {}", FAILURE_PREFIX, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_part_serialization() {
        let text = serde_json::to_value(ContentPart::text("hi")).unwrap();
        assert_eq!(text, serde_json::json!({"type": "text", "text": "hi"}));

        let image = serde_json::to_value(ContentPart::image_url("data:image/png;base64,AA==")).unwrap();
        assert_eq!(
            image,
            serde_json::json!({
                "type": "image_url",
                "image_url": {"url": "data:image/png;base64,AA=="},
            })
        );
    }

    #[test]
    fn test_failure_chunk() {
        assert_eq!(failure_chunk("boom"), "ANTIGRAVITY_FAILURE: boom");
    }

    #[test]
    fn test_request_is_empty() {
        assert!(ChatRequest::default().is_empty());
        let req = ChatRequest {
            message: String::new(),
            attachment: Some(Attachment {
                filename: "a.txt".into(),
                content_type: None,
                data: Bytes::new(),
            }),
        };
        assert!(!req.is_empty());
    }
}
