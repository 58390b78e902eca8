//! Error types for the chat relay.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ChatError {
    /// Message safe to hand to untrusted callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Config(_) => "No language model provider is configured.",
            _ => "The language model request failed.",
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
