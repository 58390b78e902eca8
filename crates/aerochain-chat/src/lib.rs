//! Chat relay with external LLM streaming (Google/OpenAI-compatible).
//!
//! Forwards a message and optional attachment to the configured provider
//! and republishes the streamed text. Failures are reported in-band.

pub mod attachment;
pub mod config;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod relay;
pub mod sse;
pub mod types;

pub use config::ProviderConfig;
pub use error::ChatError;
pub use relay::{ChatRelay, ResponseStream};
pub use types::*;
