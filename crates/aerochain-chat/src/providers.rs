//! External LLM provider streaming implementations.
//!
//! Both providers stream SSE. OpenAI-compatible servers send deltas under
//! `choices[0].delta.content` and finish with `[DONE]`; Google sends a full
//! `GenerateContentResponse` per event and simply closes the stream.

use std::pin::Pin;

use futures::Stream;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::attachment::parse_data_url;
use crate::config::{GoogleSettings, OpenAISettings, ProviderSettings};
use crate::error::{ChatError, Result};
use crate::sse::SseLineBuffer;
use crate::types::{ChatMessage, ContentPart, LLMProvider, Role};

/// Boxed stream of text units produced by a provider.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Anything that can stream a chat completion.
pub trait CompletionBackend: Send + Sync {
    fn provider(&self) -> LLMProvider;

    fn model(&self) -> &str;

    /// Start a streaming completion. Nothing is sent until the stream is polled.
    fn stream_completion(&self, messages: Vec<ChatMessage>) -> CompletionStream;
}

/// A resolved provider bound to an HTTP client.
#[derive(Debug, Clone)]
pub struct Provider {
    client: Client,
    settings: ProviderSettings,
}

impl Provider {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }
}

impl CompletionBackend for Provider {
    fn provider(&self) -> LLMProvider {
        self.settings.provider()
    }

    fn model(&self) -> &str {
        self.settings.model()
    }

    fn stream_completion(&self, messages: Vec<ChatMessage>) -> CompletionStream {
        match &self.settings {
            ProviderSettings::Google(settings) => {
                Box::pin(stream_google(&self.client, settings, &messages))
            }
            ProviderSettings::OpenAICompatible(settings) => {
                Box::pin(stream_openai_compat(&self.client, settings, &messages))
            }
        }
    }
}

/// What one SSE `data:` payload amounts to.
#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Text(String),
    Skip,
    Done,
}

// ---------------------------------------------------------------
// OpenAI-compatible
// ---------------------------------------------------------------

fn stream_openai_compat(
    client: &Client,
    settings: &OpenAISettings,
    messages: &[ChatMessage],
) -> impl Stream<Item = Result<String>> + Send + 'static {
    let url = format!("{}/chat/completions", settings.base_url);
    let body = build_openai_body(settings, messages);

    debug!("Streaming from {} with model {}", url, settings.model);

    let request = client
        .post(url)
        .header("Authorization", format!("Bearer {}", settings.api_key))
        .header("Content-Type", "application/json")
        .json(&body);

    stream_sse(request, parse_openai_event)
}

/// Build the `/chat/completions` request body.
pub fn build_openai_body(settings: &OpenAISettings, messages: &[ChatMessage]) -> Value {
    let msgs: Vec<Value> = messages
        .iter()
        .map(|m| match m.role {
            Role::System => json!({"role": "system", "content": m.text()}),
            Role::User => json!({"role": "user", "content": m.content}),
        })
        .collect();

    json!({
        "model": settings.model,
        "messages": msgs,
        "temperature": settings.temperature,
        "stream": true,
    })
}

fn parse_openai_event(data: &str) -> Result<SseEvent> {
    if data.trim() == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let parsed: Value = serde_json::from_str(data)?;
    if let Some(err) = parsed.get("error") {
        return Err(ChatError::Provider(error_message(err)));
    }

    match parsed["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => Ok(SseEvent::Text(content.to_string())),
        _ => Ok(SseEvent::Skip),
    }
}

// ---------------------------------------------------------------
// Google
// ---------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GoogleContent {
    role: &'static str,
    parts: Vec<Value>,
}

fn stream_google(
    client: &Client,
    settings: &GoogleSettings,
    messages: &[ChatMessage],
) -> impl Stream<Item = Result<String>> + Send + 'static {
    let url = format!(
        "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
        settings.base_url, settings.model
    );
    let body = build_google_body(settings, messages);

    debug!("Streaming from Google with model {}", settings.model);

    let request = client
        .post(url)
        .header("x-goog-api-key", &settings.api_key)
        .header("Content-Type", "application/json")
        .json(&body);

    stream_sse(request, parse_google_event)
}

/// Build the `streamGenerateContent` request body.
///
/// With `convert_system_message_to_human` the system text becomes the first
/// part of the first user turn; otherwise it is sent as `systemInstruction`.
pub fn build_google_body(settings: &GoogleSettings, messages: &[ChatMessage]) -> Value {
    let mut system_texts = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        match message.role {
            Role::System => system_texts.push(message.text()),
            Role::User => contents.push(GoogleContent {
                role: "user",
                parts: message.content.iter().filter_map(google_part).collect(),
            }),
        }
    }

    let system_text = system_texts.join("\n\n");
    let mut body = json!({
        "generationConfig": { "temperature": settings.temperature },
    });

    if !system_text.is_empty() {
        if settings.convert_system_message_to_human {
            let system_part = json!({ "text": system_text });
            match contents.first_mut() {
                Some(first) => first.parts.insert(0, system_part),
                None => contents.push(GoogleContent {
                    role: "user",
                    parts: vec![system_part],
                }),
            }
        } else {
            body["systemInstruction"] = json!({ "parts": [{ "text": system_text }] });
        }
    }

    body["contents"] = json!(contents);
    body
}

/// Empty text parts are rejected by the API, so they are dropped.
fn google_part(part: &ContentPart) -> Option<Value> {
    match part {
        ContentPart::Text { text } if text.is_empty() => None,
        ContentPart::Text { text } => Some(json!({ "text": text })),
        ContentPart::ImageUrl { image_url } => match parse_data_url(&image_url.url) {
            Some((mime, data)) => Some(json!({
                "inlineData": { "mimeType": mime, "data": data },
            })),
            None => {
                warn!("Dropping non-data image URL for Google request");
                None
            }
        },
    }
}

fn parse_google_event(data: &str) -> Result<SseEvent> {
    let parsed: Value = serde_json::from_str(data)?;
    if let Some(err) = parsed.get("error") {
        return Err(ChatError::Provider(error_message(err)));
    }

    let text: String = parsed["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter(|p| !p["thought"].as_bool().unwrap_or(false))
                .filter_map(|p| p["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(SseEvent::Text(text));
    }

    if parsed["candidates"].as_array().map_or(true, |c| c.is_empty()) {
        if let Some(reason) = parsed["promptFeedback"]["blockReason"].as_str() {
            return Err(ChatError::Provider(format!("Prompt blocked: {}", reason)));
        }
    }

    Ok(SseEvent::Skip)
}

// ---------------------------------------------------------------
// Shared SSE transport
// ---------------------------------------------------------------

fn stream_sse(
    request: RequestBuilder,
    parse: fn(&str) -> Result<SseEvent>,
) -> impl Stream<Item = Result<String>> + Send + 'static {
    async_stream::stream! {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                yield Err(ChatError::Request(e));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            yield Err(ChatError::Api { status, body });
            return;
        }

        let mut stream = response.bytes_stream();
        let mut lines = SseLineBuffer::new();

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield Err(ChatError::Request(e));
                    return;
                }
            };

            for data in lines.push(&bytes) {
                match parse(&data) {
                    Ok(SseEvent::Text(text)) => {
                        yield Ok(text);
                    }
                    Ok(SseEvent::Skip) => {}
                    Ok(SseEvent::Done) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        if let Some(data) = lines.finish() {
            match parse(&data) {
                Ok(SseEvent::Text(text)) => {
                        yield Ok(text);
                    }
                Ok(_) => {}
                Err(e) => {
                    yield Err(e);
                }
            }
        }
    }
}

fn error_message(err: &Value) -> String {
    err["message"]
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| err.to_string())
}
