//! Chat relay: prompt assembly, provider streaming and the in-band failure channel.

use std::pin::Pin;

use futures::Stream;
use reqwest::Client;
use tokio_stream::StreamExt;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::prompt::build_messages;
use crate::providers::{CompletionBackend, Provider};
use crate::types::{failure_chunk, ChatRequest};

/// Boxed stream of response chunks as written to the client.
pub type ResponseStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Relays chat requests to the configured provider.
#[derive(Debug, Clone)]
pub struct ChatRelay {
    providers: ProviderConfig,
    client: Client,
    redact_errors: bool,
}

impl ChatRelay {
    pub fn new(providers: ProviderConfig, redact_errors: bool) -> Self {
        Self::with_client(Client::new(), providers, redact_errors)
    }

    pub fn with_client(client: Client, providers: ProviderConfig, redact_errors: bool) -> Self {
        Self {
            providers,
            client,
            redact_errors,
        }
    }

    pub fn providers(&self) -> &ProviderConfig {
        &self.providers
    }

    /// Stream the response for one request.
    ///
    /// Provider selection happens here so a configuration error surfaces as
    /// the failure chunk rather than as an HTTP status.
    pub fn generate(&self, request: ChatRequest) -> ResponseStream {
        let backend = self
            .providers
            .resolve()
            .map(|settings| Provider::new(self.client.clone(), settings));
        generate_with(backend, request, self.redact_errors)
    }
}

/// Stream the response using an explicit backend (or the error that prevented one).
pub fn generate_with<B>(backend: Result<B>, request: ChatRequest, redact_errors: bool) -> ResponseStream
where
    B: CompletionBackend + 'static,
{
    let request_id = Uuid::new_v4();
    Box::pin(into_response_chunks(
        try_generate(backend, request, request_id),
        redact_errors,
        request_id,
    ))
}

/// Typed stream of provider text. Ends after the first error.
pub fn try_generate<B>(
    backend: Result<B>,
    request: ChatRequest,
    request_id: Uuid,
) -> impl Stream<Item = Result<String>> + Send + 'static
where
    B: CompletionBackend + 'static,
{
    async_stream::stream! {
        let backend = match backend {
            Ok(b) => b,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        info!(
            %request_id,
            provider = %backend.provider(),
            model = backend.model(),
            has_attachment = request.attachment.is_some(),
            "Starting generation"
        );

        let messages = build_messages(&request.message, request.attachment.as_ref());
        let mut completion = backend.stream_completion(messages);

        while let Some(item) = completion.next().await {
            let failed = item.is_err();
            yield item;
            if failed {
                return;
            }
        }
    }
}

/// Forward text verbatim; turn the first error into one failure chunk and stop.
pub fn into_response_chunks<S>(
    stream: S,
    redact_errors: bool,
    request_id: Uuid,
) -> impl Stream<Item = String> + Send + 'static
where
    S: Stream<Item = Result<String>> + Send + 'static,
{
    async_stream::stream! {
        tokio::pin!(stream);
        let mut chunks = 0usize;

        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => {
                    chunks += 1;
                    yield text;
                }
                Err(e) => {
                    error!(%request_id, chunks, "Generation failed: {}", e);
                    let detail = if redact_errors {
                        e.public_message().to_string()
                    } else {
                        e.to_string()
                    };
                    yield failure_chunk(&detail);
                    return;
                }
            }
        }

        info!(%request_id, chunks, "Generation complete");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::MISSING_KEY_MESSAGE;
    use crate::error::ChatError;
    use crate::prompt::SYSTEM_PROMPT;
    use crate::providers::CompletionStream;
    use crate::types::{Attachment, ChatMessage, ContentPart, LLMProvider, Role, FAILURE_PREFIX};
    use bytes::Bytes;

    /// Replays a fixed script and records the prompts it was given.
    struct ScriptedBackend {
        script: Vec<std::result::Result<&'static str, &'static str>>,
        seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<std::result::Result<&'static str, &'static str>>) -> Self {
            Self {
                script,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl CompletionBackend for ScriptedBackend {
        fn provider(&self) -> LLMProvider {
            LLMProvider::Google
        }

        fn model(&self) -> &str {
            "scripted"
        }

        fn stream_completion(&self, messages: Vec<ChatMessage>) -> CompletionStream {
            self.seen.lock().unwrap().push(messages);
            let items: Vec<Result<String>> = self
                .script
                .iter()
                .map(|step| match step {
                    Ok(text) => Ok(text.to_string()),
                    Err(msg) => Err(ChatError::Provider(msg.to_string())),
                })
                .collect();
            Box::pin(tokio_stream::iter(items))
        }
    }

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.into(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn test_no_credentials_yields_single_failure() {
        let relay = ChatRelay::new(ProviderConfig::default(), false);
        let chunks: Vec<String> = relay.generate(request("hi")).collect().await;
        assert_eq!(chunks, vec![format!("{} {}", FAILURE_PREFIX, MISSING_KEY_MESSAGE)]);
    }

    #[tokio::test]
    async fn test_chunks_forwarded_in_order() {
        let backend = ScriptedBackend::new(vec![Ok("Hel"), Ok("lo"), Ok(" world")]);
        let chunks: Vec<String> = generate_with(Ok(backend), request("hi"), false).collect().await;
        assert_eq!(chunks, vec!["Hel", "lo", " world"]);
    }

    #[tokio::test]
    async fn test_mid_stream_failure() {
        let backend = ScriptedBackend::new(vec![Ok("Hel"), Ok("lo"), Err("connection reset"), Ok("never")]);
        let chunks: Vec<String> = generate_with(Ok(backend), request("hi"), false).collect().await;
        assert_eq!(
            chunks,
            vec![
                "Hel".to_string(),
                "lo".to_string(),
                "ANTIGRAVITY_FAILURE: Provider error: connection reset".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_redacted_failure() {
        let backend = ScriptedBackend::new(vec![Err("key sk-123 revoked")]);
        let chunks: Vec<String> = generate_with(Ok(backend), request("hi"), true).collect().await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with(FAILURE_PREFIX));
        assert!(!chunks[0].contains("sk-123"));
    }

    #[tokio::test]
    async fn test_prompt_reaches_backend() {
        let backend = ScriptedBackend::new(vec![Ok("ok")]);
        let seen = backend.seen.clone();
        let req = ChatRequest {
            message: "".into(),
            attachment: Some(Attachment {
                filename: "notes.txt".into(),
                content_type: Some("text/plain".into()),
                data: Bytes::from_static(b"abc"),
            }),
        };

        let _: Vec<String> = generate_with(Ok(backend), req, false).collect().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let messages = &seen[0];
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].text(), SYSTEM_PROMPT);
        assert_eq!(
            messages[1].content,
            vec![
                ContentPart::text(""),
                ContentPart::text("\n\n[FILE START: notes.txt]\nabc\n[FILE END]\n\n"),
            ]
        );
    }

    #[tokio::test]
    async fn test_backend_not_called_on_config_error() {
        let chunks: Vec<String> = generate_with::<ScriptedBackend>(
            Err(ChatError::Config(MISSING_KEY_MESSAGE.into())),
            request("hi"),
            false,
        )
        .collect()
        .await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("ANTIGRAVITY_FAILURE: "));
    }
}
