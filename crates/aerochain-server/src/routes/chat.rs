//! Chat route: form/multipart upload in, raw text stream out.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::Deserialize;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::state::AppState;
use aerochain_chat::types::{Attachment, ChatRequest};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// POST /chat: stream the model's answer as `text/event-stream`.
///
/// The status is always 200 once streaming starts; failures after that
/// point arrive as an `ANTIGRAVITY_FAILURE:` chunk.
async fn chat(State(state): State<Arc<AppState>>, ChatUpload(request): ChatUpload) -> Response {
    if request.is_empty() {
        debug!("Rejecting chat request without message or file");
        return bad_request("Message or file required");
    }

    let stream = state
        .relay
        .generate(request)
        .map(Ok::<_, Infallible>);

    (
        [(CONTENT_TYPE, "text/event-stream"), (CACHE_CONTROL, "no-cache")],
        Body::from_stream(stream),
    )
        .into_response()
}

// ---------------------------------------------------------------
// Request extraction
// ---------------------------------------------------------------

/// Chat request decoded from `multipart/form-data` or a urlencoded form.
pub struct ChatUpload(pub ChatRequest);

#[derive(Debug, Deserialize)]
struct UrlEncodedChat {
    #[serde(default)]
    message: Option<String>,
}

impl<S> FromRequest<S> for ChatUpload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| bad_request(&rejection.body_text()))?;
            return read_multipart(multipart).await.map(ChatUpload);
        }

        let Form(fields) = Form::<UrlEncodedChat>::from_request(req, state)
            .await
            .map_err(|rejection| bad_request(&rejection.body_text()))?;

        Ok(ChatUpload(ChatRequest {
            message: fields.message.unwrap_or_default(),
            attachment: None,
        }))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<ChatRequest, Response> {
    let mut request = ChatRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("message") => {
                request.message = field.text().await.map_err(|e| bad_request(&e.body_text()))?;
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| bad_request(&e.body_text()))?;

                // Browsers send an empty, unnamed part when no file was picked
                if filename.is_empty() && data.is_empty() {
                    continue;
                }

                debug!(
                    "Received attachment {} ({} bytes, {:?})",
                    filename,
                    data.len(),
                    content_type
                );
                request.attachment = Some(Attachment {
                    filename,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    Ok(request)
}

fn bad_request(detail: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "detail": detail })),
    )
        .into_response()
}
