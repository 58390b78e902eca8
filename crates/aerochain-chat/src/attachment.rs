//! Attachment classification and embedding into prompt content.
//!
//! Classification looks only at the declared media type and the filename;
//! the bytes themselves are never sniffed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::types::{Attachment, ContentPart};

pub const TEXT_MEDIA_TYPES: &[&str] = &["text/plain", "text/markdown", "text/csv", "application/json"];
pub const TEXT_EXTENSIONS: &[&str] = &[".txt", ".md", ".py", ".js", ".json"];

/// Media type used when the client declared none.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Text,
    Image,
}

/// Classify an upload as text or image.
pub fn classify(content_type: Option<&str>, filename: &str) -> AttachmentKind {
    let declared_text = content_type
        .map(media_type_essence)
        .is_some_and(|essence| TEXT_MEDIA_TYPES.contains(&essence.as_str()));

    if declared_text || TEXT_EXTENSIONS.iter().any(|ext| filename.ends_with(ext)) {
        AttachmentKind::Text
    } else {
        AttachmentKind::Image
    }
}

/// Convert an attachment into the content part appended to the user turn.
pub fn to_content_part(attachment: &Attachment) -> ContentPart {
    match classify(attachment.content_type.as_deref(), &attachment.filename) {
        AttachmentKind::Text => ContentPart::text(wrap_text_file(&attachment.filename, &attachment.data)),
        AttachmentKind::Image => {
            let mime = attachment
                .content_type
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(FALLBACK_MEDIA_TYPE);
            ContentPart::image_url(data_url(mime, &attachment.data))
        }
    }
}

/// Decode file bytes (lossy) and wrap them in file delimiters.
pub fn wrap_text_file(filename: &str, data: &[u8]) -> String {
    format!(
        "\n\n[FILE START: {}]\n{}\n[FILE END]\n\n",
        filename,
        String::from_utf8_lossy(data)
    )
}

pub fn data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Split a base64 data URL into `(mime, payload)`.
pub fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// `"Text/Plain; charset=utf-8"` -> `"text/plain"`.
fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
