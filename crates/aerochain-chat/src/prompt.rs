//! System persona and prompt assembly.

use crate::attachment;
use crate::types::{Attachment, ChatMessage, ContentPart};

pub const SYSTEM_PROMPT: &str = r#"ROLE:
You are AeroChain, an AI intelligence engine designed for speed and precision.

MISSION:
Provide expert, high-velocity assistance. Eliminate friction. Be helpful, but concise.

GUIDELINES:
1. **Directness**: Answer the user's question immediately. Minimize preamble.
2. **Clarity**: Use clear, technical language. Format code blocks precisely.
3. **Efficiency**: Do not withhold information, but avoid unnecessary fluff.
4. **Context**: You are running in the "Antigravity" interface, a high-performance, linear-log environment.
5. **Multimodal**: If you receive an image or file, analyze it instantly and answer the user's query about it.

Your goal is to be the fastest path from question to answer."#;

/// Build `[system(persona), user([text, attachment?])]`.
pub fn build_messages(message: &str, attachment: Option<&Attachment>) -> Vec<ChatMessage> {
    let mut user_content = vec![ContentPart::text(message)];
    if let Some(file) = attachment {
        user_content.push(attachment::to_content_part(file));
    }

    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_content),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use bytes::Bytes;

    #[test]
    fn test_message_only() {
        let messages = build_messages("Hello, are you online?", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].text(), SYSTEM_PROMPT);
        assert_eq!(
            messages[1],
            ChatMessage::user(vec![ContentPart::text("Hello, are you online?")])
        );
    }

    #[test]
    fn test_empty_message_with_text_file() {
        let file = Attachment {
            filename: "notes.txt".into(),
            content_type: Some("text/plain".into()),
            data: Bytes::from_static(b"abc"),
        };
        let messages = build_messages("", Some(&file));
        assert_eq!(
            messages[1].content,
            vec![
                ContentPart::text(""),
                ContentPart::text("\n\n[FILE START: notes.txt]\nabc\n[FILE END]\n\n"),
            ]
        );
    }

    #[test]
    fn test_identical_inputs_build_identical_prompts() {
        let file = Attachment {
            filename: "shot.png".into(),
            content_type: Some("image/png".into()),
            data: Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47]),
        };
        assert_eq!(
            build_messages("describe", Some(&file)),
            build_messages("describe", Some(&file))
        );
    }
}
