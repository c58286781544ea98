use foreman_core::host::{ContentPart, MessageRole, SessionMessage};

/// Result recorded when a completed session produced no extractable text.
pub const EMPTY_RESULT_PLACEHOLDER: &str = "(no output)";

/// Extract a completed task's result from its session transcript:
/// assistant-authored entries only, non-empty text fragments only, joined
/// with a blank-line separator.
pub fn extract_result_text(messages: &[SessionMessage]) -> String {
    messages
        .iter()
        .filter(|message| message.role == MessageRole::Assistant)
        .flat_map(|message| message.content.iter())
        .filter_map(|part| match part {
            ContentPart::Text { text } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
