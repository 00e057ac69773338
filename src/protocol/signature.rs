use crate::protocol::canonical::CanonicalMessage;
use crate::protocol::gemini::GeminiPart;
use crate::protocol::interactions::InteractionContent;
use crate::protocol::mapping::is_model_role;

/// The signature an outbound message must carry back to the server. Any role
/// that lands on the `model` wire role qualifies, generic aliases included.
#[must_use]
pub fn carried_signature(message: &CanonicalMessage) -> Option<&str> {
    if !is_model_role(&message.role) {
        return None;
    }
    message.thought_signature()
}

/// Attach to the message's last part, or append a zero-text carrier part.
pub fn attach_standard(parts: &mut Vec<GeminiPart>, signature: &str) {
    match parts.last_mut() {
        Some(last) => last.thought_signature = Some(signature.to_string()),
        None => parts.push(GeminiPart {
            text: Some(String::new()),
            thought_signature: Some(signature.to_string()),
            ..GeminiPart::default()
        }),
    }
}

/// Only thought items carry a signature on Interactions; reuse the message's
/// last one or append a signature-only thought.
pub fn attach_interactions(items: &mut Vec<InteractionContent>, signature: &str) {
    let last_thought = items.iter_mut().rev().find_map(|item| match item {
        InteractionContent::Thought { signature, .. } => Some(signature),
        _ => None,
    });
    match last_thought {
        Some(slot) => *slot = Some(signature.to_string()),
        None => items.push(InteractionContent::Thought {
            signature: Some(signature.to_string()),
            summary: None,
        }),
    }
}
