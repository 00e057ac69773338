use crate::error::TranscodeError;
use crate::observability::log_usage;
use crate::protocol::canonical::CanonicalResponse;
use crate::protocol::chunk::CanonicalMessageChunk;
use crate::protocol::interactions::codec::decode_item;
use crate::protocol::interactions::Interaction;
use crate::protocol::mapping::interactions_usage_to_canonical;

/// Interaction-level fields (id, status, model, usage) as a chunk.
pub(crate) fn interaction_header_chunk(interaction: &Interaction) -> CanonicalMessageChunk {
    CanonicalMessageChunk {
        interaction_id: interaction.id.clone(),
        status: interaction.status.clone(),
        model: interaction.model.clone().or_else(|| interaction.agent.clone()),
        usage: interaction.usage.as_ref().map(interactions_usage_to_canonical),
        ..CanonicalMessageChunk::default()
    }
}

/// Decode a complete interaction.
///
/// # Errors
///
/// Returns [`TranscodeError::EmptyResponse`] when the interaction has no
/// outputs.
pub fn decode_interaction(interaction: &Interaction) -> Result<CanonicalResponse, TranscodeError> {
    if interaction.outputs.is_empty() {
        return Err(TranscodeError::EmptyResponse(format!(
            "interaction {} has no outputs (status: {})",
            interaction.id.as_deref().unwrap_or("-"),
            interaction.status.as_deref().unwrap_or("unknown")
        )));
    }

    let mut chunk = CanonicalMessageChunk::default();
    for (index, item) in interaction.outputs.iter().enumerate() {
        decode_item(item, index, &mut chunk);
    }
    chunk.merge(interaction_header_chunk(interaction));
    let message = chunk.finish();

    tracing::debug!(
        interaction_id = interaction.id.as_deref().unwrap_or("-"),
        outputs = interaction.outputs.len(),
        tool_calls = message.tool_calls.len(),
        "decoded interaction"
    );
    if let Some(usage) = &message.usage {
        log_usage("interactions", interaction.model.as_deref(), usage);
    }

    Ok(CanonicalResponse {
        id: interaction.id.clone(),
        model: interaction.model.clone().or_else(|| interaction.agent.clone()),
        usage: message.usage.clone().unwrap_or_default(),
        message,
        alternatives: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::canonical::{ContentBlock, MessageContent};
    use serde_json::json;

    fn interaction(value: serde_json::Value) -> Interaction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_completed_interaction() {
        let decoded = decode_interaction(&interaction(json!({
            "id": "int_9",
            "status": "completed",
            "model": "gemini-3-pro",
            "outputs": [
                {"type": "thought", "signature": "sig", "summary": [{"type": "text", "text": "hmm"}]},
                {"type": "text", "text": "Done."}
            ],
            "usage": {"total_input_tokens": 5, "total_output_tokens": 3, "total_tokens": 8}
        })))
        .unwrap();
        let message = &decoded.message;
        assert_eq!(
            message.content,
            MessageContent::Blocks(vec![ContentBlock::reasoning("hmm"), ContentBlock::text("Done.")])
        );
        assert_eq!(message.interaction_id(), Some("int_9"));
        assert_eq!(message.thought_signature(), Some("sig"));
        assert_eq!(decoded.usage.total_tokens, Some(8));
        assert_eq!(decoded.id.as_deref(), Some("int_9"));
    }

    #[test]
    fn test_requires_action_with_call() {
        let decoded = decode_interaction(&interaction(json!({
            "id": "int_1",
            "status": "requires_action",
            "outputs": [{"type": "function_call", "id": "fc_1", "name": "lookup", "arguments": {"q": "x"}}]
        })))
        .unwrap();
        assert_eq!(decoded.message.tool_calls[0].name, "lookup");
        assert_eq!(decoded.message.content, MessageContent::Text(String::new()));
    }

    #[test]
    fn test_no_outputs_is_empty_response() {
        let err = decode_interaction(&interaction(json!({"id": "int_2", "status": "in_progress"})))
            .unwrap_err();
        assert!(matches!(err, TranscodeError::EmptyResponse(_)));
    }
}
