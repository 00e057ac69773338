use crate::error::TranscodeError;
use crate::protocol::chunk::CanonicalMessageChunk;
use crate::protocol::interactions::codec::{decode_delta, decode_item};
use crate::protocol::interactions::response_decoder::interaction_header_chunk;
use crate::protocol::interactions::InteractionSseEvent;
use crate::util::parse_sse_data_json_line;

/// Parse a single SSE line from a streamed interaction.
///
/// The event kind travels inside the JSON as `event_type`, so `event:`
/// lines are ignored.
#[must_use]
pub fn parse_interactions_sse_line(line: &str) -> Option<InteractionSseEvent> {
    parse_sse_data_json_line(line, true, false, true)
}

/// Convert one stream event into a partial message.
///
/// `Ok(None)` for events that carry nothing (`content.stop`). The complete
/// event contributes id, status and usage but never content: its outputs
/// were already streamed as deltas.
///
/// # Errors
///
/// Returns [`TranscodeError::Stream`] for an `error` event.
pub fn decode_interactions_stream_event(
    event: &InteractionSseEvent,
) -> Result<Option<CanonicalMessageChunk>, TranscodeError> {
    let chunk = match event {
        InteractionSseEvent::InteractionStart { interaction }
        | InteractionSseEvent::InteractionComplete { interaction } => {
            interaction_header_chunk(interaction)
        }
        InteractionSseEvent::InteractionStatusUpdate {
            interaction_id,
            status,
        } => CanonicalMessageChunk {
            interaction_id: interaction_id.clone(),
            status: Some(status.clone()),
            ..CanonicalMessageChunk::default()
        },
        InteractionSseEvent::ContentStart { index, content } => {
            let mut chunk = CanonicalMessageChunk::default();
            decode_item(content, *index, &mut chunk);
            chunk
        }
        InteractionSseEvent::ContentDelta { index, delta } => {
            let mut chunk = CanonicalMessageChunk::default();
            decode_delta(delta, *index, &mut chunk);
            chunk
        }
        InteractionSseEvent::ContentStop { .. } => return Ok(None),
        InteractionSseEvent::Error { error } => {
            return Err(TranscodeError::Stream {
                code: error.code.clone(),
                message: error.message.clone(),
            })
        }
    };
    Ok(Some(chunk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::canonical::ContentBlock;

    #[test]
    fn test_parse_and_decode_delta() {
        let line = r#"data: {"event_type":"content.delta","index":0,"delta":{"type":"text","text":"Hel"}}"#;
        let event = parse_interactions_sse_line(line).unwrap();
        let chunk = decode_interactions_stream_event(&event).unwrap().unwrap();
        assert_eq!(chunk.blocks, vec![ContentBlock::text("Hel")]);
    }

    #[test]
    fn test_event_lines_ignored() {
        assert!(parse_interactions_sse_line("event: content.delta").is_none());
    }

    #[test]
    fn test_stop_yields_nothing() {
        let event = parse_interactions_sse_line(r#"data: {"event_type":"content.stop","index":1}"#).unwrap();
        assert_eq!(decode_interactions_stream_event(&event).unwrap(), None);
    }

    #[test]
    fn test_error_event() {
        let event = parse_interactions_sse_line(
            r#"data: {"event_type":"error","error":{"code":"RESOURCE_EXHAUSTED","message":"quota"}}"#,
        )
        .unwrap();
        assert_eq!(
            decode_interactions_stream_event(&event),
            Err(TranscodeError::Stream {
                code: "RESOURCE_EXHAUSTED".into(),
                message: "quota".into()
            })
        );
    }

    #[test]
    fn test_complete_records_usage_only() {
        let event = parse_interactions_sse_line(
            r#"data: {"event_type":"interaction.complete","interaction":{"id":"int_1","status":"completed","outputs":[{"type":"text","text":"dup"}],"usage":{"total_tokens":9}}}"#,
        )
        .unwrap();
        let chunk = decode_interactions_stream_event(&event).unwrap().unwrap();
        assert!(chunk.blocks.is_empty());
        assert_eq!(chunk.interaction_id.as_deref(), Some("int_1"));
        assert_eq!(chunk.usage.unwrap().total_tokens, Some(9));
    }
}
