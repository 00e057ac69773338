use crate::error::TranscodeError;
use crate::observability::log_usage;
use crate::protocol::canonical::CanonicalResponse;
use crate::protocol::chunk::CanonicalMessageChunk;
use crate::protocol::gemini::codec::decode_part;
use crate::protocol::gemini::{GeminiCandidate, GeminiResponse};
use crate::protocol::mapping::gemini_usage_to_canonical;

/// Fold one candidate plus the response-level fields into a chunk.
///
/// Streaming decodes every chunk through this same function, which is what
/// makes a folded stream equal to the decoded full response.
pub(crate) fn candidate_chunk(
    response: &GeminiResponse,
    candidate: Option<&GeminiCandidate>,
) -> CanonicalMessageChunk {
    let mut chunk = CanonicalMessageChunk::default();
    if let Some(candidate) = candidate {
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                decode_part(part, &mut chunk);
            }
        }
        chunk.finish_reason.clone_from(&candidate.finish_reason);
    }
    chunk.usage = response.usage_metadata.as_ref().map(gemini_usage_to_canonical);
    chunk.response_id.clone_from(&response.response_id);
    chunk.model.clone_from(&response.model_version);
    chunk
}

/// Decode a complete `generateContent` response.
///
/// # Errors
///
/// Returns [`TranscodeError::EmptyResponse`] when the response carries no
/// candidates.
pub fn decode_gemini_response(
    response: &GeminiResponse,
) -> Result<CanonicalResponse, TranscodeError> {
    let mut generations = response
        .candidates
        .iter()
        .map(|candidate| candidate_chunk(response, Some(candidate)).finish());
    let Some(message) = generations.next() else {
        return Err(TranscodeError::EmptyResponse(
            "response contained no candidates".to_string(),
        ));
    };
    let alternatives: Vec<_> = generations.collect();

    tracing::debug!(
        candidates = alternatives.len() + 1,
        tool_calls = message.tool_calls.len(),
        "decoded generateContent response"
    );
    if let Some(usage) = &message.usage {
        log_usage("generateContent", response.model_version.as_deref(), usage);
    }

    Ok(CanonicalResponse {
        id: response.response_id.clone(),
        model: response.model_version.clone(),
        usage: message.usage.clone().unwrap_or_default(),
        message,
        alternatives,
    })
}
