use crate::protocol::chunk::CanonicalMessageChunk;
use crate::protocol::gemini::response_decoder::candidate_chunk;
use crate::protocol::gemini::GeminiResponse;
use crate::util::parse_sse_data_json_line;

/// Parse a single SSE line from a `streamGenerateContent?alt=sse` stream.
///
/// Each `data:` line carries a full `GeminiResponse` JSON object holding
/// only the newly generated parts.
#[must_use]
pub fn parse_gemini_sse_line(line: &str) -> Option<GeminiResponse> {
    parse_sse_data_json_line(line, true, false, true)
}

/// Decode one streamed response into a partial message.
///
/// Only the first candidate is followed; streams with several candidates
/// interleave them and are not merged here.
#[must_use]
pub fn decode_gemini_stream_chunk(chunk: &GeminiResponse) -> CanonicalMessageChunk {
    let candidate = chunk
        .candidates
        .iter()
        .find(|candidate| candidate.index.unwrap_or(0) == 0);
    candidate_chunk(chunk, candidate)
}
