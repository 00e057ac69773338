//! Streaming plumbing: SSE framing, per-protocol chunk decoding and
//! accumulation.

pub mod accumulator;
pub mod sse;

use std::collections::VecDeque;

use futures_util::{future, stream, Stream, StreamExt};

pub use accumulator::{AccumulatingStream, StreamAccumulator};
pub use sse::{SseEvent, SseParser};

use crate::error::TranscodeError;
use crate::protocol::chunk::CanonicalMessageChunk;
use crate::protocol::gemini::stream::decode_gemini_stream_chunk;
use crate::protocol::gemini::GeminiResponse;
use crate::protocol::interactions::stream::decode_interactions_stream_event;
use crate::protocol::interactions::InteractionSseEvent;

/// Split a response body into SSE events.
///
/// Body errors are forwarded in place. A trailing event without a closing
/// blank line is dispatched when the body ends.
pub fn sse_events<S, B, E>(body: S) -> impl Stream<Item = Result<SseEvent, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let state = (Box::pin(body), SseParser::new(), VecDeque::new(), false);
    stream::unfold(state, |(mut body, mut parser, mut pending, mut done)| async move {
        loop {
            if let Some(event) = pending.pop_front() {
                return Some((Ok(event), (body, parser, pending, done)));
            }
            if done {
                return None;
            }
            let mut parsed = Vec::new();
            match body.next().await {
                Some(Ok(bytes)) => parser.feed_bytes_into(bytes.as_ref(), &mut parsed),
                Some(Err(err)) => return Some((Err(err), (body, parser, pending, done))),
                None => {
                    parser.flush_into(&mut parsed);
                    done = true;
                }
            }
            pending.extend(parsed);
        }
    })
}

fn undecodable(protocol: &str, err: &serde_json::Error) -> TranscodeError {
    TranscodeError::malformed(format!("undecodable {protocol} stream frame: {err}"))
}

/// Decode a `streamGenerateContent?alt=sse` event stream into chunks.
pub fn gemini_chunks<S, E>(events: S) -> impl Stream<Item = Result<CanonicalMessageChunk, E>>
where
    S: Stream<Item = Result<SseEvent, E>>,
    E: From<TranscodeError>,
{
    events.filter_map(|item| {
        future::ready(match item {
            Ok(event) if event.is_done() => None,
            Ok(event) => Some(
                serde_json::from_str::<GeminiResponse>(&event.data)
                    .map(|response| decode_gemini_stream_chunk(&response))
                    .map_err(|err| E::from(undecodable("generateContent", &err))),
            ),
            Err(err) => Some(Err(err)),
        })
    })
}

/// Decode an Interactions event stream into chunks.
///
/// `content.stop` events yield nothing; an `error` event becomes
/// [`TranscodeError::Stream`].
pub fn interactions_chunks<S, E>(events: S) -> impl Stream<Item = Result<CanonicalMessageChunk, E>>
where
    S: Stream<Item = Result<SseEvent, E>>,
    E: From<TranscodeError>,
{
    events.filter_map(|item| {
        future::ready(match item {
            Ok(event) if event.is_done() => None,
            Ok(event) => match serde_json::from_str::<InteractionSseEvent>(&event.data) {
                Ok(event) => decode_interactions_stream_event(&event)
                    .map_err(E::from)
                    .transpose(),
                Err(err) => Some(Err(E::from(undecodable("interactions", &err)))),
            },
            Err(err) => Some(Err(err)),
        })
    })
}
