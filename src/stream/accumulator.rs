use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;

use crate::error::TranscodeError;
use crate::observability::log_usage;
use crate::protocol::canonical::CanonicalMessage;
use crate::protocol::chunk::CanonicalMessageChunk;
use crate::protocol::gemini::stream::decode_gemini_stream_chunk;
use crate::protocol::gemini::GeminiResponse;
use crate::protocol::interactions::stream::decode_interactions_stream_event;
use crate::protocol::interactions::InteractionSseEvent;

/// Running merge of one streamed generation.
///
/// Every pushed chunk is handed back unchanged so the caller can forward it,
/// while the accumulator keeps the fold for [`StreamAccumulator::finish`].
#[derive(Debug, Clone, Default)]
pub struct StreamAccumulator {
    merged: CanonicalMessageChunk,
    deltas: usize,
    protocol: Option<&'static str>,
}

impl StreamAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `chunk` into the running merge and return it.
    pub fn push(&mut self, chunk: CanonicalMessageChunk) -> CanonicalMessageChunk {
        self.merged.merge(chunk.clone());
        self.deltas += 1;
        chunk
    }

    /// Decode and fold one streamed `generateContent` response.
    pub fn push_gemini(&mut self, response: &GeminiResponse) -> CanonicalMessageChunk {
        self.protocol = Some("generateContent");
        self.push(decode_gemini_stream_chunk(response))
    }

    /// Decode and fold one Interactions stream event.
    ///
    /// # Errors
    ///
    /// Returns [`TranscodeError::Stream`] for an `error` event; the merge so
    /// far is kept.
    pub fn push_interactions(
        &mut self,
        event: &InteractionSseEvent,
    ) -> Result<Option<CanonicalMessageChunk>, TranscodeError> {
        self.protocol = Some("interactions");
        Ok(decode_interactions_stream_event(event)?.map(|chunk| self.push(chunk)))
    }

    #[must_use]
    pub fn merged(&self) -> &CanonicalMessageChunk {
        &self.merged
    }

    #[must_use]
    pub fn deltas(&self) -> usize {
        self.deltas
    }

    /// Finalize the merge into the AI message the non-streamed decoder
    /// would have produced.
    #[must_use]
    pub fn finish(self) -> CanonicalMessage {
        tracing::debug!(
            deltas = self.deltas,
            blocks = self.merged.blocks.len(),
            tool_calls = self.merged.tool_call_chunks.len(),
            "finished stream accumulation"
        );
        if let Some(usage) = &self.merged.usage {
            log_usage(
                self.protocol.unwrap_or("stream"),
                self.merged.model.as_deref(),
                usage,
            );
        }
        self.merged.finish()
    }
}

pin_project! {
    /// Forwards every chunk of `inner` while accumulating them.
    ///
    /// Polling drives `inner` one item at a time; dropping the adapter drops
    /// `inner`. Errors pass through and leave the merge untouched.
    #[must_use = "streams do nothing unless polled"]
    pub struct AccumulatingStream<S> {
        #[pin]
        inner: S,
        accumulator: StreamAccumulator,
    }
}

impl<S> AccumulatingStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            accumulator: StreamAccumulator::new(),
        }
    }

    #[must_use]
    pub fn accumulated(&self) -> &CanonicalMessageChunk {
        self.accumulator.merged()
    }

    #[must_use]
    pub fn finish(self) -> CanonicalMessage {
        self.accumulator.finish()
    }
}

impl<S, E> Stream for AccumulatingStream<S>
where
    S: Stream<Item = Result<CanonicalMessageChunk, E>>,
{
    type Item = Result<CanonicalMessageChunk, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let item = ready!(this.inner.poll_next(cx));
        Poll::Ready(item.map(|result| result.map(|chunk| this.accumulator.push(chunk))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
