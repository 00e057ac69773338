use serde_json::json;

use crate::config::ImageConfig;
use crate::error::TranscodeError;
use crate::protocol::assembler::{tool_result_value, TurnEncoder};
use crate::protocol::canonical::{CanonicalMessage, ContentBlock, ImageSource, ToolCall};
use crate::protocol::chunk::{args_text, CanonicalMessageChunk, ToolCallChunk};
use crate::protocol::interactions::{ContentDelta, InteractionContent, ThoughtSummaryContent};
use crate::protocol::media::{resolve_image, to_data_url, MediaReference};
use crate::protocol::signature;

/// Block encoder for the Interactions protocol.
#[derive(Debug, Clone, Copy)]
pub struct InteractionsEncoder<'a> {
    pub images: &'a ImageConfig,
}

impl TurnEncoder for InteractionsEncoder<'_> {
    type Item = InteractionContent;
    const PROTOCOL: &'static str = "interactions";

    fn encode_block(
        &self,
        block: &ContentBlock,
    ) -> Result<Option<InteractionContent>, TranscodeError> {
        let item = match block {
            ContentBlock::Text { text } if text.is_empty() => return Ok(None),
            ContentBlock::Text { text } => InteractionContent::Text { text: text.clone() },
            ContentBlock::Reasoning { text } if text.is_empty() => return Ok(None),
            ContentBlock::Reasoning { text } => InteractionContent::Thought {
                signature: None,
                summary: Some(vec![ThoughtSummaryContent::text(text.clone())]),
            },
            ContentBlock::Image { source, mime_type } => {
                match resolve_image(source, mime_type.as_deref(), self.images)? {
                    MediaReference::Inline { mime_type, data } => InteractionContent::Image {
                        data: Some(data),
                        uri: None,
                        mime_type: Some(mime_type),
                    },
                    MediaReference::External { mime_type, uri } => InteractionContent::Image {
                        data: None,
                        uri: Some(uri),
                        mime_type: Some(mime_type),
                    },
                }
            }
            ContentBlock::FunctionCall { id, name, args } => InteractionContent::FunctionCall {
                id: Some(id.clone()),
                name: name.clone(),
                arguments: args.clone(),
            },
            ContentBlock::FunctionResult {
                call_id,
                name,
                result,
                is_error,
            } => {
                if call_id.is_empty() {
                    return Err(TranscodeError::malformed(
                        "function result block without a call id",
                    ));
                }
                InteractionContent::FunctionResult {
                    call_id: call_id.clone(),
                    name: Some(name.clone()),
                    result: result.clone(),
                    is_error: is_error.then_some(true),
                }
            }
            ContentBlock::Other { kind, .. } => {
                return Err(TranscodeError::unsupported_block(kind.clone(), Self::PROTOCOL))
            }
        };
        Ok(Some(item))
    }

    fn encode_tool_call(&self, call: &ToolCall) -> InteractionContent {
        InteractionContent::FunctionCall {
            id: Some(call.id.clone()),
            name: call.name.clone(),
            arguments: call.args.clone(),
        }
    }

    fn encode_tool_result(
        &self,
        message: &CanonicalMessage,
        name: Option<&str>,
    ) -> Result<InteractionContent, TranscodeError> {
        let Some(call_id) = message.tool_call_id.as_deref().filter(|id| !id.is_empty()) else {
            return Err(TranscodeError::malformed(
                "tool message requires a tool_call_id for interactions",
            ));
        };
        Ok(InteractionContent::FunctionResult {
            call_id: call_id.to_string(),
            name: name.map(str::to_string),
            result: tool_result_value(message),
            is_error: message.is_error.then_some(true),
        })
    }

    fn attach_signature(&self, items: &mut Vec<InteractionContent>, sig: &str) {
        signature::attach_interactions(items, sig);
    }
}

/// Fold one output item, at output position `index`, into `chunk`.
pub fn decode_item(item: &InteractionContent, index: usize, chunk: &mut CanonicalMessageChunk) {
    match item {
        InteractionContent::Text { text } => chunk.push_block(ContentBlock::text(text.clone())),
        InteractionContent::Image {
            data,
            uri,
            mime_type,
        } => {
            let block = image_block(data.as_deref(), uri.as_deref(), mime_type.as_deref());
            if let Some(block) = block {
                chunk.push_block(block);
            }
        }
        InteractionContent::Thought { signature, summary } => {
            for entry in summary.iter().flatten() {
                if let Some(text) = entry.as_text() {
                    chunk.push_block(ContentBlock::reasoning(text));
                }
            }
            if let Some(sig) = signature {
                chunk.set_signature(sig);
            }
        }
        InteractionContent::FunctionCall {
            id,
            name,
            arguments,
        } => chunk.push_tool_call(ToolCallChunk {
            index: Some(index),
            id: id.clone().filter(|id| !id.is_empty()),
            name: Some(name.clone()).filter(|name| !name.is_empty()),
            args: args_text(arguments),
        }),
        InteractionContent::FunctionResult {
            call_id,
            name,
            result,
            is_error,
        } => chunk.push_block(ContentBlock::FunctionResult {
            call_id: call_id.clone(),
            name: name.clone().unwrap_or_default(),
            result: result.clone(),
            is_error: is_error.unwrap_or(false),
        }),
        InteractionContent::CodeExecutionCall { arguments, .. } => chunk
            .code_execution_results
            .push(json!({ "code_execution_call": arguments })),
        InteractionContent::CodeExecutionResult {
            result, signature, ..
        } => {
            chunk
                .code_execution_results
                .push(json!({ "code_execution_result": result }));
            if let Some(sig) = signature {
                chunk.set_signature(sig);
            }
        }
        InteractionContent::Unsupported => {
            tracing::debug!(index, "skipping output item with no canonical mapping");
        }
    }
}

/// Fold one `content.delta` payload into `chunk`.
pub fn decode_delta(delta: &ContentDelta, index: usize, chunk: &mut CanonicalMessageChunk) {
    match delta {
        ContentDelta::Text { text } => chunk.push_block(ContentBlock::text(text.clone())),
        ContentDelta::Image {
            data,
            uri,
            mime_type,
        } => {
            let block = image_block(data.as_deref(), uri.as_deref(), mime_type.as_deref());
            if let Some(block) = block {
                chunk.push_block(block);
            }
        }
        ContentDelta::ThoughtSummary { content } => {
            if let Some(text) = content.as_text() {
                chunk.push_block(ContentBlock::reasoning(text));
            }
        }
        ContentDelta::ThoughtSignature { signature } => chunk.set_signature(signature),
        ContentDelta::FunctionCall {
            id,
            name,
            arguments,
        } => chunk.push_tool_call(ToolCallChunk {
            index: Some(index),
            id: id.clone().filter(|id| !id.is_empty()),
            name: name.clone().filter(|name| !name.is_empty()),
            args: arguments.as_ref().map(args_text).unwrap_or_default(),
        }),
        ContentDelta::CodeExecutionResult {
            result, signature, ..
        } => {
            chunk
                .code_execution_results
                .push(json!({ "code_execution_result": result }));
            if let Some(sig) = signature {
                chunk.set_signature(sig);
            }
        }
        ContentDelta::Unsupported => {
            tracing::debug!(index, "skipping delta with no canonical mapping");
        }
    }
}

fn image_block(
    data: Option<&str>,
    uri: Option<&str>,
    mime_type: Option<&str>,
) -> Option<ContentBlock> {
    let source = match (data, uri, mime_type) {
        (Some(data), _, Some(mime)) => ImageSource::Url(to_data_url(mime, data)),
        (Some(data), _, None) => ImageSource::Base64(data.to_string()),
        (None, Some(uri), _) => ImageSource::Url(uri.to_string()),
        (None, None, _) => return None,
    };
    Some(ContentBlock::Image {
        source,
        mime_type: mime_type.map(str::to_string),
    })
}
