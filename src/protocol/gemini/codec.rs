use serde_json::{json, Value};

use crate::config::ImageConfig;
use crate::error::TranscodeError;
use crate::protocol::assembler::{tool_result_value, TurnEncoder};
use crate::protocol::canonical::{CanonicalMessage, ContentBlock, ImageSource, ToolCall};
use crate::protocol::chunk::{args_text, CanonicalMessageChunk, ToolCallChunk};
use crate::protocol::gemini::{
    GeminiBlob, GeminiFileData, GeminiFunctionCall, GeminiFunctionResponse, GeminiPart,
    GeminiPartKind,
};
use crate::protocol::media::{resolve_image, to_data_url, MediaReference};
use crate::protocol::signature;

/// Block encoder for the standard protocol.
#[derive(Debug, Clone, Copy)]
pub struct GeminiEncoder<'a> {
    pub images: &'a ImageConfig,
}

impl TurnEncoder for GeminiEncoder<'_> {
    type Item = GeminiPart;
    const PROTOCOL: &'static str = "generateContent";

    fn encode_block(&self, block: &ContentBlock) -> Result<Option<GeminiPart>, TranscodeError> {
        let part = match block {
            ContentBlock::Text { text } if text.is_empty() => return Ok(None),
            ContentBlock::Text { text } => GeminiPart::text(text.clone()),
            ContentBlock::Reasoning { text } if text.is_empty() => return Ok(None),
            ContentBlock::Reasoning { text } => GeminiPart::thought(text.clone()),
            ContentBlock::Image { source, mime_type } => {
                image_part(source, mime_type.as_deref(), self.images)?
            }
            ContentBlock::FunctionCall { id, name, args } => GeminiPart {
                function_call: Some(GeminiFunctionCall {
                    id: Some(id.clone()),
                    name: name.clone(),
                    args: args.clone(),
                }),
                ..GeminiPart::default()
            },
            ContentBlock::FunctionResult {
                call_id,
                name,
                result,
                is_error,
            } => function_response_part(Some(call_id.as_str()), name, result.clone(), *is_error),
            ContentBlock::Other { kind, .. } => {
                return Err(TranscodeError::unsupported_block(kind.clone(), Self::PROTOCOL))
            }
        };
        Ok(Some(part))
    }

    fn encode_tool_call(&self, call: &ToolCall) -> GeminiPart {
        GeminiPart {
            function_call: Some(GeminiFunctionCall {
                id: Some(call.id.clone()),
                name: call.name.clone(),
                args: call.args.clone(),
            }),
            ..GeminiPart::default()
        }
    }

    fn encode_tool_result(
        &self,
        message: &CanonicalMessage,
        name: Option<&str>,
    ) -> Result<GeminiPart, TranscodeError> {
        let call_id = message.tool_call_id.as_deref();
        let Some(name) = name.or(call_id) else {
            return Err(TranscodeError::malformed(
                "tool message has neither a name nor a tool_call_id",
            ));
        };
        Ok(function_response_part(
            call_id,
            name,
            tool_result_value(message),
            message.is_error,
        ))
    }

    fn attach_signature(&self, items: &mut Vec<GeminiPart>, sig: &str) {
        signature::attach_standard(items, sig);
    }
}

fn image_part(
    source: &ImageSource,
    mime_type: Option<&str>,
    images: &ImageConfig,
) -> Result<GeminiPart, TranscodeError> {
    let part = match resolve_image(source, mime_type, images)? {
        MediaReference::Inline { mime_type, data } => GeminiPart {
            inline_data: Some(GeminiBlob { mime_type, data }),
            ..GeminiPart::default()
        },
        MediaReference::External { mime_type, uri } => GeminiPart {
            file_data: Some(GeminiFileData {
                mime_type: Some(mime_type),
                file_uri: uri,
            }),
            ..GeminiPart::default()
        },
    };
    Ok(part)
}

/// `functionResponse.response` must be an object: errors nest under
/// `error`, other non-object values under `result`.
fn function_response_part(
    call_id: Option<&str>,
    name: &str,
    result: Value,
    is_error: bool,
) -> GeminiPart {
    let response = if is_error {
        json!({ "error": result })
    } else if result.is_object() {
        result
    } else {
        json!({ "result": result })
    };
    GeminiPart {
        function_response: Some(GeminiFunctionResponse {
            id: call_id.filter(|id| !id.is_empty()).map(str::to_string),
            name: name.to_string(),
            response,
        }),
        ..GeminiPart::default()
    }
}

/// Fold one response part into `chunk`.
pub fn decode_part(part: &GeminiPart, chunk: &mut CanonicalMessageChunk) {
    match part.kind() {
        GeminiPartKind::Text {
            text,
            thought: true,
        } => chunk.push_block(ContentBlock::reasoning(text)),
        GeminiPartKind::Text { text, thought: false } => chunk.push_block(ContentBlock::text(text)),
        GeminiPartKind::InlineData(blob) => chunk.push_block(ContentBlock::Image {
            source: ImageSource::Url(to_data_url(&blob.mime_type, &blob.data)),
            mime_type: Some(blob.mime_type.clone()),
        }),
        GeminiPartKind::FileData(file) => chunk.push_block(ContentBlock::Image {
            source: ImageSource::Url(file.file_uri.clone()),
            mime_type: file.mime_type.clone(),
        }),
        GeminiPartKind::FunctionCall(call) => chunk.push_tool_call(ToolCallChunk {
            index: None,
            id: call.id.clone().filter(|id| !id.is_empty()),
            name: Some(call.name.clone()),
            args: args_text(&call.args),
        }),
        GeminiPartKind::FunctionResponse(response) => {
            chunk.push_block(ContentBlock::FunctionResult {
                call_id: response.id.clone().unwrap_or_default(),
                name: response.name.clone(),
                result: response.response.clone(),
                is_error: false,
            });
        }
        GeminiPartKind::ExecutableCode(code) => chunk
            .code_execution_results
            .push(json!({ "executable_code": code })),
        GeminiPartKind::CodeExecutionResult(result) => chunk
            .code_execution_results
            .push(json!({ "code_execution_result": result })),
        GeminiPartKind::SignatureOnly(_) | GeminiPartKind::Empty => {}
    }
    if let Some(sig) = &part.thought_signature {
        chunk.set_signature(sig);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encoder(images: &ImageConfig) -> GeminiEncoder<'_> {
        GeminiEncoder { images }
    }

    #[test]
    fn test_reasoning_becomes_thought_part() {
        let images = ImageConfig::default();
        let part = encoder(&images)
            .encode_block(&ContentBlock::reasoning("hmm"))
            .unwrap()
            .unwrap();
        assert_eq!(serde_json::to_value(&part).unwrap(), json!({"text": "hmm", "thought": true}));
    }

    #[test]
    fn test_other_block_rejected() {
        let images = ImageConfig::default();
        let err = encoder(&images)
            .encode_block(&ContentBlock::Other {
                kind: "audio".into(),
                value: json!({}),
            })
            .unwrap_err();
        assert!(matches!(err, TranscodeError::UnsupportedBlock { block_type, .. } if block_type == "audio"));
    }

    #[test]
    fn test_function_response_wrapping() {
        let part = function_response_part(Some("c1"), "f", json!("72F"), false);
        let response = part.function_response.unwrap();
        assert_eq!(response.response, json!({"result": "72F"}));
        assert_eq!(response.id.as_deref(), Some("c1"));

        let part = function_response_part(None, "f", json!("boom"), true);
        assert_eq!(part.function_response.unwrap().response, json!({"error": "boom"}));

        let part = function_response_part(Some(""), "f", json!({"ok": true}), false);
        let response = part.function_response.unwrap();
        assert_eq!(response.response, json!({"ok": true}));
        assert_eq!(response.id, None);
    }

    #[test]
    fn test_tool_result_without_name_or_id() {
        let images = ImageConfig::default();
        let mut message = CanonicalMessage::tool("x", "y");
        message.tool_call_id = None;
        assert!(matches!(
            encoder(&images).encode_tool_result(&message, None),
            Err(TranscodeError::MalformedContent(_))
        ));
    }

    #[test]
    fn test_decode_parts_into_chunk() {
        let parts: Vec<GeminiPart> = serde_json::from_value(json!([
            {"text": "plan", "thought": true},
            {"text": "Hello"},
            {"functionCall": {"name": "f", "args": {"a": 1}}, "thoughtSignature": "s1"},
            {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
            {"codeExecutionResult": {"outcome": "OUTCOME_OK", "output": "2"}},
            {"text": "", "thoughtSignature": "s2"}
        ]))
        .unwrap();
        let mut chunk = CanonicalMessageChunk::default();
        for part in &parts {
            decode_part(part, &mut chunk);
        }
        assert_eq!(chunk.blocks.len(), 3);
        assert_eq!(chunk.blocks[0], ContentBlock::reasoning("plan"));
        assert_eq!(chunk.tool_call_chunks.len(), 1);
        assert_eq!(chunk.tool_call_chunks[0].args, "{\"a\":1}");
        assert_eq!(chunk.signature.as_deref(), Some("s2"));
        assert_eq!(chunk.code_execution_results.len(), 1);
    }
}
