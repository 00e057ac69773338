use serde_json::Value;

use crate::config::TranscodeConfig;
use crate::error::TranscodeError;
use crate::protocol::assembler::assemble;
use crate::protocol::canonical::CanonicalMessage;
use crate::protocol::gemini::codec::GeminiEncoder;
use crate::protocol::gemini::tools::{format_tool_choice, format_tools};
use crate::protocol::gemini::{
    GeminiContent, GeminiGenerateContentConfig, GeminiPart, GeminiRequest, GeminiSafetySetting,
    GeminiThinkingConfig,
};
use crate::protocol::tools::{ToolChoice, ToolEntry};

/// Caller-chosen parameters for a `generateContent` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateContentOptions {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
    pub candidate_count: Option<u32>,
    pub stop_sequences: Vec<String>,
    pub safety_settings: Vec<GeminiSafetySetting>,
    pub thinking: Option<GeminiThinkingConfig>,
    pub response_mime_type: Option<String>,
    pub response_schema: Option<Value>,
    pub tools: Vec<ToolEntry>,
    pub tool_choice: Option<ToolChoice>,
}

/// Encoded conversation: merged contents plus the lifted system instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedContents {
    pub contents: Vec<GeminiContent>,
    pub system_instruction: Option<GeminiContent>,
}

/// Encode a canonical history into standard-protocol contents.
///
/// # Errors
///
/// Returns [`TranscodeError`] when a role has no mapping or a block cannot
/// be encoded.
pub fn encode_contents(
    messages: &[CanonicalMessage],
    config: &TranscodeConfig,
) -> Result<EncodedContents, TranscodeError> {
    let encoder = GeminiEncoder {
        images: &config.images,
    };
    let assembled = assemble(&encoder, messages, &config.system_instruction_separator)?;
    let contents = assembled
        .turns
        .into_iter()
        .map(|turn| GeminiContent {
            role: Some(turn.role.to_string()),
            parts: turn.items,
        })
        .collect();
    let system_instruction = assembled.system_instruction.map(|text| GeminiContent {
        role: None,
        parts: vec![GeminiPart::text(text)],
    });
    Ok(EncodedContents {
        contents,
        system_instruction,
    })
}

/// Build a complete `generateContent` request.
///
/// # Errors
///
/// Returns [`TranscodeError`] when the history cannot be encoded.
pub fn encode_generate_content_request(
    model: &str,
    messages: &[CanonicalMessage],
    options: &GenerateContentOptions,
    config: &TranscodeConfig,
) -> Result<GeminiRequest, TranscodeError> {
    let EncodedContents {
        contents,
        system_instruction,
    } = encode_contents(messages, config)?;

    let tools = format_tools(&options.tools);
    let tool_config = options.tool_choice.as_ref().and_then(format_tool_choice);

    let request_config = GeminiGenerateContentConfig {
        temperature: options.temperature,
        top_p: options.top_p,
        top_k: options.top_k,
        max_output_tokens: options.max_output_tokens,
        candidate_count: options.candidate_count,
        stop_sequences: non_empty(options.stop_sequences.clone()),
        safety_settings: non_empty(options.safety_settings.clone()),
        thinking_config: options.thinking.clone(),
        response_mime_type: options.response_mime_type.clone(),
        response_schema: options.response_schema.clone(),
        tools: non_empty(tools),
        tool_config,
    };

    tracing::debug!(
        model,
        contents = contents.len(),
        has_system = system_instruction.is_some(),
        "encoded generateContent request"
    );

    Ok(GeminiRequest {
        model: model.to_string(),
        contents,
        config: request_config,
        system_instruction,
    })
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
