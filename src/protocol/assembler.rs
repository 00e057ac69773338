use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::TranscodeError;
use crate::protocol::canonical::{
    CanonicalMessage, CanonicalRole, ContentBlock, MessageContent, ToolCall,
};
use crate::protocol::mapping::canonical_role_to_wire;
use crate::protocol::signature::carried_signature;
use crate::util::push_joined;

/// Per-protocol content encoding used by [`assemble`].
pub trait TurnEncoder {
    /// One wire part (standard) or content item (Interactions).
    type Item;

    /// Protocol name used in error messages.
    const PROTOCOL: &'static str;

    /// Encode one block; `Ok(None)` means the block produces no wire content.
    fn encode_block(&self, block: &ContentBlock) -> Result<Option<Self::Item>, TranscodeError>;

    fn encode_tool_call(&self, call: &ToolCall) -> Self::Item;

    /// Encode a tool-result message whose function name is already resolved.
    fn encode_tool_result(
        &self,
        message: &CanonicalMessage,
        name: Option<&str>,
    ) -> Result<Self::Item, TranscodeError>;

    fn attach_signature(&self, items: &mut Vec<Self::Item>, signature: &str);
}

/// One role-tagged wire entry.
#[derive(Debug, Clone, PartialEq)]
pub struct WireTurn<T> {
    pub role: &'static str,
    pub items: Vec<T>,
}

/// Output of [`assemble`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTurns<T> {
    pub turns: Vec<WireTurn<T>>,
    pub system_instruction: Option<String>,
}

/// Turn an ordered canonical history into merged wire turns plus one system
/// instruction.
///
/// # Errors
///
/// Returns [`TranscodeError::UnsupportedMessageType`] for roles without a
/// wire mapping, and propagates block encoding failures.
pub fn assemble<E: TurnEncoder>(
    encoder: &E,
    messages: &[CanonicalMessage],
    system_separator: &str,
) -> Result<AssembledTurns<E::Item>, TranscodeError> {
    let mut system = String::new();
    let mut call_names: FxHashMap<&str, &str> = FxHashMap::default();
    let mut encoded = Vec::with_capacity(messages.len());

    for message in messages {
        if message.role == CanonicalRole::System {
            push_joined(&mut system, system_separator, &message.content.flattened_text());
            continue;
        }
        let role = canonical_role_to_wire(&message.role)?;
        let items = encode_message(encoder, message, &call_names)?;
        remember_call_names(message, &mut call_names);
        if items.is_empty() {
            tracing::debug!(role = message.role.label(), "dropping message with no wire content");
            continue;
        }
        encoded.push(WireTurn { role, items });
    }

    Ok(AssembledTurns {
        turns: merge_adjacent(encoded),
        system_instruction: (!system.is_empty()).then_some(system),
    })
}

/// Merge neighbouring entries that share a role.
#[must_use]
pub fn merge_adjacent<T>(turns: Vec<WireTurn<T>>) -> Vec<WireTurn<T>> {
    turns.into_iter().fold(Vec::new(), |mut merged, turn| {
        match merged.last_mut() {
            Some(previous) if previous.role == turn.role => previous.items.extend(turn.items),
            _ => merged.push(turn),
        }
        merged
    })
}

fn encode_message<E: TurnEncoder>(
    encoder: &E,
    message: &CanonicalMessage,
    call_names: &FxHashMap<&str, &str>,
) -> Result<Vec<E::Item>, TranscodeError> {
    if message.role == CanonicalRole::Tool {
        let name = message.name.as_deref().or_else(|| {
            message
                .tool_call_id
                .as_deref()
                .and_then(|id| call_names.get(id).copied())
        });
        return Ok(vec![encoder.encode_tool_result(message, name)?]);
    }

    let mut items = Vec::new();
    let mut encoded_call_ids: Vec<&str> = Vec::new();
    if let MessageContent::Blocks(blocks) = &message.content {
        for block in blocks {
            if let ContentBlock::FunctionCall { id, .. } = block {
                encoded_call_ids.push(id);
            }
            if let Some(item) = encoder.encode_block(block)? {
                items.push(item);
            }
        }
    } else {
        let text = ContentBlock::text(message.content.flattened_text());
        if let Some(item) = encoder.encode_block(&text)? {
            items.push(item);
        }
    }

    for call in &message.tool_calls {
        if encoded_call_ids.contains(&call.id.as_str()) {
            continue;
        }
        items.push(encoder.encode_tool_call(call));
    }

    if let Some(signature) = carried_signature(message) {
        encoder.attach_signature(&mut items, signature);
    }
    Ok(items)
}

fn remember_call_names<'a>(
    message: &'a CanonicalMessage,
    call_names: &mut FxHashMap<&'a str, &'a str>,
) {
    for call in &message.tool_calls {
        call_names.insert(&call.id, &call.name);
    }
    if let MessageContent::Blocks(blocks) = &message.content {
        for block in blocks {
            if let ContentBlock::FunctionCall { id, name, .. } = block {
                call_names.insert(id, name);
            }
        }
    }
}

/// The JSON payload a tool-result message carries.
///
/// Text that parses as JSON is used as-is, other text as a string; explicit
/// function-result blocks win over both.
#[must_use]
pub fn tool_result_value(message: &CanonicalMessage) -> Value {
    match &message.content {
        MessageContent::Text(text) => parse_result_text(text),
        MessageContent::Blocks(blocks) => {
            let mut results = blocks.iter().filter_map(|block| match block {
                ContentBlock::FunctionResult { result, .. } => Some(result.clone()),
                _ => None,
            });
            match (results.next(), results.next()) {
                (Some(only), None) => only,
                (Some(first), Some(second)) => {
                    let mut all = vec![first, second];
                    all.extend(results);
                    Value::Array(all)
                }
                (None, _) => parse_result_text(&message.content.flattened_text()),
            }
        }
    }
}

fn parse_result_text(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
        _ => Value::String(text.to_string()),
    }
}
