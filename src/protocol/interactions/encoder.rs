use serde_json::Value;

use crate::config::TranscodeConfig;
use crate::error::TranscodeError;
use crate::protocol::assembler::assemble;
use crate::protocol::canonical::{CanonicalMessage, CanonicalRole};
use crate::protocol::interactions::codec::InteractionsEncoder;
use crate::protocol::interactions::tools::{format_tool_choice, format_tools};
use crate::protocol::mapping::is_model_role;
use crate::protocol::interactions::{
    InteractionsGenerationConfig, InteractionsRequest, InteractionsTurn,
};
use crate::protocol::tools::{ToolChoice, ToolEntry};

/// What the interaction runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionsTarget {
    Model(String),
    Agent(String),
}

impl Default for InteractionsTarget {
    fn default() -> Self {
        InteractionsTarget::Model(String::new())
    }
}

/// Caller-chosen parameters for a create-interaction request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionsOptions {
    pub target: InteractionsTarget,
    /// Continue server-side state from this interaction.
    pub previous_interaction_id: Option<String>,
    pub store: Option<bool>,
    pub background: Option<bool>,
    pub stream: Option<bool>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub seed: Option<i64>,
    pub max_output_tokens: Option<u32>,
    pub stop_sequences: Vec<String>,
    pub thinking_level: Option<String>,
    pub thinking_summaries: Option<String>,
    pub response_mime_type: Option<String>,
    pub response_format: Option<Value>,
    pub tools: Vec<ToolEntry>,
    pub tool_choice: Option<ToolChoice>,
}

/// Encoded conversation: merged turns plus the lifted system instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTurns {
    pub turns: Vec<InteractionsTurn>,
    pub system_instruction: Option<String>,
}

/// Encode a canonical history into Interactions turns.
///
/// # Errors
///
/// Returns [`TranscodeError`] when a role has no mapping, a tool result has
/// no call id, or a block cannot be encoded.
pub fn encode_turns(
    messages: &[CanonicalMessage],
    config: &TranscodeConfig,
) -> Result<EncodedTurns, TranscodeError> {
    let encoder = InteractionsEncoder {
        images: &config.images,
    };
    let assembled = assemble(&encoder, messages, &config.system_instruction_separator)?;
    Ok(EncodedTurns {
        turns: assembled
            .turns
            .into_iter()
            .map(|turn| InteractionsTurn {
                role: turn.role.to_string(),
                content: turn.items,
            })
            .collect(),
        system_instruction: assembled.system_instruction,
    })
}

/// The interaction id of the most recent AI message, if any was recorded.
#[must_use]
pub fn resolve_previous_interaction_id(messages: &[CanonicalMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .filter(|message| is_model_role(&message.role))
        .find_map(CanonicalMessage::interaction_id)
}

/// Drop the history the server already holds for `previous_interaction_id`.
///
/// Returns everything after the AI message carrying that id, keeping system
/// messages. When no message matches, the history is returned unchanged.
#[must_use]
pub fn trim_to_previous_interaction<'a>(
    messages: &'a [CanonicalMessage],
    previous_interaction_id: &str,
) -> Vec<&'a CanonicalMessage> {
    let boundary = messages.iter().rposition(|message| {
        is_model_role(&message.role)
            && message.interaction_id() == Some(previous_interaction_id)
    });
    match boundary {
        Some(position) => messages[..=position]
            .iter()
            .filter(|message| message.role == CanonicalRole::System)
            .chain(&messages[position + 1..])
            .collect(),
        None => messages.iter().collect(),
    }
}

/// Build a complete create-interaction request.
///
/// # Errors
///
/// Returns [`TranscodeError`] when the history cannot be encoded.
pub fn encode_interactions_request(
    messages: &[CanonicalMessage],
    options: &InteractionsOptions,
    config: &TranscodeConfig,
) -> Result<InteractionsRequest, TranscodeError> {
    let trimmed: Vec<CanonicalMessage>;
    let history: &[CanonicalMessage] = match options.previous_interaction_id.as_deref() {
        Some(previous) if config.interactions.trim_to_previous_interaction => {
            trimmed = trim_to_previous_interaction(messages, previous)
                .into_iter()
                .cloned()
                .collect();
            tracing::debug!(
                previous_interaction_id = previous,
                kept = trimmed.len(),
                total = messages.len(),
                "trimmed history to previous interaction"
            );
            &trimmed
        }
        _ => messages,
    };

    let EncodedTurns {
        turns,
        system_instruction,
    } = encode_turns(history, config)?;

    let generation_config = InteractionsGenerationConfig {
        temperature: options.temperature,
        top_p: options.top_p,
        seed: options.seed,
        max_output_tokens: options.max_output_tokens,
        stop_sequences: (!options.stop_sequences.is_empty())
            .then(|| options.stop_sequences.clone()),
        thinking_level: options.thinking_level.clone(),
        thinking_summaries: options.thinking_summaries.clone(),
        tool_choice: options.tool_choice.as_ref().and_then(format_tool_choice),
    };
    let tools = format_tools(&options.tools);

    let (model, agent) = match &options.target {
        InteractionsTarget::Model(model) => (Some(model.clone()), None),
        InteractionsTarget::Agent(agent) => (None, Some(agent.clone())),
    };

    Ok(InteractionsRequest {
        model,
        agent,
        input: turns,
        system_instruction,
        previous_interaction_id: options.previous_interaction_id.clone(),
        tools: (!tools.is_empty()).then_some(tools),
        generation_config: (!generation_config.is_empty()).then_some(generation_config),
        response_mime_type: options.response_mime_type.clone(),
        response_format: options.response_format.clone(),
        background: options.background,
        store: options.store,
        stream: options.stream,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::canonical::{keys, ContentBlock, ToolCall};
    use crate::protocol::tools::ToolMode;
    use serde_json::json;

    fn history() -> Vec<CanonicalMessage> {
        vec![
            CanonicalMessage::system("sys"),
            CanonicalMessage::human("first"),
            CanonicalMessage::ai("reply one").with_metadata(keys::INTERACTION_ID, "int_1"),
            CanonicalMessage::human("second"),
            CanonicalMessage::ai("reply two").with_metadata(keys::INTERACTION_ID, "int_2"),
            CanonicalMessage::human("third"),
        ]
    }

    #[test]
    fn test_resolve_previous_interaction_id() {
        assert_eq!(resolve_previous_interaction_id(&history()), Some("int_2"));
        assert_eq!(resolve_previous_interaction_id(&[CanonicalMessage::human("x")]), None);
    }

    #[test]
    fn test_trim_keeps_system_and_tail() {
        let messages = history();
        let kept = trim_to_previous_interaction(&messages, "int_1");
        let texts: Vec<_> = kept.iter().map(|m| m.content.flattened_text()).collect();
        assert_eq!(texts, vec!["sys", "second", "reply two", "third"]);

        let untouched = trim_to_previous_interaction(&messages, "missing");
        assert_eq!(untouched.len(), messages.len());
    }

    #[test]
    fn test_request_with_previous_interaction() {
        let options = InteractionsOptions {
            target: InteractionsTarget::Model("gemini-3-pro".into()),
            previous_interaction_id: Some("int_2".into()),
            store: Some(true),
            thinking_level: Some("high".into()),
            tool_choice: Some(ToolChoice::Mode(ToolMode::Any)),
            ..InteractionsOptions::default()
        };
        let request =
            encode_interactions_request(&history(), &options, &TranscodeConfig::default())
                .unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "gemini-3-pro",
                "input": [{"role": "user", "content": [{"type": "text", "text": "third"}]}],
                "system_instruction": "sys",
                "previous_interaction_id": "int_2",
                "generation_config": {"thinking_level": "high", "tool_choice": "any"},
                "store": true
            })
        );
    }

    #[test]
    fn test_trimming_can_be_disabled() {
        let mut config = TranscodeConfig::default();
        config.interactions.trim_to_previous_interaction = false;
        let options = InteractionsOptions {
            target: InteractionsTarget::Agent("deep-research".into()),
            previous_interaction_id: Some("int_2".into()),
            ..InteractionsOptions::default()
        };
        let request = encode_interactions_request(&history(), &options, &config).unwrap();
        assert_eq!(request.input.len(), 5);
        assert_eq!(request.agent.as_deref(), Some("deep-research"));
        assert_eq!(request.model, None);
    }

    #[test]
    fn test_signature_on_content_less_tool_turn() {
        let messages = vec![
            CanonicalMessage::human("go"),
            CanonicalMessage::ai(Vec::<ContentBlock>::new())
                .with_tool_calls(vec![ToolCall {
                    id: "fc_1".into(),
                    name: "f".into(),
                    args: json!({}),
                }])
                .with_metadata(keys::THOUGHT_SIGNATURE, "sig"),
            CanonicalMessage::tool("fc_1", "done"),
        ];
        let encoded = encode_turns(&messages, &TranscodeConfig::default()).unwrap();
        assert_eq!(
            serde_json::to_value(&encoded.turns[1]).unwrap(),
            json!({"role": "model", "content": [
                {"type": "function_call", "id": "fc_1", "name": "f", "arguments": {}},
                {"type": "thought", "signature": "sig"}
            ]})
        );
    }
}
