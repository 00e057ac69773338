use serde_json::Value;
use smallvec::SmallVec;

use crate::protocol::canonical::{
    keys, CanonicalMessage, CanonicalRole, CanonicalUsage, ContentBlock, InvalidToolCall,
    Metadata, MessageContent, ToolCall,
};
use crate::util::generated_call_id;

/// A fragment of a tool call as it arrives on the wire.
///
/// Fragments sharing `Some(index)` belong to the same call; a fragment
/// without an index always starts a new call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallChunk {
    pub index: Option<usize>,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Raw argument text, possibly a partial JSON document.
    pub args: String,
}

impl ToolCallChunk {
    fn absorb(&mut self, other: ToolCallChunk) {
        if self.id.is_none() {
            self.id = other.id;
        }
        if self.name.is_none() {
            self.name = other.name;
        }
        self.args.push_str(&other.args);
    }
}

/// Argument text for a call whose arguments arrived as JSON.
///
/// An empty object means "no arguments yet" so that a start event followed
/// by an argument delta concatenates cleanly.
#[must_use]
pub fn args_text(args: &Value) -> String {
    match args {
        Value::Null => String::new(),
        Value::String(partial) => partial.clone(),
        Value::Object(map) if map.is_empty() => String::new(),
        other => other.to_string(),
    }
}

/// A partial AI message: one stream delta, or a whole response folded into one.
///
/// Chunks form a monoid under [`CanonicalMessageChunk::concat`] with
/// `Default` as identity, so any in-order partition of a response's deltas
/// folds to the same value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalMessageChunk {
    pub blocks: Vec<ContentBlock>,
    pub tool_call_chunks: SmallVec<[ToolCallChunk; 2]>,
    pub signature: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<CanonicalUsage>,
    pub response_id: Option<String>,
    pub model: Option<String>,
    pub interaction_id: Option<String>,
    pub status: Option<String>,
    pub code_execution_results: Vec<Value>,
}

impl CanonicalMessageChunk {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Append a content block, extending an open text or reasoning block of
    /// the same kind.
    pub fn push_block(&mut self, block: ContentBlock) {
        if matches!(
            &block,
            ContentBlock::Text { text } | ContentBlock::Reasoning { text } if text.is_empty()
        ) {
            return;
        }
        let extended = match (self.blocks.last_mut(), &block) {
            (Some(ContentBlock::Text { text: open }), ContentBlock::Text { text })
            | (Some(ContentBlock::Reasoning { text: open }), ContentBlock::Reasoning { text }) => {
                open.push_str(text);
                true
            }
            _ => false,
        };
        if !extended {
            self.blocks.push(block);
        }
    }

    pub fn push_tool_call(&mut self, chunk: ToolCallChunk) {
        if let Some(index) = chunk.index {
            if let Some(open) = self
                .tool_call_chunks
                .iter_mut()
                .rev()
                .find(|existing| existing.index == Some(index))
            {
                open.absorb(chunk);
                return;
            }
        }
        self.tool_call_chunks.push(chunk);
    }

    pub fn set_signature(&mut self, signature: &str) {
        if !signature.is_empty() {
            self.signature = Some(signature.to_string());
        }
    }

    /// Fold `other` into `self`; `other` is the later fragment.
    pub fn merge(&mut self, other: CanonicalMessageChunk) {
        for block in other.blocks {
            self.push_block(block);
        }
        for chunk in other.tool_call_chunks {
            self.push_tool_call(chunk);
        }
        self.code_execution_results
            .extend(other.code_execution_results);
        last_wins(&mut self.signature, other.signature);
        last_wins(&mut self.finish_reason, other.finish_reason);
        last_wins(&mut self.usage, other.usage);
        last_wins(&mut self.response_id, other.response_id);
        last_wins(&mut self.model, other.model);
        last_wins(&mut self.interaction_id, other.interaction_id);
        last_wins(&mut self.status, other.status);
    }

    #[must_use]
    pub fn concat(mut self, other: CanonicalMessageChunk) -> Self {
        self.merge(other);
        self
    }

    /// Finalize into an AI message.
    ///
    /// Tool-call ids missing on the wire become `call_<n>` by position, and
    /// argument text that is not a JSON object lands in `invalid_tool_calls`.
    #[must_use]
    pub fn finish(self) -> CanonicalMessage {
        let mut tool_calls = Vec::with_capacity(self.tool_call_chunks.len());
        let mut invalid_tool_calls = Vec::new();
        for (position, chunk) in self.tool_call_chunks.into_iter().enumerate() {
            let id = chunk.id.unwrap_or_else(|| generated_call_id(position));
            match finish_tool_call(id, chunk.name, chunk.args) {
                Ok(call) => tool_calls.push(call),
                Err(invalid) => {
                    tracing::warn!(
                        name = invalid.name.as_deref().unwrap_or("-"),
                        error = %invalid.error,
                        "tool call arguments did not parse"
                    );
                    invalid_tool_calls.push(invalid);
                }
            }
        }

        let mut metadata = Metadata::new();
        let thoughts: Vec<Value> = self
            .blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Reasoning { text } => Some(Value::String(text.clone())),
                _ => None,
            })
            .collect();
        if !thoughts.is_empty() {
            metadata.insert(keys::THOUGHTS.to_string(), Value::Array(thoughts));
        }
        insert_str(&mut metadata, keys::THOUGHT_SIGNATURE, self.signature);
        insert_str(&mut metadata, keys::FINISH_REASON, self.finish_reason);
        insert_str(&mut metadata, keys::INTERACTION_ID, self.interaction_id);
        insert_str(&mut metadata, keys::RESPONSE_ID, self.response_id);
        insert_str(&mut metadata, keys::MODEL_VERSION, self.model);
        insert_str(&mut metadata, keys::STATUS, self.status);
        if !self.code_execution_results.is_empty() {
            metadata.insert(
                keys::CODE_EXECUTION_RESULT.to_string(),
                Value::Array(self.code_execution_results),
            );
        }

        let mut message = CanonicalMessage::new(CanonicalRole::Ai, collapse_blocks(self.blocks));
        message.tool_calls = tool_calls;
        message.invalid_tool_calls = invalid_tool_calls;
        message.usage = self.usage;
        message.metadata = metadata;
        message
    }
}

fn last_wins<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

fn insert_str(metadata: &mut Metadata, key: &str, value: Option<String>) {
    if let Some(value) = value {
        metadata.insert(key.to_string(), Value::String(value));
    }
}

/// Plain text when every block is text, otherwise the block sequence.
fn collapse_blocks(blocks: Vec<ContentBlock>) -> MessageContent {
    if blocks
        .iter()
        .all(|block| matches!(block, ContentBlock::Text { .. }))
    {
        let mut text = String::new();
        for block in &blocks {
            if let ContentBlock::Text { text: fragment } = block {
                text.push_str(fragment);
            }
        }
        return MessageContent::Text(text);
    }
    MessageContent::Blocks(blocks)
}

fn finish_tool_call(
    id: String,
    name: Option<String>,
    args: String,
) -> Result<ToolCall, InvalidToolCall> {
    let Some(name) = name.filter(|name| !name.is_empty()) else {
        return Err(InvalidToolCall {
            id: Some(id),
            name: None,
            args,
            error: "missing function name".to_string(),
        });
    };
    if args.trim().is_empty() {
        return Ok(ToolCall {
            id,
            name,
            args: Value::Object(serde_json::Map::new()),
        });
    }
    let error = match serde_json::from_str::<Value>(&args) {
        Ok(parsed @ Value::Object(_)) => {
            return Ok(ToolCall {
                id,
                name,
                args: parsed,
            })
        }
        Ok(_) => "arguments are not a JSON object".to_string(),
        Err(e) => e.to_string(),
    };
    Err(InvalidToolCall {
        id: Some(id),
        name: Some(name),
        args,
        error,
    })
}
