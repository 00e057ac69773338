use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::mapping::finish_reason_to_canonical;

/// Free-form per-message metadata (signatures, ids, finish reasons).
pub type Metadata = serde_json::Map<String, Value>;

/// Well-known metadata keys surfaced to callers.
pub mod keys {
    pub const THOUGHT_SIGNATURE: &str = "thought_signature";
    pub const THOUGHT_SIGNATURE_CAMEL: &str = "thoughtSignature";
    pub const FINISH_REASON: &str = "finish_reason";
    pub const FINISH_REASON_CAMEL: &str = "finishReason";
    pub const INTERACTION_ID: &str = "interaction_id";
    pub const THOUGHTS: &str = "thoughts";
    pub const CODE_EXECUTION_RESULT: &str = "code_execution_result";
    pub const RESPONSE_ID: &str = "response_id";
    pub const MODEL_VERSION: &str = "model_version";
    pub const STATUS: &str = "status";
}

/// Canonical message role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalRole {
    System,
    Human,
    Ai,
    Tool,
    /// A caller-defined role string; only user/model aliases have a wire mapping.
    Generic(String),
}

impl CanonicalRole {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            CanonicalRole::System => "system",
            CanonicalRole::Human => "human",
            CanonicalRole::Ai => "ai",
            CanonicalRole::Tool => "tool",
            CanonicalRole::Generic(role) => role,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalStopReason {
    EndOfTurn,
    ToolCalls,
    MaxTokens,
    ContentFilter,
    Other,
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// Where an image's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    /// A `data:` URL or an external `gs://` / `http(s)://` reference.
    Url(String),
    /// Bare base64 payload; requires a MIME type on the block.
    Base64(String),
}

/// A single unit of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    Image {
        source: ImageSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    FunctionCall {
        id: String,
        name: String,
        #[serde(default)]
        args: Value,
    },
    FunctionResult {
        call_id: String,
        name: String,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        is_error: bool,
    },
    /// A block kind this layer has no mapping for; encoding it always fails.
    Other {
        kind: String,
        #[serde(default)]
        value: Value,
    },
}

impl ContentBlock {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    #[must_use]
    pub fn reasoning(text: impl Into<String>) -> Self {
        ContentBlock::Reasoning { text: text.into() }
    }

    #[must_use]
    pub fn image_url(url: impl Into<String>) -> Self {
        ContentBlock::Image {
            source: ImageSource::Url(url.into()),
            mime_type: None,
        }
    }

    /// Build a block from caller-supplied JSON.
    ///
    /// Shapes that do not match a known block become [`ContentBlock::Other`]
    /// so the failure surfaces at encode time with the offending type name.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<ContentBlock>(value.clone()) {
            Ok(block) => block,
            Err(_) => {
                let kind = value
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                ContentBlock::Other { kind, value }
            }
        }
    }

    /// The block's type tag, as used in error messages.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Reasoning { .. } => "reasoning",
            ContentBlock::Image { .. } => "image",
            ContentBlock::FunctionCall { .. } => "function_call",
            ContentBlock::FunctionResult { .. } => "function_result",
            ContentBlock::Other { kind, .. } => kind,
        }
    }
}

/// A message body: either one text value or an ordered block sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl MessageContent {
    /// Concatenated answer text; reasoning and non-text blocks are excluded.
    #[must_use]
    pub fn flattened_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => {
                let mut out = String::new();
                for block in blocks {
                    if let ContentBlock::Text { text } = block {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(text) => text.is_empty(),
            MessageContent::Blocks(blocks) => blocks.is_empty(),
        }
    }

    /// View the body as blocks; a non-empty plain text becomes one text block.
    #[must_use]
    pub fn to_blocks(&self) -> Vec<ContentBlock> {
        match self {
            MessageContent::Text(text) if text.is_empty() => Vec::new(),
            MessageContent::Text(text) => vec![ContentBlock::text(text.clone())],
            MessageContent::Blocks(blocks) => blocks.clone(),
        }
    }

    #[must_use]
    pub fn reasoning_blocks(&self) -> Vec<&str> {
        match self {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Reasoning { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        MessageContent::Text(value.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        MessageContent::Text(value)
    }
}

impl From<Vec<ContentBlock>> for MessageContent {
    fn from(value: Vec<ContentBlock>) -> Self {
        MessageContent::Blocks(value)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// A streamed tool call whose argument text never became valid JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub args: String,
    pub error: String,
}

/// A single message in the canonical conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub role: CanonicalRole,
    #[serde(default)]
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_tool_calls: Vec<InvalidToolCall>,
    /// Function name of a tool-result message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Only meaningful on tool-result messages.
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CanonicalUsage>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CanonicalMessage {
    #[must_use]
    pub fn new(role: CanonicalRole, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            invalid_tool_calls: Vec::new(),
            name: None,
            tool_call_id: None,
            is_error: false,
            usage: None,
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(CanonicalRole::System, content)
    }

    #[must_use]
    pub fn human(content: impl Into<MessageContent>) -> Self {
        Self::new(CanonicalRole::Human, content)
    }

    #[must_use]
    pub fn ai(content: impl Into<MessageContent>) -> Self {
        Self::new(CanonicalRole::Ai, content)
    }

    /// A tool-result message answering the call `tool_call_id`.
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        let mut message = Self::new(CanonicalRole::Tool, content);
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn metadata_str(&self, primary: &str, alias: &str) -> Option<&str> {
        self.metadata
            .get(primary)
            .or_else(|| self.metadata.get(alias))
            .and_then(Value::as_str)
    }

    /// The continuation signature recorded when this message was decoded.
    #[must_use]
    pub fn thought_signature(&self) -> Option<&str> {
        self.metadata_str(keys::THOUGHT_SIGNATURE, keys::THOUGHT_SIGNATURE_CAMEL)
            .filter(|sig| !sig.is_empty())
    }

    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.metadata_str(keys::FINISH_REASON, keys::FINISH_REASON_CAMEL)
    }

    #[must_use]
    pub fn interaction_id(&self) -> Option<&str> {
        self.metadata
            .get(keys::INTERACTION_ID)
            .and_then(Value::as_str)
    }

    /// Legacy flat list of reasoning texts.
    #[must_use]
    pub fn thoughts(&self) -> Vec<&str> {
        self.metadata
            .get(keys::THOUGHTS)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn stop_reason(&self) -> CanonicalStopReason {
        let base = self
            .finish_reason()
            .map_or(CanonicalStopReason::EndOfTurn, finish_reason_to_canonical);
        if base == CanonicalStopReason::EndOfTurn && !self.tool_calls.is_empty() {
            CanonicalStopReason::ToolCalls
        } else {
            base
        }
    }
}

/// A fully decoded, non-streaming response.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalResponse {
    pub id: Option<String>,
    pub model: Option<String>,
    /// The first candidate / the interaction's output.
    pub message: CanonicalMessage,
    /// Further candidates, when the server produced more than one.
    pub alternatives: Vec<CanonicalMessage>,
    pub usage: CanonicalUsage,
}
