pub mod codec;
pub mod encoder;
pub mod response_decoder;
pub mod stream;
pub mod tools;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Create-interaction request wire type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub input: Vec<InteractionsTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_interaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<InteractionsTool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<InteractionsGenerationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// One role-tagged turn of input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionsTurn {
    pub role: String,
    pub content: Vec<InteractionContent>,
}

/// A content item, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionContent {
    Text {
        text: String,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Thought {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<Vec<ThoughtSummaryContent>>,
    },
    FunctionCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        #[serde(default)]
        arguments: Value,
    },
    FunctionResult {
        call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    CodeExecutionCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        arguments: Value,
    },
    CodeExecutionResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        #[serde(default)]
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Item types with no canonical counterpart (audio, search results, ...).
    #[serde(other)]
    Unsupported,
}

/// One entry of a thought summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThoughtSummaryContent {
    Text(SummaryText),
    Other(Value),
}

impl ThoughtSummaryContent {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        ThoughtSummaryContent::Text(SummaryText {
            kind: summary_text_kind(),
            text: text.into(),
        })
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ThoughtSummaryContent::Text(summary) => Some(&summary.text),
            ThoughtSummaryContent::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryText {
    #[serde(rename = "type", default = "summary_text_kind")]
    pub kind: String,
    pub text: String,
}

fn summary_text_kind() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionsGenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_summaries: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<InteractionsToolChoice>,
}

impl InteractionsGenerationConfig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `tool_choice`: a bare mode string or an allowed-tools object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InteractionsToolChoice {
    Mode(String),
    Config { allowed_tools: AllowedTools },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedTools {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// A tool entry, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionsTool {
    Function {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parameters: Option<Value>,
    },
    GoogleSearch,
    CodeExecution,
    UrlContext,
    FileSearch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_search_store_names: Option<Vec<String>>,
    },
    McpServer {
        name: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allowed_tools: Option<Value>,
    },
}

impl InteractionsTool {
    /// `type` tags this enum understands.
    pub const KNOWN_TYPES: [&'static str; 6] = [
        "function",
        "google_search",
        "code_execution",
        "url_context",
        "file_search",
        "mcp_server",
    ];
}

/// A complete interaction, as returned by create or carried in stream events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default)]
    pub outputs: Vec<InteractionContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<InteractionUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_thought_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cached_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// Server-sent event of a streamed interaction, tagged by `event_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum InteractionSseEvent {
    #[serde(rename = "interaction.start")]
    InteractionStart { interaction: Interaction },
    #[serde(rename = "interaction.complete")]
    InteractionComplete { interaction: Interaction },
    #[serde(rename = "interaction.status_update")]
    InteractionStatusUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interaction_id: Option<String>,
        status: String,
    },
    #[serde(rename = "content.start")]
    ContentStart {
        index: usize,
        content: InteractionContent,
    },
    #[serde(rename = "content.delta")]
    ContentDelta { index: usize, delta: ContentDelta },
    #[serde(rename = "content.stop")]
    ContentStop { index: usize },
    #[serde(rename = "error")]
    Error { error: StreamErrorBody },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Incremental payload of a `content.delta` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    Text {
        #[serde(default)]
        text: String,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    ThoughtSummary {
        content: ThoughtSummaryContent,
    },
    ThoughtSignature {
        signature: String,
    },
    FunctionCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arguments: Option<Value>,
    },
    CodeExecutionResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        #[serde(default)]
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}
