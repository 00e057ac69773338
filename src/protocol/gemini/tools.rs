use serde_json::Value;

use crate::protocol::gemini::{
    GeminiFunctionCallingConfig, GeminiFunctionDeclaration, GeminiTool, GeminiToolConfig,
};
use crate::protocol::interactions::{InteractionsTool, InteractionsToolChoice};
use crate::protocol::tools::{ToolChoice, ToolEntry, ToolMode};

/// Format tool entries for a `generateContent` request.
///
/// All function declarations are grouped into one leading tool; server-side
/// tools follow in caller order.
#[must_use]
pub fn format_tools(entries: &[ToolEntry]) -> Vec<GeminiTool> {
    let mut declarations: Vec<GeminiFunctionDeclaration> = Vec::new();
    let mut others: Vec<GeminiTool> = Vec::new();

    for entry in entries {
        match entry {
            ToolEntry::Declared(declaration) => declarations.push(declaration.clone().into()),
            ToolEntry::Standard(tool) => others.push(tool.clone()),
            ToolEntry::Interactions(tool) => match convert_interactions_tool(tool) {
                Converted::Declaration(declaration) => declarations.push(declaration),
                Converted::Tool(tool) => others.push(tool),
                Converted::Unavailable(kind) => {
                    tracing::warn!(tool_type = kind, "tool has no generateContent equivalent, skipping");
                }
            },
            ToolEntry::Unrecognized(value) => {
                tracing::warn!(tool = %value, "unrecognized tool definition, skipping");
            }
        }
    }

    let mut tools = Vec::with_capacity(others.len() + 1);
    if !declarations.is_empty() {
        tools.push(GeminiTool {
            function_declarations: Some(declarations),
            ..GeminiTool::default()
        });
    }
    tools.extend(others);
    tools
}

enum Converted {
    Declaration(GeminiFunctionDeclaration),
    Tool(GeminiTool),
    Unavailable(&'static str),
}

fn convert_interactions_tool(tool: &InteractionsTool) -> Converted {
    let empty = || Some(Value::Object(serde_json::Map::new()));
    match tool {
        InteractionsTool::Function {
            name,
            description,
            parameters,
        } => Converted::Declaration(GeminiFunctionDeclaration {
            name: name.clone(),
            description: description.clone(),
            parameters: parameters.clone(),
        }),
        InteractionsTool::GoogleSearch => Converted::Tool(GeminiTool {
            google_search: empty(),
            ..GeminiTool::default()
        }),
        InteractionsTool::CodeExecution => Converted::Tool(GeminiTool {
            code_execution: empty(),
            ..GeminiTool::default()
        }),
        InteractionsTool::UrlContext => Converted::Tool(GeminiTool {
            url_context: empty(),
            ..GeminiTool::default()
        }),
        InteractionsTool::FileSearch { .. } => Converted::Unavailable("file_search"),
        InteractionsTool::McpServer { .. } => Converted::Unavailable("mcp_server"),
    }
}

fn mode_name(mode: ToolMode) -> &'static str {
    match mode {
        ToolMode::Auto => "AUTO",
        ToolMode::Any => "ANY",
        ToolMode::None => "NONE",
    }
}

/// Format a tool choice as `toolConfig`; `None` when the choice is skipped.
#[must_use]
pub fn format_tool_choice(choice: &ToolChoice) -> Option<GeminiToolConfig> {
    let config = match choice {
        ToolChoice::Mode(mode) => GeminiFunctionCallingConfig {
            mode: Some(mode_name(*mode).to_string()),
            allowed_function_names: None,
        },
        ToolChoice::Function(names) => GeminiFunctionCallingConfig {
            mode: Some("ANY".to_string()),
            allowed_function_names: Some(names.clone()),
        },
        ToolChoice::Standard(config) => return Some(config.clone()),
        ToolChoice::Interactions(InteractionsToolChoice::Mode(mode)) => {
            GeminiFunctionCallingConfig {
                mode: Some(mode.to_ascii_uppercase()),
                allowed_function_names: None,
            }
        }
        ToolChoice::Interactions(InteractionsToolChoice::Config { allowed_tools }) => {
            GeminiFunctionCallingConfig {
                mode: Some(
                    allowed_tools
                        .mode
                        .as_deref()
                        .map_or_else(|| "ANY".to_string(), str::to_ascii_uppercase),
                ),
                allowed_function_names: Some(allowed_tools.tools.clone()),
            }
        }
        ToolChoice::Unrecognized(value) => {
            tracing::warn!(tool_choice = %value, "unrecognized tool choice, skipping");
            return None;
        }
    };
    Some(GeminiToolConfig {
        function_calling_config: Some(config),
    })
}
