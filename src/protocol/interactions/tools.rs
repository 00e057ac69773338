use crate::protocol::gemini::{GeminiTool, GeminiToolConfig};
use crate::protocol::interactions::{AllowedTools, InteractionsTool, InteractionsToolChoice};
use crate::protocol::tools::{ToolChoice, ToolDeclaration, ToolEntry, ToolMode};

/// Format tool entries for a create-interaction request, in caller order.
#[must_use]
pub fn format_tools(entries: &[ToolEntry]) -> Vec<InteractionsTool> {
    let mut tools = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            ToolEntry::Declared(declaration) => tools.push(declaration.clone().into()),
            ToolEntry::Interactions(tool) => tools.push(tool.clone()),
            ToolEntry::Standard(tool) => convert_standard_tool(tool, &mut tools),
            ToolEntry::Unrecognized(value) => {
                tracing::warn!(tool = %value, "unrecognized tool definition, skipping");
            }
        }
    }
    tools
}

/// A standard tool may bundle several capabilities; each becomes one entry.
fn convert_standard_tool(tool: &GeminiTool, out: &mut Vec<InteractionsTool>) {
    for declaration in tool.function_declarations.iter().flatten() {
        out.push(ToolDeclaration::from(declaration.clone()).into());
    }
    if tool.google_search.is_some() {
        out.push(InteractionsTool::GoogleSearch);
    }
    if tool.code_execution.is_some() {
        out.push(InteractionsTool::CodeExecution);
    }
    if tool.url_context.is_some() {
        out.push(InteractionsTool::UrlContext);
    }
}

fn mode_name(mode: ToolMode) -> &'static str {
    match mode {
        ToolMode::Auto => "auto",
        ToolMode::Any => "any",
        ToolMode::None => "none",
    }
}

/// Format a tool choice as `generation_config.tool_choice`.
#[must_use]
pub fn format_tool_choice(choice: &ToolChoice) -> Option<InteractionsToolChoice> {
    match choice {
        ToolChoice::Mode(mode) => Some(InteractionsToolChoice::Mode(mode_name(*mode).to_string())),
        ToolChoice::Function(names) => Some(InteractionsToolChoice::Config {
            allowed_tools: AllowedTools {
                mode: Some("validated".to_string()),
                tools: names.clone(),
            },
        }),
        ToolChoice::Interactions(choice) => Some(choice.clone()),
        ToolChoice::Standard(config) => from_standard_config(config),
        ToolChoice::Unrecognized(value) => {
            tracing::warn!(tool_choice = %value, "unrecognized tool choice, skipping");
            None
        }
    }
}

fn from_standard_config(config: &GeminiToolConfig) -> Option<InteractionsToolChoice> {
    let calling = config.function_calling_config.as_ref()?;
    let mode = calling.mode.as_deref().map(str::to_ascii_lowercase);
    match &calling.allowed_function_names {
        Some(names) if !names.is_empty() => Some(InteractionsToolChoice::Config {
            allowed_tools: AllowedTools {
                mode,
                tools: names.clone(),
            },
        }),
        _ => mode.map(InteractionsToolChoice::Mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declarations_become_function_tools() {
        let tools = format_tools(&[
            ToolDeclaration::new("f").with_description("does f").into(),
            ToolEntry::from_value(json!({"type": "url_context"})),
            ToolEntry::Unrecognized(json!(42)),
        ]);
        assert_eq!(
            serde_json::to_value(&tools).unwrap(),
            json!([
                {"type": "function", "name": "f", "description": "does f"},
                {"type": "url_context"}
            ])
        );
    }

    #[test]
    fn test_zero_argument_declaration_from_json() {
        let value = serde_json::to_value(ToolDeclaration::new("ping")).unwrap();
        let tools = format_tools(&[ToolEntry::from_value(value)]);
        assert_eq!(
            serde_json::to_value(&tools).unwrap(),
            json!([{"type": "function", "name": "ping"}])
        );
    }

    #[test]
    fn test_standard_tool_expanded() {
        let tools = format_tools(&[ToolEntry::from_value(json!({
            "functionDeclarations": [{"name": "a"}, {"name": "b"}],
            "googleSearch": {}
        }))]);
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[2], InteractionsTool::GoogleSearch);
    }

    #[test]
    fn test_tool_choice_forms() {
        assert_eq!(
            format_tool_choice(&ToolChoice::Mode(ToolMode::None)),
            Some(InteractionsToolChoice::Mode("none".into()))
        );
        assert_eq!(
            serde_json::to_value(format_tool_choice(&ToolChoice::Function(vec!["f".into()]))).unwrap(),
            json!({"allowed_tools": {"mode": "validated", "tools": ["f"]}})
        );
        let standard = ToolChoice::from_value(&json!({
            "functionCallingConfig": {"mode": "ANY", "allowedFunctionNames": ["g"]}
        }));
        assert_eq!(
            format_tool_choice(&standard),
            Some(InteractionsToolChoice::Config {
                allowed_tools: AllowedTools {
                    mode: Some("any".into()),
                    tools: vec!["g".into()]
                }
            })
        );
    }
}
