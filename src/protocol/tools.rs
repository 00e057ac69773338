use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::gemini::{GeminiFunctionDeclaration, GeminiTool, GeminiToolConfig};
use crate::protocol::interactions::{InteractionsTool, InteractionsToolChoice};

/// A protocol-neutral function declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolDeclaration {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

impl From<ToolDeclaration> for GeminiFunctionDeclaration {
    fn from(value: ToolDeclaration) -> Self {
        GeminiFunctionDeclaration {
            name: value.name,
            description: value.description,
            parameters: value.parameters,
        }
    }
}

impl From<GeminiFunctionDeclaration> for ToolDeclaration {
    fn from(value: GeminiFunctionDeclaration) -> Self {
        ToolDeclaration {
            name: value.name,
            description: value.description,
            parameters: value.parameters,
        }
    }
}

impl From<ToolDeclaration> for InteractionsTool {
    fn from(value: ToolDeclaration) -> Self {
        InteractionsTool::Function {
            name: value.name,
            description: value.description,
            parameters: value.parameters,
        }
    }
}

/// A tool as supplied by the caller, classified once.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEntry {
    Declared(ToolDeclaration),
    Standard(GeminiTool),
    Interactions(InteractionsTool),
    Unrecognized(Value),
}

const STANDARD_MARKERS: [&str; 8] = [
    "functionDeclarations",
    "function_declarations",
    "googleSearch",
    "google_search",
    "codeExecution",
    "code_execution",
    "urlContext",
    "url_context",
];

impl ToolEntry {
    /// Classify raw JSON by its marker fields.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Some(object) = value.as_object() else {
            return ToolEntry::Unrecognized(value);
        };

        if let Some(kind) = object.get("type").and_then(Value::as_str) {
            if kind == "function" {
                if let Some(function) = object.get("function") {
                    return declared(function).unwrap_or(ToolEntry::Unrecognized(value));
                }
            }
            if InteractionsTool::KNOWN_TYPES.contains(&kind) {
                return match serde_json::from_value::<InteractionsTool>(value.clone()) {
                    Ok(tool) => ToolEntry::Interactions(tool),
                    Err(_) => ToolEntry::Unrecognized(value),
                };
            }
            return ToolEntry::Unrecognized(value);
        }

        if STANDARD_MARKERS.iter().any(|marker| object.contains_key(*marker)) {
            return match serde_json::from_value::<GeminiTool>(value.clone()) {
                Ok(tool) => ToolEntry::Standard(tool),
                Err(_) => ToolEntry::Unrecognized(value),
            };
        }

        // A bare declaration: `parameters` is omitted for zero-argument tools.
        if object.contains_key("name") {
            if let Some(entry) = declared(&value) {
                return entry;
            }
        }
        ToolEntry::Unrecognized(value)
    }
}

fn declared(value: &Value) -> Option<ToolEntry> {
    let declaration: ToolDeclaration = serde_json::from_value(value.clone()).ok()?;
    if declaration.name.is_empty() {
        return None;
    }
    Some(ToolEntry::Declared(declaration))
}

impl From<ToolDeclaration> for ToolEntry {
    fn from(value: ToolDeclaration) -> Self {
        ToolEntry::Declared(value)
    }
}

/// Function-calling mode shared by both protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    Auto,
    Any,
    None,
}

impl ToolMode {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Some(ToolMode::Auto),
            "any" | "required" => Some(ToolMode::Any),
            "none" => Some(ToolMode::None),
            _ => None,
        }
    }
}

/// A tool choice as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolChoice {
    Mode(ToolMode),
    /// Force a call to one of the named functions.
    Function(Vec<String>),
    Standard(GeminiToolConfig),
    Interactions(InteractionsToolChoice),
    Unrecognized(Value),
}

impl ToolChoice {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => match ToolMode::parse(s) {
                Some(mode) => ToolChoice::Mode(mode),
                None if !s.is_empty() => ToolChoice::Function(vec![s.clone()]),
                None => ToolChoice::Unrecognized(value.clone()),
            },
            Value::Bool(true) => ToolChoice::Mode(ToolMode::Any),
            Value::Bool(false) => ToolChoice::Mode(ToolMode::None),
            Value::Array(items) => {
                let names: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect();
                match names {
                    Some(names) if !names.is_empty() => ToolChoice::Function(names),
                    _ => ToolChoice::Unrecognized(value.clone()),
                }
            }
            Value::Object(object) => {
                if object.contains_key("functionCallingConfig")
                    || object.contains_key("function_calling_config")
                {
                    if let Ok(config) = serde_json::from_value(value.clone()) {
                        return ToolChoice::Standard(config);
                    }
                } else if object.contains_key("allowed_tools") {
                    if let Ok(choice) = serde_json::from_value(value.clone()) {
                        return ToolChoice::Interactions(choice);
                    }
                } else if let Some(name) = object
                    .get("function")
                    .and_then(|function| function.get("name"))
                    .or_else(|| object.get("name"))
                    .and_then(Value::as_str)
                {
                    return ToolChoice::Function(vec![name.to_string()]);
                }
                ToolChoice::Unrecognized(value.clone())
            }
            _ => ToolChoice::Unrecognized(value.clone()),
        }
    }
}
