pub mod validation;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// How image blocks without an explicit MIME type are treated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// MIME type used when neither the block nor the URI extension names one.
    #[serde(default = "default_image_mime_type")]
    pub default_mime_type: String,
    /// Reject images whose MIME type would otherwise fall back to the default.
    #[serde(default)]
    pub require_explicit_mime_type: bool,
}

fn default_image_mime_type() -> String {
    "image/jpeg".to_string()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            default_mime_type: default_image_mime_type(),
            require_explicit_mime_type: false,
        }
    }
}

/// Interactions-protocol request shaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionsConfig {
    /// When a `previous_interaction_id` is sent, drop the history the server
    /// already holds (everything up to and including the matching AI turn).
    #[serde(default = "default_true")]
    pub trim_to_previous_interaction: bool,
}

impl Default for InteractionsConfig {
    fn default() -> Self {
        Self {
            trim_to_previous_interaction: true,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_system_separator() -> String {
    "\n\n".to_string()
}

/// Top-level translation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Joins the text of multiple system messages into one instruction.
    #[serde(default = "default_system_separator")]
    pub system_instruction_separator: String,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub interactions: InteractionsConfig,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            system_instruction_separator: default_system_separator(),
            images: ImageConfig::default(),
            interactions: InteractionsConfig::default(),
        }
    }
}

impl TranscodeConfig {
    /// Parse and validate configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] when parsing fails or
    /// [`ConfigError::Validation`] when semantic validation fails.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: TranscodeConfig = serde_yaml::from_str(contents)?;
        validate_config(&config)?;
        Ok(config)
    }
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<TranscodeConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    TranscodeConfig::from_yaml_str(&contents)
}
