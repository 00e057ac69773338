use super::{ConfigError, TranscodeConfig};

/// Validate the translation config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &TranscodeConfig) -> Result<(), ConfigError> {
    validate_log_level(config)?;
    validate_images(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_log_level(config: &TranscodeConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    Ok(())
}

fn validate_images(config: &TranscodeConfig) -> Result<(), ConfigError> {
    let mime = config.images.default_mime_type.trim();
    let Some(subtype) = mime.strip_prefix("image/") else {
        return Err(validation_err(
            "images.default_mime_type must be an image/* MIME type",
        ));
    };
    if subtype.is_empty() || subtype.contains('/') {
        return Err(validation_err(format!(
            "images.default_mime_type is not a valid MIME type: {mime}"
        )));
    }
    Ok(())
}
