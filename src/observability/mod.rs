use crate::protocol::canonical::CanonicalUsage;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
pub fn init_tracing(log_level: &str) {
    let level = log_level.to_uppercase();

    if level == "DISABLED" {
        return;
    }

    let filter = EnvFilter::try_new(tracing_level(&level)).unwrap_or_else(|_| EnvFilter::new("INFO"));

    // A host application may already own the global subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

fn tracing_level(level: &str) -> &str {
    match level {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    }
}

/// Record the token usage reported for one decoded response.
pub fn log_usage(protocol: &str, model: Option<&str>, usage: &CanonicalUsage) {
    info!(
        protocol,
        model = model.unwrap_or("-"),
        input_tokens = usage.input_tokens.unwrap_or(0),
        output_tokens = usage.output_tokens.unwrap_or(0),
        reasoning_tokens = usage.reasoning_tokens.unwrap_or(0),
        cached_tokens = usage.cached_tokens.unwrap_or(0),
        total_tokens = usage.total_tokens.unwrap_or(0),
        "usage"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_aliases() {
        assert_eq!(tracing_level("WARNING"), "WARN");
        assert_eq!(tracing_level("CRITICAL"), "ERROR");
        assert_eq!(tracing_level("DEBUG"), "DEBUG");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing("DISABLED");
        init_tracing("ERROR");
        init_tracing("ERROR");
        log_usage("standard", None, &CanonicalUsage::default());
    }
}
