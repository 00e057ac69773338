use super::canonical::{CanonicalRole, CanonicalStopReason, CanonicalUsage};
use super::gemini::GeminiUsageMetadata;
use super::interactions::InteractionUsage;
use crate::error::TranscodeError;

// ---------------------------------------------------------------------------
// Role mappings
// ---------------------------------------------------------------------------

pub const USER_ROLE: &str = "user";
pub const MODEL_ROLE: &str = "model";

/// Wire role for a non-system message. Both protocols share `user`/`model`.
///
/// # Errors
///
/// Returns [`TranscodeError::UnsupportedMessageType`] for system messages
/// (they are lifted into the system instruction) and generic roles with no
/// user/model meaning.
pub fn canonical_role_to_wire(role: &CanonicalRole) -> Result<&'static str, TranscodeError> {
    match role {
        CanonicalRole::Human | CanonicalRole::Tool => Ok(USER_ROLE),
        CanonicalRole::Ai => Ok(MODEL_ROLE),
        CanonicalRole::Generic(name) => match name.to_ascii_lowercase().as_str() {
            "user" | "human" => Ok(USER_ROLE),
            "model" | "ai" | "assistant" => Ok(MODEL_ROLE),
            _ => Err(TranscodeError::UnsupportedMessageType(name.clone())),
        },
        CanonicalRole::System => Err(TranscodeError::UnsupportedMessageType("system".to_string())),
    }
}

/// Whether `role` is sent as the `model` wire role.
#[must_use]
pub fn is_model_role(role: &CanonicalRole) -> bool {
    canonical_role_to_wire(role) == Ok(MODEL_ROLE)
}

#[must_use]
pub fn wire_role_to_canonical(s: &str) -> CanonicalRole {
    match s {
        "model" => CanonicalRole::Ai,
        "user" => CanonicalRole::Human,
        other => CanonicalRole::Generic(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Finish reason mappings
// ---------------------------------------------------------------------------

#[must_use]
pub fn finish_reason_to_canonical(s: &str) -> CanonicalStopReason {
    match s {
        "STOP" | "stop" | "completed" => CanonicalStopReason::EndOfTurn,
        "MAX_TOKENS" | "max_tokens" | "incomplete" => CanonicalStopReason::MaxTokens,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" | "IMAGE_SAFETY" => {
            CanonicalStopReason::ContentFilter
        }
        "requires_action" => CanonicalStopReason::ToolCalls,
        _ => CanonicalStopReason::Other,
    }
}

// ---------------------------------------------------------------------------
// Usage mappings
// ---------------------------------------------------------------------------

/// Convert standard-protocol `usageMetadata` to canonical usage.
///
/// Output tokens include thought tokens, matching what the service bills.
#[must_use]
pub fn gemini_usage_to_canonical(usage: &GeminiUsageMetadata) -> CanonicalUsage {
    let output_tokens = match (usage.candidates_token_count, usage.thoughts_token_count) {
        (None, None) => None,
        (candidates, thoughts) => Some(candidates.unwrap_or(0) + thoughts.unwrap_or(0)),
    };
    CanonicalUsage {
        input_tokens: usage.prompt_token_count,
        output_tokens,
        reasoning_tokens: usage.thoughts_token_count,
        cached_tokens: usage.cached_content_token_count,
        total_tokens: usage.total_token_count.or_else(|| {
            usage
                .prompt_token_count
                .zip(output_tokens)
                .map(|(input, output)| input + output)
        }),
    }
}

/// Convert an Interaction's `usage` block to canonical usage.
#[must_use]
pub fn interactions_usage_to_canonical(usage: &InteractionUsage) -> CanonicalUsage {
    let output_tokens = match (usage.total_output_tokens, usage.total_thought_tokens) {
        (None, None) => None,
        (output, thoughts) => Some(output.unwrap_or(0) + thoughts.unwrap_or(0)),
    };
    CanonicalUsage {
        input_tokens: usage.total_input_tokens,
        output_tokens,
        reasoning_tokens: usage.total_thought_tokens,
        cached_tokens: usage.total_cached_tokens,
        total_tokens: usage.total_tokens.or_else(|| {
            usage
                .total_input_tokens
                .zip(output_tokens)
                .map(|(input, output)| input + output)
        }),
    }
}
