use std::fmt::Write as _;

/// Identifier for a function call the server sent without one.
///
/// Derived from the call's position within a single response so that a
/// streamed response and its non-streamed equivalent agree on the id.
#[inline]
pub(crate) fn generated_call_id(position: usize) -> String {
    let mut out = String::with_capacity(8);
    out.push_str("call_");
    // Writing into a String cannot fail.
    let _ = write!(out, "{position}");
    out
}

#[inline]
pub(crate) fn extract_sse_data_payload(
    line: &str,
    allow_data_no_space: bool,
    allow_bare_json: bool,
    ignore_event_lines: bool,
) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }
    if ignore_event_lines && trimmed.starts_with("event:") {
        return None;
    }

    let payload = if let Some(rest) = trimmed.strip_prefix("data: ") {
        rest
    } else if allow_data_no_space {
        trimmed.strip_prefix("data:")?
    } else if allow_bare_json {
        trimmed
    } else {
        return None;
    };

    let payload = payload.trim();
    if payload == "[DONE]" {
        return None;
    }
    Some(payload)
}

#[inline]
pub(crate) fn parse_sse_data_json_line<T>(
    line: &str,
    allow_data_no_space: bool,
    allow_bare_json: bool,
    ignore_event_lines: bool,
) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    let payload = extract_sse_data_payload(
        line,
        allow_data_no_space,
        allow_bare_json,
        ignore_event_lines,
    )?;
    match serde_json::from_str(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable SSE data payload");
            None
        }
    }
}

/// Append `fragment` to `target`, inserting `separator` only between two
/// non-empty values.
pub(crate) fn push_joined(target: &mut String, separator: &str, fragment: &str) {
    if fragment.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push_str(separator);
    }
    target.push_str(fragment);
}
