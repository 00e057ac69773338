/// Error type shared by every encode and decode path.
///
/// Nothing in this crate retries or swallows one of these; they are always
/// returned to the immediate caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscodeError {
    #[error("Malformed content: {0}")]
    MalformedContent(String),
    #[error("Unsupported content block type for {protocol}: {block_type}")]
    UnsupportedBlock {
        block_type: String,
        protocol: &'static str,
    },
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(String),
    #[error("Empty response: {0}")]
    EmptyResponse(String),
    #[error("Stream error: code={code}, message={message}")]
    Stream { code: String, message: String },
}

impl TranscodeError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        TranscodeError::MalformedContent(msg.into())
    }

    pub(crate) fn unsupported_block(block_type: impl Into<String>, protocol: &'static str) -> Self {
        TranscodeError::UnsupportedBlock {
            block_type: block_type.into(),
            protocol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_block_names_type() {
        let err = TranscodeError::unsupported_block("audio", "interactions");
        assert_eq!(
            err.to_string(),
            "Unsupported content block type for interactions: audio"
        );
    }

    #[test]
    fn test_stream_error_display() {
        let err = TranscodeError::Stream {
            code: "429".into(),
            message: "quota".into(),
        };
        assert!(err.to_string().contains("code=429"));
    }
}
