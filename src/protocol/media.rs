use base64::Engine as _;

use crate::config::ImageConfig;
use crate::error::TranscodeError;
use crate::protocol::canonical::ImageSource;

/// Where resolved image bytes are sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaReference {
    /// Base64 payload embedded in the request.
    Inline { mime_type: String, data: String },
    /// A `gs://` or `http(s)://` reference the server fetches itself.
    External { mime_type: String, uri: String },
}

const EXTERNAL_SCHEMES: [&str; 3] = ["gs://", "https://", "http://"];

/// Resolve an image block's source into an inline or external reference.
///
/// # Errors
///
/// Returns [`TranscodeError::MalformedContent`] for an unparsable data URL,
/// undecodable base64, an unsupported URI scheme, or a missing MIME type
/// when `require_explicit_mime_type` is set.
pub fn resolve_image(
    source: &ImageSource,
    mime_type: Option<&str>,
    config: &ImageConfig,
) -> Result<MediaReference, TranscodeError> {
    let explicit = mime_type.map(str::trim).filter(|mime| !mime.is_empty());
    match source {
        ImageSource::Url(url) if url.starts_with("data:") => {
            let (header_mime, payload) = parse_data_url(url)?;
            let mime_type = match header_mime.or(explicit) {
                Some(mime) => mime.to_string(),
                None => fallback_mime(config, "data URL without a media type")?,
            };
            Ok(MediaReference::Inline {
                mime_type,
                data: payload.to_string(),
            })
        }
        ImageSource::Url(url) if EXTERNAL_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) => {
            let mime_type = match explicit {
                Some(mime) => mime.to_string(),
                None => match mime_from_extension(url) {
                    Some(mime) => mime.to_string(),
                    None => fallback_mime(config, url)?,
                },
            };
            Ok(MediaReference::External {
                mime_type,
                uri: url.clone(),
            })
        }
        ImageSource::Url(url) => Err(TranscodeError::malformed(format!(
            "unsupported image URL (expected data:, gs://, http:// or https://): {}",
            truncate_for_error(url)
        ))),
        ImageSource::Base64(data) => {
            let payload = data.trim();
            validate_base64(payload)?;
            let mime_type = match explicit {
                Some(mime) => mime.to_string(),
                None => fallback_mime(config, "base64 payload")?,
            };
            Ok(MediaReference::Inline {
                mime_type,
                data: payload.to_string(),
            })
        }
    }
}

/// Split `data:<mime>;base64,<payload>` and check the payload decodes.
///
/// # Errors
///
/// Returns [`TranscodeError::MalformedContent`] when the URL is not a base64
/// data URL or the payload is not valid base64.
pub fn parse_data_url(url: &str) -> Result<(Option<&str>, &str), TranscodeError> {
    let invalid = || {
        TranscodeError::malformed(format!(
            "invalid data URL (expected data:<mime>;base64,<payload>): {}",
            truncate_for_error(url)
        ))
    };
    let rest = url.strip_prefix("data:").ok_or_else(invalid)?;
    let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let mime = header.strip_suffix(";base64").ok_or_else(invalid)?.trim();
    let payload = payload.trim();
    validate_base64(payload)?;
    Ok((Some(mime).filter(|mime| !mime.is_empty()), payload))
}

/// Inverse of [`parse_data_url`] for decoded inline bytes.
#[must_use]
pub fn to_data_url(mime_type: &str, data: &str) -> String {
    let mut out = String::with_capacity(mime_type.len() + data.len() + 13);
    out.push_str("data:");
    out.push_str(mime_type);
    out.push_str(";base64,");
    out.push_str(data);
    out
}

fn validate_base64(payload: &str) -> Result<(), TranscodeError> {
    if payload.is_empty() {
        return Err(TranscodeError::malformed("empty base64 image payload"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map(|_| ())
        .map_err(|e| TranscodeError::malformed(format!("invalid base64 image payload: {e}")))
}

/// Guess an image MIME type from the URI path's extension.
#[must_use]
pub fn mime_from_extension(uri: &str) -> Option<&'static str> {
    let parsed = url::Url::parse(uri).ok()?;
    let file = parsed.path_segments()?.next_back()?;
    let (_, ext) = file.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

fn fallback_mime(config: &ImageConfig, what: &str) -> Result<String, TranscodeError> {
    if config.require_explicit_mime_type {
        return Err(TranscodeError::malformed(format!(
            "cannot determine image MIME type for {}",
            truncate_for_error(what)
        )));
    }
    tracing::warn!(
        default_mime_type = %config.default_mime_type,
        source = %truncate_for_error(what),
        "image MIME type unknown, using default"
    );
    Ok(config.default_mime_type.clone())
}

fn truncate_for_error(value: &str) -> &str {
    const LIMIT: usize = 64;
    if value.len() <= LIMIT {
        return value;
    }
    let mut end = LIMIT;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
