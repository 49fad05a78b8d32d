//! Error types for the vendor clients.

use reqwest::header::HeaderMap;
use std::time::Duration;

/// Longest vendor error body carried into a user-visible message.
const MAX_ERROR_MESSAGE_LEN: usize = 300;

/// Errors raised while talking to the mailing-list or image-generation vendors.
#[derive(Debug, thiserror::Error)]
pub enum TinderGenError {
    /// API key missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Vendor error text, sanitized.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Wait time the vendor asked for, if any.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The vendor answered successfully but without any inline image.
    #[error("no image returned")]
    NoImageReturned,

    /// The vendor answered with something we could not use.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or malformed process configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TinderGenError {
    /// Returns true if the vendor was unreachable or asked us to slow down.
    ///
    /// Nothing retries automatically. The generate page adds a "try again" hint for these.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }
}

/// Result type alias for vendor operations.
pub type Result<T> = std::result::Result<T, TinderGenError>;

/// Reads a `Retry-After` header expressed in whole seconds.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Trims a vendor error body down to something safe to show a user.
///
/// Collapses whitespace, masks anything that looks like an API key and caps the length.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let mut out = text
        .split_whitespace()
        .map(|word| {
            let looks_like_key = word.len() >= 32
                && word
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
            if looks_like_key || word.starts_with("AIza") {
                "[redacted]"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if out.len() > MAX_ERROR_MESSAGE_LEN {
        let mut cut = MAX_ERROR_MESSAGE_LEN;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, RETRY_AFTER};

    #[test]
    fn test_is_transient() {
        assert!(TinderGenError::RateLimited { retry_after: None }.is_transient());

        assert!(!TinderGenError::Auth("bad key".into()).is_transient());
        assert!(!TinderGenError::ContentBlocked("nsfw".into()).is_transient());
        assert!(!TinderGenError::Decode("bad base64".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = TinderGenError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = TinderGenError::ContentBlocked("Safety filter triggered".into());
        assert_eq!(err.to_string(), "content blocked: Safety filter triggered");
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(parse_retry_after(&headers), Some(30));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_sanitize_masks_keys() {
        let msg = sanitize_error_message("API key AIzaSyD-not-a-real-key is invalid");
        assert_eq!(msg, "API key [redacted] is invalid");

        let long_token = "a".repeat(40);
        let msg = sanitize_error_message(&format!("token {long_token} rejected"));
        assert_eq!(msg, "token [redacted] rejected");
    }

    #[test]
    fn test_sanitize_truncates() {
        let body = "word ".repeat(200);
        let msg = sanitize_error_message(&body);
        assert!(msg.chars().count() <= MAX_ERROR_MESSAGE_LEN + 1);
        assert!(msg.ends_with('…'));
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(
            sanitize_error_message("  bad\n\trequest  "),
            "bad request"
        );
    }
}
