//! Error types for JSON content negotiation.

use content::ContentError;
use thiserror::Error;

/// Errors raised while writing a JSON body or reading one back.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The value cannot be represented as JSON (e.g. a map with non-string keys).
    #[error("Failed to serialize value as JSON")]
    Serialize(#[source] serde_json::Error),

    /// The body did not parse into the requested shape.
    #[error("Failed to deserialize JSON into {type_name}")]
    Deserialize {
        /// Rust type the caller asked for.
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The response declared a content type the feature does not accept.
    #[error("Unexpected response content type: {content_type}")]
    UnexpectedContentType {
        /// The declared type, or `(none)` when the header was missing.
        content_type: String,
    },

    /// The response `Content-Type` header could not be parsed.
    #[error(transparent)]
    InvalidContentType(#[from] ContentError),

    /// The HTTP client failed to deliver the body.
    #[error("HTTP transport error")]
    Transport(#[from] reqwest::Error),
}
