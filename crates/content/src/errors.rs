//! Error type for content vocabulary parsing and decoding.

use thiserror::Error;

/// Failures raised while parsing a content type or decoding body bytes that a
/// caller has already read.
///
/// Every variant describes malformed or unsupported *content*; none of them is
/// an I/O failure.
#[derive(Debug, Error)]
pub enum ContentError {
    /// A `Content-Type` or `Content-Disposition` value could not be parsed.
    #[error("Invalid header value '{value}': {reason}")]
    InvalidHeaderValue {
        /// The raw header value.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// The named charset is not one of the supported [`crate::Charset`]s.
    #[error("Unsupported charset '{name}'")]
    UnsupportedCharset {
        /// The charset name as it appeared in the header.
        name: String,
    },

    /// The bytes are not valid text in the given charset.
    #[error("Body is not valid {charset} text (first invalid byte at offset {offset})")]
    MalformedText {
        /// Charset name used for decoding.
        charset: &'static str,
        /// Offset of the first byte that could not be decoded.
        offset: usize,
    },

    /// An `application/x-www-form-urlencoded` body could not be decoded.
    #[error("Malformed form body")]
    MalformedForm(#[from] serde_urlencoded::de::Error),
}
