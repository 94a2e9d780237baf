//! Error type for the receive pipeline.
//!
//! [`ReceiveError`] covers every way a receive call can fail. The variants
//! split into two families:
//!
//! - **Content transformation failures**: the body exists but cannot become
//!   the requested type (or was already consumed). These are the failures a
//!   caller can recover from with
//!   [`ApplicationCall::receive_or_none`](crate::ApplicationCall::receive_or_none).
//! - **Everything else**: API misuse, size limits or transport I/O.
//!   These always propagate.

use std::error::Error as StdError;

use thiserror::Error;

use crate::TypeInfo;

/// Errors produced by a receive call or by a pipeline step.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// The request body was already materialized by an earlier receive call
    /// on the same request, and no re-read capability is installed.
    #[error("Request body has been already consumed (received).")]
    AlreadyConsumed,

    /// No pipeline step produced a value of the requested type.
    #[error("Cannot transform this request's content to {type_info}")]
    CannotTransform {
        /// The type the caller asked for.
        type_info: TypeInfo,
    },

    /// The body is malformed for the requested type (invalid text encoding,
    /// broken form encoding, malformed multipart framing, bad `Content-Type`).
    #[error("Bad request content: {message}")]
    BadContent {
        /// What was wrong with the body.
        message: String,
        /// Underlying parse failure, when there is one.
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// The body is larger than the configured limit.
    #[error("Request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Configured maximum size in bytes.
        limit: u64,
    },

    /// The API was used incorrectly (for example, receiving the pipeline's
    /// own request type). Raised before any byte is read.
    #[error("{message}")]
    Usage {
        /// Description of the misuse.
        message: String,
    },

    /// The transport failed while the body was being read.
    #[error("I/O error while reading the request body")]
    Io(#[from] std::io::Error),
}

impl ReceiveError {
    /// Builds a [`ReceiveError::BadContent`] from a message and its cause.
    pub fn bad_content(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::BadContent {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` for the failures `receive_or_none` turns into `None`.
    pub fn is_content_transformation(&self) -> bool {
        matches!(
            self,
            ReceiveError::AlreadyConsumed
                | ReceiveError::CannotTransform { .. }
                | ReceiveError::BadContent { .. }
        )
    }
}

impl From<content::ContentError> for ReceiveError {
    fn from(err: content::ContentError) -> Self {
        Self::bad_content(err.to_string(), err)
    }
}
