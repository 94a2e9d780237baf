//! The `Content-Disposition` header value, as used by multipart part headers.

use crate::content_type::{is_token, split_unquoted, unquote};
use crate::{ContentError, HeaderParameter};

/// A parsed `Content-Disposition` value such as
/// `form-data; name="avatar"; filename="me.png"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    disposition: String,
    parameters: Vec<HeaderParameter>,
}

impl ContentDisposition {
    pub fn parse(value: &str) -> Result<Self, ContentError> {
        let invalid = |reason| ContentError::InvalidHeaderValue {
            value: value.to_string(),
            reason,
        };

        let mut segments = split_unquoted(value, ';').into_iter();
        let disposition = segments.next().unwrap_or_default().trim();
        if !is_token(disposition) {
            return Err(invalid("disposition type must be a token"));
        }

        let mut parameters = Vec::new();
        for segment in segments.map(str::trim).filter(|s| !s.is_empty()) {
            let (name, raw_value) = segment
                .split_once('=')
                .ok_or_else(|| invalid("parameter without '='"))?;
            let value = unquote(raw_value.trim())
                .ok_or_else(|| invalid("unterminated quoted parameter"))?;
            parameters.push(HeaderParameter::new(name.trim(), value));
        }

        Ok(Self {
            disposition: disposition.to_ascii_lowercase(),
            parameters,
        })
    }

    /// Lower-cased disposition type, e.g. `form-data`.
    pub fn disposition(&self) -> &str {
        &self.disposition
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .map(HeaderParameter::value)
    }

    /// The `name` parameter: the form field this part belongs to.
    pub fn name(&self) -> Option<&str> {
        self.parameter("name")
    }

    /// The `filename` parameter, present on file uploads.
    pub fn file_name(&self) -> Option<&str> {
        self.parameter("filename")
    }
}
