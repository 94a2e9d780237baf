//! The `Content-Type` value type.
//!
//! A [`ContentType`] is a media type (`type/subtype`) plus an ordered list of
//! parameters. Type, subtype and parameter names are stored lower-cased so that
//! equality and matching are case-insensitive where HTTP says they are;
//! parameter values keep their case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Charset, ContentError};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// One `name=value` parameter of a content type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeaderParameter {
    name: String,
    value: String,
}

impl HeaderParameter {
    /// Creates a parameter. The name is lower-cased.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            value: value.into(),
        }
    }

    /// The lower-cased parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter value, unquoted.
    pub fn value(&self) -> &str {
        &self.value
    }
}

// ---------------------------------------------------------------------------
// Content type
// ---------------------------------------------------------------------------

/// A parsed `Content-Type` (or `Accept` element).
///
/// `*` is allowed as type and subtype so the same value can be used as a
/// pattern in [`ContentType::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentType {
    content_type: String,
    content_subtype: String,
    parameters: Vec<HeaderParameter>,
}

impl ContentType {
    /// Creates a content type without parameters.
    pub fn new(content_type: impl Into<String>, content_subtype: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into().to_ascii_lowercase(),
            content_subtype: content_subtype.into().to_ascii_lowercase(),
            parameters: Vec::new(),
        }
    }

    /// `*/*`
    pub fn any() -> Self {
        Self::new("*", "*")
    }

    /// `application/json`, the default for serialized client bodies.
    pub fn application_json() -> Self {
        Self::new("application", "json")
    }

    /// `application/octet-stream`
    pub fn application_octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// `application/x-www-form-urlencoded`
    pub fn application_form_url_encoded() -> Self {
        Self::new("application", "x-www-form-urlencoded")
    }

    /// `multipart/form-data`
    pub fn multipart_form_data() -> Self {
        Self::new("multipart", "form-data")
    }

    /// `text/plain`
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Parses a header value such as `text/plain; charset="utf-8"`.
    ///
    /// A bare `*` is accepted as shorthand for `*/*`.
    pub fn parse(value: &str) -> Result<Self, ContentError> {
        let invalid = |reason| ContentError::InvalidHeaderValue {
            value: value.to_string(),
            reason,
        };

        let mut segments = split_unquoted(value, ';').into_iter();
        let media = segments.next().unwrap_or_default();
        let media = media.trim();
        if media.is_empty() {
            return Err(invalid("empty media type"));
        }

        let (content_type, content_subtype) = if media == "*" {
            ("*", "*")
        } else {
            media
                .split_once('/')
                .ok_or_else(|| invalid("missing '/' between type and subtype"))?
        };
        let (content_type, content_subtype) = (content_type.trim(), content_subtype.trim());
        if !is_token(content_type) || !is_token(content_subtype) {
            return Err(invalid("type and subtype must be non-empty tokens"));
        }

        let mut result = Self::new(content_type, content_subtype);
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (name, raw_value) = segment
                .split_once('=')
                .ok_or_else(|| invalid("parameter without '='"))?;
            let name = name.trim();
            if !is_token(name) {
                return Err(invalid("parameter name must be a token"));
            }
            let parameter_value = unquote(raw_value.trim()).ok_or_else(|| invalid("unterminated quoted parameter"))?;
            result.parameters.push(HeaderParameter::new(name, parameter_value));
        }
        Ok(result)
    }

    /// The lower-cased primary type, e.g. `application`.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The lower-cased subtype, e.g. `json`.
    pub fn content_subtype(&self) -> &str {
        &self.content_subtype
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[HeaderParameter] {
        &self.parameters
    }

    /// Value of the first parameter called `name` (case-insensitive).
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(HeaderParameter::value)
    }

    /// Returns a copy with parameter `name` set to `value`, replacing any
    /// existing parameter of that name.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters.retain(|p| !p.name.eq_ignore_ascii_case(name));
        self.parameters.push(HeaderParameter::new(name, value));
        self
    }

    /// Returns a copy with all parameters removed.
    #[must_use]
    pub fn without_parameters(&self) -> Self {
        Self::new(self.content_type.clone(), self.content_subtype.clone())
    }

    /// The declared `charset`, if any.
    pub fn charset(&self) -> Result<Option<Charset>, ContentError> {
        self.parameter("charset").map(Charset::from_name).transpose()
    }

    /// Returns a copy with the `charset` parameter set.
    #[must_use]
    pub fn with_charset(self, charset: Charset) -> Self {
        self.with_parameter("charset", charset.name())
    }

    /// Returns `true` if `self` satisfies `pattern`.
    ///
    /// A `*` type or subtype in the pattern matches anything. Every parameter
    /// of the pattern must be present on `self` with an equal value
    /// (ASCII case-insensitive), unless the pattern value is `*`.
    pub fn matches(&self, pattern: &ContentType) -> bool {
        let part_matches = |pattern: &str, actual: &str| pattern == "*" || pattern == actual;
        if !part_matches(&pattern.content_type, &self.content_type)
            || !part_matches(&pattern.content_subtype, &self.content_subtype)
        {
            return false;
        }
        pattern.parameters.iter().all(|expected| {
            match self.parameter(&expected.name) {
                Some(actual) => expected.value == "*" || actual.eq_ignore_ascii_case(&expected.value),
                None => expected.value == "*",
            }
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.content_type, self.content_subtype)?;
        for parameter in &self.parameters {
            if is_token(&parameter.value) {
                write!(f, "; {}={}", parameter.name, parameter.value)?;
            } else {
                let escaped = parameter.value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {}=\"{}\"", parameter.name, escaped)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ContentType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentType {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentType> for String {
    fn from(content_type: ContentType) -> Self {
        content_type.to_string()
    }
}

// ---------------------------------------------------------------------------
// Lexing helpers
// ---------------------------------------------------------------------------

// RFC 7230 tchar
pub(crate) fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Splits on `separator` outside of double-quoted strings.
pub(crate) fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (index, ch) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&value[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Strips surrounding quotes and resolves backslash escapes.
/// Returns `None` for an unterminated quoted string.
pub(crate) fn unquote(value: &str) -> Option<String> {
    let Some(inner) = value.strip_prefix('"') else {
        return Some(value.to_string());
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push(chars.next()?),
            '"' => return chars.as_str().trim().is_empty().then_some(out),
            c => out.push(c),
        }
    }
    None
}
