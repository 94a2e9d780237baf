//! Text charsets understood by the receive pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ContentError;

/// A character set a request body may be declared in.
///
/// Only the charsets that can be decoded without a lookup table are supported;
/// an unknown `charset` parameter is reported as
/// [`ContentError::UnsupportedCharset`] instead of being guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Charset {
    /// UTF-8. The default when a request does not declare a charset.
    #[default]
    Utf8,
    /// 7-bit US-ASCII.
    UsAscii,
    /// ISO-8859-1 (Latin-1): every byte maps to the code point of the same value.
    Iso8859_1,
}

impl Charset {
    /// Canonical (IANA) name of the charset.
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::UsAscii => "US-ASCII",
            Charset::Iso8859_1 => "ISO-8859-1",
        }
    }

    /// Looks up a charset by any of its common names, ignoring ASCII case.
    pub fn from_name(name: &str) -> Result<Self, ContentError> {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "us-ascii" | "ascii" => Ok(Charset::UsAscii),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Charset::Iso8859_1),
            _ => Err(ContentError::UnsupportedCharset {
                name: name.to_string(),
            }),
        }
    }

    /// Decodes `bytes` as text in this charset.
    pub fn decode(self, bytes: &[u8]) -> Result<String, ContentError> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|err| ContentError::MalformedText {
                    charset: self.name(),
                    offset: err.valid_up_to(),
                }),
            Charset::UsAscii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(ContentError::MalformedText {
                    charset: self.name(),
                    offset,
                }),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
            Charset::Iso8859_1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl TryFrom<String> for Charset {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value)
    }
}

impl From<Charset> for String {
    fn from(charset: Charset) -> Self {
        charset.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive_with_aliases() {
        assert_eq!(Charset::from_name("UTF-8").unwrap(), Charset::Utf8);
        assert_eq!(Charset::from_name("utf8").unwrap(), Charset::Utf8);
        assert_eq!(Charset::from_name("Latin1").unwrap(), Charset::Iso8859_1);
        assert_eq!(Charset::from_name(" us-ascii ").unwrap(), Charset::UsAscii);
    }

    #[test]
    fn unknown_charset_is_rejected() {
        let err = Charset::from_name("koi8-r").unwrap_err();
        assert!(matches!(err, ContentError::UnsupportedCharset { name } if name == "koi8-r"));
    }

    #[test]
    fn latin1_maps_every_byte() {
        assert_eq!(Charset::Iso8859_1.decode(&[0x63, 0x61, 0x66, 0xe9]).unwrap(), "café");
    }

    #[test]
    fn invalid_utf8_reports_offset() {
        let err = Charset::Utf8.decode(b"ok\xff").unwrap_err();
        assert!(matches!(err, ContentError::MalformedText { offset: 2, .. }));
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        assert!(Charset::UsAscii.decode(b"plain").is_ok());
        assert!(Charset::UsAscii.decode(&[b'a', 0x80]).is_err());
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&Charset::Iso8859_1).unwrap();
        assert_eq!(json, "\"ISO-8859-1\"");
        let back: Charset = serde_json::from_str("\"utf8\"").unwrap();
        assert_eq!(back, Charset::Utf8);
    }
}
