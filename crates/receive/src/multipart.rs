//! `multipart/form-data` bodies.

use std::collections::VecDeque;

use bytes::Bytes;
use content::{Charset, ContentDisposition, ContentType};
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use crate::ReceiveError;

/// One part of a multipart body.
#[derive(Debug, Clone)]
pub enum PartData {
    /// A plain form field (no `filename`), decoded as text.
    FormItem {
        name: Option<String>,
        value: String,
        headers: HeaderMap,
    },
    /// A file upload (has a `filename`); the content is kept as bytes.
    FileItem {
        name: Option<String>,
        file_name: Option<String>,
        content_type: Option<ContentType>,
        bytes: Bytes,
        headers: HeaderMap,
    },
}

impl PartData {
    /// The form field name from `Content-Disposition`.
    pub fn name(&self) -> Option<&str> {
        match self {
            PartData::FormItem { name, .. } | PartData::FileItem { name, .. } => name.as_deref(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        match self {
            PartData::FormItem { headers, .. } | PartData::FileItem { headers, .. } => headers,
        }
    }
}

/// The parts of a `multipart/form-data` body, in body order.
#[derive(Debug, Clone, Default)]
pub struct MultiPartData {
    parts: VecDeque<PartData>,
}

impl MultiPartData {
    /// Parses a fully buffered body delimited by `boundary`.
    pub fn parse(body: &[u8], boundary: &str) -> Result<Self, ReceiveError> {
        let parts = split_parts(body, boundary)
            .map_err(|err| ReceiveError::bad_content("malformed multipart body", err))?;
        let parts = parts
            .into_iter()
            .map(parse_part)
            .collect::<Result<VecDeque<_>, _>>()?;
        Ok(Self { parts })
    }

    /// Removes and returns the next part.
    pub fn read_part(&mut self) -> Option<PartData> {
        self.parts.pop_front()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Iterator for MultiPartData {
    type Item = PartData;

    fn next(&mut self) -> Option<PartData> {
        self.read_part()
    }
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
enum FramingError {
    #[error("opening boundary not found")]
    MissingOpeningBoundary,
    #[error("closing boundary not found")]
    MissingClosingBoundary,
    #[error("boundary line is not followed by CRLF")]
    BadBoundaryLine,
    #[error("part headers are not terminated by an empty line")]
    UnterminatedHeaders,
    #[error("malformed part header line")]
    BadHeaderLine,
}

struct RawPart<'a> {
    headers: Vec<(&'a [u8], &'a [u8])>,
    body: &'a [u8],
}

fn split_parts<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<RawPart<'a>>, FramingError> {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut inner_delimiter = b"\r\n".to_vec();
    inner_delimiter.extend_from_slice(&delimiter);

    // The opening delimiter is either at the very start or after a preamble line.
    let mut cursor = if body.starts_with(&delimiter) {
        delimiter.len()
    } else {
        find(body, &inner_delimiter).ok_or(FramingError::MissingOpeningBoundary)? + inner_delimiter.len()
    };

    let mut parts = Vec::new();
    loop {
        let rest = &body[cursor..];
        if rest.starts_with(b"--") {
            return Ok(parts);
        }
        // Transport padding (spaces/tabs) is allowed before the CRLF.
        let padding = rest.iter().take_while(|b| **b == b' ' || **b == b'\t').count();
        if !rest[padding..].starts_with(b"\r\n") {
            return Err(if rest.is_empty() {
                FramingError::MissingClosingBoundary
            } else {
                FramingError::BadBoundaryLine
            });
        }
        let start = cursor + padding + 2;
        let end = find(&body[start..], &inner_delimiter)
            .map(|offset| start + offset)
            .ok_or(FramingError::MissingClosingBoundary)?;
        parts.push(parse_raw_part(&body[start..end])?);
        cursor = end + inner_delimiter.len();
    }
}

fn parse_raw_part(part: &[u8]) -> Result<RawPart<'_>, FramingError> {
    if let Some(body) = part.strip_prefix(b"\r\n") {
        return Ok(RawPart {
            headers: Vec::new(),
            body,
        });
    }
    let split = find(part, b"\r\n\r\n").ok_or(FramingError::UnterminatedHeaders)?;
    let headers = part[..split]
        .split(|b| *b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let colon = line.iter().position(|b| *b == b':').ok_or(FramingError::BadHeaderLine)?;
            Ok((&line[..colon], line[colon + 1..].trim_ascii()))
        })
        .collect::<Result<Vec<_>, FramingError>>()?;
    Ok(RawPart {
        headers,
        body: &part[split + 4..],
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

// ---------------------------------------------------------------------------
// Part interpretation
// ---------------------------------------------------------------------------

fn parse_part(raw: RawPart<'_>) -> Result<PartData, ReceiveError> {
    let mut headers = HeaderMap::new();
    for (name, value) in raw.headers {
        let name = HeaderName::from_bytes(name)
            .map_err(|err| ReceiveError::bad_content("invalid multipart header name", err))?;
        let value = HeaderValue::from_bytes(value)
            .map_err(|err| ReceiveError::bad_content("invalid multipart header value", err))?;
        headers.append(name, value);
    }

    let disposition = header_str(&headers, &CONTENT_DISPOSITION)?
        .map(ContentDisposition::parse)
        .transpose()?;
    let content_type = header_str(&headers, &CONTENT_TYPE)?
        .map(ContentType::parse)
        .transpose()?;
    let name = disposition
        .as_ref()
        .and_then(|d| d.name())
        .map(str::to_owned);
    let file_name = disposition
        .as_ref()
        .and_then(|d| d.file_name())
        .map(str::to_owned);

    if file_name.is_some() {
        return Ok(PartData::FileItem {
            name,
            file_name,
            content_type,
            bytes: Bytes::copy_from_slice(raw.body),
            headers,
        });
    }

    let charset = match &content_type {
        Some(ct) => ct.charset()?.unwrap_or_default(),
        None => Charset::default(),
    };
    Ok(PartData::FormItem {
        name,
        value: charset.decode(raw.body)?,
        headers,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Result<Option<&'a str>, ReceiveError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|err| ReceiveError::bad_content(format!("non-text {name} header"), err))
        })
        .transpose()
}
