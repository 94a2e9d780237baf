//! Serialized bodies ready to be sent.

use bytes::Bytes;

use crate::ContentType;

/// A fully serialized body together with the content type it is tagged with.
///
/// Produced by client-side serializers and attached to an outgoing request;
/// the bytes are reference-counted so attaching them does not copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingContent {
    bytes: Bytes,
    content_type: ContentType,
}

impl OutgoingContent {
    pub fn new(bytes: impl Into<Bytes>, content_type: ContentType) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Length of the body in bytes, suitable for a `Content-Length` header.
    pub fn content_length(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn into_parts(self) -> (Bytes, ContentType) {
        (self.bytes, self.content_type)
    }
}
