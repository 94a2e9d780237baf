//! The JSON serializer contract and its `serde_json` implementation.

use std::any::type_name;
use std::io::Read;

use content::{ContentType, OutgoingContent};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::JsonError;

/// Converts values to and from JSON request/response bodies.
pub trait JsonSerializer: Send + Sync {
    /// Serializes `data` into an outgoing body tagged with `content_type`.
    fn write_with<T: Serialize + ?Sized>(
        &self,
        data: &T,
        content_type: ContentType,
    ) -> Result<OutgoingContent, JsonError>;

    /// Serializes `data` into an `application/json` body.
    fn write<T: Serialize + ?Sized>(&self, data: &T) -> Result<OutgoingContent, JsonError> {
        self.write_with(data, ContentType::application_json())
    }

    /// Deserializes a `T` from `body`, consuming it.
    fn read<T: DeserializeOwned>(&self, body: impl Read) -> Result<T, JsonError>;
}

/// [`JsonSerializer`] backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonSerializer {
    pretty: bool,
}

impl SerdeJsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit indented output instead of the compact form.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }
}

impl JsonSerializer for SerdeJsonSerializer {
    fn write_with<T: Serialize + ?Sized>(
        &self,
        data: &T,
        content_type: ContentType,
    ) -> Result<OutgoingContent, JsonError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(data)
        } else {
            serde_json::to_vec(data)
        }
        .map_err(JsonError::Serialize)?;
        Ok(OutgoingContent::new(bytes, content_type))
    }

    fn read<T: DeserializeOwned>(&self, body: impl Read) -> Result<T, JsonError> {
        serde_json::from_reader(body).map_err(|source| JsonError::Deserialize {
            type_name: type_name::<T>(),
            source,
        })
    }
}
