//! JSON content negotiation for outgoing requests and incoming responses.

use bytes::Buf;
use content::{ContentError, ContentType};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{JsonError, JsonSerializer, SerdeJsonSerializer};

/// Settings for [`JsonFeature`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonConfig {
    /// Content type sent with serialized request bodies.
    pub content_type: ContentType,
    /// Response content types the feature deserializes.
    pub accept: Vec<ContentType>,
    /// Indent serialized request bodies.
    pub pretty: bool,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            content_type: ContentType::application_json(),
            accept: vec![ContentType::application_json()],
            pretty: false,
        }
    }
}

/// Plugs a [`JsonSerializer`] into reqwest's request/response flow.
#[derive(Debug, Clone)]
pub struct JsonFeature<S = SerdeJsonSerializer> {
    config: JsonConfig,
    serializer: S,
}

impl JsonFeature<SerdeJsonSerializer> {
    pub fn new(config: JsonConfig) -> Self {
        let serializer = SerdeJsonSerializer::new().pretty(config.pretty);
        Self { config, serializer }
    }
}

impl Default for JsonFeature<SerdeJsonSerializer> {
    fn default() -> Self {
        Self::new(JsonConfig::default())
    }
}

impl<S: JsonSerializer> JsonFeature<S> {
    pub fn with_serializer(config: JsonConfig, serializer: S) -> Self {
        Self { config, serializer }
    }

    pub fn config(&self) -> &JsonConfig {
        &self.config
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Whether a response of `content_type` is handled by this feature.
    pub fn accepts(&self, content_type: &ContentType) -> bool {
        self.config
            .accept
            .iter()
            .any(|pattern| content_type.matches(pattern))
    }

    /// Serializes `body` into `builder`, setting `Content-Type` and `Accept`.
    pub fn prepare<T: Serialize + ?Sized>(
        &self,
        builder: RequestBuilder,
        body: &T,
    ) -> Result<RequestBuilder, JsonError> {
        let outgoing = self
            .serializer
            .write_with(body, self.config.content_type.clone())?;
        let (bytes, content_type) = outgoing.into_parts();
        debug!(content_type = %content_type, bytes = bytes.len(), "prepared JSON request body");

        let mut builder = builder.header(CONTENT_TYPE, content_type.to_string());
        if !self.config.accept.is_empty() {
            let accept = self
                .config
                .accept
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            builder = builder.header(ACCEPT, accept);
        }
        Ok(builder.body(bytes))
    }

    /// Reads and deserializes a JSON response body.
    ///
    /// # Errors
    ///
    /// - [`JsonError::UnexpectedContentType`] when the response is missing a
    ///   `Content-Type` or declares one outside [`JsonConfig::accept`]; the
    ///   body is not read.
    /// - [`JsonError::InvalidContentType`] for an unparsable header.
    /// - [`JsonError::Transport`] when reading the body fails.
    /// - [`JsonError::Deserialize`] when the body does not fit `T`.
    pub async fn receive<T: DeserializeOwned>(&self, response: Response) -> Result<T, JsonError> {
        let content_type = response_content_type(&response)?;
        match &content_type {
            Some(content_type) if self.accepts(content_type) => {}
            other => {
                return Err(JsonError::UnexpectedContentType {
                    content_type: other
                        .as_ref()
                        .map_or_else(|| "(none)".to_string(), ToString::to_string),
                });
            }
        }

        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), "received JSON response body");
        self.serializer.read(body.reader())
    }
}

fn response_content_type(response: &Response) -> Result<Option<ContentType>, JsonError> {
    let Some(value) = response.headers().get(CONTENT_TYPE) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ContentError::InvalidHeaderValue {
        value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
        reason: "header value is not visible ASCII",
    })?;
    Ok(Some(ContentType::parse(value)?))
}
