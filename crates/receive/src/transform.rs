//! Built-in transformations from the raw body channel.

use async_trait::async_trait;
use bytes::Bytes;
use content::{ContentType, Parameters};
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use tracing::debug;

use crate::pipeline::{ReceiveContext, ReceiveStep, StepOutcome};
use crate::{
    ByteReadChannel, InputStream, MultiPartData, ReceiveConfig, ReceiveError, ReceiveRequest,
    TypeInfo,
};

/// Converts a [`ByteReadChannel`] candidate into the common body shapes:
/// `Bytes`, `Vec<u8>`, `String`, [`InputStream`], [`Parameters`] and
/// [`MultiPartData`].
///
/// Requests for any other type, and candidates that are not a channel, pass
/// through untouched so a later step (or the final type check) can handle them.
/// Form and multipart conversions only apply when the request declares the
/// matching content type; otherwise the channel is left unread.
#[derive(Debug, Clone, Default)]
pub struct DefaultTransform {
    config: ReceiveConfig,
}

impl DefaultTransform {
    pub fn new(config: ReceiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReceiveConfig {
        &self.config
    }

    async fn read(&self, channel: ByteReadChannel) -> Result<Bytes, ReceiveError> {
        channel.read_remaining(self.config.max_body_size).await
    }

    async fn transform(
        &self,
        headers: &HeaderMap,
        type_info: TypeInfo,
        channel: ByteReadChannel,
    ) -> Result<Result<Box<dyn std::any::Any + Send>, ByteReadChannel>, ReceiveError> {
        if type_info.is::<Bytes>() {
            return Ok(Ok(Box::new(self.read(channel).await?)));
        }
        if type_info.is::<Vec<u8>>() {
            return Ok(Ok(Box::new(self.read(channel).await?.to_vec())));
        }
        if type_info.is::<InputStream>() {
            return Ok(Ok(Box::new(InputStream::new(self.read(channel).await?))));
        }
        if type_info.is::<String>() {
            let charset = match request_content_type(headers)? {
                Some(content_type) => content_type.charset()?,
                None => None,
            }
            .unwrap_or(self.config.default_charset);
            let bytes = self.read(channel).await?;
            return Ok(Ok(Box::new(charset.decode(&bytes)?)));
        }
        if type_info.is::<Parameters>() {
            let is_form = request_content_type(headers)?
                .is_some_and(|ct| ct.matches(&ContentType::application_form_url_encoded()));
            if !is_form {
                return Ok(Err(channel));
            }
            let bytes = self.read(channel).await?;
            return Ok(Ok(Box::new(Parameters::parse_url_encoded(&bytes)?)));
        }
        if type_info.is::<MultiPartData>() {
            let boundary = request_content_type(headers)?
                .filter(|ct| ct.matches(&ContentType::multipart_form_data()))
                .and_then(|ct| ct.parameter("boundary").map(str::to_owned));
            let Some(boundary) = boundary else {
                return Ok(Err(channel));
            };
            let bytes = self.read(channel).await?;
            return Ok(Ok(Box::new(MultiPartData::parse(&bytes, &boundary)?)));
        }
        Ok(Err(channel))
    }
}

#[async_trait]
impl ReceiveStep for DefaultTransform {
    fn name(&self) -> &'static str {
        "DefaultTransform"
    }

    async fn process(
        &self,
        context: &mut ReceiveContext<'_>,
        request: ReceiveRequest,
    ) -> Result<StepOutcome, ReceiveError> {
        let reusable = request.reusable_value();
        let (type_info, channel) = match request.take_value::<ByteReadChannel>() {
            Ok(taken) => taken,
            Err(request) => return Ok(StepOutcome::Proceed(request)),
        };

        match self.transform(context.headers, type_info, channel).await? {
            Ok(value) => {
                debug!(call_id = %context.call_id, requested = %type_info, "body transformed");
                let reusable_value = !(type_info.is::<InputStream>() || type_info.is::<MultiPartData>());
                Ok(StepOutcome::Proceed(ReceiveRequest::new(
                    type_info,
                    Some(value),
                    reusable_value,
                )))
            }
            Err(channel) => Ok(StepOutcome::Proceed(ReceiveRequest::new(
                type_info,
                Some(Box::new(channel)),
                reusable,
            ))),
        }
    }
}

/// Parses the request's `Content-Type` header, if present.
pub(crate) fn request_content_type(headers: &HeaderMap) -> Result<Option<ContentType>, ReceiveError> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|err| ReceiveError::bad_content("Content-Type header is not valid text", err))?;
    Ok(Some(ContentType::parse(value)?))
}
