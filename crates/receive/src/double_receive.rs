//! Opt-in re-read capability.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::pipeline::{ReceiveContext, ReceiveStep, StepOutcome};
use crate::{AttributeKey, ByteReadChannel, ReceiveError, ReceiveRequest};

const CACHED_BODY: AttributeKey<Bytes> = AttributeKey::new("DoubleReceive.CachedBody");

/// Lets a call receive its body more than once.
///
/// Install in the [`Before`](crate::ReceivePhase::Before) phase. The first
/// receive buffers the raw channel into the call attributes and continues with
/// a fresh channel over the buffer; every later receive starts again from a
/// fresh channel over the same buffer, so each call re-runs the
/// transformations and may ask for a different type.
///
/// Buffering is capped by the pipeline's
/// [`ReceiveConfig::max_body_size`](crate::ReceiveConfig::max_body_size)
/// unless [`DoubleReceive::with_limit`] sets a cap of its own. A body over the
/// cap fails with [`ReceiveError::PayloadTooLarge`] and nothing is cached.
#[derive(Debug, Clone, Default)]
pub struct DoubleReceive {
    limit: Option<u64>,
}

impl DoubleReceive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of bytes buffered for re-reading, overriding the
    /// pipeline's body size limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
impl ReceiveStep for DoubleReceive {
    fn name(&self) -> &'static str {
        "DoubleReceive"
    }

    async fn process(
        &self,
        context: &mut ReceiveContext<'_>,
        request: ReceiveRequest,
    ) -> Result<StepOutcome, ReceiveError> {
        if request.is_consumed() {
            let Some(cached) = context.attributes.get(&CACHED_BODY) else {
                return Ok(StepOutcome::Proceed(request));
            };
            debug!(call_id = %context.call_id, bytes = cached.len(), "re-reading cached request body");
            let channel = ByteReadChannel::from_bytes(cached.clone());
            return Ok(StepOutcome::Proceed(request.with_value(channel, true)));
        }

        match request.take_value::<ByteReadChannel>() {
            Ok((type_info, channel)) => {
                let limit = self.limit.or(context.config.max_body_size);
                let body = channel.read_remaining(limit).await?;
                context.attributes.put(&CACHED_BODY, body.clone());
                let request = ReceiveRequest::new(
                    type_info,
                    Some(Box::new(ByteReadChannel::from_bytes(body))),
                    true,
                );
                Ok(StepOutcome::Proceed(request))
            }
            Err(request) => Ok(StepOutcome::Proceed(request)),
        }
    }
}
