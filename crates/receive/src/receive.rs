//! Typed receive accessors.
//!
//! Every accessor funnels into [`ApplicationCall::receive`], which runs the
//! call's [`ReceivePipeline`](crate::ReceivePipeline) once and type-checks the
//! result. The per-request [`ConsumptionState`] guarantees the raw body is
//! handed to the pipeline at most once; later calls start from "no value" and
//! fail with [`ReceiveError::AlreadyConsumed`] unless a step such as
//! [`DoubleReceive`](crate::DoubleReceive) supplies one.

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use content::Parameters;

use crate::pipeline::ReceiveContext;
use crate::{
    ApplicationCall, AttributeKey, ByteReadChannel, InputStream, MultiPartData, ReceiveError,
    ReceiveRequest, TypeInfo,
};

/// How far a call's body has progressed toward being materialized.
///
/// A call with no recorded state has not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionState {
    NotStarted,
    /// A receive is running, or one was cancelled mid-pipeline; the raw body
    /// is no longer available either way.
    InProgress,
    Consumed,
}

const CONSUMPTION_STATE: AttributeKey<ConsumptionState> = AttributeKey::new("ConsumptionState");

impl ApplicationCall {
    /// Current consumption state of the request body.
    pub fn consumption_state(&self) -> ConsumptionState {
        self.attributes()
            .get(&CONSUMPTION_STATE)
            .copied()
            .unwrap_or(ConsumptionState::NotStarted)
    }

    /// Receives the request body as a `T`.
    ///
    /// # Errors
    ///
    /// - [`ReceiveError::Usage`] when `T` is [`ReceiveRequest`]; nothing is read.
    /// - [`ReceiveError::AlreadyConsumed`] when the body was received before and
    ///   no step re-supplied it.
    /// - [`ReceiveError::CannotTransform`] when no step produced a `T`.
    /// - Any error raised by a step (`BadContent`, `PayloadTooLarge`, `Io`).
    pub async fn receive<T: Any + Send>(&mut self) -> Result<T, ReceiveError> {
        let type_info = TypeInfo::of::<T>();
        if type_info.is::<ReceiveRequest>() {
            return Err(ReceiveError::Usage {
                message: "ReceiveRequest can't be received".to_string(),
            });
        }

        let source: Option<Box<dyn Any + Send>> = match self.consumption_state() {
            ConsumptionState::NotStarted => {
                self.attributes_mut()
                    .put(&CONSUMPTION_STATE, ConsumptionState::InProgress);
                self.take_body()
                    .map(|body| Box::new(body) as Box<dyn Any + Send>)
            }
            ConsumptionState::InProgress | ConsumptionState::Consumed => None,
        };

        let call_id = self.id();
        let pipeline = Arc::clone(self.pipeline());
        let (headers, attributes) = self.receive_parts();
        let mut context = ReceiveContext {
            call_id,
            headers,
            attributes,
            config: pipeline.config(),
        };
        let outcome = pipeline
            .execute(&mut context, ReceiveRequest::new(type_info, source, false))
            .await;
        self.attributes_mut()
            .put(&CONSUMPTION_STATE, ConsumptionState::Consumed);

        let Some(value) = outcome?.into_value() else {
            warn!(%call_id, requested = %type_info, "request body received twice");
            return Err(ReceiveError::AlreadyConsumed);
        };
        if !type_info.is_instance(value.as_ref()) {
            return Err(ReceiveError::CannotTransform { type_info });
        }
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ReceiveError::CannotTransform { type_info })
    }

    /// Like [`receive`](Self::receive), but content-transformation failures
    /// (`AlreadyConsumed`, `CannotTransform`, `BadContent`) become `Ok(None)`.
    /// All other errors still propagate.
    pub async fn receive_or_none<T: Any + Send>(&mut self) -> Result<Option<T>, ReceiveError> {
        match self.receive::<T>().await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_content_transformation() => {
                debug!(call_id = %self.id(), error = %err, "Conversion failed, none returned");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Receives the body as text.
    pub async fn receive_text(&mut self) -> Result<String, ReceiveError> {
        self.receive().await
    }

    /// Receives the raw body channel.
    pub async fn receive_channel(&mut self) -> Result<ByteReadChannel, ReceiveError> {
        self.receive().await
    }

    /// Receives the body as a blocking reader.
    pub async fn receive_stream(&mut self) -> Result<InputStream, ReceiveError> {
        self.receive().await
    }

    /// Receives a `multipart/form-data` body.
    pub async fn receive_multipart(&mut self) -> Result<MultiPartData, ReceiveError> {
        self.receive().await
    }

    /// Receives an `application/x-www-form-urlencoded` body.
    pub async fn receive_parameters(&mut self) -> Result<Parameters, ReceiveError> {
        self.receive().await
    }
}
