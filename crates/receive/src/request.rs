//! The subject flowing through the receive pipeline.

use std::any::Any;
use std::fmt;

use crate::TypeInfo;

/// Pairs the type a caller asked for with the current candidate value.
///
/// Steps take a request by value and hand back a request; they never mutate
/// the candidate in place. A request whose value is `None` belongs to a call
/// whose body was already consumed by an earlier receive.
pub struct ReceiveRequest {
    type_info: TypeInfo,
    value: Option<Box<dyn Any + Send>>,
    reusable_value: bool,
}

impl ReceiveRequest {
    /// `reusable_value` marks values that can be handed out again without
    /// being consumed; stream-like values are not reusable.
    pub fn new(type_info: TypeInfo, value: Option<Box<dyn Any + Send>>, reusable_value: bool) -> Self {
        Self {
            type_info,
            value,
            reusable_value,
        }
    }

    /// The type requested by the caller.
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// The current candidate value, unless the body was already consumed.
    pub fn value(&self) -> Option<&(dyn Any + Send)> {
        self.value.as_deref()
    }

    pub fn reusable_value(&self) -> bool {
        self.reusable_value
    }

    /// Returns `true` when there is no candidate because the body was consumed.
    pub fn is_consumed(&self) -> bool {
        self.value.is_none()
    }

    /// Returns `true` if the candidate is a `V`.
    pub fn value_is<V: Any>(&self) -> bool {
        self.value().is_some_and(|value| value.is::<V>())
    }

    /// Returns `true` if the candidate already has the requested type.
    pub fn is_complete(&self) -> bool {
        self.value()
            .is_some_and(|value| self.type_info.is_instance(value))
    }

    /// Replaces the candidate, producing the request for the next step.
    pub fn with_value<V: Any + Send>(self, value: V, reusable_value: bool) -> Self {
        Self {
            type_info: self.type_info,
            value: Some(Box::new(value)),
            reusable_value,
        }
    }

    /// Takes the candidate out if it is a `V`; otherwise hands the request back
    /// untouched.
    pub fn take_value<V: Any + Send>(self) -> Result<(TypeInfo, V), Self> {
        match self.value {
            Some(value) if value.is::<V>() => match value.downcast::<V>() {
                Ok(value) => Ok((self.type_info, *value)),
                Err(value) => Err(Self {
                    value: Some(value),
                    ..self
                }),
            },
            value => Err(Self { value, ..self }),
        }
    }

    pub(crate) fn into_value(self) -> Option<Box<dyn Any + Send>> {
        self.value
    }
}

impl fmt::Debug for ReceiveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiveRequest")
            .field("type_info", &self.type_info)
            .field("consumed", &self.is_consumed())
            .field("complete", &self.is_complete())
            .field("reusable_value", &self.reusable_value)
            .finish()
    }
}
