//! Newtype identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a single application call (one request/response exchange).
///
/// Generated fresh for every [`crate::ApplicationCall`]; recorded on every
/// log event the receive pipeline emits so all activity for one request can be
/// correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(Uuid);

impl CallId {
    /// Generates a new random call identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`CallId`] from an existing UUID (e.g. a propagated request id).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
