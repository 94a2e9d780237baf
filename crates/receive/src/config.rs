//! Receive pipeline configuration.

use content::Charset;
use serde::{Deserialize, Serialize};

/// Default cap on a buffered request body: 16 MiB.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 16 * 1024 * 1024;

/// Settings for the default transformations.
///
/// Loaded from the `receive` section of a configuration file; every field has
/// a default so an empty section is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReceiveConfig {
    /// Largest body, in bytes, that a transformation will buffer.
    /// `None` disables the limit.
    pub max_body_size: Option<u64>,

    /// Charset used to decode text when the request does not declare one.
    pub default_charset: Charset,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            max_body_size: Some(DEFAULT_MAX_BODY_SIZE),
            default_charset: Charset::Utf8,
        }
    }
}
