use serde::{Deserialize, Serialize};

use crate::Error;

/// Default number of bytes read and written per streaming iteration.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Options recognised by [`StreamResponseSender`](crate::StreamResponseSender).
///
/// Deserializes from an option map using the same keys as the field names.
/// Missing keys take their defaults, unknown keys are rejected.
///
/// ```
/// use axum_stream_sender::SenderConfig;
///
/// let config = SenderConfig::default()
///     .with_range_support(true)
///     .with_chunk_size(10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenderConfig {
    /// When false, any `Range` header is ignored and the full body is sent
    /// with `200 OK` and `Accept-Ranges: none`.
    pub enable_range_support: bool,
    /// Maximum bytes read from the resource and written to the sink at once.
    pub chunk_size: usize,
    /// Pause one second after each chunk, capping throughput at roughly
    /// `chunk_size` bytes per second.
    pub enable_speed_limit: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            enable_range_support: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            enable_speed_limit: false,
        }
    }
}

impl SenderConfig {
    pub fn with_range_support(mut self, enabled: bool) -> Self {
        self.enable_range_support = enabled;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_speed_limit(mut self, enabled: bool) -> Self {
        self.enable_speed_limit = enabled;
        self
    }

    /// Checks the options that cannot be expressed in the field types.
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunk_size == 0 {
            return Err(Error::ZeroChunkSize);
        }
        Ok(())
    }
}
