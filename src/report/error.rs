//! Run report error types.

use thiserror::Error;

/// Errors that can occur when writing or reading a run report
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization to JSON failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Report was written by an incompatible version
    #[error("Unsupported report version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}
