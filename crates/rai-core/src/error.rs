//! # Error Types
//!
//! Errors shared by every crate in the workspace. Component-specific errors
//! (transitions, overrides, transport) live next to the component that
//! raises them and convert into these where they cross a boundary.

use thiserror::Error;

/// Top-level error type for the foundational types.
#[derive(Error, Debug)]
pub enum RaiError {
    /// A value failed validation at construction.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stage index outside 1..=7.
    #[error("unknown pipeline stage {0}; stages run from 1 to 7")]
    UnknownStage(u8),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One line of the analysis stream could not be decoded.
///
/// Never fatal: the coordinator drops the line, logs it, and keeps reading.
#[derive(Error, Debug)]
#[error("malformed stream line {line_no}: {message}")]
pub struct StreamParseError {
    /// 1-based position of the line within the run.
    pub line_no: u64,
    /// Decoder message.
    pub message: String,
    /// Leading part of the offending line, for diagnostics.
    pub excerpt: String,
}
