//! Errors raised by the compliance components.

use std::path::PathBuf;

use thiserror::Error;

use rai_core::QuestionId;

/// A rejected override. The ledger and the results are left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    #[error("no current result for question {0}")]
    UnknownQuestion(QuestionId),

    #[error("override of question {0} needs a non-empty reason")]
    EmptyReason(QuestionId),
}

/// Writing an export to disk failed.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("cannot write export to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coverage thresholds out of range.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid coverage setting {field}: {reason}")]
pub struct CoverageConfigError {
    pub field: &'static str,
    pub reason: String,
}
