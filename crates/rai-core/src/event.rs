//! # Analysis Stream Events
//!
//! Records carried by the analysis event channel, one JSON object per line:
//!
//! ```text
//! {"type":"progress","data":{"total_questions":12,"completed_questions":3,...}}
//! {"type":"result","data":{"question_id":"IAS_1_q1","status":"YES",...}}
//! {"type":"complete","data":{"total":12,...}}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RaiError;
use crate::result::{AnalysisProgress, ComplianceResultItem};

/// One decoded record of the analysis stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Question counters and phase label.
    Progress(AnalysisProgress),
    /// Pipeline status change (extracting, indexing, analyzing...).
    Status(StatusPayload),
    /// One determination.
    Result(ComplianceResultItem),
    /// The run finished; terminal.
    Complete(CompletePayload),
    /// The run failed server-side; terminal.
    Error(ErrorPayload),
}

impl StreamEvent {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Status(_) => "status",
            Self::Result(_) => "result",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
        }
    }

    /// Whether the run ends with this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_))
    }

    /// Serialize as one newline-terminated stream line.
    pub fn to_line(&self) -> Result<String, RaiError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }
}

/// Data of a `status` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Data of a `complete` event.
///
/// Only `total` is guaranteed; servers may also attach the tallies and the
/// full result list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    pub total: u32,
    #[serde(default)]
    pub compliant: u32,
    #[serde(default)]
    pub non_compliant: u32,
    #[serde(default)]
    pub not_applicable: u32,
    #[serde(default)]
    pub errors: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ComplianceResultItem>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cache_hit: bool,
}

/// Data of an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}
