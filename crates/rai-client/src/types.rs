//! Request and response bodies specific to the collaborator API.

use serde::{Deserialize, Serialize};

use rai_core::{ComplianceResultItem, SessionId, SessionStatus};

/// Response to a document upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub session_id: SessionId,
    pub financial_statements_uploaded: bool,
    pub notes_uploaded: bool,
    pub status: SessionStatus,
    #[serde(default)]
    pub message: String,
}

/// Replacement results of a scoped re-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReanalyzeResponse {
    pub session_id: SessionId,
    pub re_analyzed: u32,
    #[serde(default)]
    pub results: Vec<ComplianceResultItem>,
    #[serde(default)]
    pub compliance_score: u32,
}

/// Server view of a result after an override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideResponse {
    pub session_id: SessionId,
    pub result: ComplianceResultItem,
    #[serde(default)]
    pub compliance_score: u32,
}
