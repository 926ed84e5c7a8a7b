//! # Session Record
//!
//! The server-held compliance session and its pipeline position.
//!
//! ## Pipeline
//!
//! ```text
//! 1 Upload ─▶ 2 Metadata ─▶ 3 Framework ─▶ 4 Standards ─▶ 5 Context ─▶ 6 Analysis ─▶ 7 Results
//!                                                             ▲              │
//!                                                             └── retry ─────┘ (after a failed run)
//! ```
//!
//! The `(current_stage, status, selected_standards)` triple is the only
//! resumability cursor: a consumer reconnecting at any time rebuilds its
//! position from a fetched `Session` alone.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RaiError;
use crate::identity::SessionId;
use crate::temporal::Timestamp;

// ─── Stage ───────────────────────────────────────────────────────────

/// One of the seven ordered pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Stage {
    /// Financial statements and notes are uploaded.
    Upload = 1,
    /// Extracted metadata is reviewed.
    MetadataReview = 2,
    /// The reporting framework is chosen.
    FrameworkSelection = 3,
    /// Disclosure standards are chosen and confirmed.
    StandardsSelection = 4,
    /// Classified document context is previewed and validated.
    ContextPreview = 5,
    /// The automated question-by-question analysis runs.
    Analysis = 6,
    /// Results are reviewed, overridden and exported.
    Results = 7,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 7] = [
        Stage::Upload,
        Stage::MetadataReview,
        Stage::FrameworkSelection,
        Stage::StandardsSelection,
        Stage::ContextPreview,
        Stage::Analysis,
        Stage::Results,
    ];

    /// 1-based stage number.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Stage for a 1-based number.
    pub fn from_index(index: u8) -> Result<Self, RaiError> {
        Stage::ALL
            .get(usize::from(index).wrapping_sub(1))
            .copied()
            .ok_or(RaiError::UnknownStage(index))
    }

    /// The following stage, if any.
    pub fn next(self) -> Option<Stage> {
        Stage::from_index(self.index() + 1).ok()
    }

    /// Human-readable name used in transition messages.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Upload => "document upload",
            Stage::MetadataReview => "metadata review",
            Stage::FrameworkSelection => "framework selection",
            Stage::StandardsSelection => "standards selection",
            Stage::ContextPreview => "context preview",
            Stage::Analysis => "analysis",
            Stage::Results => "results review",
        }
    }

    /// Status a session carries when it enters this stage normally.
    pub fn entry_status(self) -> SessionStatus {
        match self {
            Stage::Upload => SessionStatus::AwaitingUpload,
            Stage::MetadataReview => SessionStatus::MetadataReview,
            Stage::FrameworkSelection => SessionStatus::FrameworkSelection,
            Stage::StandardsSelection => SessionStatus::StandardsSelection,
            Stage::ContextPreview => SessionStatus::ContextPreview,
            Stage::Analysis => SessionStatus::Analyzing,
            Stage::Results => SessionStatus::Completed,
        }
    }
}

impl TryFrom<u8> for Stage {
    type Error = RaiError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Stage::from_index(value)
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> u8 {
        stage.index()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.index())
    }
}

// ─── Status ──────────────────────────────────────────────────────────

/// Coarse lifecycle status of a session, as stored by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    AwaitingUpload,
    Processing,
    MetadataReview,
    FrameworkSelection,
    StandardsSelection,
    ContextPreview,
    Analyzing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 9] = [
        Self::AwaitingUpload,
        Self::Processing,
        Self::MetadataReview,
        Self::FrameworkSelection,
        Self::StandardsSelection,
        Self::ContextPreview,
        Self::Analyzing,
        Self::Completed,
        Self::Failed,
    ];

    /// Status by wire name.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// The snake_case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingUpload => "awaiting_upload",
            Self::Processing => "processing",
            Self::MetadataReview => "metadata_review",
            Self::FrameworkSelection => "framework_selection",
            Self::StandardsSelection => "standards_selection",
            Self::ContextPreview => "context_preview",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Framework ───────────────────────────────────────────────────────

/// Reporting framework the statements are assessed against.
///
/// Unknown framework names are kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Framework {
    #[default]
    Ifrs,
    UsGaap,
    IndAs,
    Other(String),
}

impl Framework {
    /// The wire name (`IFRS`, `US GAAP`, `Ind AS`, or the verbatim value).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ifrs => "IFRS",
            Self::UsGaap => "US GAAP",
            Self::IndAs => "Ind AS",
            Self::Other(name) => name,
        }
    }

    /// Parse a framework name, case-insensitively for the known ones.
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        match trimmed.to_ascii_uppercase().replace(['_', '-'], " ").as_str() {
            "IFRS" => Self::Ifrs,
            "US GAAP" | "USGAAP" => Self::UsGaap,
            "IND AS" | "INDAS" => Self::IndAs,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Framework {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Framework {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| Framework::parse(&s)).unwrap_or_default())
    }
}

// ─── Session ─────────────────────────────────────────────────────────

/// A compliance session as returned by the server.
///
/// `total_standards`/`total_questions` are snapshotted when the standards
/// selection is confirmed and never recomputed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub session_code: String,
    pub client_name: String,
    #[serde(default)]
    pub framework: Framework,
    pub status: SessionStatus,
    pub current_stage: Stage,
    #[serde(default, deserialize_with = "null_as_default")]
    pub selected_standards: Vec<String>,
    #[serde(default)]
    pub total_standards: u32,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub financial_statements_filename: Option<String>,
    #[serde(default)]
    pub notes_filename: Option<String>,
    #[serde(default)]
    pub compliance_score: Option<u32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    /// Whether the financial statements document has been uploaded.
    pub fn has_documents(&self) -> bool {
        self.financial_statements_filename.is_some()
    }
}

/// Body of a session creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub client_name: String,
    #[serde(default)]
    pub framework: Framework,
}

/// Partial update of a session; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_standards: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_standards: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<u32>,
}

impl SessionPatch {
    /// Patch that moves the session to `stage` with its entry status.
    pub fn enter(stage: Stage) -> Self {
        Self {
            current_stage: Some(stage),
            status: Some(stage.entry_status()),
            ..Self::default()
        }
    }

    /// Apply this patch to a session record in place.
    pub fn apply_to(&self, session: &mut Session) {
        if let Some(stage) = self.current_stage {
            session.current_stage = stage;
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(framework) = &self.framework {
            session.framework = framework.clone();
        }
        if let Some(selected) = &self.selected_standards {
            session.selected_standards = selected.clone();
        }
        if let Some(total) = self.total_standards {
            session.total_standards = total;
        }
        if let Some(total) = self.total_questions {
            session.total_questions = total;
        }
    }
}

/// Filter for a session listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
}

impl SessionQuery {
    pub fn matches(&self, session: &Session) -> bool {
        self.status.map_or(true, |s| session.status == s)
            && self.framework.as_ref().map_or(true, |f| &session.framework == f)
    }

    /// Matching sessions, newest first.
    pub fn apply<'a>(&self, sessions: impl IntoIterator<Item = &'a Session>) -> Vec<Session> {
        let mut listed: Vec<Session> = sessions
            .into_iter()
            .filter(|s| self.matches(s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listed
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_json() -> serde_json::Value {
        serde_json::json!({
            "id": "6f1c1c3e-7d0a-4c55-9a3b-1b2c3d4e5f60",
            "session_code": "RAI-ACME-03072026-9F2C",
            "client_name": "Acme",
            "framework": "IFRS",
            "status": "context_preview",
            "current_stage": 5,
            "selected_standards": null,
            "total_standards": 0,
            "total_questions": 0,
            "created_at": "2026-03-07T09:15:00.123456",
            "updated_at": "2026-03-07T09:20:00Z"
        })
    }

    // ── Stage ────────────────────────────────────────────────────────

    #[test]
    fn stage_indices_are_one_based() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(usize::from(stage.index()), i + 1);
            assert_eq!(Stage::from_index(stage.index()).unwrap(), *stage);
        }
    }

    #[test]
    fn stage_out_of_range_rejected() {
        assert!(Stage::from_index(0).is_err());
        assert!(Stage::from_index(8).is_err());
    }

    #[test]
    fn stage_next_stops_at_results() {
        assert_eq!(Stage::Analysis.next(), Some(Stage::Results));
        assert_eq!(Stage::Results.next(), None);
    }

    #[test]
    fn stage_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Stage::ContextPreview).unwrap(), "5");
        let s: Stage = serde_json::from_str("7").unwrap();
        assert_eq!(s, Stage::Results);
        assert!(serde_json::from_str::<Stage>("9").is_err());
    }

    // ── Framework ────────────────────────────────────────────────────

    #[test]
    fn framework_parse_known_and_unknown() {
        assert_eq!(Framework::parse("ifrs"), Framework::Ifrs);
        assert_eq!(Framework::parse("US GAAP"), Framework::UsGaap);
        assert_eq!(Framework::parse("ind_as"), Framework::IndAs);
        assert_eq!(
            Framework::parse("FRS 102"),
            Framework::Other("FRS 102".to_string())
        );
    }

    #[test]
    fn framework_null_defaults_to_ifrs() {
        let f: Framework = serde_json::from_str("null").unwrap();
        assert_eq!(f, Framework::Ifrs);
    }

    // ── Session ──────────────────────────────────────────────────────

    #[test]
    fn session_tolerates_null_selection_and_naive_timestamps() {
        let s: Session = serde_json::from_value(session_json()).unwrap();
        assert_eq!(s.current_stage, Stage::ContextPreview);
        assert_eq!(s.status, SessionStatus::ContextPreview);
        assert!(s.selected_standards.is_empty());
        assert!(!s.has_documents());
        assert_eq!(s.created_at.to_iso8601(), "2026-03-07T09:15:00Z");
    }

    #[test]
    fn patch_skips_absent_fields() {
        let json = serde_json::to_value(SessionPatch::enter(Stage::ContextPreview)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"current_stage": 5, "status": "context_preview"})
        );
    }

    #[test]
    fn patch_apply_updates_only_present_fields() {
        let mut s: Session = serde_json::from_value(session_json()).unwrap();
        let patch = SessionPatch {
            selected_standards: Some(vec!["IAS_1".into()]),
            total_questions: Some(12),
            ..SessionPatch::default()
        };
        patch.apply_to(&mut s);
        assert_eq!(s.selected_standards, vec!["IAS_1".to_string()]);
        assert_eq!(s.total_questions, 12);
        assert_eq!(s.current_stage, Stage::ContextPreview);
    }

    #[test]
    fn status_parses_wire_names_only() {
        for status in SessionStatus::ALL {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::parse(" completed "), Some(SessionStatus::Completed));
        assert_eq!(SessionStatus::parse("Completed"), None);
    }

    // ── SessionQuery ─────────────────────────────────────────────────

    #[test]
    fn session_query_filters_and_orders_newest_first() {
        let base: Session = serde_json::from_value(session_json()).unwrap();
        let mut older = base.clone();
        older.id = SessionId::new();
        older.created_at = Timestamp::parse("2026-01-02T00:00:00Z").unwrap();
        older.framework = Framework::UsGaap;
        let mut completed = base.clone();
        completed.id = SessionId::new();
        completed.status = SessionStatus::Completed;

        let all = [older.clone(), base.clone(), completed.clone()];
        let listed = SessionQuery::default().apply(&all);
        assert_eq!(listed.len(), 3);
        assert_eq!(listed.last().map(|s| s.id), Some(older.id));

        let ifrs = SessionQuery {
            framework: Some(Framework::Ifrs),
            ..SessionQuery::default()
        };
        assert_eq!(ifrs.apply(&all).len(), 2);

        let done = SessionQuery {
            status: Some(SessionStatus::Completed),
            framework: Some(Framework::Ifrs),
        };
        let listed = done.apply(&all);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, completed.id);
    }
}
