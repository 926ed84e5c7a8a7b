//! # Compliance Results
//!
//! Per-question determinations produced by the analyzer, run progress, and
//! the records of human corrections.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::identity::QuestionId;
use crate::temporal::Timestamp;

// ─── Determination ───────────────────────────────────────────────────

/// Outcome of one compliance question.
///
/// Open set: the analyzer emits `YES` and `NO` for assessed questions, `N/A`
/// when a requirement does not apply and `ERROR` when it failed to answer.
/// Anything else is carried verbatim in `Other` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeterminationStatus {
    Yes,
    No,
    NotApplicable,
    Error,
    Other(String),
}

impl DeterminationStatus {
    /// Parse a wire value, case-insensitively for the known determinations.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "YES" => Self::Yes,
            "NO" => Self::No,
            "N/A" | "NA" => Self::NotApplicable,
            "ERROR" => Self::Error,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::NotApplicable => "N/A",
            Self::Error => "ERROR",
            Self::Other(s) => s,
        }
    }

    /// Whether this determination counts towards the compliance score.
    pub fn is_assessed(&self) -> bool {
        matches!(self, Self::Yes | Self::No)
    }
}

impl fmt::Display for DeterminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeterminationStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for DeterminationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeterminationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

// ─── Result Item ─────────────────────────────────────────────────────

/// One live determination, keyed by `question_id` within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResultItem {
    pub question_id: QuestionId,
    pub standard: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub question: String,
    pub status: DeterminationStatus,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub suggested_disclosure: String,
    #[serde(default)]
    pub decision_tree_path: Vec<String>,
    #[serde(default)]
    pub sequence: u32,
    #[serde(default)]
    pub analysis_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set once a reviewer has overridden the automated status.
    #[serde(default)]
    pub overridden: bool,
}

impl ComplianceResultItem {
    /// Minimal result with the required fields; the rest default.
    pub fn new(
        question_id: impl Into<QuestionId>,
        standard: impl Into<String>,
        status: DeterminationStatus,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            standard: standard.into(),
            section: String::new(),
            reference: String::new(),
            question: String::new(),
            status,
            confidence: 0.0,
            explanation: String::new(),
            evidence: String::new(),
            suggested_disclosure: String::new(),
            decision_tree_path: Vec::new(),
            sequence: 0,
            analysis_time_ms: 0,
            error: None,
            overridden: false,
        }
    }

    /// Whether this item belongs to `standard`, treating `_` and spaces alike.
    pub fn matches_standard(&self, standard: &str) -> bool {
        self.standard.replace('_', " ") == standard.replace('_', " ")
    }
}

// ─── Progress ────────────────────────────────────────────────────────

/// Live progress of an analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisProgress {
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub completed_questions: u32,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_standard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question: Option<String>,
    /// Per-question failure messages accumulated so far.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl AnalysisProgress {
    /// Progress at the start of a run over `total_questions`.
    pub fn starting(total_questions: u32) -> Self {
        Self {
            total_questions,
            phase: "preparing".to_string(),
            ..Self::default()
        }
    }

    /// `completed/total` as a percentage rounded to one decimal.
    pub fn computed_percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        let pct = f64::from(self.completed_questions) / f64::from(self.total_questions) * 100.0;
        (pct * 10.0).round() / 10.0
    }
}

// ─── Overrides ───────────────────────────────────────────────────────

/// A reviewer's request to replace one determination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRequest {
    pub question_id: QuestionId,
    pub new_status: DeterminationStatus,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// One applied override. Records are never edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub question_id: QuestionId,
    pub previous_status: DeterminationStatus,
    pub new_status: DeterminationStatus,
    pub reason: String,
    pub actor: String,
    pub timestamp: Timestamp,
}

/// Body of a scoped re-analysis request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReanalyzeRequest {
    pub question_ids: Vec<QuestionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// ─── Listing ─────────────────────────────────────────────────────────

/// Filter and page selector for a results listing.
///
/// Pages are 1-based; `page_size` 0 returns every matching result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeterminationStatus>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

fn first_page() -> u32 {
    1
}

impl Default for ResultsQuery {
    fn default() -> Self {
        Self {
            standard: None,
            status: None,
            page: 1,
            page_size: 0,
        }
    }
}

impl ResultsQuery {
    /// Apply this query to results in collection order.
    pub fn apply(&self, all: &[ComplianceResultItem]) -> ResultsPage {
        let filtered: Vec<&ComplianceResultItem> = all
            .iter()
            .filter(|r| self.standard.as_deref().map_or(true, |s| r.matches_standard(s)))
            .filter(|r| self.status.as_ref().map_or(true, |s| &r.status == s))
            .collect();
        let total_filtered = u32::try_from(filtered.len()).unwrap_or(u32::MAX);
        let page = self.page.max(1);
        let (results, total_pages) = if self.page_size == 0 {
            (filtered.into_iter().cloned().collect(), 1)
        } else {
            let start = (page as usize - 1) * self.page_size as usize;
            let results = filtered
                .into_iter()
                .skip(start)
                .take(self.page_size as usize)
                .cloned()
                .collect();
            (results, total_filtered.div_ceil(self.page_size))
        };
        ResultsPage {
            results,
            total_filtered,
            total_results: u32::try_from(all.len()).unwrap_or(u32::MAX),
            page,
            page_size: self.page_size,
            total_pages,
            compliance_score: None,
        }
    }
}

/// One page of a session's results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsPage {
    #[serde(default)]
    pub results: Vec<ComplianceResultItem>,
    #[serde(default)]
    pub total_filtered: u32,
    #[serde(default)]
    pub total_results: u32,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_score: Option<u32>,
}
