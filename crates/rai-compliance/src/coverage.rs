//! # Financial Statement Coverage
//!
//! Decides which primary financial statements a session's classified
//! chunks evidence. Chunk taxonomy labels are matched against per-statement
//! synonym lists after normalization (lower case, `&` read as `and`, any
//! punctuation treated as a word break), so `Balance_Sheet`,
//! `balance-sheet` and `Statement of Financial Position` all count as a
//! balance sheet.
//!
//! ## Evidence
//!
//! A chunk supports a statement when its label matches and its full text is
//! at least `min_chunk_chars` long. A statement is detected when at least
//! `min_chunks` distinct chunks support it. Each detected statement weighs
//!
//! ```text
//! weight = min(1, chunks / floor_chunks) × min(1, chars / floor_chars)
//! ```
//!
//! and `confidence` is the summed weight over the number of expected
//! statements, rounded to two decimals. The session is valid when the
//! confidence reaches `valid_threshold` and nothing expected is missing.
//!
//! The computation is pure: it reads chunks and returns a report.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use rai_core::ChunkPreviewItem;

use crate::error::CoverageConfigError;

// ─── Statement Kinds ─────────────────────────────────────────────────

/// A primary financial statement the validator can look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    BalanceSheet,
    IncomeStatement,
    CashFlowStatement,
    EquityStatement,
    Notes,
}

impl StatementKind {
    pub const ALL: [StatementKind; 5] = [
        StatementKind::BalanceSheet,
        StatementKind::IncomeStatement,
        StatementKind::CashFlowStatement,
        StatementKind::EquityStatement,
        StatementKind::Notes,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::BalanceSheet => "Balance Sheet",
            Self::IncomeStatement => "Income Statement",
            Self::CashFlowStatement => "Cash Flow Statement",
            Self::EquityStatement => "Equity Statement",
            Self::Notes => "Notes",
        }
    }

    /// Normalized taxonomy labels that identify this statement.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::BalanceSheet => &[
                "balance sheet",
                "statement of financial position",
                "financial position",
            ],
            Self::IncomeStatement => &[
                "income statement",
                "statement of comprehensive income",
                "statement of profit or loss",
                "statement of profit and loss",
                "profit and loss",
                "profit or loss",
                "p and l",
                "statement of financial performance",
            ],
            Self::CashFlowStatement => &[
                "cash flow",
                "cash flows",
                "cashflow",
                "statement of cash flows",
            ],
            Self::EquityStatement => &[
                "equity changes",
                "changes in equity",
                "statement of changes in equity",
                "equity statement",
            ],
            Self::Notes => &[
                "notes",
                "notes to financial statements",
                "notes to the financial statements",
                "accounting policies",
            ],
        }
    }

    /// Whether a normalized label names this statement.
    fn matches(self, normalized_label: &str) -> bool {
        let padded = format!(" {normalized_label} ");
        self.synonyms()
            .iter()
            .any(|syn| padded.contains(&format!(" {syn} ")))
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Normalize a taxonomy label for synonym matching.
pub fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .replace('&', " and ")
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ─── Configuration ───────────────────────────────────────────────────

/// Thresholds of the coverage check. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Statements that must be present.
    pub expected: Vec<StatementKind>,
    /// Distinct supporting chunks needed to detect a statement.
    pub min_chunks: u32,
    /// Shortest chunk, in characters, that counts as support.
    pub min_chunk_chars: u32,
    /// Supporting chunks at which a statement reaches full weight.
    pub floor_chunks: u32,
    /// Supporting characters at which a statement reaches full weight.
    pub floor_chars: u32,
    /// Confidence needed for a valid report.
    pub valid_threshold: f64,
    /// Share of `general` chunks above which a warning is raised.
    pub general_share_warning: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            expected: vec![
                StatementKind::BalanceSheet,
                StatementKind::IncomeStatement,
                StatementKind::CashFlowStatement,
                StatementKind::EquityStatement,
            ],
            min_chunks: 2,
            min_chunk_chars: 200,
            floor_chunks: 3,
            floor_chars: 1500,
            valid_threshold: 0.75,
            general_share_warning: 0.3,
        }
    }
}

impl CoverageConfig {
    pub fn validate(&self) -> Result<(), CoverageConfigError> {
        let invalid = |field, reason: &str| {
            Err(CoverageConfigError {
                field,
                reason: reason.to_string(),
            })
        };
        if self.expected.is_empty() {
            return invalid("expected", "at least one statement must be expected");
        }
        if self.min_chunks == 0 {
            return invalid("min_chunks", "must be at least 1");
        }
        if self.floor_chunks == 0 || self.floor_chars == 0 {
            return invalid("floor_chunks/floor_chars", "evidence floors must be positive");
        }
        if !(0.0..=1.0).contains(&self.valid_threshold) {
            return invalid("valid_threshold", "must lie in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.general_share_warning) {
            return invalid("general_share_warning", "must lie in [0, 1]");
        }
        Ok(())
    }
}

// ─── Report ──────────────────────────────────────────────────────────

/// Supporting evidence gathered for one expected statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEvidence {
    pub statement: StatementKind,
    pub chunks: u32,
    pub chars: u64,
    pub detected: bool,
    pub weight: f64,
}

/// Outcome of a coverage check. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialValidationResult {
    pub is_valid: bool,
    pub confidence: f64,
    pub detected_statements: BTreeSet<StatementKind>,
    pub missing_statements: BTreeSet<StatementKind>,
    pub warnings: Vec<String>,
    pub evidence: Vec<CategoryEvidence>,
}

// ─── Validator ───────────────────────────────────────────────────────

/// Evidence-weighted statement matcher.
#[derive(Debug, Clone, Default)]
pub struct FinancialCoverageValidator {
    config: CoverageConfig,
}

impl FinancialCoverageValidator {
    pub fn new(config: CoverageConfig) -> Result<Self, CoverageConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// Check a session's full chunk set.
    pub fn validate(&self, chunks: &[ChunkPreviewItem]) -> FinancialValidationResult {
        let cfg = &self.config;
        let mut warnings = Vec::new();

        // statement -> chunk_id -> char_count of qualifying chunks
        let mut support: BTreeMap<StatementKind, BTreeMap<&str, u32>> = BTreeMap::new();
        let mut ambiguous: BTreeSet<&str> = BTreeSet::new();

        for chunk in chunks {
            let label = normalize_label(&chunk.taxonomy);
            let kinds: Vec<StatementKind> = StatementKind::ALL
                .into_iter()
                .filter(|k| k.matches(&label))
                .collect();
            if kinds.len() > 1 && ambiguous.insert(chunk.chunk_id.as_str()) {
                let names: Vec<&str> = kinds.iter().map(|k| k.display_name()).collect();
                tracing::warn!(chunk_id = %chunk.chunk_id, taxonomy = %chunk.taxonomy, "ambiguous chunk classification");
                warnings.push(format!(
                    "chunk {} is classified under more than one statement ({})",
                    chunk.chunk_id,
                    names.join(", ")
                ));
            }
            if chunk.char_count < cfg.min_chunk_chars {
                continue;
            }
            for kind in kinds {
                support
                    .entry(kind)
                    .or_default()
                    .insert(chunk.chunk_id.as_str(), chunk.char_count);
            }
        }

        let mut evidence = Vec::with_capacity(cfg.expected.len());
        let mut detected_statements = BTreeSet::new();
        let mut missing_statements = BTreeSet::new();
        let mut total_weight = 0.0;

        for &kind in &cfg.expected {
            let supporting = support.get(&kind);
            let n = supporting.map_or(0, |m| u32::try_from(m.len()).unwrap_or(u32::MAX));
            let chars: u64 = supporting.map_or(0, |m| m.values().map(|&c| u64::from(c)).sum());
            let detected = n >= cfg.min_chunks;
            let weight = if detected {
                let by_count = (f64::from(n) / f64::from(cfg.floor_chunks)).min(1.0);
                let by_chars = (chars as f64 / f64::from(cfg.floor_chars)).min(1.0);
                by_count * by_chars
            } else {
                0.0
            };
            if detected {
                detected_statements.insert(kind);
                total_weight += weight;
                if weight < 1.0 {
                    warnings.push(format!(
                        "{kind} detected on limited evidence ({n} chunks, {chars} characters)"
                    ));
                }
            } else {
                missing_statements.insert(kind);
            }
            evidence.push(CategoryEvidence {
                statement: kind,
                chunks: n,
                chars,
                detected,
                weight: round2(weight),
            });
        }

        if chunks.is_empty() {
            warnings.push("no classified chunks available".to_string());
        } else {
            let general = chunks.iter().filter(|c| c.is_general()).count();
            if general as f64 > chunks.len() as f64 * cfg.general_share_warning {
                warnings.push(format!(
                    "{general} of {} chunks classified as 'general'; document structure may be unconventional",
                    chunks.len()
                ));
            }
        }

        let confidence = if cfg.expected.is_empty() {
            0.0
        } else {
            round2(total_weight / cfg.expected.len() as f64)
        };
        FinancialValidationResult {
            is_valid: confidence >= cfg.valid_threshold && missing_statements.is_empty(),
            confidence,
            detected_statements,
            missing_statements,
            warnings,
            evidence,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
