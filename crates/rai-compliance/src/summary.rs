//! # Results Summary
//!
//! Counts per determination, overall and per standard, and the compliance
//! score `round(compliant / (compliant + non_compliant) × 100)`, which is 0
//! when nothing was assessed. Recomputed from the collection whenever it
//! changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rai_core::{ComplianceResultItem, DeterminationStatus};

/// Compliance score over assessed questions.
pub fn compliance_score(compliant: u32, non_compliant: u32) -> u32 {
    let assessed = compliant + non_compliant;
    if assessed == 0 {
        return 0;
    }
    (f64::from(compliant) / f64::from(assessed) * 100.0).round() as u32
}

/// Counts for one standard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardSummary {
    pub total: u32,
    pub compliant: u32,
    pub non_compliant: u32,
    pub not_applicable: u32,
    pub errors: u32,
    pub other: u32,
    pub compliance_score: u32,
    pub avg_confidence: f64,
}

impl StandardSummary {
    fn count(&mut self, item: &ComplianceResultItem) {
        self.total += 1;
        match item.status {
            DeterminationStatus::Yes => self.compliant += 1,
            DeterminationStatus::No => self.non_compliant += 1,
            DeterminationStatus::NotApplicable => self.not_applicable += 1,
            DeterminationStatus::Error => self.errors += 1,
            DeterminationStatus::Other(_) => self.other += 1,
        }
        self.avg_confidence += item.confidence;
    }

    fn finish(&mut self) {
        self.compliance_score = compliance_score(self.compliant, self.non_compliant);
        self.avg_confidence = if self.total == 0 {
            0.0
        } else {
            ((self.avg_confidence / f64::from(self.total)) * 100.0).round() / 100.0
        };
    }
}

/// Session-wide counts plus a per-standard breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    #[serde(flatten)]
    pub overall: StandardSummary,
    pub overridden: u32,
    pub by_standard: BTreeMap<String, StandardSummary>,
}

impl ResultsSummary {
    pub fn compute<'a>(items: impl IntoIterator<Item = &'a ComplianceResultItem>) -> Self {
        let mut summary = Self::default();
        for item in items {
            summary.overall.count(item);
            if item.overridden {
                summary.overridden += 1;
            }
            let key = if item.standard.trim().is_empty() {
                "Unknown".to_string()
            } else {
                item.standard.clone()
            };
            summary.by_standard.entry(key).or_default().count(item);
        }
        summary.overall.finish();
        for s in summary.by_standard.values_mut() {
            s.finish();
        }
        summary
    }

    pub fn compliance_score(&self) -> u32 {
        self.overall.compliance_score
    }
}
