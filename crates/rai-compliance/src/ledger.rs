//! # Override Ledger
//!
//! Append-only audit trail of reviewer corrections. Each applied override
//! records the status it replaced, so the evolution of any determination
//! can be rebuilt from the ledger alone. Records are never edited or
//! removed, including when a later override reverses an earlier one.

use rai_core::{OverrideRecord, OverrideRequest, QuestionId, Timestamp};

use crate::error::OverrideError;
use crate::results::ResultsCollection;

/// Actor recorded when a request names none.
pub const DEFAULT_ACTOR: &str = "reviewer";

/// Ordered override history of one session.
#[derive(Debug, Clone, Default)]
pub struct OverrideLedger {
    records: Vec<OverrideRecord>,
}

impl OverrideLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from records already in application order.
    pub fn from_records(records: Vec<OverrideRecord>) -> Self {
        Self { records }
    }

    /// Validate a request without applying it.
    pub fn check(
        &self,
        results: &ResultsCollection,
        request: &OverrideRequest,
    ) -> Result<(), OverrideError> {
        if !results.contains(request.question_id.as_str()) {
            return Err(OverrideError::UnknownQuestion(request.question_id.clone()));
        }
        if request.reason.trim().is_empty() {
            return Err(OverrideError::EmptyReason(request.question_id.clone()));
        }
        Ok(())
    }

    /// Apply an override to `results` and append its record.
    ///
    /// The item takes the new status, full confidence and the overridden
    /// flag. On error nothing changes.
    pub fn apply(
        &mut self,
        results: &mut ResultsCollection,
        request: OverrideRequest,
    ) -> Result<&OverrideRecord, OverrideError> {
        self.check(results, &request)?;
        let item = results
            .get_mut(request.question_id.as_str())
            .ok_or_else(|| OverrideError::UnknownQuestion(request.question_id.clone()))?;
        let previous_status = std::mem::replace(&mut item.status, request.new_status.clone());
        item.confidence = 1.0;
        item.overridden = true;

        tracing::info!(
            question_id = %request.question_id,
            from = %previous_status,
            to = %request.new_status,
            "result overridden"
        );
        self.records.push(OverrideRecord {
            question_id: request.question_id,
            previous_status,
            new_status: request.new_status,
            reason: request.reason.trim().to_string(),
            actor: request.actor.unwrap_or_else(|| DEFAULT_ACTOR.to_string()),
            timestamp: Timestamp::now(),
        });
        Ok(&self.records[self.records.len() - 1])
    }

    /// Every record in application order.
    pub fn records(&self) -> &[OverrideRecord] {
        &self.records
    }

    /// Records of one question in application order.
    pub fn history<'a>(
        &'a self,
        question_id: &'a QuestionId,
    ) -> impl Iterator<Item = &'a OverrideRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| &r.question_id == question_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
