//! # Results Collection
//!
//! The live results of one session, keyed by question id. Results arrive
//! out of order and may be replayed; every write is an upsert, so a
//! question never has more than one live row. Rows keep the position of
//! their first arrival.

use std::collections::HashMap;

use rai_core::{ComplianceResultItem, QuestionId};

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Ordered, question-keyed result rows.
#[derive(Debug, Clone, Default)]
pub struct ResultsCollection {
    items: Vec<ComplianceResultItem>,
    index: HashMap<QuestionId, usize>,
}

impl ResultsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from rows in order; later duplicates replace earlier ones.
    pub fn from_items(items: impl IntoIterator<Item = ComplianceResultItem>) -> Self {
        let mut collection = Self::default();
        for item in items {
            collection.upsert(item);
        }
        collection
    }

    /// Insert a new row or replace the row with the same question id.
    pub fn upsert(&mut self, item: ComplianceResultItem) -> UpsertOutcome {
        match self.index.get(&item.question_id) {
            Some(&pos) => {
                self.items[pos] = item;
                UpsertOutcome::Replaced
            }
            None => {
                self.index.insert(item.question_id.clone(), self.items.len());
                self.items.push(item);
                UpsertOutcome::Inserted
            }
        }
    }

    pub fn get(&self, question_id: &str) -> Option<&ComplianceResultItem> {
        self.index.get(question_id).map(|&i| &self.items[i])
    }

    pub(crate) fn get_mut(&mut self, question_id: &str) -> Option<&mut ComplianceResultItem> {
        self.index.get(question_id).map(|&i| &mut self.items[i])
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.index.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Rows in first-arrival order.
    pub fn as_slice(&self) -> &[ComplianceResultItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComplianceResultItem> {
        self.items.iter()
    }

    /// Replace every row with the server's view.
    pub fn replace_all(&mut self, items: impl IntoIterator<Item = ComplianceResultItem>) {
        *self = Self::from_items(items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rai_core::DeterminationStatus;

    fn item(id: &str, status: DeterminationStatus, explanation: &str) -> ComplianceResultItem {
        let mut r = ComplianceResultItem::new(id, "IAS 1", status);
        r.explanation = explanation.to_string();
        r
    }

    #[test]
    fn replaying_a_result_keeps_one_row_with_latest_data() {
        let mut c = ResultsCollection::new();
        assert_eq!(c.upsert(item("q1", DeterminationStatus::Yes, "first")), UpsertOutcome::Inserted);
        assert_eq!(c.upsert(item("q1", DeterminationStatus::No, "second")), UpsertOutcome::Replaced);
        assert_eq!(c.len(), 1);
        let r = c.get("q1").unwrap();
        assert_eq!(r.status, DeterminationStatus::No);
        assert_eq!(r.explanation, "second");
    }

    #[test]
    fn out_of_order_replacements_keep_positions() {
        let mut c = ResultsCollection::from_items([
            item("q1", DeterminationStatus::Yes, ""),
            item("q2", DeterminationStatus::Yes, ""),
            item("q3", DeterminationStatus::Yes, ""),
        ]);
        c.upsert(item("q3", DeterminationStatus::No, "redo"));
        c.upsert(item("q1", DeterminationStatus::No, "redo"));
        let ids: Vec<&str> = c.iter().map(|r| r.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
        assert_eq!(c.get("q2").unwrap().status, DeterminationStatus::Yes);
    }

    #[test]
    fn replace_all_resets_index() {
        let mut c = ResultsCollection::from_items([item("q1", DeterminationStatus::Yes, "")]);
        c.replace_all([item("q9", DeterminationStatus::No, "")]);
        assert!(!c.contains("q1"));
        assert!(c.contains("q9"));
        assert_eq!(c.len(), 1);
    }
}
