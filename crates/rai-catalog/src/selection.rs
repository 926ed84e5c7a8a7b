//! # Standards Selection
//!
//! A session's working pick of catalog sections. Confirming computes
//! `total_standards` and `total_questions` once; the resulting snapshot is
//! written onto the session and never recomputed from the catalog.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use rai_core::SessionPatch;

use crate::catalog::{StandardItem, StandardsCatalog};
use crate::error::SelectionError;

/// Mutable set of selected section keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardsSelection {
    keys: BTreeSet<String>,
}

impl StandardsSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously selected keys (e.g. a session's record).
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Flip `key` in or out. Returns whether it is now selected.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.keys.remove(key) {
            false
        } else {
            self.keys.insert(key.to_string());
            true
        }
    }

    /// Select every section of `catalog`.
    pub fn select_all(&mut self, catalog: &StandardsCatalog) {
        self.keys = catalog.sections().iter().map(|s| s.key()).collect();
    }

    pub fn clear_all(&mut self) {
        self.keys.clear();
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compute the totals against `catalog`.
    ///
    /// Keys are reported in catalog order. Every selected key must exist in
    /// the catalog and at least one must be selected.
    pub fn confirm(&self, catalog: &StandardsCatalog) -> Result<SelectionSnapshot, SelectionError> {
        self.confirm_listing(&catalog.standard_items())
    }

    /// Same as [`confirm`](Self::confirm), against a catalog listing such as
    /// the one the API returns.
    pub fn confirm_listing(
        &self,
        standards: &[StandardItem],
    ) -> Result<SelectionSnapshot, SelectionError> {
        if self.keys.is_empty() {
            return Err(SelectionError::Empty);
        }
        if let Some(unknown) = self
            .keys
            .iter()
            .find(|k| !standards.iter().any(|s| &s.key == *k))
        {
            return Err(SelectionError::UnknownStandard(unknown.clone()));
        }
        let selected: Vec<&StandardItem> = standards
            .iter()
            .filter(|s| self.keys.contains(&s.key))
            .collect();
        Ok(SelectionSnapshot {
            selected_standards: selected.iter().map(|s| s.key.clone()).collect(),
            total_standards: u32::try_from(selected.len()).unwrap_or(u32::MAX),
            total_questions: selected.iter().map(|s| s.item_count).sum(),
        })
    }
}

/// Totals frozen at confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub selected_standards: Vec<String>,
    pub total_standards: u32,
    pub total_questions: u32,
}

impl SelectionSnapshot {
    /// Session patch carrying the snapshot.
    pub fn to_patch(&self) -> SessionPatch {
        SessionPatch {
            selected_standards: Some(self.selected_standards.clone()),
            total_standards: Some(self.total_standards),
            total_questions: Some(self.total_questions),
            ..SessionPatch::default()
        }
    }
}
