//! # Standards Catalog
//!
//! Sections are read from every `*.json` file of a directory, in file-name
//! order, then in-file order. Each file has the shape
//!
//! ```json
//! {"sections": [{"section": "IAS 1", "title": "...", "description": "...",
//!                "items": [{"id": "IAS_1_q1", "question": "...", "reference": "1.10"}]}]}
//! ```
//!
//! A section's key is its name with spaces replaced by underscores
//! (`IAS 1` → `IAS_1`). A later file redefining a key replaces the earlier
//! definition in place.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Catalog key for a section name.
pub fn section_key(section: &str) -> String {
    section.trim().replace(' ', "_")
}

/// One compliance question of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_question: Option<String>,
}

/// One regulatory section and its questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSection {
    pub section: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<CatalogItem>,
    #[serde(default)]
    pub file_name: String,
}

impl CatalogSection {
    pub fn key(&self) -> String {
        section_key(&self.section)
    }

    pub fn item_count(&self) -> u32 {
        u32::try_from(self.items.len()).unwrap_or(u32::MAX)
    }
}

/// Listing entry for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardItem {
    pub key: String,
    pub section: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub item_count: u32,
    #[serde(default)]
    pub file_name: String,
}

/// Catalog listing with totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardsSummary {
    pub total_standards: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub frameworks: Vec<String>,
    pub standards: Vec<StandardItem>,
}

/// A question matching a catalog search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub standard: String,
    #[serde(flatten)]
    pub item: CatalogItem,
}

#[derive(Deserialize)]
struct DecisionTreeFile {
    #[serde(default)]
    sections: Vec<CatalogSection>,
}

/// Ordered, immutable list of sections.
#[derive(Debug, Clone, Default)]
pub struct StandardsCatalog {
    sections: Vec<CatalogSection>,
    index: HashMap<String, usize>,
}

impl StandardsCatalog {
    /// Build a catalog from sections in order. Duplicate keys replace the
    /// earlier section in place.
    pub fn from_sections(sections: impl IntoIterator<Item = CatalogSection>) -> Self {
        let mut catalog = Self::default();
        for section in sections {
            catalog.insert(section);
        }
        catalog
    }

    /// Load every `*.json` decision tree in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut catalog = Self::default();
        for path in files {
            let raw = std::fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            let tree: DecisionTreeFile =
                serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                    path: path.clone(),
                    source,
                })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            for mut section in tree.sections {
                section.file_name = file_name.clone();
                catalog.insert(section);
            }
        }
        tracing::info!(
            dir = %dir.display(),
            standards = catalog.len(),
            questions = catalog.total_questions(),
            "standards catalog loaded"
        );
        Ok(catalog)
    }

    fn insert(&mut self, section: CatalogSection) {
        let key = section.key();
        if let Some(&pos) = self.index.get(&key) {
            tracing::warn!(key = %key, file = %section.file_name, "standard redefined; replacing");
            self.sections[pos] = section;
        } else {
            self.index.insert(key, self.sections.len());
            self.sections.push(section);
        }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections in catalog order.
    pub fn sections(&self) -> &[CatalogSection] {
        &self.sections
    }

    /// Section by key.
    pub fn get(&self, key: &str) -> Option<&CatalogSection> {
        self.index.get(key).map(|&i| &self.sections[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of questions in a section.
    pub fn item_count(&self, key: &str) -> Option<u32> {
        self.get(key).map(CatalogSection::item_count)
    }

    /// Questions across every section.
    pub fn total_questions(&self) -> u32 {
        self.sections.iter().map(CatalogSection::item_count).sum()
    }

    /// Listing entries in catalog order.
    pub fn standard_items(&self) -> Vec<StandardItem> {
        self.sections
            .iter()
            .map(|s| StandardItem {
                key: s.key(),
                section: s.section.clone(),
                title: s.title.clone(),
                description: s.description.clone(),
                item_count: s.item_count(),
                file_name: s.file_name.clone(),
            })
            .collect()
    }

    /// Listing with totals.
    pub fn summary(&self) -> StandardsSummary {
        StandardsSummary {
            total_standards: u32::try_from(self.len()).unwrap_or(u32::MAX),
            total_questions: self.total_questions(),
            frameworks: vec!["IFRS".to_string()],
            standards: self.standard_items(),
        }
    }

    /// Questions of the given sections, in the order the keys are given.
    /// Unknown keys contribute nothing.
    pub fn items_for<'a>(
        &'a self,
        keys: &'a [String],
    ) -> impl Iterator<Item = (&'a CatalogSection, &'a CatalogItem)> + 'a {
        keys.iter()
            .filter_map(|k| self.get(k))
            .flat_map(|s| s.items.iter().map(move |i| (s, i)))
    }

    /// Case-insensitive substring search over question text and references.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.sections
            .iter()
            .flat_map(|s| s.items.iter().map(move |i| (s, i)))
            .filter(|(_, item)| {
                item.question.to_lowercase().contains(&needle)
                    || item.reference.to_lowercase().contains(&needle)
                    || item
                        .original_question
                        .as_deref()
                        .is_some_and(|q| q.to_lowercase().contains(&needle))
            })
            .map(|(s, item)| SearchHit {
                standard: s.section.clone(),
                item: item.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, n: usize) -> CatalogSection {
        CatalogSection {
            section: name.to_string(),
            title: format!("{name} title"),
            description: String::new(),
            items: (1..=n)
                .map(|i| CatalogItem {
                    id: format!("{}_q{i}", section_key(name)),
                    question: format!("Does the entity disclose item {i} of {name}?"),
                    reference: format!("{name}.{i}"),
                    original_question: None,
                })
                .collect(),
            file_name: String::new(),
        }
    }

    fn write(dir: &Path, name: &str, sections: &[CatalogSection]) {
        let body = serde_json::json!({ "sections": sections });
        std::fs::write(dir.join(name), body.to_string()).unwrap();
    }

    // ── loading ──────────────────────────────────────────────────────

    #[test]
    fn load_dir_orders_by_file_then_position() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.json", &[section("IAS 7", 3)]);
        write(dir.path(), "a.json", &[section("IAS 1", 5), section("IAS 2", 4)]);
        std::fs::write(dir.path().join("README.txt"), "ignored").unwrap();

        let cat = StandardsCatalog::load_dir(dir.path()).unwrap();
        let keys: Vec<String> = cat.standard_items().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["IAS_1", "IAS_2", "IAS_7"]);
        assert_eq!(cat.total_questions(), 12);
        assert_eq!(cat.get("IAS_7").unwrap().file_name, "b.json");
    }

    #[test]
    fn load_dir_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let err = StandardsCatalog::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn load_dir_missing_directory() {
        let err = StandardsCatalog::load_dir(Path::new("/nonexistent/catalog")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn redefinition_replaces_in_place() {
        let cat = StandardsCatalog::from_sections([
            section("IAS 1", 5),
            section("IAS 2", 4),
            section("IAS 1", 2),
        ]);
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.sections()[0].section, "IAS 1");
        assert_eq!(cat.item_count("IAS_1"), Some(2));
    }

    // ── queries ──────────────────────────────────────────────────────

    #[test]
    fn items_for_follows_key_order() {
        let cat = StandardsCatalog::from_sections([section("IAS 1", 2), section("IAS 2", 1)]);
        let keys = vec!["IAS_2".to_string(), "IAS_9".to_string(), "IAS_1".to_string()];
        let ids: Vec<&str> = cat.items_for(&keys).map(|(_, i)| i.id.as_str()).collect();
        assert_eq!(ids, vec!["IAS_2_q1", "IAS_1_q1", "IAS_1_q2"]);
    }

    #[test]
    fn search_matches_question_and_reference() {
        let cat = StandardsCatalog::from_sections([section("IAS 1", 2), section("IAS 16", 1)]);
        assert_eq!(cat.search("ITEM 2").len(), 1);
        let hits = cat.search("IAS 16.1");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].standard, "IAS 16");
        assert!(cat.search("   ").is_empty());
    }

    #[test]
    fn summary_totals() {
        let cat = StandardsCatalog::from_sections([section("IAS 1", 5), section("IAS 2", 4)]);
        let s = cat.summary();
        assert_eq!(s.total_standards, 2);
        assert_eq!(s.total_questions, 9);
        assert_eq!(s.standards[1].item_count, 4);
    }
}
