//! # Document Chunks
//!
//! Classified chunks of the uploaded documents. Chunking and taxonomy
//! labelling happen upstream; the engine only reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::SessionId;

/// Taxonomy label carried by chunks that match no statement category.
pub const GENERAL_TAXONOMY: &str = "general";

/// Longest content excerpt kept in a preview item, in characters.
pub const PREVIEW_EXCERPT_CHARS: usize = 500;

fn general_taxonomy() -> String {
    GENERAL_TAXONOMY.to_string()
}

/// A single chunk as shown by the preview screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPreviewItem {
    pub chunk_id: String,
    pub chunk_index: u32,
    /// Content excerpt; may be shorter than `char_count`.
    #[serde(default)]
    pub content: String,
    #[serde(default = "general_taxonomy")]
    pub taxonomy: String,
    #[serde(default)]
    pub has_table: bool,
    /// Character count of the full chunk, not of the excerpt.
    #[serde(default)]
    pub char_count: u32,
}

impl ChunkPreviewItem {
    /// Build a preview item from full chunk text, truncating the excerpt.
    pub fn from_text(
        chunk_id: impl Into<String>,
        chunk_index: u32,
        text: &str,
        taxonomy: impl Into<String>,
        has_table: bool,
    ) -> Self {
        let char_count = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        Self {
            chunk_id: chunk_id.into(),
            chunk_index,
            content: text.chars().take(PREVIEW_EXCERPT_CHARS).collect(),
            taxonomy: taxonomy.into(),
            has_table,
            char_count,
        }
    }

    /// Whether the chunk is unclassified.
    pub fn is_general(&self) -> bool {
        self.taxonomy.trim().eq_ignore_ascii_case(GENERAL_TAXONOMY)
    }
}

/// Label → chunk count over a set of chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomySummary(BTreeMap<String, u32>);

impl TaxonomySummary {
    /// Count labels over `items`.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a ChunkPreviewItem>) -> Self {
        let mut summary = Self::default();
        for item in items {
            summary.record(&item.taxonomy);
        }
        summary
    }

    /// Count one more chunk under `label`.
    pub fn record(&mut self, label: &str) {
        *self.0.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Chunks counted under `label`.
    pub fn count(&self, label: &str) -> u32 {
        self.0.get(label).copied().unwrap_or(0)
    }

    /// Total chunks counted.
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    /// Iterate `(label, count)` in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Filter and page selector for a chunk listing.
///
/// Pages are 1-based. A `page_size` of zero returns every matching chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkQuery {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_chunk_page_size")]
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<String>,
}

fn first_page() -> u32 {
    1
}

fn default_chunk_page_size() -> u32 {
    50
}

impl Default for ChunkQuery {
    fn default() -> Self {
        Self {
            page: first_page(),
            page_size: default_chunk_page_size(),
            taxonomy: None,
        }
    }
}

impl ChunkQuery {
    /// Query for one page without a taxonomy filter.
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            taxonomy: None,
        }
    }

    /// Apply this query to an in-memory chunk list.
    ///
    /// The taxonomy summary covers every chunk matching the filter, not only
    /// the returned page.
    pub fn apply(&self, session_id: SessionId, chunks: &[ChunkPreviewItem]) -> ChunkPage {
        let matching: Vec<&ChunkPreviewItem> = chunks
            .iter()
            .filter(|c| self.taxonomy.as_deref().map_or(true, |t| c.taxonomy == t))
            .collect();
        let taxonomy_summary = TaxonomySummary::from_items(matching.iter().copied());
        let total_chunks = u32::try_from(matching.len()).unwrap_or(u32::MAX);
        let page_items: Vec<ChunkPreviewItem> = if self.page_size == 0 {
            matching.into_iter().cloned().collect()
        } else {
            let start = (self.page.max(1) as usize - 1) * self.page_size as usize;
            matching
                .into_iter()
                .skip(start)
                .take(self.page_size as usize)
                .cloned()
                .collect()
        };
        ChunkPage {
            session_id,
            total_chunks,
            page: self.page.max(1),
            page_size: self.page_size,
            chunks: page_items,
            taxonomy_summary,
        }
    }
}

/// One page of a session's chunk listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPage {
    pub session_id: SessionId,
    /// Chunks matching the filter across all pages.
    pub total_chunks: u32,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    pub chunks: Vec<ChunkPreviewItem>,
    #[serde(default)]
    pub taxonomy_summary: TaxonomySummary,
}

impl ChunkPage {
    /// Whether further pages follow this one.
    pub fn has_more(&self) -> bool {
        if self.page_size == 0 || self.chunks.is_empty() {
            return false;
        }
        u64::from(self.page) * u64::from(self.page_size) < u64::from(self.total_chunks)
    }
}
