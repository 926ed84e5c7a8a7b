//! # Document Chunking
//!
//! Splits extracted document text into paragraph-aligned chunks and tags
//! each with the statement taxonomy whose marker phrases it mentions most.
//! Chunks shorter than [`MIN_CHUNK_CHARS`] are dropped; a paragraph longer
//! than [`CHUNK_CHARS`] is cut at the last space before the limit.

use rai_core::{ChunkPreviewItem, GENERAL_TAXONOMY};

pub const CHUNK_CHARS: usize = 4000;
pub const MIN_CHUNK_CHARS: usize = 200;

const TAXONOMY_MARKERS: &[(&str, &[&str])] = &[
    (
        "balance_sheet",
        &[
            "statement of financial position",
            "balance sheet",
            "current assets",
            "non-current assets",
            "total equity",
            "total liabilities",
        ],
    ),
    (
        "income_statement",
        &[
            "statement of comprehensive income",
            "statement of profit or loss",
            "profit and loss",
            "operating profit",
            "earnings per share",
        ],
    ),
    (
        "cash_flow",
        &[
            "statement of cash flows",
            "cash flow statement",
            "operating activities",
            "investing activities",
            "financing activities",
        ],
    ),
    (
        "equity_changes",
        &[
            "statement of changes in equity",
            "retained earnings",
            "share capital",
        ],
    ),
    (
        "notes",
        &[
            "notes to the financial statements",
            "accounting policies",
            "basis of preparation",
        ],
    ),
    (
        "audit_report",
        &["independent auditor", "audit report", "opinion on the financial"],
    ),
];

/// Taxonomy label with the most marker hits, or `general`.
///
/// Ties go to the label listed first.
pub fn classify(text: &str) -> &'static str {
    let lower = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let mut best = (GENERAL_TAXONOMY, 0usize);
    for (label, markers) in TAXONOMY_MARKERS {
        let hits: usize = markers.iter().map(|m| lower.matches(m).count()).sum();
        if hits > best.1 {
            best = (*label, hits);
        }
    }
    best.0
}

/// Chunk `text`, numbering chunks from `first_index`.
pub fn chunk_document(prefix: &str, first_index: u32, text: &str) -> Vec<ChunkPreviewItem> {
    let mut bodies = Vec::new();
    let mut current = String::new();
    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty() && current.len() + para.len() + 2 > CHUNK_CHARS {
            bodies.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(para);
        while current.len() > CHUNK_CHARS {
            let cut = split_point(&current, CHUNK_CHARS);
            let rest = current.split_off(cut);
            bodies.push(std::mem::replace(&mut current, rest.trim_start().to_string()));
        }
    }
    if !current.is_empty() {
        bodies.push(current);
    }

    bodies
        .into_iter()
        .map(|b| b.trim().to_string())
        .filter(|b| b.chars().count() >= MIN_CHUNK_CHARS)
        .zip(first_index..)
        .map(|(body, index)| {
            let has_table = body.contains('|') && body.contains("---");
            ChunkPreviewItem::from_text(
                format!("{prefix}_chunk_{index}"),
                index,
                &body,
                classify(&body),
                has_table,
            )
        })
        .collect()
}

/// Byte offset at which to cut, on a char boundary at or before `max`.
fn split_point(text: &str, max: usize) -> usize {
    let mut limit = max.min(text.len());
    while !text.is_char_boundary(limit) {
        limit -= 1;
    }
    match text[..limit].rfind(' ') {
        Some(space) if space > 0 => space + 1,
        _ => limit,
    }
}
