//! # rai-catalog — Standards Catalog and Selection
//!
//! The catalog is the process-wide, ordered list of regulatory sections and
//! their questions, loaded from a directory of decision-tree JSON files.
//! Sessions pick a subset of sections; confirming the pick snapshots the
//! section and question totals so later catalog edits leave confirmed
//! sessions untouched.
//!
//! - **Catalog** (`catalog.rs`): loading, lookup, search.
//! - **Shared handle** (`shared.rs`): cheap snapshots plus explicit reload.
//! - **Selection** (`selection.rs`): toggle / select-all / clear-all and the
//!   confirmation snapshot.

pub mod catalog;
pub mod error;
pub mod selection;
pub mod shared;

pub use catalog::{
    section_key, CatalogItem, CatalogSection, SearchHit, StandardItem, StandardsCatalog,
    StandardsSummary,
};
pub use error::{CatalogError, SelectionError};
pub use selection::{SelectionSnapshot, StandardsSelection};
pub use shared::SharedCatalog;
