//! # rai-compliance — Coverage, Results, Overrides, Export
//!
//! Pure, synchronous logic over a session's chunks and results. Nothing in
//! this crate talks to the network or mutates a session record.
//!
//! - **Coverage** (`coverage.rs`): which financial statements the classified
//!   chunks evidence, with a confidence score.
//! - **Results** (`results.rs`): the live results collection, upserted by
//!   question id.
//! - **Ledger** (`ledger.rs`): append-only history of reviewer overrides.
//! - **Summary** (`summary.rs`): counts and compliance score.
//! - **Export** (`export.rs`): delimited-text rendering of the results.

pub mod coverage;
pub mod error;
pub mod export;
pub mod ledger;
pub mod results;
pub mod summary;

pub use coverage::{
    CategoryEvidence, CoverageConfig, FinancialCoverageValidator, FinancialValidationResult,
    StatementKind,
};
pub use error::{CoverageConfigError, ExportError, OverrideError};
pub use export::{export_csv, write_csv, EXPORT_COLUMNS};
pub use ledger::OverrideLedger;
pub use results::{ResultsCollection, UpsertOutcome};
pub use summary::{compliance_score, ResultsSummary, StandardSummary};
