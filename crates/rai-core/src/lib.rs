//! # rai-core — Foundational Types for the Compliance Session Engine
//!
//! Every other crate in the workspace depends on `rai-core`; it depends on
//! nothing internal. It defines the records exchanged with the compliance
//! API and the primitives the engine reasons about.
//!
//! ## Contents
//!
//! - **Identifiers** (`identity.rs`): `SessionId`, `QuestionId` and the
//!   human-readable session code generator.
//! - **Timestamps** (`temporal.rs`): UTC-only, seconds-precision `Timestamp`.
//! - **Session** (`session.rs`): the server-held session record, pipeline
//!   `Stage`, `SessionStatus`, `Framework`, and the patch body used to move it.
//! - **Chunks** (`chunk.rs`): classified document chunks as seen by the
//!   preview screen and the coverage validator.
//! - **Results** (`result.rs`): per-question determinations, the open
//!   `DeterminationStatus`, run progress and override records.
//! - **Events** (`event.rs`): the newline-delimited analysis stream records.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rai-*` crates.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All wire types derive `Serialize`/`Deserialize` and tolerate absent
//!   optional fields.

pub mod chunk;
pub mod error;
pub mod event;
pub mod identity;
pub mod result;
pub mod session;
pub mod temporal;

pub use chunk::{ChunkPage, ChunkPreviewItem, ChunkQuery, TaxonomySummary, GENERAL_TAXONOMY};
pub use error::{RaiError, StreamParseError};
pub use event::{CompletePayload, ErrorPayload, StatusPayload, StreamEvent};
pub use identity::{generate_session_code, QuestionId, SessionId};
pub use result::{
    AnalysisProgress, ComplianceResultItem, DeterminationStatus, OverrideRecord, OverrideRequest,
    ReanalyzeRequest, ResultsPage, ResultsQuery,
};
pub use session::{
    Framework, NewSession, Session, SessionPatch, SessionQuery, SessionStatus, Stage,
};
pub use temporal::Timestamp;
