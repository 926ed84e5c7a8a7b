//! # rai-analysis — Analysis Runs and Session Control
//!
//! - **Framing** (`framing.rs`): newline reassembly over arbitrary byte
//!   fragments.
//! - **Decoder** (`decoder.rs`): per-line event parsing with lenient
//!   recovery from malformed lines.
//! - **Registry** (`registry.rs`): one active run per session.
//! - **Coordinator** (`coordinator.rs`): a full analysis run from start to
//!   settled stage, and scoped re-analysis.
//! - **Controller** (`controller.rs`): the pipeline for one session,
//!   resynced from the server after every mutation.

pub mod controller;
pub mod coordinator;
pub mod decoder;
pub mod error;
pub mod framing;
pub mod registry;

#[cfg(test)]
mod testing;

pub use controller::SessionController;
pub use coordinator::{
    AnalysisRunReport, AnalysisStreamCoordinator, NoopObserver, ReanalysisReport, RunObserver,
    RunOutcome, StreamConfig,
};
pub use decoder::{parse_line, EventDecoder};
pub use error::{AnalysisError, RunFailure};
pub use framing::{FramedLine, InvalidLine, LineFramer};
pub use registry::{RunGuard, RunRegistry};
