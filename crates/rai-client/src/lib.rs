//! # rai-client — Compliance API Client
//!
//! The engine reaches its collaborators (session store, document upload,
//! chunk index, standards catalog, analyzer) through one async trait,
//! [`ComplianceBackend`]. [`HttpBackend`] implements it over HTTP; the
//! development stub implements it in memory.
//!
//! ## Streaming
//!
//! `start_analysis` returns an [`EventChannel`] yielding raw byte fragments
//! exactly as the transport delivers them. Fragment boundaries carry no
//! meaning; line reassembly is the caller's job.
//!
//! ## Retry
//!
//! Idempotent requests (GET, PATCH, DELETE) are retried on transport
//! failure with exponential backoff. Requests that start server-side work
//! are sent once.

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
mod retry;
pub mod types;
pub mod upload;

pub use backend::{ComplianceBackend, EventChannel};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use http::HttpBackend;
pub use types::{OverrideResponse, ReanalyzeResponse, UploadReceipt};
pub use upload::{UploadDocument, UploadError, UploadRequest};
