//! # rai-stub — In-Memory Compliance API
//!
//! A self-contained stand-in for the compliance API the engine talks to.
//! It serves two roles:
//!
//! - [`MemoryBackend`] implements `ComplianceBackend` in process, so the
//!   engine's end-to-end tests need no socket.
//! - [`router`] exposes the same backend over axum at `/api/v1`, so the
//!   HTTP client and the CLI can be exercised against a real server.
//!
//! Documents are chunked and classified by keyword markers, and questions
//! are answered by a deterministic keyword analyzer. Analysis streams can
//! be made to fail on purpose with [`Fault`].
//!
//! Storage is in-memory (DashMap) with no persistence; data is lost on
//! restart.

pub mod analyzer;
pub mod backend;
pub mod chunker;
pub mod routes;
pub mod sample;
pub mod store;

pub use backend::{MemoryBackend, MemoryChannel};
pub use routes::router;
pub use sample::sample_catalog;
pub use store::{AppState, Fault, StubConfig};
