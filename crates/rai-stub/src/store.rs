//! In-memory storage using DashMap.
//!
//! One [`SessionRecord`] per session holds the session row, uploaded
//! document text, chunks, results and override history. Results are
//! written as the analyzer emits them, so a run that dies mid-stream
//! leaves its partial results behind.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use rai_catalog::{SharedCatalog, StandardsCatalog};
use rai_compliance::{OverrideLedger, ResultsCollection};
use rai_core::{ChunkPreviewItem, Session, SessionId};

/// Bytes per fragment when the analysis stream is written out.
pub const DEFAULT_FRAGMENT_SIZE: usize = 64;

/// Stub settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubConfig {
    /// Bytes per fragment of the analysis stream.
    pub fragment_size: usize,
    /// Directory of decision-tree files; the built-in sample otherwise.
    pub catalog_dir: Option<PathBuf>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            catalog_dir: None,
        }
    }
}

impl StubConfig {
    /// Read `RAI_STUB_CATALOG` and `RAI_STUB_FRAGMENT_SIZE`.
    pub fn from_env() -> Self {
        Self {
            fragment_size: std::env::var("RAI_STUB_FRAGMENT_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FRAGMENT_SIZE),
            catalog_dir: std::env::var_os("RAI_STUB_CATALOG").map(PathBuf::from),
        }
    }
}

/// Extracted text of one uploaded document.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub file_name: String,
    pub text: String,
}

/// Everything the stub keeps for one session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session: Session,
    pub financial_statements: Option<StoredDocument>,
    pub notes: Option<StoredDocument>,
    pub chunks: Vec<ChunkPreviewItem>,
    pub results: ResultsCollection,
    pub ledger: OverrideLedger,
}

impl SessionRecord {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            financial_statements: None,
            notes: None,
            chunks: Vec::new(),
            results: ResultsCollection::new(),
            ledger: OverrideLedger::new(),
        }
    }

    /// Text of every uploaded document, statements first.
    pub fn document_text(&self) -> String {
        [&self.financial_statements, &self.notes]
            .into_iter()
            .flatten()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A scripted failure for the next analysis run of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Send an `error` event after this many results.
    ErrorAfter(usize),
    /// End the stream without `complete` after this many results.
    DisconnectAfter(usize),
    /// Stop sending anything after this many results.
    StallAfter(usize),
}

struct Inner {
    sessions: DashMap<SessionId, SessionRecord>,
    running: DashSet<SessionId>,
    faults: DashMap<SessionId, Fault>,
    catalog: SharedCatalog,
    config: StubConfig,
}

/// Shared application state. Clones share the same data.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    pub fn new(catalog: StandardsCatalog) -> Self {
        Self::with_config(catalog, StubConfig::default())
    }

    pub fn with_config(catalog: StandardsCatalog, mut config: StubConfig) -> Self {
        config.fragment_size = config.fragment_size.max(1);
        Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                running: DashSet::new(),
                faults: DashMap::new(),
                catalog: SharedCatalog::new(catalog),
                config,
            }),
        }
    }

    pub fn sessions(&self) -> &DashMap<SessionId, SessionRecord> {
        &self.inner.sessions
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.inner.catalog
    }

    pub fn config(&self) -> &StubConfig {
        &self.inner.config
    }

    /// Arm a failure for the session's next run.
    pub fn inject_fault(&self, session_id: SessionId, fault: Fault) {
        self.inner.faults.insert(session_id, fault);
    }

    pub(crate) fn take_fault(&self, session_id: SessionId) -> Option<Fault> {
        self.inner.faults.remove(&session_id).map(|(_, f)| f)
    }

    /// Claim the run slot, or `None` if a run is active.
    pub(crate) fn try_start(&self, session_id: SessionId) -> Option<RunSlot> {
        if self.inner.running.insert(session_id) {
            Some(RunSlot {
                state: self.clone(),
                session_id,
            })
        } else {
            None
        }
    }

    pub fn is_running(&self, session_id: SessionId) -> bool {
        self.inner.running.contains(&session_id)
    }
}

/// Held for the life of a run; frees the slot on drop.
pub(crate) struct RunSlot {
    state: AppState,
    session_id: SessionId,
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        self.state.inner.running.remove(&self.session_id);
    }
}
