//! # Collaborator API Contract
//!
//! Everything the engine needs from the outside world. Implementations
//! must map "no such session" to [`ClientError::NotFound`] and "a run is
//! already active" to [`ClientError::Conflict`].

use async_trait::async_trait;

use rai_catalog::{CatalogSection, SearchHit, StandardsSummary};
use rai_core::{
    ChunkPage, ChunkQuery, NewSession, OverrideRecord, OverrideRequest, ReanalyzeRequest,
    ResultsPage, ResultsQuery, Session, SessionId, SessionPatch, SessionQuery,
};

use crate::error::ClientError;
use crate::types::{OverrideResponse, ReanalyzeResponse, UploadReceipt};
use crate::upload::UploadRequest;

/// Ordered byte fragments of one analysis stream.
///
/// `Ok(None)` means the channel closed. Fragments may split records, or
/// UTF-8 sequences, anywhere.
#[async_trait]
pub trait EventChannel: Send {
    async fn next_fragment(&mut self) -> Result<Option<Vec<u8>>, ClientError>;
}

/// The compliance API as seen by the engine.
#[async_trait]
pub trait ComplianceBackend: Send + Sync {
    async fn create_session(&self, new: &NewSession) -> Result<Session, ClientError>;

    async fn get_session(&self, id: SessionId) -> Result<Session, ClientError>;

    /// Sessions matching `query`, newest first.
    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, ClientError>;

    /// Partial update; last write wins.
    async fn patch_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> Result<Session, ClientError>;

    async fn delete_session(&self, id: SessionId) -> Result<(), ClientError>;

    async fn upload_documents(
        &self,
        id: SessionId,
        upload: &UploadRequest,
    ) -> Result<UploadReceipt, ClientError>;

    async fn list_chunks(&self, id: SessionId, query: &ChunkQuery) -> Result<ChunkPage, ClientError>;

    async fn list_standards(&self) -> Result<StandardsSummary, ClientError>;

    /// One standard with all of its questions, by section key (`IAS_1`).
    async fn get_standard(&self, key: &str) -> Result<CatalogSection, ClientError>;

    async fn search_standards(&self, query: &str) -> Result<Vec<SearchHit>, ClientError>;

    /// Reload the process-wide catalog. Confirmed sessions keep their totals.
    async fn reload_standards(&self) -> Result<StandardsSummary, ClientError>;

    /// Start a run and open its event channel. Rejected with `Conflict`
    /// while another run of the same session is active.
    async fn start_analysis(&self, id: SessionId) -> Result<Box<dyn EventChannel>, ClientError>;

    /// Re-analyze exactly the given questions, synchronously.
    async fn reanalyze(
        &self,
        id: SessionId,
        request: &ReanalyzeRequest,
    ) -> Result<ReanalyzeResponse, ClientError>;

    async fn apply_override(
        &self,
        id: SessionId,
        request: &OverrideRequest,
    ) -> Result<OverrideResponse, ClientError>;

    /// Override history in application order.
    async fn list_overrides(&self, id: SessionId) -> Result<Vec<OverrideRecord>, ClientError>;

    async fn list_results(
        &self,
        id: SessionId,
        query: &ResultsQuery,
    ) -> Result<ResultsPage, ClientError>;
}
