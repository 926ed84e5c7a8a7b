//! # In-Memory Backend
//!
//! [`MemoryBackend`] implements [`ComplianceBackend`] directly over
//! [`AppState`]. Integration tests drive the engine against it without a
//! socket; the axum routes delegate to it so both surfaces behave alike.
//!
//! An analysis run is planned up front and replayed by [`MemoryChannel`],
//! which persists every event to the session record at the moment it is
//! handed out and splits each line into fragments of the configured size.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::mapref::one::RefMut;

use rai_catalog::{section_key, CatalogSection, SearchHit, StandardsCatalog, StandardsSummary};
use rai_client::{
    ClientError, ComplianceBackend, EventChannel, OverrideResponse, ReanalyzeResponse,
    UploadReceipt, UploadRequest,
};
use rai_compliance::{OverrideError, ResultsSummary};
use rai_core::{
    generate_session_code, ChunkPage, ChunkQuery, NewSession, OverrideRecord, OverrideRequest,
    ReanalyzeRequest, ResultsPage, ResultsQuery, Session, SessionId, SessionPatch, SessionQuery,
    SessionStatus, Stage, StreamEvent, Timestamp,
};

use crate::analyzer::{assess, plan_run, Step};
use crate::chunker::chunk_document;
use crate::sample::sample_catalog;
use crate::store::{AppState, RunSlot, SessionRecord, StoredDocument, StubConfig};

/// [`ComplianceBackend`] over the stub's in-memory store.
#[derive(Clone)]
pub struct MemoryBackend {
    state: AppState,
}

impl MemoryBackend {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Fresh state holding `catalog`.
    pub fn with_catalog(catalog: StandardsCatalog) -> Self {
        Self::new(AppState::new(catalog))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn record(
        &self,
        id: SessionId,
        endpoint: &str,
    ) -> Result<RefMut<'_, SessionId, SessionRecord>, ClientError> {
        self.state
            .sessions()
            .get_mut(&id)
            .ok_or_else(|| ClientError::NotFound {
                endpoint: endpoint.to_string(),
            })
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("sessions", &self.state.sessions().len())
            .finish()
    }
}

fn bad_request(endpoint: &str, body: impl Into<String>) -> ClientError {
    ClientError::Api {
        endpoint: endpoint.to_string(),
        status: 400,
        body: body.into(),
    }
}

fn score_of(record: &SessionRecord) -> u32 {
    ResultsSummary::compute(record.results.iter()).compliance_score()
}

#[async_trait]
impl ComplianceBackend for MemoryBackend {
    async fn create_session(&self, new: &NewSession) -> Result<Session, ClientError> {
        let client_name = new.client_name.trim();
        if client_name.is_empty() {
            return Err(ClientError::Api {
                endpoint: "/sessions".to_string(),
                status: 422,
                body: "client_name must not be empty".to_string(),
            });
        }
        let now = Timestamp::now();
        let session = Session {
            id: SessionId::new(),
            session_code: generate_session_code(client_name),
            client_name: client_name.to_string(),
            framework: new.framework.clone(),
            status: SessionStatus::AwaitingUpload,
            current_stage: Stage::Upload,
            selected_standards: Vec::new(),
            total_standards: 0,
            total_questions: 0,
            financial_statements_filename: None,
            notes_filename: None,
            compliance_score: None,
            created_at: now,
            updated_at: now,
        };
        tracing::info!(session_id = %session.id, code = %session.session_code, "session created");
        self.state
            .sessions()
            .insert(session.id, SessionRecord::new(session.clone()));
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, ClientError> {
        let endpoint = format!("/sessions/{id}");
        Ok(self.record(id, &endpoint)?.session.clone())
    }

    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, ClientError> {
        let sessions: Vec<Session> = self
            .state
            .sessions()
            .iter()
            .map(|entry| entry.value().session.clone())
            .collect();
        Ok(query.apply(&sessions))
    }

    async fn patch_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> Result<Session, ClientError> {
        let endpoint = format!("/sessions/{id}");
        let mut record = self.record(id, &endpoint)?;
        patch.apply_to(&mut record.session);
        record.session.updated_at = Timestamp::now();
        tracing::debug!(session_id = %id, stage = %record.session.current_stage, "session patched");
        Ok(record.session.clone())
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), ClientError> {
        match self.state.sessions().remove(&id) {
            Some(_) => {
                tracing::info!(session_id = %id, "session deleted");
                Ok(())
            }
            None => Err(ClientError::NotFound {
                endpoint: format!("/sessions/{id}"),
            }),
        }
    }

    async fn upload_documents(
        &self,
        id: SessionId,
        upload: &UploadRequest,
    ) -> Result<UploadReceipt, ClientError> {
        upload.validate()?;
        let endpoint = format!("/sessions/{id}/upload");
        let mut record = self.record(id, &endpoint)?;

        if let Some(fs) = &upload.financial_statements {
            record.financial_statements = Some(StoredDocument {
                file_name: fs.file_name.clone(),
                text: String::from_utf8_lossy(&fs.bytes).into_owned(),
            });
            record.session.financial_statements_filename = Some(fs.file_name.clone());
        }
        if let Some(notes) = &upload.notes {
            record.notes = Some(StoredDocument {
                file_name: notes.file_name.clone(),
                text: String::from_utf8_lossy(&notes.bytes).into_owned(),
            });
            record.session.notes_filename = Some(notes.file_name.clone());
        }

        let mut chunks = record
            .financial_statements
            .as_ref()
            .map(|d| chunk_document(&format!("{id}_fs"), 0, &d.text))
            .unwrap_or_default();
        if let Some(notes) = &record.notes {
            let next = u32::try_from(chunks.len()).unwrap_or(u32::MAX);
            chunks.extend(chunk_document(&format!("{id}_notes"), next, &notes.text));
        }
        record.chunks = chunks;
        record.session.status = SessionStatus::Processing;
        record.session.updated_at = Timestamp::now();

        let both = record.financial_statements.is_some() && record.notes.is_some();
        tracing::info!(
            session_id = %id,
            chunks = record.chunks.len(),
            notes = record.notes.is_some(),
            "documents uploaded"
        );
        Ok(UploadReceipt {
            session_id: id,
            financial_statements_uploaded: record.financial_statements.is_some(),
            notes_uploaded: record.notes.is_some(),
            status: record.session.status,
            message: if both {
                "Files uploaded successfully".to_string()
            } else {
                "Partial upload; both files required to proceed".to_string()
            },
        })
    }

    async fn list_chunks(&self, id: SessionId, query: &ChunkQuery) -> Result<ChunkPage, ClientError> {
        let endpoint = format!("/sessions/{id}/chunks");
        let record = self.record(id, &endpoint)?;
        Ok(query.apply(id, &record.chunks))
    }

    async fn list_standards(&self) -> Result<StandardsSummary, ClientError> {
        Ok(self.state.catalog().snapshot().summary())
    }

    async fn get_standard(&self, key: &str) -> Result<CatalogSection, ClientError> {
        let key = section_key(key);
        self.state
            .catalog()
            .snapshot()
            .get(&key)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                endpoint: format!("/standards/{key}"),
            })
    }

    async fn search_standards(&self, query: &str) -> Result<Vec<SearchHit>, ClientError> {
        Ok(self.state.catalog().snapshot().search(query))
    }

    async fn reload_standards(&self) -> Result<StandardsSummary, ClientError> {
        let shared = self.state.catalog();
        match &self.state.config().catalog_dir {
            Some(dir) => shared.reload_from(dir).map_err(|e| ClientError::Api {
                endpoint: "/standards/reload".to_string(),
                status: 500,
                body: e.to_string(),
            })?,
            None => shared.replace(sample_catalog()),
        }
        let summary = shared.snapshot().summary();
        tracing::info!(
            standards = summary.total_standards,
            questions = summary.total_questions,
            "standards catalog reloaded"
        );
        Ok(summary)
    }

    async fn start_analysis(&self, id: SessionId) -> Result<Box<dyn EventChannel>, ClientError> {
        let endpoint = format!("/sessions/{id}/analyze-stream");
        let mut record = self.record(id, &endpoint)?;
        if !record.session.has_documents() {
            return Err(bad_request(&endpoint, "Documents must be uploaded"));
        }
        if record.session.selected_standards.is_empty() {
            return Err(bad_request(&endpoint, "Standards must be selected"));
        }
        let slot = self.state.try_start(id).ok_or_else(|| ClientError::Conflict {
            endpoint: endpoint.clone(),
            body: "Analysis already running for this session".to_string(),
        })?;

        let catalog = self.state.catalog().snapshot();
        let document = record.document_text().to_lowercase();
        let mut reused = 0usize;
        let mut planned = Vec::new();
        for (seq, (section, item)) in catalog.items_for(&record.session.selected_standards).enumerate() {
            let sequence = u32::try_from(seq + 1).unwrap_or(u32::MAX);
            match record.results.get(&item.id) {
                Some(existing) => {
                    reused += 1;
                    planned.push(existing.clone());
                }
                None => planned.push(assess(&section.section, sequence, item, &document, &record.chunks)),
            }
        }
        let cache_hit = !planned.is_empty() && reused == planned.len();
        let fault = self.state.take_fault(id);
        let steps = plan_run(&planned, cache_hit, fault);

        let patch = SessionPatch::enter(Stage::Analysis);
        patch.apply_to(&mut record.session);
        record.session.updated_at = Timestamp::now();
        tracing::info!(
            session_id = %id,
            questions = planned.len(),
            cache_hit,
            fault = ?fault,
            "analysis started"
        );

        Ok(Box::new(MemoryChannel {
            state: self.state.clone(),
            session_id: id,
            steps: steps.into(),
            pending: VecDeque::new(),
            fragment_size: self.state.config().fragment_size,
            slot: Some(slot),
        }))
    }

    async fn reanalyze(
        &self,
        id: SessionId,
        request: &ReanalyzeRequest,
    ) -> Result<ReanalyzeResponse, ClientError> {
        let endpoint = format!("/sessions/{id}/re-analyze");
        let mut record = self.record(id, &endpoint)?;
        if request.question_ids.is_empty() {
            return Err(bad_request(&endpoint, "question_ids must not be empty"));
        }
        let _slot = self.state.try_start(id).ok_or_else(|| ClientError::Conflict {
            endpoint: endpoint.clone(),
            body: "Analysis already running for this session".to_string(),
        })?;

        let catalog = self.state.catalog().snapshot();
        let document = record.document_text().to_lowercase();
        let mut fresh = Vec::new();
        for question_id in &request.question_ids {
            let found = catalog
                .items_for(&record.session.selected_standards)
                .find(|(_, item)| item.id == question_id.as_str());
            let Some((section, item)) = found else {
                tracing::warn!(session_id = %id, question_id = %question_id, "re-analysis of unknown question skipped");
                continue;
            };
            let sequence = record
                .results
                .get(question_id.as_str())
                .map_or(0, |r| r.sequence);
            let mut result = assess(&section.section, sequence, item, &document, &record.chunks);
            if let Some(instructions) = request.instructions.as_deref().filter(|s| !s.trim().is_empty()) {
                result.explanation = format!("{} (instructions: {})", result.explanation, instructions.trim());
            }
            fresh.push(result);
        }
        for result in &fresh {
            record.results.upsert(result.clone());
        }
        let score = score_of(&record);
        record.session.compliance_score = Some(score);
        record.session.updated_at = Timestamp::now();
        tracing::info!(session_id = %id, re_analyzed = fresh.len(), score, "re-analysis finished");

        Ok(ReanalyzeResponse {
            session_id: id,
            re_analyzed: u32::try_from(fresh.len()).unwrap_or(u32::MAX),
            results: fresh,
            compliance_score: score,
        })
    }

    async fn apply_override(
        &self,
        id: SessionId,
        request: &OverrideRequest,
    ) -> Result<OverrideResponse, ClientError> {
        let endpoint = format!("/sessions/{id}/override");
        let mut record = self.record(id, &endpoint)?;
        let SessionRecord {
            results, ledger, ..
        } = &mut *record;
        ledger
            .apply(results, request.clone())
            .map_err(|e| match e {
                OverrideError::UnknownQuestion(_) => ClientError::NotFound {
                    endpoint: format!("{endpoint}/{}", request.question_id),
                },
                OverrideError::EmptyReason(_) => bad_request(&endpoint, e.to_string()),
            })?;
        let result = results
            .get(request.question_id.as_str())
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                endpoint: endpoint.clone(),
            })?;
        let score = score_of(&record);
        record.session.compliance_score = Some(score);
        record.session.updated_at = Timestamp::now();
        Ok(OverrideResponse {
            session_id: id,
            result,
            compliance_score: score,
        })
    }

    async fn list_overrides(&self, id: SessionId) -> Result<Vec<OverrideRecord>, ClientError> {
        let endpoint = format!("/sessions/{id}/overrides");
        Ok(self.record(id, &endpoint)?.ledger.records().to_vec())
    }

    async fn list_results(
        &self,
        id: SessionId,
        query: &ResultsQuery,
    ) -> Result<ResultsPage, ClientError> {
        let endpoint = format!("/sessions/{id}/results");
        let record = self.record(id, &endpoint)?;
        let mut page = query.apply(record.results.as_slice());
        page.compliance_score = Some(score_of(&record));
        Ok(page)
    }
}

// ─── Stream ──────────────────────────────────────────────────────────

/// Replays a planned run as byte fragments.
///
/// Holds the session's run slot until the terminal event is handed out,
/// the stream ends, or the channel is dropped.
pub struct MemoryChannel {
    state: AppState,
    session_id: SessionId,
    steps: VecDeque<Step>,
    pending: VecDeque<Vec<u8>>,
    fragment_size: usize,
    slot: Option<RunSlot>,
}

impl MemoryChannel {
    fn persist(&self, event: &StreamEvent) {
        let Some(mut record) = self.state.sessions().get_mut(&self.session_id) else {
            return;
        };
        match event {
            StreamEvent::Result(item) => {
                record.results.upsert(item.clone());
            }
            StreamEvent::Complete(_) => {
                let score = score_of(&record);
                SessionPatch::enter(Stage::Results).apply_to(&mut record.session);
                record.session.compliance_score = Some(score);
                tracing::info!(session_id = %self.session_id, score, "analysis completed");
            }
            StreamEvent::Error(e) => {
                record.session.status = SessionStatus::Failed;
                tracing::warn!(session_id = %self.session_id, message = %e.message, "analysis failed");
            }
            StreamEvent::Progress(_) | StreamEvent::Status(_) => return,
        }
        record.session.updated_at = Timestamp::now();
    }
}

#[async_trait]
impl EventChannel for MemoryChannel {
    async fn next_fragment(&mut self) -> Result<Option<Vec<u8>>, ClientError> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Ok(Some(fragment));
            }
            match self.steps.pop_front() {
                Some(Step::Emit(event)) => {
                    self.persist(&event);
                    let line = event
                        .to_line()
                        .map_err(|e| ClientError::Transport(e.to_string()))?;
                    self.pending.extend(
                        line.as_bytes()
                            .chunks(self.fragment_size)
                            .map(<[u8]>::to_vec),
                    );
                    if event.is_terminal() {
                        self.steps.clear();
                        self.slot = None;
                    }
                }
                Some(Step::Disconnect) => {
                    tracing::warn!(session_id = %self.session_id, "stream dropped before completion");
                    self.steps.clear();
                    self.slot = None;
                    return Ok(None);
                }
                Some(Step::Stall) => {
                    tracing::warn!(session_id = %self.session_id, "stream stalled");
                    futures::future::pending::<()>().await;
                }
                None => {
                    self.slot = None;
                    return Ok(None);
                }
            }
        }
    }
}
