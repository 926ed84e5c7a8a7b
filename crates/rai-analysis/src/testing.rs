//! Scripted in-process backend for unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use rai_catalog::{CatalogSection, SearchHit, StandardsSummary};
use rai_client::{
    ClientError, ComplianceBackend, EventChannel, OverrideResponse, ReanalyzeResponse,
    UploadReceipt, UploadRequest,
};
use rai_core::{
    ChunkPage, ChunkPreviewItem, ChunkQuery, ComplianceResultItem, Framework, NewSession,
    OverrideRecord, OverrideRequest, ReanalyzeRequest, ResultsPage, ResultsQuery, Session,
    SessionId, SessionPatch, SessionQuery, SessionStatus, Stage, StreamEvent, Timestamp,
};

/// One step of a scripted event channel.
#[derive(Debug, Clone)]
pub enum Step {
    Bytes(Vec<u8>),
    Fail(String),
    Stall,
}

pub fn line(event: &StreamEvent) -> Step {
    Step::Bytes(event.to_line().unwrap().into_bytes())
}

pub fn session_at(stage: Stage) -> Session {
    let now = Timestamp::now();
    Session {
        id: SessionId::new(),
        session_code: "RAI-ACME-01152026-AB12".to_string(),
        client_name: "Acme".to_string(),
        framework: Framework::Ifrs,
        status: stage.entry_status(),
        current_stage: stage,
        selected_standards: vec!["IAS_1".to_string()],
        total_standards: 1,
        total_questions: 3,
        financial_statements_filename: Some("fs.pdf".to_string()),
        notes_filename: None,
        compliance_score: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    pub session: Mutex<Option<Session>>,
    pub script: Mutex<Vec<Step>>,
    pub patches: Mutex<Vec<SessionPatch>>,
    pub reanalyzed: Mutex<Vec<ComplianceResultItem>>,
    pub chunks: Mutex<Vec<ChunkPreviewItem>>,
    pub conflict_on_start: Mutex<bool>,
    pub fail_patches: Mutex<bool>,
}

impl ScriptedBackend {
    pub fn new(session: Session, script: Vec<Step>) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            script: Mutex::new(script),
            ..Self::default()
        }
    }

    pub fn server_session(&self) -> Session {
        self.session.lock().clone().unwrap()
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> Result<T, ClientError> {
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(ClientError::NotFound {
            endpoint: "/sessions".to_string(),
        })?;
        Ok(f(session))
    }
}

struct ScriptedChannel {
    steps: VecDeque<Step>,
}

#[async_trait]
impl EventChannel for ScriptedChannel {
    async fn next_fragment(&mut self) -> Result<Option<Vec<u8>>, ClientError> {
        match self.steps.pop_front() {
            None => Ok(None),
            Some(Step::Bytes(b)) => Ok(Some(b)),
            Some(Step::Fail(msg)) => Err(ClientError::Transport(msg)),
            Some(Step::Stall) => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Ok(None)
            }
        }
    }
}

fn unused(endpoint: &str) -> ClientError {
    ClientError::Transport(format!("{endpoint} not scripted"))
}

#[async_trait]
impl ComplianceBackend for ScriptedBackend {
    async fn create_session(&self, new: &NewSession) -> Result<Session, ClientError> {
        let mut session = session_at(Stage::Upload);
        session.client_name = new.client_name.clone();
        session.selected_standards.clear();
        session.financial_statements_filename = None;
        *self.session.lock() = Some(session.clone());
        Ok(session)
    }

    async fn get_session(&self, _id: SessionId) -> Result<Session, ClientError> {
        self.with_session(|s| s.clone())
    }

    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, ClientError> {
        Ok(query.apply(self.session.lock().iter()))
    }

    async fn patch_session(
        &self,
        _id: SessionId,
        patch: &SessionPatch,
    ) -> Result<Session, ClientError> {
        if *self.fail_patches.lock() {
            return Err(ClientError::Transport("connection reset".to_string()));
        }
        self.patches.lock().push(patch.clone());
        self.with_session(|s| {
            patch.apply_to(s);
            s.clone()
        })
    }

    async fn delete_session(&self, _id: SessionId) -> Result<(), ClientError> {
        *self.session.lock() = None;
        Ok(())
    }

    async fn upload_documents(
        &self,
        id: SessionId,
        upload: &UploadRequest,
    ) -> Result<UploadReceipt, ClientError> {
        self.with_session(|s| {
            s.financial_statements_filename =
                upload.financial_statements.as_ref().map(|d| d.file_name.clone());
            s.status = SessionStatus::Processing;
        })?;
        Ok(UploadReceipt {
            session_id: id,
            financial_statements_uploaded: true,
            notes_uploaded: upload.has_notes(),
            status: SessionStatus::Processing,
            message: String::new(),
        })
    }

    async fn list_chunks(&self, id: SessionId, query: &ChunkQuery) -> Result<ChunkPage, ClientError> {
        Ok(query.apply(id, &self.chunks.lock()))
    }

    async fn list_standards(&self) -> Result<StandardsSummary, ClientError> {
        Err(unused("/standards"))
    }

    async fn get_standard(&self, _key: &str) -> Result<CatalogSection, ClientError> {
        Err(unused("/standards/{key}"))
    }

    async fn search_standards(&self, _query: &str) -> Result<Vec<SearchHit>, ClientError> {
        Err(unused("/standards/search"))
    }

    async fn reload_standards(&self) -> Result<StandardsSummary, ClientError> {
        Err(unused("/standards/reload"))
    }

    async fn start_analysis(&self, _id: SessionId) -> Result<Box<dyn EventChannel>, ClientError> {
        if *self.conflict_on_start.lock() {
            return Err(ClientError::Conflict {
                endpoint: "/analyze-stream".to_string(),
                body: "analysis already running".to_string(),
            });
        }
        self.with_session(|s| {
            s.current_stage = Stage::Analysis;
            s.status = SessionStatus::Analyzing;
        })?;
        let steps = std::mem::take(&mut *self.script.lock());
        Ok(Box::new(ScriptedChannel {
            steps: steps.into(),
        }))
    }

    async fn reanalyze(
        &self,
        id: SessionId,
        request: &ReanalyzeRequest,
    ) -> Result<ReanalyzeResponse, ClientError> {
        let results = self.reanalyzed.lock().clone();
        Ok(ReanalyzeResponse {
            session_id: id,
            re_analyzed: u32::try_from(request.question_ids.len()).unwrap(),
            results,
            compliance_score: 0,
        })
    }

    async fn apply_override(
        &self,
        id: SessionId,
        request: &OverrideRequest,
    ) -> Result<OverrideResponse, ClientError> {
        let mut result = ComplianceResultItem::new(
            request.question_id.clone(),
            "IAS 1",
            request.new_status.clone(),
        );
        result.overridden = true;
        Ok(OverrideResponse {
            session_id: id,
            result,
            compliance_score: 0,
        })
    }

    async fn list_overrides(&self, _id: SessionId) -> Result<Vec<OverrideRecord>, ClientError> {
        Ok(Vec::new())
    }

    async fn list_results(
        &self,
        _id: SessionId,
        query: &ResultsQuery,
    ) -> Result<ResultsPage, ClientError> {
        Ok(query.apply(&[]))
    }
}
