//! # Session Controller
//!
//! Holds one session's local view (stage machine, results, override
//! ledger, pending standards selection) and routes every mutation through
//! the backend, resyncing from the returned server record afterwards. The
//! server record always wins.

use std::path::Path;
use std::sync::Arc;

use rai_catalog::{SelectionSnapshot, StandardsCatalog, StandardsSelection};
use rai_client::{ComplianceBackend, UploadReceipt, UploadRequest};
use rai_compliance::{
    export_csv, write_csv, FinancialCoverageValidator, FinancialValidationResult, OverrideLedger,
    ResultsCollection, ResultsSummary,
};
use rai_core::{
    ChunkPage, ChunkPreviewItem, ChunkQuery, Framework, NewSession, OverrideRecord,
    OverrideRequest, ReanalyzeRequest, ResultsPage, ResultsQuery, Session, SessionId,
    SessionPatch, Stage,
};
use rai_state::{SessionMachine, TransitionError};

use crate::coordinator::{
    AnalysisRunReport, AnalysisStreamCoordinator, ReanalysisReport, RunObserver,
};
use crate::error::AnalysisError;

/// Chunks fetched per page when walking the whole chunk list.
const CHUNK_WALK_PAGE_SIZE: u32 = 100;

/// Local view of one compliance session.
pub struct SessionController {
    backend: Arc<dyn ComplianceBackend>,
    coordinator: AnalysisStreamCoordinator,
    validator: FinancialCoverageValidator,
    session: Session,
    machine: SessionMachine,
    results: ResultsCollection,
    ledger: OverrideLedger,
    selection: StandardsSelection,
}

impl SessionController {
    /// Create a session on the server and take control of it.
    pub async fn create(
        coordinator: AnalysisStreamCoordinator,
        validator: FinancialCoverageValidator,
        backend: Arc<dyn ComplianceBackend>,
        new: &NewSession,
    ) -> Result<Self, AnalysisError> {
        let session = backend.create_session(new).await?;
        tracing::info!(
            session_id = %session.id,
            session_code = %session.session_code,
            "session created"
        );
        Ok(Self::from_parts(backend, coordinator, validator, session))
    }

    /// Load an existing session with its results and override history.
    ///
    /// The session's stage, status and selected standards alone determine
    /// where the pipeline resumes.
    pub async fn load(
        coordinator: AnalysisStreamCoordinator,
        validator: FinancialCoverageValidator,
        backend: Arc<dyn ComplianceBackend>,
        session_id: SessionId,
    ) -> Result<Self, AnalysisError> {
        let session = backend.get_session(session_id).await?;
        let mut controller = Self::from_parts(backend, coordinator, validator, session);
        controller.reload_results().await?;
        Ok(controller)
    }

    fn from_parts(
        backend: Arc<dyn ComplianceBackend>,
        coordinator: AnalysisStreamCoordinator,
        validator: FinancialCoverageValidator,
        session: Session,
    ) -> Self {
        Self {
            machine: SessionMachine::from_session(&session),
            selection: StandardsSelection::from_keys(session.selected_standards.iter().cloned()),
            backend,
            coordinator,
            validator,
            session,
            results: ResultsCollection::new(),
            ledger: OverrideLedger::new(),
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id
    }

    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    pub fn stage(&self) -> Stage {
        self.machine.stage()
    }

    pub fn results(&self) -> &ResultsCollection {
        &self.results
    }

    pub fn ledger(&self) -> &OverrideLedger {
        &self.ledger
    }

    pub fn selection(&self) -> &StandardsSelection {
        &self.selection
    }

    /// Pending selection; nothing is sent until [`confirm_standards`](Self::confirm_standards).
    pub fn selection_mut(&mut self) -> &mut StandardsSelection {
        &mut self.selection
    }

    pub fn can_go_to(&self, stage: Stage) -> bool {
        self.machine.can_go_to(stage)
    }

    // ─── Sync ───────────────────────────────────────────────────────

    /// Re-read the server record.
    pub async fn refresh(&mut self) -> Result<&Session, AnalysisError> {
        let session = self.backend.get_session(self.session.id).await?;
        self.adopt(session);
        Ok(&self.session)
    }

    /// Re-read results and override history from the server.
    pub async fn reload_results(&mut self) -> Result<(), AnalysisError> {
        let id = self.session.id;
        let page = self.backend.list_results(id, &ResultsQuery::default()).await?;
        self.results.replace_all(page.results);
        self.ledger = OverrideLedger::from_records(self.backend.list_overrides(id).await?);
        Ok(())
    }

    fn adopt(&mut self, session: Session) {
        self.machine.sync_from_session(&session);
        self.session = session;
    }

    async fn patch(&mut self, patch: &SessionPatch) -> Result<(), AnalysisError> {
        let session = self.backend.patch_session(self.session.id, patch).await?;
        self.adopt(session);
        Ok(())
    }

    // ─── Pipeline ───────────────────────────────────────────────────

    /// Send documents; the server moves the session on once it has them.
    pub async fn upload(&mut self, request: &UploadRequest) -> Result<UploadReceipt, AnalysisError> {
        request.validate()?;
        let receipt = self.backend.upload_documents(self.session.id, request).await?;
        self.refresh().await?;
        Ok(receipt)
    }

    pub async fn select_framework(&mut self, framework: Framework) -> Result<(), AnalysisError> {
        self.require_stage(Stage::FrameworkSelection, "the reporting framework")?;
        self.patch(&SessionPatch {
            framework: Some(framework),
            ..SessionPatch::default()
        })
        .await
    }

    /// Snapshot the pending selection's totals onto the session.
    ///
    /// Totals are computed from `catalog` now and never recomputed.
    pub async fn confirm_standards(
        &mut self,
        catalog: &StandardsCatalog,
    ) -> Result<SelectionSnapshot, AnalysisError> {
        self.require_stage(Stage::StandardsSelection, "the standards selection")?;
        let snapshot = self.selection.confirm(catalog)?;
        self.patch(&snapshot.to_patch()).await?;
        tracing::info!(
            session_id = %self.session.id,
            standards = snapshot.total_standards,
            questions = snapshot.total_questions,
            "standards selection confirmed"
        );
        Ok(snapshot)
    }

    /// Confirm against the catalog the server currently lists.
    pub async fn confirm_standards_listed(&mut self) -> Result<SelectionSnapshot, AnalysisError> {
        self.require_stage(Stage::StandardsSelection, "the standards selection")?;
        let listing = self.backend.list_standards().await?;
        let snapshot = self.selection.confirm_listing(&listing.standards)?;
        self.patch(&snapshot.to_patch()).await?;
        tracing::info!(
            session_id = %self.session.id,
            standards = snapshot.total_standards,
            questions = snapshot.total_questions,
            "standards selection confirmed"
        );
        Ok(snapshot)
    }

    /// Move one stage forward, or back through the retry edge.
    ///
    /// Analysis and results are entered by running an analysis instead.
    pub async fn advance(&mut self, target: Stage) -> Result<(), AnalysisError> {
        if matches!(target, Stage::Analysis | Stage::Results) {
            return Err(TransitionError::Illegal {
                from: self.stage(),
                to: target,
                reason: "start an analysis run to enter this stage".to_string(),
            }
            .into());
        }
        self.check_leaving(target)?;
        let before = self.machine.clone();
        self.machine.go_to(target)?;
        if let Err(e) = self.patch(&SessionPatch::enter(target)).await {
            self.machine = before;
            return Err(e);
        }
        Ok(())
    }

    /// Fields snapshotted at `stage` are fixed once the session moves on.
    fn require_stage(&self, stage: Stage, what: &str) -> Result<(), AnalysisError> {
        let current = self.stage();
        if current == stage {
            return Ok(());
        }
        Err(AnalysisError::Precondition {
            stage: current,
            reason: format!("{what} can only be changed during {}", stage.label()),
        })
    }

    fn check_leaving(&self, target: Stage) -> Result<(), AnalysisError> {
        let stage = self.stage();
        let reason = match target {
            Stage::MetadataReview if !self.session.has_documents() => {
                "the financial statements have not been uploaded"
            }
            Stage::ContextPreview
                if stage == Stage::StandardsSelection
                    && self.session.selected_standards.is_empty() =>
            {
                "no standards selection has been confirmed"
            }
            _ => return Ok(()),
        };
        Err(AnalysisError::Precondition {
            stage,
            reason: reason.to_string(),
        })
    }

    // ─── Context ────────────────────────────────────────────────────

    pub async fn preview(&self, query: &ChunkQuery) -> Result<ChunkPage, AnalysisError> {
        Ok(self.backend.list_chunks(self.session.id, query).await?)
    }

    /// Every classified chunk, across all pages.
    pub async fn all_chunks(&self) -> Result<Vec<ChunkPreviewItem>, AnalysisError> {
        let mut chunks = Vec::new();
        let mut page_no = 1;
        loop {
            let page = self
                .backend
                .list_chunks(self.session.id, &ChunkQuery::page(page_no, CHUNK_WALK_PAGE_SIZE))
                .await?;
            let more = page.has_more();
            chunks.extend(page.chunks);
            if !more {
                break;
            }
            page_no += 1;
        }
        Ok(chunks)
    }

    /// Coverage report over every chunk. Never changes the session.
    pub async fn validate_coverage(&self) -> Result<FinancialValidationResult, AnalysisError> {
        let chunks = self.all_chunks().await?;
        let report = self.validator.validate(&chunks);
        tracing::info!(
            session_id = %self.session.id,
            chunks = chunks.len(),
            confidence = report.confidence,
            is_valid = report.is_valid,
            "financial coverage validated"
        );
        Ok(report)
    }

    // ─── Analysis ───────────────────────────────────────────────────

    /// Run a full analysis; see [`AnalysisStreamCoordinator::run_analysis`].
    pub async fn analyze(
        &mut self,
        observer: &mut dyn RunObserver,
    ) -> Result<AnalysisRunReport, AnalysisError> {
        let report = self
            .coordinator
            .run_analysis(&mut self.machine, &mut self.results, observer)
            .await?;
        self.refresh_after_run().await;
        if report.failure().is_some() && self.stage() == Stage::Analysis {
            self.machine.record_run_failure();
        }
        Ok(report)
    }

    pub async fn reanalyze(
        &mut self,
        request: &ReanalyzeRequest,
    ) -> Result<ReanalysisReport, AnalysisError> {
        let report = self
            .coordinator
            .reanalyze(self.session.id, &mut self.results, request)
            .await?;
        self.refresh_after_run().await;
        Ok(report)
    }

    async fn refresh_after_run(&mut self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(
                session_id = %self.session.id,
                "keeping last known session record: {err}"
            );
        }
    }

    // ─── Review ─────────────────────────────────────────────────────

    /// Validate locally, record on the server, then append locally.
    pub async fn apply_override(
        &mut self,
        request: OverrideRequest,
    ) -> Result<&OverrideRecord, AnalysisError> {
        self.ledger.check(&self.results, &request)?;
        self.backend.apply_override(self.session.id, &request).await?;
        Ok(self.ledger.apply(&mut self.results, request)?)
    }

    pub fn summary(&self) -> ResultsSummary {
        ResultsSummary::compute(self.results.iter())
    }

    /// Filtered, paged view of the local results.
    pub fn results_page(&self, query: &ResultsQuery) -> ResultsPage {
        let mut page = query.apply(self.results.as_slice());
        page.compliance_score = Some(self.summary().compliance_score());
        page
    }

    /// Delimited-text export; `None` when there are no results.
    pub fn export(&self) -> Option<String> {
        export_csv(&self.results)
    }

    /// Write the export to `path`; `false` when there was nothing to write.
    pub fn export_to(&self, path: &Path) -> Result<bool, AnalysisError> {
        Ok(write_csv(&self.results, path)?)
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session_id", &self.session.id)
            .field("stage", &self.machine.stage())
            .field("results", &self.results.len())
            .field("overrides", &self.ledger.len())
            .finish()
    }
}
