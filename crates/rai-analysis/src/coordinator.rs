//! # Analysis Stream Coordinator
//!
//! Drives one analysis run from start request to a settled session stage.
//!
//! ## Run lifecycle
//!
//! 1. Claim the session's run slot ([`RunRegistry`]); a second start for the
//!    same session is refused with [`AnalysisError::AlreadyRunning`], as is
//!    a `409` from the server.
//! 2. Enter the analysis stage locally and open the event channel.
//! 3. Feed each fragment through the [`EventDecoder`] and apply events in
//!    order: progress (completed count never decreases), status (phase
//!    only), result (upsert by question id), then a terminal `complete` or
//!    `error`.
//! 4. Settle the stage:
//!    - `complete` → results stage / `completed`.
//!    - `error`, channel end without `complete`, channel failure, or no
//!      activity within [`StreamConfig::inactivity_timeout_secs`] → the run
//!      is marked failed, the stage reverts to context preview through the
//!      retry edge, and every result already received is kept.
//!
//! After settling, the local machine is resynced from the server record. If
//! the settling update itself fails, the report is still returned and its
//! `final_stage` is whatever the machine holds after a best-effort resync.
//!
//! Dropping the coordinator mid-run does not stop the server; the next
//! session load reconciles whatever state the server reached.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rai_client::{ClientError, ComplianceBackend, EventChannel};
use rai_compliance::{ResultsCollection, ResultsSummary, UpsertOutcome};
use rai_core::{
    AnalysisProgress, CompletePayload, ComplianceResultItem, QuestionId, ReanalyzeRequest,
    SessionId, SessionPatch, Stage, StatusPayload, StreamEvent,
};
use rai_state::SessionMachine;

use crate::decoder::EventDecoder;
use crate::error::{AnalysisError, RunFailure};
use crate::registry::{RunGuard, RunRegistry};

// ─── Configuration ──────────────────────────────────────────────────

fn default_inactivity_timeout_secs() -> u64 {
    120
}

/// Stream handling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Seconds without any fragment before the run is treated as failed.
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
        }
    }
}

impl StreamConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

// ─── Observer ───────────────────────────────────────────────────────

/// Live view of a run as events are applied.
pub trait RunObserver: Send {
    fn on_progress(&mut self, _progress: &AnalysisProgress) {}
    fn on_status(&mut self, _status: &StatusPayload) {}
    fn on_result(&mut self, _result: &ComplianceResultItem, _outcome: UpsertOutcome) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

// ─── Reports ────────────────────────────────────────────────────────

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(CompletePayload),
    Failed(RunFailure),
}

/// Summary of one analysis run after the stage has settled.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRunReport {
    pub session_id: SessionId,
    pub outcome: RunOutcome,
    /// Last applied progress, with the completed count clamped to its
    /// running maximum.
    pub progress: AnalysisProgress,
    /// `result` events applied, counting replays.
    pub results_received: u32,
    /// Results that replaced an existing entry.
    pub results_replaced: u32,
    /// Malformed lines skipped.
    pub dropped_lines: u32,
    /// Size of the results collection when the run settled.
    pub results_held: usize,
    /// Stage after settling.
    pub final_stage: Stage,
}

impl AnalysisRunReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed(_))
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match &self.outcome {
            RunOutcome::Failed(f) => Some(f),
            RunOutcome::Completed(_) => None,
        }
    }
}

/// Outcome of a scoped re-analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReanalysisReport {
    pub requested: u32,
    pub replaced: u32,
    pub inserted: u32,
    /// Returned items that were not requested and were discarded.
    pub ignored: u32,
    /// Score over the whole collection afterwards.
    pub compliance_score: u32,
}

// ─── Coordinator ────────────────────────────────────────────────────

/// Runs analyses for sessions against a backend.
#[derive(Clone)]
pub struct AnalysisStreamCoordinator {
    backend: Arc<dyn ComplianceBackend>,
    registry: RunRegistry,
    config: StreamConfig,
}

impl std::fmt::Debug for AnalysisStreamCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisStreamCoordinator")
            .field("active_runs", &self.registry.active_count())
            .field("config", &self.config)
            .finish()
    }
}

impl AnalysisStreamCoordinator {
    pub fn new(backend: Arc<dyn ComplianceBackend>, config: StreamConfig) -> Self {
        Self::with_registry(backend, RunRegistry::new(), config)
    }

    /// Share a run registry with other coordinators of the same process.
    pub fn with_registry(
        backend: Arc<dyn ComplianceBackend>,
        registry: RunRegistry,
        config: StreamConfig,
    ) -> Self {
        Self {
            backend,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    fn acquire(&self, session_id: SessionId) -> Result<RunGuard, AnalysisError> {
        self.registry
            .try_acquire(session_id)
            .ok_or(AnalysisError::AlreadyRunning(session_id))
    }

    /// Run a full analysis and settle the session stage.
    ///
    /// Allowed from context preview, from the analysis stage itself, and as
    /// an explicit re-run from results. `results` keeps everything it held
    /// before the run; streamed results are upserted into it.
    pub async fn run_analysis(
        &self,
        machine: &mut SessionMachine,
        results: &mut ResultsCollection,
        observer: &mut dyn RunObserver,
    ) -> Result<AnalysisRunReport, AnalysisError> {
        let session_id = machine.session_id();
        let _guard = self.acquire(session_id)?;

        match machine.stage() {
            Stage::Analysis => {}
            Stage::Results => {
                let session = self
                    .backend
                    .patch_session(session_id, &SessionPatch::enter(Stage::Analysis))
                    .await?;
                machine.sync_from_session(&session);
            }
            _ => machine.go_to(Stage::Analysis)?,
        }

        let channel = match self.backend.start_analysis(session_id).await {
            Ok(channel) => channel,
            Err(err) => {
                self.resync(machine).await;
                return Err(match err {
                    ClientError::Conflict { .. } => AnalysisError::AlreadyRunning(session_id),
                    other => AnalysisError::Client(other),
                });
            }
        };
        tracing::info!(session_id = %session_id, "analysis run started");

        let mut run = RunState::new(results, observer);
        let outcome = run.consume(channel, &self.config).await;
        let report_counts = (
            run.progress.clone(),
            run.received,
            run.replaced,
            run.dropped_lines,
        );
        let results_held = results.len();

        match &outcome {
            RunOutcome::Completed(payload) => {
                tracing::info!(
                    session_id = %session_id,
                    total = payload.total,
                    results = results_held,
                    "analysis run completed"
                );
                if machine.can_go_to(Stage::Results) {
                    machine.go_to(Stage::Results)?;
                }
                self.settle(machine, Stage::Results).await;
            }
            RunOutcome::Failed(failure) => {
                tracing::warn!(
                    session_id = %session_id,
                    results_kept = results_held,
                    "analysis run failed: {failure}"
                );
                machine.record_run_failure();
                if machine.stage() == Stage::Analysis {
                    machine.go_to(Stage::ContextPreview)?;
                }
                self.settle(machine, Stage::ContextPreview).await;
                if machine.stage() == Stage::Analysis {
                    machine.record_run_failure();
                }
            }
        }

        let (progress, results_received, results_replaced, dropped_lines) = report_counts;
        Ok(AnalysisRunReport {
            session_id,
            outcome,
            progress,
            results_received,
            results_replaced,
            dropped_lines,
            results_held,
            final_stage: machine.stage(),
        })
    }

    /// Replace the results of exactly the requested questions.
    ///
    /// Returned items for other questions are discarded. Shares the run
    /// slot with full analyses.
    pub async fn reanalyze(
        &self,
        session_id: SessionId,
        results: &mut ResultsCollection,
        request: &ReanalyzeRequest,
    ) -> Result<ReanalysisReport, AnalysisError> {
        let _guard = self.acquire(session_id)?;
        let response = match self.backend.reanalyze(session_id, request).await {
            Ok(response) => response,
            Err(ClientError::Conflict { .. }) => {
                return Err(AnalysisError::AlreadyRunning(session_id))
            }
            Err(other) => return Err(other.into()),
        };

        let wanted: HashSet<&QuestionId> = request.question_ids.iter().collect();
        let mut report = ReanalysisReport {
            requested: u32::try_from(wanted.len()).unwrap_or(u32::MAX),
            replaced: 0,
            inserted: 0,
            ignored: 0,
            compliance_score: 0,
        };
        for item in response.results {
            if !wanted.contains(&item.question_id) {
                tracing::warn!(
                    session_id = %session_id,
                    question_id = %item.question_id,
                    "re-analysis returned an unrequested question; ignoring"
                );
                report.ignored += 1;
                continue;
            }
            match results.upsert(item) {
                UpsertOutcome::Replaced => report.replaced += 1,
                UpsertOutcome::Inserted => report.inserted += 1,
            }
        }
        report.compliance_score = ResultsSummary::compute(results.iter()).compliance_score();
        tracing::info!(
            session_id = %session_id,
            requested = report.requested,
            replaced = report.replaced,
            "re-analysis applied"
        );
        Ok(report)
    }

    /// Record the settled stage on the server. A failed patch never
    /// discards the run: the machine is resynced from whatever the server
    /// holds, or left at the local stage if the server is unreachable.
    async fn settle(&self, machine: &mut SessionMachine, stage: Stage) {
        let patch = SessionPatch::enter(stage);
        match self.backend.patch_session(machine.session_id(), &patch).await {
            Ok(session) => machine.sync_from_session(&session),
            Err(err) => {
                tracing::warn!(
                    session_id = %machine.session_id(),
                    stage = stage.index(),
                    "could not record settled stage: {err}"
                );
                self.resync(machine).await;
            }
        }
    }

    async fn resync(&self, machine: &mut SessionMachine) {
        match self.backend.get_session(machine.session_id()).await {
            Ok(session) => machine.sync_from_session(&session),
            Err(err) => tracing::warn!(
                session_id = %machine.session_id(),
                "could not resync session from server: {err}"
            ),
        }
    }
}

// ─── Run State ──────────────────────────────────────────────────────

struct RunState<'a> {
    results: &'a mut ResultsCollection,
    observer: &'a mut dyn RunObserver,
    decoder: EventDecoder,
    progress: AnalysisProgress,
    received: u32,
    replaced: u32,
    dropped_lines: u32,
}

impl<'a> RunState<'a> {
    fn new(results: &'a mut ResultsCollection, observer: &'a mut dyn RunObserver) -> Self {
        Self {
            results,
            observer,
            decoder: EventDecoder::new(),
            progress: AnalysisProgress::default(),
            received: 0,
            replaced: 0,
            dropped_lines: 0,
        }
    }

    async fn consume(
        &mut self,
        mut channel: Box<dyn EventChannel>,
        config: &StreamConfig,
    ) -> RunOutcome {
        let window = config.inactivity_timeout();
        let outcome = loop {
            let fragment = match tokio::time::timeout(window, channel.next_fragment()).await {
                Err(_) => {
                    break RunOutcome::Failed(RunFailure::Inactivity {
                        secs: config.inactivity_timeout_secs,
                    })
                }
                Ok(Err(err)) => break RunOutcome::Failed(RunFailure::Transport(err.to_string())),
                Ok(Ok(None)) => {
                    let tail = self.decoder.finish();
                    if let Some(outcome) = tail.and_then(|event| self.apply(event)) {
                        break outcome;
                    }
                    break RunOutcome::Failed(RunFailure::ClosedBeforeComplete);
                }
                Ok(Ok(Some(fragment))) => fragment,
            };
            let events = self.decoder.push(&fragment);
            if let Some(outcome) = events.into_iter().find_map(|event| self.apply(event)) {
                break outcome;
            }
        };
        self.dropped_lines = u32::try_from(self.decoder.dropped().len()).unwrap_or(u32::MAX);
        outcome
    }

    /// Apply one event; a terminal event yields the run outcome.
    fn apply(&mut self, event: StreamEvent) -> Option<RunOutcome> {
        match event {
            StreamEvent::Progress(mut progress) => {
                let high = self.progress.completed_questions;
                if progress.completed_questions < high {
                    tracing::warn!(
                        reported = progress.completed_questions,
                        high_water = high,
                        "progress went backwards; keeping high-water mark"
                    );
                    progress.completed_questions = high;
                    progress.percentage = progress.computed_percentage();
                }
                self.progress = progress;
                self.observer.on_progress(&self.progress);
                None
            }
            StreamEvent::Status(status) => {
                tracing::debug!(status = %status.status, "analysis status");
                self.progress.phase = status.status.clone();
                self.observer.on_status(&status);
                None
            }
            StreamEvent::Result(item) => {
                self.upsert(item);
                None
            }
            StreamEvent::Complete(mut payload) => {
                for item in std::mem::take(&mut payload.results) {
                    self.upsert(item);
                }
                Some(RunOutcome::Completed(payload))
            }
            StreamEvent::Error(err) => Some(RunOutcome::Failed(RunFailure::ServerError {
                message: err.message,
            })),
        }
    }

    fn upsert(&mut self, item: ComplianceResultItem) {
        self.received += 1;
        let outcome = self.results.upsert(item.clone());
        if outcome == UpsertOutcome::Replaced {
            self.replaced += 1;
            tracing::debug!(question_id = %item.question_id, "result replayed; replaced in place");
        }
        self.observer.on_result(&item, outcome);
    }
}
