//! # Session Stage Machine
//!
//! ## Stages
//!
//! ```text
//! Upload ─▶ MetadataReview ─▶ FrameworkSelection ─▶ StandardsSelection ─▶ ContextPreview ─▶ Analysis ─▶ Results
//!                                                                               ▲               │
//!                                                                               └── retry ──────┘
//!                                                                             (only after a failed run)
//! ```
//!
//! Forward moves go exactly one stage at a time. The single backward edge,
//! Analysis → ContextPreview, opens only once the current run has failed.
//! No stage is final: a completed session re-enters analysis through an
//! explicit re-run, which the server records as a fresh stage change.
//!
//! Illegal transitions return a [`TransitionError`] carrying a readable
//! reason and leave the machine untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rai_core::{Session, SessionId, SessionStatus, Stage, Timestamp};

// ─── Errors ──────────────────────────────────────────────────────────

/// A rejected stage change. Never mutates the machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The target is not reachable from the current stage.
    #[error("cannot move from {from} to {to}: {reason}")]
    Illegal {
        /// Current stage.
        from: Stage,
        /// Requested stage.
        to: Stage,
        /// What must happen first.
        reason: String,
    },

    /// The requested stage number is outside 1..=7.
    #[error("unknown pipeline stage {0}; stages run from 1 to 7")]
    UnknownStage(u8),
}

// ─── Transition Record ───────────────────────────────────────────────

/// One local stage change, explicit or synced from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransitionRecord {
    pub from: Stage,
    pub to: Stage,
    pub timestamp: Timestamp,
    pub reason: String,
}

// ─── Machine ─────────────────────────────────────────────────────────

/// Local mirror of a session's pipeline position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMachine {
    session_id: SessionId,
    stage: Stage,
    status: SessionStatus,
    selected_standards: Vec<String>,
    last_run_failed: bool,
    transitions: Vec<StageTransitionRecord>,
}

impl SessionMachine {
    /// Mirror a freshly fetched session.
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id,
            stage: session.current_stage,
            status: session.status,
            selected_standards: session.selected_standards.clone(),
            last_run_failed: session.status == SessionStatus::Failed,
            transitions: Vec::new(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Section keys selected on the server at the last sync.
    pub fn selected_standards(&self) -> &[String] {
        &self.selected_standards
    }

    /// Whether the most recent analysis run failed.
    pub fn last_run_failed(&self) -> bool {
        self.last_run_failed
    }

    /// Ordered log of local stage changes.
    pub fn transitions(&self) -> &[StageTransitionRecord] {
        &self.transitions
    }

    /// Whether `target` is reachable in one move from the current stage.
    pub fn can_go_to(&self, target: Stage) -> bool {
        self.check(target).is_ok()
    }

    /// Stages reachable in one move.
    pub fn allowed_targets(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|s| self.can_go_to(*s))
            .collect()
    }

    /// Move to `target`, or explain why that is not possible.
    pub fn go_to(&mut self, target: Stage) -> Result<(), TransitionError> {
        self.check(target)?;
        let reason = if self.is_retry_edge(target) {
            "retry after failed analysis"
        } else {
            "advance"
        };
        self.do_transition(target, reason);
        if target == Stage::Analysis {
            self.last_run_failed = false;
        }
        Ok(())
    }

    /// [`go_to`](Self::go_to) by stage number.
    pub fn go_to_index(&mut self, target: u8) -> Result<(), TransitionError> {
        let stage = Stage::from_index(target).map_err(|_| TransitionError::UnknownStage(target))?;
        self.go_to(stage)
    }

    /// Mark the current analysis run as failed, opening the retry edge.
    pub fn record_run_failure(&mut self) {
        tracing::warn!(
            session_id = %self.session_id,
            stage = self.stage.index(),
            "analysis run failed; retry edge open"
        );
        self.last_run_failed = true;
        self.status = SessionStatus::Failed;
    }

    /// Overwrite the local cursor from the authoritative server record.
    pub fn sync_from_session(&mut self, session: &Session) {
        if session.current_stage != self.stage {
            tracing::debug!(
                session_id = %session.id,
                from = self.stage.index(),
                to = session.current_stage.index(),
                "stage changed on server"
            );
            self.transitions.push(StageTransitionRecord {
                from: self.stage,
                to: session.current_stage,
                timestamp: Timestamp::now(),
                reason: "synced from server".to_string(),
            });
        }
        self.session_id = session.id;
        self.stage = session.current_stage;
        self.status = session.status;
        self.selected_standards = session.selected_standards.clone();
        self.last_run_failed = session.status == SessionStatus::Failed;
    }

    fn is_retry_edge(&self, target: Stage) -> bool {
        self.stage == Stage::Analysis && target == Stage::ContextPreview
    }

    fn check(&self, target: Stage) -> Result<(), TransitionError> {
        let from = self.stage;
        if self.is_retry_edge(target) {
            if self.last_run_failed {
                return Ok(());
            }
            return Err(self.illegal(
                target,
                "context preview can only be re-entered after a failed analysis run".to_string(),
            ));
        }
        if target == from {
            return Err(self.illegal(target, format!("session is already at {}", from.label())));
        }
        if target < from {
            return Err(self.illegal(
                target,
                "stages only move forward except to retry a failed analysis".to_string(),
            ));
        }
        if Some(target) == from.next() {
            return Ok(());
        }
        let skipped: Vec<&str> = Stage::ALL
            .into_iter()
            .filter(|s| *s > from && *s < target)
            .map(Stage::label)
            .collect();
        Err(self.illegal(
            target,
            format!("{} {} required first", join_labels(&skipped), verb(skipped.len())),
        ))
    }

    fn illegal(&self, to: Stage, reason: String) -> TransitionError {
        TransitionError::Illegal {
            from: self.stage,
            to,
            reason,
        }
    }

    fn do_transition(&mut self, to: Stage, reason: &str) {
        self.transitions.push(StageTransitionRecord {
            from: self.stage,
            to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.stage = to;
        self.status = to.entry_status();
    }
}

fn join_labels(labels: &[&str]) -> String {
    match labels {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

fn verb(n: usize) -> &'static str {
    if n == 1 {
        "is"
    } else {
        "are"
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
