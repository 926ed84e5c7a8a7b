//! # rai-cli — Compliance Session Command Line
//!
//! The `rai` binary drives one compliance session at a time through the
//! HTTP API. Every subcommand loads the session fresh from the server, so
//! consecutive invocations behave like one long-running controller.
//!
//! ## Subcommands
//!
//! - `rai standards`: list, search or reload the standards catalog.
//! - `rai session create|show|delete`: session lifecycle.
//! - `rai upload`, `rai advance`, `rai select`: the pipeline up to the
//!   context preview.
//! - `rai preview`, `rai validate`: chunk listing and coverage check.
//! - `rai analyze`, `rai reanalyze`: analysis runs.
//! - `rai override`, `rai results`, `rai export`: review.
//!
//! ```bash
//! rai session create --client "Acme Holdings"
//! rai upload <SESSION> --statements fs.pdf --notes notes.pdf
//! rai select <SESSION> IAS_1 IAS_2 IAS_7
//! rai analyze <SESSION>
//! rai export <SESSION> --out results.csv
//! ```

pub mod analysis;
pub mod config;
pub mod pipeline;
pub mod review;
pub mod session;
pub mod standards;

use std::sync::Arc;

use anyhow::Result;

use rai_analysis::{AnalysisStreamCoordinator, SessionController};
use rai_client::{ComplianceBackend, HttpBackend};
use rai_compliance::FinancialCoverageValidator;
use rai_core::SessionId;

use crate::config::CliConfig;

/// Configuration plus the backend every subcommand talks to.
pub struct CliContext {
    config: CliConfig,
    backend: Arc<dyn ComplianceBackend>,
}

impl CliContext {
    /// Connect to the HTTP API described by `config`.
    pub fn connect(config: CliConfig) -> Result<Self> {
        let backend = HttpBackend::new(config.api.clone())?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    pub fn with_backend(config: CliConfig, backend: Arc<dyn ComplianceBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn ComplianceBackend {
        self.backend.as_ref()
    }

    /// Load a session with its results and override history.
    pub async fn controller(&self, session_id: SessionId) -> Result<SessionController> {
        let coordinator =
            AnalysisStreamCoordinator::new(Arc::clone(&self.backend), self.config.stream.clone());
        let validator = FinancialCoverageValidator::new(self.config.coverage.clone())?;
        Ok(SessionController::load(coordinator, validator, Arc::clone(&self.backend), session_id).await?)
    }
}

impl std::fmt::Debug for CliContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
