//! Errors raised while coordinating a session.

use thiserror::Error;

use rai_catalog::SelectionError;
use rai_client::{ClientError, UploadError};
use rai_compliance::{ExportError, OverrideError};
use rai_core::{SessionId, Stage};
use rai_state::TransitionError;

/// A session operation that could not be carried out.
///
/// A failed analysis *run* is not an error: it is reported inside
/// [`AnalysisRunReport`](crate::AnalysisRunReport) after recovery.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Another run holds the session's run slot, here or on the server.
    #[error("an analysis run is already active for session {0}")]
    AlreadyRunning(SessionId),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A stage's own requirement is unmet.
    #[error("cannot leave {stage}: {reason}")]
    Precondition { stage: Stage, reason: String },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Override(#[from] OverrideError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<UploadError> for AnalysisError {
    fn from(err: UploadError) -> Self {
        Self::Client(ClientError::Upload(err))
    }
}

/// Why an analysis run ended without `complete`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// The server sent an `error` event.
    #[error("analysis failed on the server: {message}")]
    ServerError { message: String },

    /// The channel ended before a `complete` event.
    #[error("event channel closed before the run completed")]
    ClosedBeforeComplete,

    /// Reading the channel failed.
    #[error("event channel failed: {0}")]
    Transport(String),

    /// Nothing arrived within the inactivity window.
    #[error("no stream activity for {secs}s")]
    Inactivity { secs: u64 },
}
