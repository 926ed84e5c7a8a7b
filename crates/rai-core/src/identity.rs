//! # Identifiers
//!
//! Newtype wrappers for the identifiers the engine passes around, so a
//! session id can never be handed to something expecting a question id.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RaiError;
use crate::temporal::Timestamp;

/// Server-assigned identifier of a compliance session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new random session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = RaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| RaiError::Validation(format!("invalid session id {s:?}: {e}")))
    }
}

/// Identifier of a single compliance question (e.g. `IAS_1_q12`).
///
/// Unique within a session's results; the results collection is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Wrap a question identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for QuestionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for QuestionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Generate a human-readable session code: `RAI-{PREFIX}-{MMDDYYYY}-{SHORT}`.
///
/// PREFIX is the first five characters of the client name, upper-cased, with
/// spaces removed; SHORT is four random upper-case hex digits.
pub fn generate_session_code(client_name: &str) -> String {
    let short = Uuid::new_v4().simple().to_string();
    session_code(client_name, Timestamp::now(), &short[..4])
}

/// Deterministic form of [`generate_session_code`].
pub fn session_code(client_name: &str, at: Timestamp, short: &str) -> String {
    let prefix: String = client_name
        .chars()
        .take(5)
        .collect::<String>()
        .to_uppercase()
        .replace(' ', "");
    let date = at.as_datetime().format("%m%d%Y");
    format!("RAI-{prefix}-{date}-{}", short.to_uppercase())
}
