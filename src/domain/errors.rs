//! Domain errors for the debate engine.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::{ActionKind, DebatePhase};

/// Errors surfaced by the debate engine.
///
/// `PhaseViolation` is rejected before any side effect; the transient/hard
/// oracle split follows the invocation controller contract: transient
/// failures were already retried inside the client before escalating here.
#[derive(Debug, Error)]
pub enum DebateError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Action {action:?} is not valid in phase {phase:?}: {reason}")]
    PhaseViolation { action: ActionKind, phase: DebatePhase, reason: String },

    #[error("Oracle transient failure after retries: {0}")]
    OracleTransientFailure(String),

    #[error("Oracle hard failure: {0}")]
    OracleHardFailure(String),

    #[error("Output validation failed: {0}")]
    ValidationFailure(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DebateResult<T> = Result<T, DebateError>;

impl DebateError {
    pub fn phase_violation(
        action: ActionKind,
        phase: DebatePhase,
        reason: impl Into<String>,
    ) -> Self {
        Self::PhaseViolation { action, phase, reason: reason.into() }
    }
}

impl From<sqlx::Error> for DebateError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreError(err.to_string())
    }
}

impl From<serde_json::Error> for DebateError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
