use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CandidateId, RouteVariant, SessionPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    OracleUnavailable,
    EmptyPlan,
    UnknownCandidate,
    InvalidTransition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

/// Every failure is recoverable: the session is either left untouched or
/// returned to Planning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("no route generated: {variant} request failed: {reason}")]
    Oracle {
        variant: RouteVariant,
        reason: String,
    },
    #[error("could not generate route")]
    EmptyPlan,
    #[error("route candidate {0} is not among the alternatives")]
    UnknownCandidate(CandidateId),
    #[error("{operation} is not valid while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: SessionPhase,
    },
}

impl NavigationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            NavigationError::Oracle { .. } => ErrorCode::OracleUnavailable,
            NavigationError::EmptyPlan => ErrorCode::EmptyPlan,
            NavigationError::UnknownCandidate(_) => ErrorCode::UnknownCandidate,
            NavigationError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
        }
    }
}

impl From<NavigationError> for ApiError {
    fn from(value: NavigationError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
