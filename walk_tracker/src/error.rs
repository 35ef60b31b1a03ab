use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walk_tracker_lib::walk::WalkPayload;

use crate::session::{Action, SessionState};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("location permission was denied")]
    PermissionDenied,
    #[error("timed out waiting for a location fix")]
    Timeout,
    #[error("{0}")]
    Unavailable(String),
}

/// Opaque failure reported by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct PersistenceError(pub String);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("location unavailable: {0}")]
    LocationUnavailable(#[from] LocationError),

    #[error("cannot {action} a walk that is {state}")]
    InvalidStateTransition { state: SessionState, action: Action },

    #[error("walk was already finalized")]
    AlreadyFinalized,

    /// The payload is returned so the caller can hand it off again.
    #[error("failed to save walk: {source}")]
    Persistence {
        source: PersistenceError,
        payload: Arc<WalkPayload>,
    },

    #[error("a pet must be selected before a walk can start")]
    InvalidPetId,

    #[error("walk was stopped before the first location fix arrived")]
    StartCancelled,

    #[error("walk has no recorded locations")]
    EmptySession,

    #[error("walk tracker has shut down")]
    TrackerClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LocationUnavailable,
    InvalidStateTransition,
    AlreadyFinalized,
    Persistence,
    InvalidPetId,
    StartCancelled,
    EmptySession,
    TrackerClosed,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::LocationUnavailable(_) => ErrorKind::LocationUnavailable,
            SessionError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            SessionError::AlreadyFinalized => ErrorKind::AlreadyFinalized,
            SessionError::Persistence { .. } => ErrorKind::Persistence,
            SessionError::InvalidPetId => ErrorKind::InvalidPetId,
            SessionError::StartCancelled => ErrorKind::StartCancelled,
            SessionError::EmptySession => ErrorKind::EmptySession,
            SessionError::TrackerClosed => ErrorKind::TrackerClosed,
        }
    }
}
