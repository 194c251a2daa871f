use chrono::{DateTime, Utc};
use egp_protocol::duration::DurationError;
use egp_protocol::objects::{ContentId, ObjectKind, RelationshipType};
use egp_protocol::validate::ValidationError;
use thiserror::Error;

use crate::cancel::Cancelled;

/// Seconds a caller is told to wait before retrying after a storage failure.
pub const RETRY_AFTER_SECS: u64 = 30;

/// Failures reported by an object store collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("object {0} not found")]
    NotFound(ContentId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store returned an unexpected response: {0}")]
    Protocol(String),
}

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{uri} could not be resolved: {reason}")]
    ReferenceNotFound { uri: String, reason: String },
    #[error("{uri} expired at {expired_at}")]
    ReferenceExpired {
        uri: String,
        expired_at: DateTime<Utc>,
    },
    #[error("\"{field}\" is not a usable duration: {source}")]
    InvalidDuration {
        field: &'static str,
        #[source]
        source: DurationError,
    },
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        message: String,
        retry_after_secs: u64,
    },
    #[error("{kind} {id} was stored but its {failed} edge was not: {reason}")]
    PartialLinkFailure {
        id: ContentId,
        kind: ObjectKind,
        /// Edges persisted before the failure.
        linked: Vec<ContentId>,
        failed: &'static str,
        reason: String,
    },
    #[error("operation cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn storage(err: StoreError) -> Self {
        EngineError::StorageUnavailable {
            message: err.to_string(),
            retry_after_secs: RETRY_AFTER_SECS,
        }
    }

    pub fn invalid_duration(field: &'static str) -> impl FnOnce(DurationError) -> Self {
        move |source| EngineError::InvalidDuration { field, source }
    }

    pub(crate) fn partial(
        id: &ContentId,
        kind: ObjectKind,
        linked: Vec<ContentId>,
        failed: RelationshipType,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::PartialLinkFailure {
            id: id.clone(),
            kind,
            linked,
            failed: failed.as_str(),
            reason: reason.into(),
        }
    }

    /// Whether repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StorageUnavailable { .. })
    }
}

impl From<Cancelled> for EngineError {
    fn from(_: Cancelled) -> Self {
        EngineError::Cancelled
    }
}
