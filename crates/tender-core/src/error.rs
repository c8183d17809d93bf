//! Domain errors

use thiserror::Error;
use tender_shared::EntityId;

use crate::domain::{EntityKind, LifecycleStatus};

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Tender not found: {0}")]
    TenderNotFound(EntityId),

    #[error("Bid not found: {0}")]
    BidNotFound(EntityId),

    #[error("Version {number} of {kind} {parent_id} not found")]
    VersionNotFound {
        kind: EntityKind,
        parent_id: EntityId,
        number: i32,
    },

    #[error("No versions recorded for {kind} {parent_id}")]
    NoVersionsFound { kind: EntityKind, parent_id: EntityId },

    #[error("User {user_id} is not responsible for organization {organization_id}")]
    Unauthorized {
        user_id: EntityId,
        organization_id: EntityId,
    },

    #[error("Invalid {kind} status transition: {from} -> {to}")]
    InvalidStatusTransition {
        kind: EntityKind,
        from: &'static str,
        to: &'static str,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("User {user_id} already approved bid {bid_id}")]
    AlreadyVoted { bid_id: EntityId, user_id: EntityId },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Operation {operation} exceeded its deadline of {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Coarse classification the request layer maps onto its own responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidStatusTransition,
    InvalidInput,
    Conflict,
    Unavailable,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::TenderNotFound(_)
            | DomainError::BidNotFound(_)
            | DomainError::VersionNotFound { .. }
            | DomainError::NoVersionsFound { .. } => ErrorKind::NotFound,
            DomainError::Unauthorized { .. } => ErrorKind::Unauthorized,
            DomainError::InvalidStatusTransition { .. } => ErrorKind::InvalidStatusTransition,
            DomainError::ValidationError(_) => ErrorKind::InvalidInput,
            DomainError::ConcurrentModification(_) | DomainError::AlreadyVoted { .. } => {
                ErrorKind::Conflict
            }
            DomainError::StoreUnavailable(_)
            | DomainError::Timeout { .. }
            | DomainError::InternalError(_) => ErrorKind::Unavailable,
        }
    }

    /// Only lost optimistic-concurrency races are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::ConcurrentModification(_))
    }

    pub fn not_found(kind: EntityKind, id: EntityId) -> Self {
        match kind {
            EntityKind::Tender => DomainError::TenderNotFound(id),
            EntityKind::Bid => DomainError::BidNotFound(id),
        }
    }

    pub fn invalid_transition<S: LifecycleStatus>(from: S, to: S) -> Self {
        DomainError::InvalidStatusTransition {
            kind: S::KIND,
            from: from.as_str(),
            to: to.as_str(),
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(errors.to_string())
    }
}
