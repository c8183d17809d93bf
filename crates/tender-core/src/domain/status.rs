// ============================================================================
// Tender Core - Lifecycle Status
// File: crates/tender-core/src/domain/status.rs
// Description: Status state machines for tenders and bids
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Entity families that carry versioned content and a lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Tender,
    Bid,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Tender => "tender",
            EntityKind::Bid => "bid",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status enum with a transition table.
pub trait LifecycleStatus: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    const KIND: EntityKind;

    fn as_str(&self) -> &'static str;

    fn can_transition_to(&self, target: Self) -> bool;

    fn is_terminal(&self) -> bool;
}

/// Validates `current -> target` against the status table of `S`.
pub fn transition<S: LifecycleStatus>(current: S, target: S) -> Result<S, DomainError> {
    if current.can_transition_to(target) {
        Ok(target)
    } else {
        Err(DomainError::invalid_transition(current, target))
    }
}

/// Tender lifecycle: CREATED -> PUBLISHED -> CLOSED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenderStatus {
    Created,
    Published,
    Closed,
}

impl TenderStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(TenderStatus::Created),
            "PUBLISHED" => Some(TenderStatus::Published),
            "CLOSED" => Some(TenderStatus::Closed),
            _ => None,
        }
    }
}

impl Default for TenderStatus {
    fn default() -> Self {
        TenderStatus::Created
    }
}

impl LifecycleStatus for TenderStatus {
    const KIND: EntityKind = EntityKind::Tender;

    fn as_str(&self) -> &'static str {
        match self {
            TenderStatus::Created => "CREATED",
            TenderStatus::Published => "PUBLISHED",
            TenderStatus::Closed => "CLOSED",
        }
    }

    fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (TenderStatus::Created, TenderStatus::Published)
                | (TenderStatus::Published, TenderStatus::Closed)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, TenderStatus::Closed)
    }
}

/// Bid lifecycle: CREATED -> APPROVED | REJECTED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    Created,
    Approved,
    Rejected,
}

impl BidStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(BidStatus::Created),
            "APPROVED" => Some(BidStatus::Approved),
            "REJECTED" => Some(BidStatus::Rejected),
            _ => None,
        }
    }
}

impl Default for BidStatus {
    fn default() -> Self {
        BidStatus::Created
    }
}

impl LifecycleStatus for BidStatus {
    const KIND: EntityKind = EntityKind::Bid;

    fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Created => "CREATED",
            BidStatus::Approved => "APPROVED",
            BidStatus::Rejected => "REJECTED",
        }
    }

    fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (BidStatus::Created, BidStatus::Approved) | (BidStatus::Created, BidStatus::Rejected)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, BidStatus::Approved | BidStatus::Rejected)
    }
}
