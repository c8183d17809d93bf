//! Bid domain entity and approval decisions

use serde::{Deserialize, Serialize};
use tender_shared::{types::now, EntityId, Timestamp};
use validator::Validate;

use super::status::{transition, BidStatus, LifecycleStatus};
use super::version::{Version, VersionContent};
use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: EntityId,
    pub tender_id: EntityId,
    pub organization_id: EntityId,
    pub creator_id: EntityId,
    pub status: BidStatus,
    pub approval_count: u32,
    /// Optimistic concurrency token, bumped by every committed decision.
    pub revision: i64,
    pub created_at: Timestamp,
}

impl Bid {
    /// Terminal bids accept no further votes.
    pub fn ensure_open(&self, target: BidStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(self.status, target));
        }
        Ok(())
    }

    /// Records one more approval. The bid becomes `APPROVED` once the count
    /// reaches `quorum`, which also closes the parent tender.
    pub fn approve(&self, approver_id: EntityId, quorum: usize) -> Result<BidDecision, DomainError> {
        self.ensure_open(BidStatus::Approved)?;

        let approval_count = self.approval_count + 1;
        let reached = approval_count as usize >= quorum;
        let status = if reached {
            transition(self.status, BidStatus::Approved)?
        } else {
            self.status
        };

        Ok(BidDecision {
            bid_id: self.id,
            expected_revision: self.revision,
            approval_count,
            status,
            vote: BidVote::new(self.id, approver_id, VoteDecision::Approve),
            close_tender: reached.then_some(self.tender_id),
            quorum_basis: None,
        })
    }

    /// A single rejection is final regardless of the approvals so far.
    pub fn reject(&self, rejecter_id: EntityId) -> Result<BidDecision, DomainError> {
        self.ensure_open(BidStatus::Rejected)?;
        let status = transition(self.status, BidStatus::Rejected)?;

        Ok(BidDecision {
            bid_id: self.id,
            expected_revision: self.revision,
            approval_count: self.approval_count,
            status,
            vote: BidVote::new(self.id, rejecter_id, VoteDecision::Reject),
            close_tender: None,
            quorum_basis: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteDecision {
    Approve,
    Reject,
}

impl VoteDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDecision::Approve => "APPROVE",
            VoteDecision::Reject => "REJECT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "APPROVE" => Some(VoteDecision::Approve),
            "REJECT" => Some(VoteDecision::Reject),
            _ => None,
        }
    }
}

/// Audit record of one responsible user's decision on a bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidVote {
    pub bid_id: EntityId,
    pub user_id: EntityId,
    pub decision: VoteDecision,
    pub decided_at: Timestamp,
}

impl BidVote {
    pub fn new(bid_id: EntityId, user_id: EntityId, decision: VoteDecision) -> Self {
        Self {
            bid_id,
            user_id,
            decision,
            decided_at: now(),
        }
    }
}

/// Everything a single approve/reject writes. Stores commit it atomically and
/// only while the bid is still at `expected_revision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidDecision {
    pub bid_id: EntityId,
    pub expected_revision: i64,
    pub approval_count: u32,
    pub status: BidStatus,
    pub vote: BidVote,
    /// Tender to close in the same write.
    pub close_tender: Option<EntityId>,
    /// Responsible users the quorum was computed from; rechecked at commit.
    pub quorum_basis: Option<QuorumBasis>,
}

impl BidDecision {
    pub fn with_quorum_basis(mut self, organization_id: EntityId, responsible_count: usize) -> Self {
        self.quorum_basis = Some(QuorumBasis {
            organization_id,
            responsible_count,
        });
        self
    }

    pub fn apply_to(&self, bid: &mut Bid) {
        bid.approval_count = self.approval_count;
        bid.status = self.status;
        bid.revision = self.expected_revision + 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumBasis {
    pub organization_id: EntityId,
    pub responsible_count: usize,
}

impl QuorumBasis {
    /// The stored responsibles still give the same quorum and still include the voter.
    pub fn holds<'a>(&self, responsibles: impl IntoIterator<Item = &'a EntityId>, voter_id: EntityId) -> bool {
        let mut count = 0;
        let mut voter_present = false;
        for user_id in responsibles {
            count += 1;
            voter_present |= *user_id == voter_id;
        }
        voter_present && count == self.responsible_count
    }
}

/// Bid row to insert; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewBid {
    pub tender_id: EntityId,
    pub organization_id: EntityId,
    pub creator_id: EntityId,
    pub status: BidStatus,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBid {
    #[validate(range(min = 1))]
    pub tender_id: EntityId,

    #[validate(range(min = 1))]
    pub organization_id: EntityId,

    #[validate(range(min = 1))]
    pub creator_id: EntityId,

    pub name: String,
    pub description: String,
}

impl CreateBid {
    pub fn into_parts(self) -> Result<(NewBid, VersionContent), DomainError> {
        self.validate()?;
        let content = VersionContent::for_bid(self.name, self.description)?;
        Ok((
            NewBid {
                tender_id: self.tender_id,
                organization_id: self.organization_id,
                creator_id: self.creator_id,
                status: BidStatus::default(),
                created_at: now(),
            },
            content,
        ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBid {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidView {
    pub id: EntityId,
    pub tender_id: EntityId,
    pub organization_id: EntityId,
    pub creator_id: EntityId,
    pub status: BidStatus,
    pub approval_count: u32,
    pub name: String,
    pub description: String,
    pub version: i32,
    pub created_at: Timestamp,
}

impl BidView {
    pub fn new(bid: Bid, version: Version) -> Self {
        Self {
            id: bid.id,
            tender_id: bid.tender_id,
            organization_id: bid.organization_id,
            creator_id: bid.creator_id,
            status: bid.status,
            approval_count: bid.approval_count,
            name: version.content.name,
            description: version.content.description,
            version: version.number,
            created_at: bid.created_at,
        }
    }
}
