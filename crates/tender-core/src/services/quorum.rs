// ============================================================================
// Tender Core - Quorum Approval Engine
// File: crates/tender-core/src/services/quorum.rs
// ============================================================================
//! Multi-party approval of bids.
//!
//! Each vote is committed as one revision-checked write covering the bid
//! counters, the vote row and the optional tender close. Approvals also
//! recheck the responsible users the quorum came from. A lost race is
//! re-evaluated from a fresh read.

use std::sync::Arc;

use tender_shared::EntityId;
use tracing::{debug, info};

use super::authorization::AuthorizationGate;
use super::retry::{retry_on_conflict, RetryPolicy};
use crate::domain::{transition, Bid, BidDecision, BidStatus, LifecycleStatus, TenderStatus};
use crate::error::DomainError;
use crate::repositories::{BidRepository, OrganizationRepository, TenderRepository};

pub struct QuorumEngine<B, T, O>
where
    B: BidRepository,
    T: TenderRepository,
    O: OrganizationRepository,
{
    bid_repo: Arc<B>,
    tender_repo: Arc<T>,
    gate: Arc<AuthorizationGate<O>>,
    max_quorum: usize,
    retry: RetryPolicy,
}

impl<B, T, O> QuorumEngine<B, T, O>
where
    B: BidRepository,
    T: TenderRepository,
    O: OrganizationRepository,
{
    pub fn new(
        bid_repo: Arc<B>,
        tender_repo: Arc<T>,
        gate: Arc<AuthorizationGate<O>>,
        max_quorum: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            bid_repo,
            tender_repo,
            gate,
            max_quorum,
            retry,
        }
    }

    /// Approvals needed for an organization with `responsible_count` responsible users.
    pub fn quorum_for(&self, responsible_count: usize) -> usize {
        responsible_count.min(self.max_quorum)
    }

    pub async fn approve(&self, bid_id: EntityId, approver_id: EntityId) -> Result<Bid, DomainError> {
        retry_on_conflict(self.retry, "approve_bid", || self.approve_once(bid_id, approver_id)).await
    }

    pub async fn reject(&self, bid_id: EntityId, rejecter_id: EntityId) -> Result<Bid, DomainError> {
        retry_on_conflict(self.retry, "reject_bid", || self.reject_once(bid_id, rejecter_id)).await
    }

    /// Whether `user_id` could currently vote on the bid. Never fails on store
    /// errors during the responsibility lookup.
    pub async fn can_decide(&self, bid_id: EntityId, user_id: EntityId) -> Result<bool, DomainError> {
        let bid = self.load_bid(bid_id).await?;
        if bid.status.is_terminal() {
            return Ok(false);
        }
        Ok(self.gate.is_responsible(user_id, bid.organization_id).await)
    }

    async fn approve_once(&self, bid_id: EntityId, approver_id: EntityId) -> Result<Bid, DomainError> {
        // 1. Load bid
        let bid = self.load_bid(bid_id).await?;

        // 2. Terminal bids take no votes
        bid.ensure_open(BidStatus::Approved)?;

        // 3. Approver must be responsible for the bidding organization
        self.gate
            .ensure_responsible(approver_id, bid.organization_id)
            .await?;

        // 4. Quorum from a fresh read of the responsible users
        let responsibles = self.gate.responsibles(bid.organization_id).await?;
        if !responsibles.contains(&approver_id) {
            return Err(DomainError::Unauthorized {
                user_id: approver_id,
                organization_id: bid.organization_id,
            });
        }
        let quorum = self.quorum_for(responsibles.len());

        // 5-6. Count the vote, approve and close the tender once the quorum is met
        let decision = bid
            .approve(approver_id, quorum)?
            .with_quorum_basis(bid.organization_id, responsibles.len());
        if let Some(tender_id) = decision.close_tender {
            self.check_tender_closable(tender_id).await?;
        } else {
            debug!(
                "Bid {} has {} of {} approvals",
                bid.id, decision.approval_count, quorum
            );
        }

        // 7. Persist
        self.commit(bid, decision).await
    }

    async fn reject_once(&self, bid_id: EntityId, rejecter_id: EntityId) -> Result<Bid, DomainError> {
        let bid = self.load_bid(bid_id).await?;
        bid.ensure_open(BidStatus::Rejected)?;
        self.gate
            .ensure_responsible(rejecter_id, bid.organization_id)
            .await?;

        let decision = bid.reject(rejecter_id)?;
        self.commit(bid, decision).await
    }

    async fn load_bid(&self, bid_id: EntityId) -> Result<Bid, DomainError> {
        self.bid_repo
            .find_by_id(bid_id)
            .await?
            .ok_or(DomainError::BidNotFound(bid_id))
    }

    /// Closing an already closed tender is a no-op; closing one that was
    /// never published is not allowed.
    async fn check_tender_closable(&self, tender_id: EntityId) -> Result<(), DomainError> {
        let tender = self
            .tender_repo
            .find_by_id(tender_id)
            .await?
            .ok_or(DomainError::TenderNotFound(tender_id))?;
        if tender.is_closed() {
            return Ok(());
        }
        transition(tender.status, TenderStatus::Closed).map(|_| ())
    }

    async fn commit(&self, mut bid: Bid, decision: BidDecision) -> Result<Bid, DomainError> {
        if !self.bid_repo.commit_decision(&decision).await? {
            return Err(DomainError::ConcurrentModification(format!(
                "bid {} changed since revision {}",
                bid.id, decision.expected_revision
            )));
        }
        decision.apply_to(&mut bid);

        info!(
            "Recorded {} by user {} on bid {}: status {}, approvals {}",
            decision.vote.decision.as_str(),
            decision.vote.user_id,
            bid.id,
            bid.status.as_str(),
            bid.approval_count
        );
        if let Some(tender_id) = decision.close_tender {
            info!("Tender {} closed by approval of bid {}", tender_id, bid.id);
        }
        Ok(bid)
    }
}
