//! Bid repository trait (port)

use async_trait::async_trait;
use tender_shared::EntityId;

use crate::domain::{Bid, BidDecision, BidVote, NewBid, Version, VersionContent};
use crate::error::DomainError;

#[async_trait]
pub trait BidRepository: Send + Sync {
    /// Inserts the bid and its version 1 in one write. Fails with
    /// `TenderNotFound` when the tender does not exist.
    async fn create(&self, bid: &NewBid, content: &VersionContent) -> Result<(Bid, Version), DomainError>;

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Bid>, DomainError>;

    async fn find_by_tender_id(&self, tender_id: EntityId) -> Result<Vec<Bid>, DomainError>;

    async fn find_by_creator_id(&self, creator_id: EntityId) -> Result<Vec<Bid>, DomainError>;

    /// Atomically applies a decision: bid counters and status, the vote row,
    /// and the optional tender close.
    ///
    /// Returns `false` without writing when the bid revision is stale or the
    /// tender to close is no longer `PUBLISHED`/`CLOSED`. A second approval by
    /// the same user is `AlreadyVoted`.
    async fn commit_decision(&self, decision: &BidDecision) -> Result<bool, DomainError>;

    async fn list_votes(&self, bid_id: EntityId) -> Result<Vec<BidVote>, DomainError>;

    /// Removes the bid with its versions and votes.
    async fn delete(&self, id: EntityId) -> Result<bool, DomainError>;
}
