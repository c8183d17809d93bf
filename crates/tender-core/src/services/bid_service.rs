//! Bid submission, content versioning and approval decisions

use std::sync::Arc;
use std::time::Duration;

use tender_shared::EntityId;
use tracing::info;

use super::quorum::QuorumEngine;
use super::retry::with_deadline;
use super::version_ledger::VersionLedger;
use crate::domain::{Bid, BidView, BidVote, CreateBid, EntityKind, UpdateBid, Version};
use crate::error::DomainError;
use crate::repositories::{BidRepository, OrganizationRepository, TenderRepository, VersionRepository};

pub struct BidService<B, T, V, O>
where
    B: BidRepository,
    T: TenderRepository,
    V: VersionRepository,
    O: OrganizationRepository,
{
    bid_repo: Arc<B>,
    tender_repo: Arc<T>,
    ledger: Arc<VersionLedger<V>>,
    engine: QuorumEngine<B, T, O>,
    timeout: Duration,
}

impl<B, T, V, O> BidService<B, T, V, O>
where
    B: BidRepository,
    T: TenderRepository,
    V: VersionRepository,
    O: OrganizationRepository,
{
    pub fn new(
        bid_repo: Arc<B>,
        tender_repo: Arc<T>,
        ledger: Arc<VersionLedger<V>>,
        engine: QuorumEngine<B, T, O>,
        timeout: Duration,
    ) -> Self {
        Self {
            bid_repo,
            tender_repo,
            ledger,
            engine,
            timeout,
        }
    }

    pub fn engine(&self) -> &QuorumEngine<B, T, O> {
        &self.engine
    }

    /// Submits a bid on an existing tender; the bid starts in `CREATED` at version 1.
    pub async fn create_bid(&self, request: CreateBid) -> Result<BidView, DomainError> {
        with_deadline(self.timeout, "create_bid", async {
            let (new_bid, content) = request.into_parts()?;
            let (bid, version) = self.bid_repo.create(&new_bid, &content).await?;
            info!(
                "Bid {} created on tender {} for organization {}",
                bid.id, bid.tender_id, bid.organization_id
            );
            Ok::<_, DomainError>(BidView::new(bid, version))
        })
        .await
    }

    pub async fn update_bid(&self, id: EntityId, update: UpdateBid) -> Result<BidView, DomainError> {
        with_deadline(self.timeout, "update_bid", async {
            let bid = self.load(id).await?;
            let version = self
                .ledger
                .update_with(EntityKind::Bid, id, |current| {
                    current.merge(update.name.clone(), update.description.clone(), None)
                })
                .await?;
            Ok::<_, DomainError>(BidView::new(bid, version))
        })
        .await
    }

    pub async fn get_bid(&self, id: EntityId) -> Result<BidView, DomainError> {
        with_deadline(self.timeout, "get_bid", async {
            let bid = self.load(id).await?;
            self.view(bid).await
        })
        .await
    }

    pub async fn bids_for_tender(&self, tender_id: EntityId) -> Result<Vec<BidView>, DomainError> {
        with_deadline(self.timeout, "bids_for_tender", async {
            if self.tender_repo.find_by_id(tender_id).await?.is_none() {
                return Err(DomainError::TenderNotFound(tender_id));
            }
            let bids = self.bid_repo.find_by_tender_id(tender_id).await?;
            self.views(bids).await
        })
        .await
    }

    pub async fn bids_by_creator(&self, creator_id: EntityId) -> Result<Vec<BidView>, DomainError> {
        with_deadline(self.timeout, "bids_by_creator", async {
            let bids = self.bid_repo.find_by_creator_id(creator_id).await?;
            self.views(bids).await
        })
        .await
    }

    pub async fn rollback_bid(&self, id: EntityId, version: i32) -> Result<BidView, DomainError> {
        with_deadline(self.timeout, "rollback_bid", async {
            let bid = self.load(id).await?;
            let restored = self.ledger.rollback_to(EntityKind::Bid, id, version).await?;
            info!("Bid {} rolled back to version {} as version {}", id, version, restored.number);
            Ok::<_, DomainError>(BidView::new(bid, restored))
        })
        .await
    }

    pub async fn bid_history(&self, id: EntityId) -> Result<Vec<Version>, DomainError> {
        with_deadline(self.timeout, "bid_history", async {
            self.ledger.history(EntityKind::Bid, id).await
        })
        .await
    }

    pub async fn bid_version(&self, id: EntityId, version: i32) -> Result<Version, DomainError> {
        with_deadline(self.timeout, "bid_version", async {
            self.ledger.version_by_number(EntityKind::Bid, id, version).await
        })
        .await
    }

    /// Decision audit trail of a bid, oldest first.
    pub async fn bid_votes(&self, id: EntityId) -> Result<Vec<BidVote>, DomainError> {
        with_deadline(self.timeout, "bid_votes", async {
            self.load(id).await?;
            self.bid_repo.list_votes(id).await
        })
        .await
    }

    pub async fn approve_bid(&self, id: EntityId, approver_id: EntityId) -> Result<BidView, DomainError> {
        with_deadline(self.timeout, "approve_bid", async {
            let bid = self.engine.approve(id, approver_id).await?;
            self.view(bid).await
        })
        .await
    }

    pub async fn reject_bid(&self, id: EntityId, rejecter_id: EntityId) -> Result<BidView, DomainError> {
        with_deadline(self.timeout, "reject_bid", async {
            let bid = self.engine.reject(id, rejecter_id).await?;
            self.view(bid).await
        })
        .await
    }

    pub async fn can_decide(&self, id: EntityId, user_id: EntityId) -> Result<bool, DomainError> {
        with_deadline(self.timeout, "can_decide", self.engine.can_decide(id, user_id)).await
    }

    pub async fn delete_bid(&self, id: EntityId) -> Result<(), DomainError> {
        with_deadline(self.timeout, "delete_bid", async {
            if !self.bid_repo.delete(id).await? {
                return Err(DomainError::BidNotFound(id));
            }
            info!("Bid {} deleted", id);
            Ok::<_, DomainError>(())
        })
        .await
    }

    async fn load(&self, id: EntityId) -> Result<Bid, DomainError> {
        self.bid_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::BidNotFound(id))
    }

    async fn view(&self, bid: Bid) -> Result<BidView, DomainError> {
        let version = self.ledger.latest_version(EntityKind::Bid, bid.id).await?;
        Ok(BidView::new(bid, version))
    }

    async fn views(&self, bids: Vec<Bid>) -> Result<Vec<BidView>, DomainError> {
        let mut views = Vec::with_capacity(bids.len());
        for bid in bids {
            views.push(self.view(bid).await?);
        }
        Ok(views)
    }
}
