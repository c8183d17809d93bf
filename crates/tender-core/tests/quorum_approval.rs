mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use tender_core::repositories::{InMemoryStore, OrganizationRepository};
use tender_core::{
    BidStatus, DomainError, ErrorKind, Marketplace, OrganizationResponsibility, TenderStatus, VoteDecision,
};
use tender_shared::config::EngineSettings;
use tender_shared::EntityId;

const FIVE: [EntityId; 5] = [21, 22, 23, 24, 25];

#[tokio::test]
async fn test_five_responsibles_need_three_approvals() {
    let (_store, market) = marketplace(&FIVE);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;
    assert_eq!(market.bids.engine().quorum_for(FIVE.len()), 3);

    let first = market.bids.approve_bid(bid.id, 21).await.unwrap();
    assert_eq!((first.status, first.approval_count), (BidStatus::Created, 1));

    let second = market.bids.approve_bid(bid.id, 22).await.unwrap();
    assert_eq!((second.status, second.approval_count), (BidStatus::Created, 2));

    let third = market.bids.approve_bid(bid.id, 23).await.unwrap();
    assert_eq!((third.status, third.approval_count), (BidStatus::Approved, 3));

    let tender = market.tenders.get_tender(tender.id).await.unwrap();
    assert_eq!(tender.status, TenderStatus::Closed, "approval closes the tender");

    let err = market.bids.approve_bid(bid.id, 24).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);
    assert_eq!(market.bids.get_bid(bid.id).await.unwrap().approval_count, 3);
}

#[tokio::test]
async fn test_two_responsibles_need_both() {
    let (_store, market) = marketplace(&[21, 22]);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    let first = market.bids.approve_bid(bid.id, 21).await.unwrap();
    assert_eq!(first.status, BidStatus::Created);

    let second = market.bids.approve_bid(bid.id, 22).await.unwrap();
    assert_eq!(second.status, BidStatus::Approved);
    assert_eq!(second.approval_count, 2);
}

#[tokio::test]
async fn test_single_responsible_approves_alone() {
    let (_store, market) = marketplace(&[21]);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    let approved = market.bids.approve_bid(bid.id, 21).await.unwrap();
    assert_eq!(approved.status, BidStatus::Approved);
}

#[tokio::test]
async fn test_outsider_is_unauthorized() {
    let (_store, market) = marketplace(&FIVE);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    let err = market.bids.approve_bid(bid.id, 99).await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized { user_id: 99, .. }));

    let err = market.bids.reject_bid(bid.id, 99).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let current = market.bids.get_bid(bid.id).await.unwrap();
    assert_eq!((current.status, current.approval_count), (BidStatus::Created, 0));
    assert!(market.bids.bid_votes(bid.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_single_rejection_is_final() {
    let (_store, market) = marketplace(&FIVE);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    market.bids.approve_bid(bid.id, 21).await.unwrap();
    market.bids.approve_bid(bid.id, 22).await.unwrap();

    let rejected = market.bids.reject_bid(bid.id, 23).await.unwrap();
    assert_eq!(rejected.status, BidStatus::Rejected);
    assert_eq!(rejected.approval_count, 2, "rejection does not touch the count");

    let err = market.bids.approve_bid(bid.id, 24).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidStatusTransition { from: "REJECTED", .. }));
    let err = market.bids.reject_bid(bid.id, 24).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);

    let tender = market.tenders.get_tender(tender.id).await.unwrap();
    assert_eq!(tender.status, TenderStatus::Published);
}

#[tokio::test]
async fn test_duplicate_approval_is_conflict() {
    let (_store, market) = marketplace(&FIVE);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    market.bids.approve_bid(bid.id, 21).await.unwrap();
    let err = market.bids.approve_bid(bid.id, 21).await.unwrap_err();
    assert!(matches!(err, DomainError::AlreadyVoted { user_id: 21, .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let current = market.bids.get_bid(bid.id).await.unwrap();
    assert_eq!(current.approval_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_stop_at_quorum() {
    let (_store, market) = marketplace(&FIVE);
    let market = Arc::new(market);
    let tender_id = published_tender(&market).await.id;
    let bid_id = bid_on(&market, tender_id).await.id;

    let handles: Vec<_> = FIVE
        .iter()
        .map(|&user_id| {
            let market = Arc::clone(&market);
            tokio::spawn(async move { market.bids.approve_bid(bid_id, user_id).await })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidStatusTransition, "unexpected: {}", e),
        }
    }
    assert_eq!(accepted, 3);

    let bid = market.bids.get_bid(bid_id).await.unwrap();
    assert_eq!(bid.status, BidStatus::Approved);
    assert_eq!(bid.approval_count, 3);

    let votes = market.bids.bid_votes(bid_id).await.unwrap();
    assert_eq!(votes.len(), 3, "count matches recorded approvals");
    assert!(votes.iter().all(|v| v.decision == VoteDecision::Approve));
}

#[tokio::test]
async fn test_quorum_uses_current_responsibles() {
    let (store, market) = marketplace(&[21, 22, 23, 24]);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    market.bids.approve_bid(bid.id, 21).await.unwrap();
    store.revoke_responsibility(BIDDER_ORG, 23);
    store.revoke_responsibility(BIDDER_ORG, 24);

    let second = market.bids.approve_bid(bid.id, 22).await.unwrap();
    assert_eq!(second.status, BidStatus::Approved, "two responsibles left, quorum is two");
}

#[tokio::test]
async fn test_approval_on_unpublished_tender_writes_nothing() {
    let (_store, market) = marketplace(&[21]);
    let tender = market
        .tenders
        .create_tender(tender_request("Draft", tender_core::ServiceType::It))
        .await
        .unwrap();
    let bid = bid_on(&market, tender.id).await;

    let err = market.bids.approve_bid(bid.id, 21).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::InvalidStatusTransition { from: "CREATED", to: "CLOSED", .. }
    ));

    let current = market.bids.get_bid(bid.id).await.unwrap();
    assert_eq!((current.status, current.approval_count), (BidStatus::Created, 0));
    assert_eq!(
        market.tenders.get_tender(tender.id).await.unwrap().status,
        TenderStatus::Created
    );
}

#[tokio::test]
async fn test_second_bid_on_closed_tender_still_approves() {
    let (_store, market) = marketplace(&[21]);
    let tender = published_tender(&market).await;
    let first = bid_on(&market, tender.id).await;
    let second = bid_on(&market, tender.id).await;

    market.bids.approve_bid(first.id, 21).await.unwrap();
    let approved = market.bids.approve_bid(second.id, 21).await.unwrap();
    assert_eq!(approved.status, BidStatus::Approved);
    assert_eq!(
        market.tenders.get_tender(tender.id).await.unwrap().status,
        TenderStatus::Closed
    );
}

#[tokio::test]
async fn test_can_decide() {
    let (_store, market) = marketplace(&[21]);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    assert!(market.bids.can_decide(bid.id, 21).await.unwrap());
    assert!(!market.bids.can_decide(bid.id, 99).await.unwrap());

    market.bids.approve_bid(bid.id, 21).await.unwrap();
    assert!(!market.bids.can_decide(bid.id, 21).await.unwrap(), "terminal bids take no votes");
}

#[tokio::test]
async fn test_vote_audit_serializes() {
    let (_store, market) = marketplace(&[21, 22]);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    market.bids.approve_bid(bid.id, 21).await.unwrap();
    market.bids.reject_bid(bid.id, 22).await.unwrap();

    let votes = market.bids.bid_votes(bid.id).await.unwrap();
    let json = serde_json::to_value(&votes).unwrap();
    assert_eq!(json[0]["decision"], "APPROVE");
    assert_eq!(json[1]["decision"], "REJECT");
    assert_eq!(json[1]["user_id"], 22);
}

/// Responsibility store that is down.
struct UnavailableOrganizations;

#[async_trait]
impl OrganizationRepository for UnavailableOrganizations {
    async fn find_responsibility(
        &self,
        _user_id: EntityId,
        _organization_id: EntityId,
    ) -> Result<Option<OrganizationResponsibility>, DomainError> {
        Err(DomainError::StoreUnavailable("connection refused".into()))
    }

    async fn list_responsibles(&self, _organization_id: EntityId) -> Result<Vec<EntityId>, DomainError> {
        Err(DomainError::StoreUnavailable("connection refused".into()))
    }
}

/// Responsibility store that answers only after `delay`.
struct SlowOrganizations {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

#[async_trait]
impl OrganizationRepository for SlowOrganizations {
    async fn find_responsibility(
        &self,
        user_id: EntityId,
        organization_id: EntityId,
    ) -> Result<Option<OrganizationResponsibility>, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_responsibility(user_id, organization_id).await
    }

    async fn list_responsibles(&self, organization_id: EntityId) -> Result<Vec<EntityId>, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_responsibles(organization_id).await
    }
}

#[tokio::test]
async fn test_store_failure_is_unavailable_not_unauthorized() {
    let store = store_with(&[21]);
    let seed = Marketplace::in_memory(Arc::clone(&store), &settings());
    let tender = published_tender(&seed).await;
    let bid = bid_on(&seed, tender.id).await;

    let market = Marketplace::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::new(UnavailableOrganizations),
        &settings(),
    );

    let err = market.bids.approve_bid(bid.id, 21).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(!market.bids.can_decide(bid.id, 21).await.unwrap(), "read path degrades to false");

    let current = market.bids.get_bid(bid.id).await.unwrap();
    assert_eq!(current.approval_count, 0);
}

#[tokio::test]
async fn test_slow_store_hits_deadline() {
    let store = store_with(&[21]);
    let seed = Marketplace::in_memory(Arc::clone(&store), &settings());
    let tender = published_tender(&seed).await;
    let bid = bid_on(&seed, tender.id).await;

    let market = Marketplace::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::new(SlowOrganizations {
            inner: Arc::clone(&store),
            delay: Duration::from_millis(500),
        }),
        &EngineSettings {
            operation_timeout_ms: 20,
            ..settings()
        },
    );

    let err = market.bids.approve_bid(bid.id, 21).await.unwrap_err();
    assert!(matches!(err, DomainError::Timeout { operation: "approve_bid", .. }));
    assert_eq!(err.kind(), ErrorKind::Unavailable);

    let current = market.bids.get_bid(bid.id).await.unwrap();
    assert_eq!((current.status, current.approval_count), (BidStatus::Created, 0));
}

/// Responsibility store where `leaving` loses responsibility right after the
/// first membership read.
struct ShrinkingOrganizations {
    inner: Arc<InMemoryStore>,
    leaving: EntityId,
    left: AtomicBool,
}

#[async_trait]
impl OrganizationRepository for ShrinkingOrganizations {
    async fn find_responsibility(
        &self,
        user_id: EntityId,
        organization_id: EntityId,
    ) -> Result<Option<OrganizationResponsibility>, DomainError> {
        self.inner.find_responsibility(user_id, organization_id).await
    }

    async fn list_responsibles(&self, organization_id: EntityId) -> Result<Vec<EntityId>, DomainError> {
        let users = self.inner.list_responsibles(organization_id).await?;
        if !self.left.swap(true, Ordering::SeqCst) {
            self.inner.revoke_responsibility(organization_id, self.leaving);
        }
        Ok(users)
    }
}

#[tokio::test]
async fn test_membership_change_before_commit_recomputes_quorum() {
    let store = store_with(&[21, 22]);
    let seed = Marketplace::in_memory(Arc::clone(&store), &settings());
    let tender = published_tender(&seed).await;
    let bid = bid_on(&seed, tender.id).await;

    let market = Marketplace::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::new(ShrinkingOrganizations {
            inner: Arc::clone(&store),
            leaving: 22,
            left: AtomicBool::new(false),
        }),
        &settings(),
    );

    // Read as two responsibles, committed against the one that remains.
    let approved = market.bids.approve_bid(bid.id, 21).await.unwrap();
    assert_eq!((approved.status, approved.approval_count), (BidStatus::Approved, 1));

    let tender = market.tenders.get_tender(tender.id).await.unwrap();
    assert_eq!(tender.status, TenderStatus::Closed);
    assert_eq!(market.bids.bid_votes(bid.id).await.unwrap().len(), 1);
}
