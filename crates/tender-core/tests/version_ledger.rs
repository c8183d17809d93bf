mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use tender_core::repositories::{InMemoryStore, VersionRepository};
use tender_core::{
    DomainError, EntityKind, ErrorKind, Marketplace, ServiceType, UpdateBid, UpdateTender, Version,
};
use tender_shared::EntityId;

fn rename(name: &str) -> UpdateTender {
    UpdateTender {
        name: Some(name.to_string()),
        ..UpdateTender::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_produce_contiguous_versions() {
    let (_store, market) = marketplace(&[21]);
    let market = Arc::new(market);
    let tender_id = published_tender(&market).await.id;

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let market = Arc::clone(&market);
            tokio::spawn(async move {
                market
                    .tenders
                    .update_tender(tender_id, rename(&format!("Revision {}", i)))
                    .await
            })
        })
        .collect();

    let mut numbers = Vec::new();
    for handle in handles {
        let view = handle.await.unwrap().expect("update succeeds");
        numbers.push(view.version);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (2..=21).collect::<Vec<i32>>(), "each update gets its own number");

    let history = market.tenders.tender_history(tender_id).await.unwrap();
    let recorded: Vec<i32> = history.iter().map(|v| v.number).collect();
    assert_eq!(recorded, (1..=21).collect::<Vec<i32>>());
}

#[tokio::test]
async fn test_concurrent_bid_updates_interleaved() {
    let (_store, market) = marketplace(&[21]);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    let updates = (0..10).map(|i| {
        market.bids.update_bid(
            bid.id,
            UpdateBid {
                description: Some(format!("price {}", i * 100)),
                ..UpdateBid::default()
            },
        )
    });
    let results = futures::future::join_all(updates).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let history = market.bids.bid_history(bid.id).await.unwrap();
    assert_eq!(history.len(), 11);
    assert!(history.windows(2).all(|w| w[1].number == w[0].number + 1));
}

#[tokio::test]
async fn test_rollback_appends_copy_of_old_content() {
    let (_store, market) = marketplace(&[21]);
    let tender = market
        .tenders
        .create_tender(tender_request("Alpha", ServiceType::It))
        .await
        .unwrap();
    market.tenders.update_tender(tender.id, rename("Beta")).await.unwrap();
    market.tenders.update_tender(tender.id, rename("Gamma")).await.unwrap();

    let rolled = market.tenders.rollback_tender(tender.id, 1).await.unwrap();
    assert_eq!(rolled.version, 4, "rollback never reuses a number");
    assert_eq!(rolled.name, "Alpha");

    let history = market.tenders.tender_history(tender.id).await.unwrap();
    let names: Vec<&str> = history.iter().map(|v| v.content.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma", "Alpha"]);

    let second = market.tenders.tender_version(tender.id, 2).await.unwrap();
    assert_eq!(second.content.name, "Beta", "old versions are untouched");

    let current = market.tenders.get_tender(tender.id).await.unwrap();
    assert_eq!(current.version, 4);
    assert_eq!(current.name, "Alpha");
}

#[tokio::test]
async fn test_rollback_restores_service_type() {
    let (_store, market) = marketplace(&[21]);
    let tender = market
        .tenders
        .create_tender(tender_request("Datacenter", ServiceType::Construction))
        .await
        .unwrap();

    let moved = market
        .tenders
        .update_tender(
            tender.id,
            UpdateTender {
                service_type: Some(ServiceType::It),
                ..UpdateTender::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.service_type, ServiceType::It);
    assert_eq!(moved.version, 2);

    let it = market.tenders.list_tenders(Some(ServiceType::It)).await.unwrap();
    assert_eq!(it.len(), 1);

    let restored = market.tenders.rollback_tender(tender.id, 1).await.unwrap();
    assert_eq!(restored.service_type, ServiceType::Construction);
    assert_eq!(restored.version, 3);

    let construction = market
        .tenders
        .list_tenders(Some(ServiceType::Construction))
        .await
        .unwrap();
    assert_eq!(construction.len(), 1);
    assert!(market.tenders.list_tenders(Some(ServiceType::It)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bid_rollback() {
    let (_store, market) = marketplace(&[21]);
    let tender = published_tender(&market).await;
    let bid = bid_on(&market, tender.id).await;

    market
        .bids
        .update_bid(
            bid.id,
            UpdateBid {
                name: Some("Revised offer".into()),
                ..UpdateBid::default()
            },
        )
        .await
        .unwrap();

    let rolled = market.bids.rollback_bid(bid.id, 1).await.unwrap();
    assert_eq!(rolled.name, "Offer");
    assert_eq!(rolled.version, 3);
}

#[tokio::test]
async fn test_update_without_changes_keeps_version() {
    let (_store, market) = marketplace(&[21]);
    let tender = market
        .tenders
        .create_tender(tender_request("Alpha", ServiceType::Consulting))
        .await
        .unwrap();

    let same = market.tenders.update_tender(tender.id, rename("Alpha")).await.unwrap();
    assert_eq!(same.version, 1);
    assert_eq!(market.tenders.tender_history(tender.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_changes_do_not_append_versions() {
    let (_store, market) = marketplace(&[21]);
    let tender = published_tender(&market).await;
    market.tenders.close_tender(tender.id).await.unwrap();

    let history = market.tenders.tender_history(tender.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(market.tenders.get_tender(tender.id).await.unwrap().version, 1);
}

#[tokio::test]
async fn test_missing_versions_and_parents() {
    let (_store, market) = marketplace(&[21]);
    let tender = published_tender(&market).await;

    let err = market.tenders.tender_version(tender.id, 9).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::VersionNotFound { kind: EntityKind::Tender, number: 9, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = market.tenders.rollback_tender(tender.id, 9).await.unwrap_err();
    assert!(matches!(err, DomainError::VersionNotFound { .. }));
    assert_eq!(
        market.tenders.tender_history(tender.id).await.unwrap().len(),
        1,
        "a failed rollback appends nothing"
    );

    assert!(matches!(
        market.tenders.update_tender(999, rename("x")).await,
        Err(DomainError::TenderNotFound(999))
    ));
    assert!(matches!(
        market.bids.bid_history(999).await,
        Err(DomainError::BidNotFound(999))
    ));
}

#[tokio::test]
async fn test_invalid_update_leaves_latest_version() {
    let (_store, market) = marketplace(&[21]);
    let tender = published_tender(&market).await;

    let err = market
        .tenders
        .update_tender(tender.id, rename(&"x".repeat(200)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let current = market.tenders.get_tender(tender.id).await.unwrap();
    assert_eq!(current.version, 1);
    assert_eq!(current.name, "Bridge repair");
}

/// Version store whose `latest_version` answers only after `delay`.
struct SlowLatestVersions {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

#[async_trait]
impl VersionRepository for SlowLatestVersions {
    async fn parent_exists(&self, kind: EntityKind, parent_id: EntityId) -> Result<bool, DomainError> {
        self.inner.parent_exists(kind, parent_id).await
    }

    async fn max_version_number(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
    ) -> Result<Option<i32>, DomainError> {
        self.inner.max_version_number(kind, parent_id).await
    }

    async fn insert_version(&self, version: &Version) -> Result<(), DomainError> {
        self.inner.insert_version(version).await
    }

    async fn latest_version(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
    ) -> Result<Option<Version>, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.latest_version(kind, parent_id).await
    }

    async fn find_version(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        number: i32,
    ) -> Result<Option<Version>, DomainError> {
        self.inner.find_version(kind, parent_id, number).await
    }

    async fn list_versions(&self, kind: EntityKind, parent_id: EntityId) -> Result<Vec<Version>, DomainError> {
        self.inner.list_versions(kind, parent_id).await
    }
}

#[tokio::test]
async fn test_concurrent_partial_updates_keep_both_changes() {
    let store = store_with(&[21]);
    let market = Marketplace::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::new(SlowLatestVersions {
            inner: Arc::clone(&store),
            delay: Duration::from_millis(50),
        }),
        Arc::clone(&store),
        &settings(),
    );
    let tender = market
        .tenders
        .create_tender(tender_request("Alpha", ServiceType::It))
        .await
        .unwrap();

    let (renamed, described) = tokio::join!(
        market.tenders.update_tender(tender.id, rename("Renamed")),
        market.tenders.update_tender(
            tender.id,
            UpdateTender {
                description: Some("New description".into()),
                ..UpdateTender::default()
            },
        ),
    );
    let mut numbers = vec![renamed.unwrap().version, described.unwrap().version];
    numbers.sort();
    assert_eq!(numbers, vec![2, 3]);

    let latest = market.tenders.get_tender(tender.id).await.unwrap();
    assert_eq!(latest.version, 3);
    assert_eq!(latest.name, "Renamed");
    assert_eq!(latest.description, "New description");
    assert_eq!(latest.service_type, ServiceType::It);
}
