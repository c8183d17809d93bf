#![allow(dead_code)]

use std::sync::Arc;

use tender_core::repositories::InMemoryStore;
use tender_core::{BidView, CreateBid, CreateTender, Marketplace, ServiceType, TenderView};
use tender_shared::config::EngineSettings;
use tender_shared::EntityId;

pub type MemoryMarketplace = Marketplace<InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore>;

pub const TENDER_ORG: EntityId = 1;
pub const TENDER_OWNER: EntityId = 10;
pub const BIDDER_ORG: EntityId = 2;
pub const BIDDER: EntityId = 50;

pub fn settings() -> EngineSettings {
    EngineSettings {
        max_retries: 20,
        retry_backoff_ms: 1,
        ..EngineSettings::default()
    }
}

/// Store with `TENDER_OWNER` responsible for `TENDER_ORG` and `responsibles`
/// responsible for `BIDDER_ORG`.
pub fn store_with(responsibles: &[EntityId]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.grant_responsibility(TENDER_ORG, TENDER_OWNER);
    for user_id in responsibles {
        store.grant_responsibility(BIDDER_ORG, *user_id);
    }
    store
}

pub fn marketplace(responsibles: &[EntityId]) -> (Arc<InMemoryStore>, MemoryMarketplace) {
    let store = store_with(responsibles);
    let market = Marketplace::in_memory(Arc::clone(&store), &settings());
    (store, market)
}

pub fn tender_request(name: &str, service_type: ServiceType) -> CreateTender {
    CreateTender {
        organization_id: TENDER_ORG,
        creator_id: TENDER_OWNER,
        name: name.to_string(),
        description: format!("{} description", name),
        service_type,
    }
}

pub fn bid_request(tender_id: EntityId, name: &str) -> CreateBid {
    CreateBid {
        tender_id,
        organization_id: BIDDER_ORG,
        creator_id: BIDDER,
        name: name.to_string(),
        description: String::new(),
    }
}

pub async fn published_tender(market: &MemoryMarketplace) -> TenderView {
    let tender = market
        .tenders
        .create_tender(tender_request("Bridge repair", ServiceType::Construction))
        .await
        .expect("create tender");
    market
        .tenders
        .publish_tender(tender.id)
        .await
        .expect("publish tender")
}

pub async fn bid_on(market: &MemoryMarketplace, tender_id: EntityId) -> BidView {
    market
        .bids
        .create_bid(bid_request(tender_id, "Offer"))
        .await
        .expect("create bid")
}
