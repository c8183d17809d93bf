//! Service wiring shared by every store backend.

use std::sync::Arc;

use tender_shared::config::EngineSettings;

use crate::repositories::{
    BidRepository, InMemoryStore, OrganizationRepository, TenderRepository, VersionRepository,
};
use crate::services::{AuthorizationGate, BidService, QuorumEngine, RetryPolicy, TenderService, VersionLedger};

/// Tender and bid services sharing one version ledger and one authorization gate.
pub struct Marketplace<T, B, V, O>
where
    T: TenderRepository,
    B: BidRepository,
    V: VersionRepository,
    O: OrganizationRepository,
{
    pub tenders: TenderService<T, V, O>,
    pub bids: BidService<B, T, V, O>,
}

impl<T, B, V, O> Marketplace<T, B, V, O>
where
    T: TenderRepository,
    B: BidRepository,
    V: VersionRepository,
    O: OrganizationRepository,
{
    pub fn new(
        tender_repo: Arc<T>,
        bid_repo: Arc<B>,
        version_repo: Arc<V>,
        org_repo: Arc<O>,
        settings: &EngineSettings,
    ) -> Self {
        let retry = RetryPolicy::from_settings(settings);
        let ledger = Arc::new(VersionLedger::new(version_repo, retry));
        let gate = Arc::new(AuthorizationGate::new(org_repo));

        let engine = QuorumEngine::new(
            Arc::clone(&bid_repo),
            Arc::clone(&tender_repo),
            Arc::clone(&gate),
            settings.max_quorum,
            retry,
        );

        Self {
            tenders: TenderService::new(
                Arc::clone(&tender_repo),
                Arc::clone(&ledger),
                gate,
                retry,
                settings.operation_timeout(),
            ),
            bids: BidService::new(bid_repo, tender_repo, ledger, engine, settings.operation_timeout()),
        }
    }
}

impl Marketplace<InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore> {
    pub fn in_memory(store: Arc<InMemoryStore>, settings: &EngineSettings) -> Self {
        Self::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
            store,
            settings,
        )
    }
}
