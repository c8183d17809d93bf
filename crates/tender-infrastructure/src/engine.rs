//! Wires the PostgreSQL repositories into the marketplace services.

use std::sync::Arc;

use sqlx::PgPool;
use tender_core::Marketplace;
use tender_shared::config::EngineSettings;

use crate::database::{PgBidRepository, PgOrganizationRepository, PgTenderRepository, PgVersionRepository};

pub type PgMarketplace =
    Marketplace<PgTenderRepository, PgBidRepository, PgVersionRepository, PgOrganizationRepository>;

/// Every repository shares the same pool; `PgPool` clones are handles.
pub fn build_marketplace(pool: PgPool, settings: &EngineSettings) -> PgMarketplace {
    Marketplace::new(
        Arc::new(PgTenderRepository::new(pool.clone())),
        Arc::new(PgBidRepository::new(pool.clone())),
        Arc::new(PgVersionRepository::new(pool.clone())),
        Arc::new(PgOrganizationRepository::new(pool)),
        settings,
    )
}
