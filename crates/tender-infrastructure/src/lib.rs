//! # Tender Infrastructure
//! 
//! PostgreSQL adapters for the tender core repository ports, plus bootstrap
//! helpers (pool, migrations, schema check, service wiring).

pub mod database;
pub mod engine;
pub mod error;

pub use database::{
    create_pool, run_migrations, verify_schema, PgBidRepository, PgOrganizationRepository,
    PgTenderRepository, PgVersionRepository,
};
pub use engine::{build_marketplace, PgMarketplace};
pub use error::InfraError;
