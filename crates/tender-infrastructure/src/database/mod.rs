//! Database module (PostgreSQL adapters)

pub mod connection;
pub mod postgres;

pub use connection::{create_pool, run_migrations, verify_schema};
pub use postgres::{PgBidRepository, PgOrganizationRepository, PgTenderRepository, PgVersionRepository};
