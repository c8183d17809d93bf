//! Database connection pool and schema management

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tender_shared::config::DatabaseSettings;
use tracing::info;

use crate::error::InfraError;

/// Tables the adapters read and write.
pub const REQUIRED_TABLES: [&str; 6] = [
    "organization_responsibles",
    "tenders",
    "tender_versions",
    "bids",
    "bid_versions",
    "bid_votes",
];

pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect(&settings.url)
        .await
}

/// Applies the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), InfraError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Fails with the list of [`REQUIRED_TABLES`] absent from the current schema.
pub async fn verify_schema(pool: &PgPool) -> Result<(), InfraError> {
    let present: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT table_name::TEXT
        FROM information_schema.tables
        WHERE table_schema = current_schema()
        "#,
    )
    .fetch_all(pool)
    .await?;

    let missing = missing_tables(&present);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InfraError::MissingTables(missing))
    }
}

fn missing_tables(present: &[String]) -> Vec<String> {
    REQUIRED_TABLES
        .iter()
        .filter(|table| !present.iter().any(|p| p.as_str() == **table))
        .map(|table| table.to_string())
        .collect()
}
