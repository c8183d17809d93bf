//! Bootstrap errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Schema is missing tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),
}
