//! PostgreSQL repository implementations

pub mod bid_repo_impl;
pub mod organization_repo_impl;
pub mod tender_repo_impl;
pub mod version_repo_impl;

pub use bid_repo_impl::PgBidRepository;
pub use organization_repo_impl::PgOrganizationRepository;
pub use tender_repo_impl::PgTenderRepository;
pub use version_repo_impl::PgVersionRepository;

use tender_core::error::DomainError;
use tracing::error;

/// Any database failure the adapters do not translate into a domain outcome.
pub(crate) fn store_error(context: &str, e: sqlx::Error) -> DomainError {
    error!("Database error {}: {}", context, e);
    DomainError::StoreUnavailable(e.to_string())
}

/// Name of the violated unique constraint, if that is what `e` is.
pub(crate) fn unique_violation(e: &sqlx::Error) -> Option<String> {
    e.as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.constraint().unwrap_or_default().to_string())
}

pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

/// Stored enum text that no longer parses means the schema and code disagree.
pub(crate) fn corrupt_column(column: &str, value: &str) -> DomainError {
    error!("Unexpected value in column {}: {}", column, value);
    DomainError::InternalError(format!("unexpected {} value: {}", column, value))
}
