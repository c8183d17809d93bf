// ============================================================================
// Tender Infrastructure - PostgreSQL Version Repository
// File: crates/tender-infrastructure/src/database/postgres/version_repo_impl.rs
// ============================================================================
//! Tender and bid histories live in separate tables with the same shape;
//! `VersionTable` picks the table, parent column and service type column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::warn;

use tender_core::domain::{EntityKind, ServiceType, Version, VersionContent};
use tender_core::error::DomainError;
use tender_core::repositories::VersionRepository;
use tender_shared::EntityId;

use super::{corrupt_column, is_foreign_key_violation, store_error, unique_violation};

struct VersionTable {
    versions: &'static str,
    parents: &'static str,
    parent_column: &'static str,
    /// Select expression for the service type column.
    service_type: &'static str,
}

impl VersionTable {
    fn of(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Tender => VersionTable {
                versions: "tender_versions",
                parents: "tenders",
                parent_column: "tender_id",
                service_type: "service_type",
            },
            EntityKind::Bid => VersionTable {
                versions: "bid_versions",
                parents: "bids",
                parent_column: "bid_id",
                service_type: "NULL::VARCHAR AS service_type",
            },
        }
    }

    fn select(&self, filter: &str) -> String {
        format!(
            "SELECT {} AS parent_id, version, name, description, {}, updated_at FROM {} WHERE {}",
            self.parent_column, self.service_type, self.versions, filter
        )
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
pub(crate) struct VersionRow {
    pub parent_id: i64,
    pub version: i32,
    pub name: String,
    pub description: String,
    pub service_type: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl VersionRow {
    pub(crate) fn into_version(self, kind: EntityKind) -> Result<Version, DomainError> {
        let service_type = match self.service_type.as_deref() {
            Some(value) => Some(
                ServiceType::from_str(value)
                    .ok_or_else(|| corrupt_column("tender_versions.service_type", value))?,
            ),
            None => None,
        };

        Ok(Version {
            kind,
            parent_id: self.parent_id,
            number: self.version,
            content: VersionContent {
                name: self.name,
                description: self.description,
                service_type,
            },
            updated_at: self.updated_at,
        })
    }
}

pub struct PgVersionRepository {
    pool: PgPool,
}

impl PgVersionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn insert_error(version: &Version, e: sqlx::Error) -> DomainError {
        if unique_violation(&e).is_some() {
            warn!(
                "Version {} of {} {} already taken",
                version.number, version.kind, version.parent_id
            );
            return DomainError::ConcurrentModification(format!(
                "{} {} version {} already exists",
                version.kind, version.parent_id, version.number
            ));
        }
        if is_foreign_key_violation(&e) {
            return DomainError::not_found(version.kind, version.parent_id);
        }
        store_error("inserting version", e)
    }
}

#[async_trait]
impl VersionRepository for PgVersionRepository {
    async fn parent_exists(&self, kind: EntityKind, parent_id: EntityId) -> Result<bool, DomainError> {
        let table = VersionTable::of(kind);
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", table.parents);

        sqlx::query_scalar(&sql)
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("checking parent existence", e))
    }

    async fn max_version_number(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
    ) -> Result<Option<i32>, DomainError> {
        let table = VersionTable::of(kind);
        let sql = format!(
            "SELECT MAX(version) FROM {} WHERE {} = $1",
            table.versions, table.parent_column
        );

        sqlx::query_scalar(&sql)
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("reading max version", e))
    }

    async fn insert_version(&self, version: &Version) -> Result<(), DomainError> {
        let content = &version.content;

        match (version.kind, content.service_type) {
            (EntityKind::Tender, Some(service_type)) => {
                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(|e| store_error("starting version transaction", e))?;

                sqlx::query(
                    r#"
                    INSERT INTO tender_versions (tender_id, version, name, description, service_type, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(version.parent_id)
                .bind(version.number)
                .bind(&content.name)
                .bind(&content.description)
                .bind(service_type.as_str())
                .bind(version.updated_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| Self::insert_error(version, e))?;

                sqlx::query("UPDATE tenders SET service_type = $2 WHERE id = $1")
                    .bind(version.parent_id)
                    .bind(service_type.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| store_error("syncing tender service type", e))?;

                tx.commit()
                    .await
                    .map_err(|e| store_error("committing version", e))?;
            }
            (EntityKind::Tender, None) => {
                return Err(DomainError::ValidationError(
                    "tender versions require a service type".to_string(),
                ));
            }
            (EntityKind::Bid, _) => {
                sqlx::query(
                    r#"
                    INSERT INTO bid_versions (bid_id, version, name, description, updated_at)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(version.parent_id)
                .bind(version.number)
                .bind(&content.name)
                .bind(&content.description)
                .bind(version.updated_at)
                .execute(&self.pool)
                .await
                .map_err(|e| Self::insert_error(version, e))?;
            }
        }

        Ok(())
    }

    async fn latest_version(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
    ) -> Result<Option<Version>, DomainError> {
        let table = VersionTable::of(kind);
        let sql = format!(
            "{} ORDER BY version DESC LIMIT 1",
            table.select(&format!("{} = $1", table.parent_column))
        );

        let row: Option<VersionRow> = sqlx::query_as(&sql)
            .bind(parent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("reading latest version", e))?;

        row.map(|r| r.into_version(kind)).transpose()
    }

    async fn find_version(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        number: i32,
    ) -> Result<Option<Version>, DomainError> {
        let table = VersionTable::of(kind);
        let sql = table.select(&format!("{} = $1 AND version = $2", table.parent_column));

        let row: Option<VersionRow> = sqlx::query_as(&sql)
            .bind(parent_id)
            .bind(number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("finding version", e))?;

        row.map(|r| r.into_version(kind)).transpose()
    }

    async fn list_versions(&self, kind: EntityKind, parent_id: EntityId) -> Result<Vec<Version>, DomainError> {
        let table = VersionTable::of(kind);
        let sql = format!(
            "{} ORDER BY version",
            table.select(&format!("{} = $1", table.parent_column))
        );

        let rows: Vec<VersionRow> = sqlx::query_as(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("listing versions", e))?;

        rows.into_iter().map(|r| r.into_version(kind)).collect()
    }
}
