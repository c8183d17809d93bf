// ============================================================================
// Tender Infrastructure - PostgreSQL Tender Repository
// File: crates/tender-infrastructure/src/database/postgres/tender_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;

use tender_core::domain::{
    EntityKind, LifecycleStatus, NewTender, ServiceType, Tender, TenderStatus, Version, VersionContent,
};
use tender_core::error::DomainError;
use tender_core::repositories::TenderRepository;
use tender_shared::{constants::FIRST_VERSION, EntityId};

use super::version_repo_impl::VersionRow;
use super::{corrupt_column, store_error};

pub struct PgTenderRepository {
    pool: PgPool,
}

impl PgTenderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct TenderRow {
    pub id: i64,
    pub organization_id: i64,
    pub creator_id: i64,
    pub status: String,
    pub service_type: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TenderRow> for Tender {
    type Error = DomainError;

    fn try_from(row: TenderRow) -> Result<Self, Self::Error> {
        let status = TenderStatus::from_str(&row.status)
            .ok_or_else(|| corrupt_column("tenders.status", &row.status))?;
        let service_type = ServiceType::from_str(&row.service_type)
            .ok_or_else(|| corrupt_column("tenders.service_type", &row.service_type))?;

        Ok(Tender {
            id: row.id,
            organization_id: row.organization_id,
            creator_id: row.creator_id,
            status,
            service_type,
            created_at: row.created_at,
        })
    }
}

fn into_tenders(rows: Vec<TenderRow>) -> Result<Vec<Tender>, DomainError> {
    rows.into_iter().map(Tender::try_from).collect()
}

#[async_trait]
impl TenderRepository for PgTenderRepository {
    async fn create(
        &self,
        tender: &NewTender,
        content: &VersionContent,
    ) -> Result<(Tender, Version), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("starting tender transaction", e))?;

        let row: TenderRow = sqlx::query_as(
            r#"
            INSERT INTO tenders (organization_id, creator_id, status, service_type, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, organization_id, creator_id, status, service_type, created_at
            "#,
        )
        .bind(tender.organization_id)
        .bind(tender.creator_id)
        .bind(tender.status.as_str())
        .bind(tender.service_type.as_str())
        .bind(tender.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| store_error("creating tender", e))?;

        let created = Tender::try_from(row)?;
        let service_type = content.service_type.unwrap_or(created.service_type);

        let version: VersionRow = sqlx::query_as(
            r#"
            INSERT INTO tender_versions (tender_id, version, name, description, service_type, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING tender_id AS parent_id, version, name, description, service_type, updated_at
            "#,
        )
        .bind(created.id)
        .bind(FIRST_VERSION)
        .bind(&content.name)
        .bind(&content.description)
        .bind(service_type.as_str())
        .bind(created.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| store_error("creating first tender version", e))?;

        tx.commit()
            .await
            .map_err(|e| store_error("committing tender", e))?;

        info!("Tender {} stored with version {}", created.id, FIRST_VERSION);
        let version = version.into_version(EntityKind::Tender)?;
        Ok((created, version))
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Tender>, DomainError> {
        let row: Option<TenderRow> = sqlx::query_as(
            r#"
            SELECT id, organization_id, creator_id, status, service_type, created_at
            FROM tenders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("finding tender by id", e))?;

        row.map(Tender::try_from).transpose()
    }

    async fn list(&self, service_type: Option<ServiceType>) -> Result<Vec<Tender>, DomainError> {
        let rows: Vec<TenderRow> = sqlx::query_as(
            r#"
            SELECT id, organization_id, creator_id, status, service_type, created_at
            FROM tenders
            WHERE $1::VARCHAR IS NULL OR service_type = $1::VARCHAR
            ORDER BY id
            "#,
        )
        .bind(service_type.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("listing tenders", e))?;

        into_tenders(rows)
    }

    async fn find_by_creator_id(&self, creator_id: EntityId) -> Result<Vec<Tender>, DomainError> {
        let rows: Vec<TenderRow> = sqlx::query_as(
            r#"
            SELECT id, organization_id, creator_id, status, service_type, created_at
            FROM tenders
            WHERE creator_id = $1
            ORDER BY id
            "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("finding tenders by creator", e))?;

        into_tenders(rows)
    }

    async fn update_status(
        &self,
        id: EntityId,
        expected: TenderStatus,
        target: TenderStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tenders
            SET status = $3
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(target.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("updating tender status", e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenders WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("checking tender existence", e))?;

        if exists {
            Ok(false)
        } else {
            Err(DomainError::TenderNotFound(id))
        }
    }

    async fn delete(&self, id: EntityId) -> Result<bool, DomainError> {
        // Versions, bids, bid versions and votes go with the row (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM tenders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("deleting tender", e))?;

        Ok(result.rows_affected() > 0)
    }
}
