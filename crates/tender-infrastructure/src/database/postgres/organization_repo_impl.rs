// ============================================================================
// Tender Infrastructure - PostgreSQL Organization Repository
// File: crates/tender-infrastructure/src/database/postgres/organization_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use tender_core::domain::OrganizationResponsibility;
use tender_core::error::DomainError;
use tender_core::repositories::OrganizationRepository;
use tender_shared::EntityId;

use super::store_error;

pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ResponsibilityRow {
    organization_id: i64,
    user_id: i64,
}

impl From<ResponsibilityRow> for OrganizationResponsibility {
    fn from(row: ResponsibilityRow) -> Self {
        OrganizationResponsibility {
            organization_id: row.organization_id,
            user_id: row.user_id,
        }
    }
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    async fn find_responsibility(
        &self,
        user_id: EntityId,
        organization_id: EntityId,
    ) -> Result<Option<OrganizationResponsibility>, DomainError> {
        let row: Option<ResponsibilityRow> = sqlx::query_as(
            r#"
            SELECT organization_id, user_id
            FROM organization_responsibles
            WHERE user_id = $1 AND organization_id = $2
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("finding responsibility", e))?;

        Ok(row.map(Into::into))
    }

    async fn list_responsibles(&self, organization_id: EntityId) -> Result<Vec<EntityId>, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM organization_responsibles
            WHERE organization_id = $1
            ORDER BY user_id
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("listing responsibles", e))
    }
}
