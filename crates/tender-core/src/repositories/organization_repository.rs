//! Organization responsibility lookup (port)

use async_trait::async_trait;
use tender_shared::EntityId;

use crate::domain::OrganizationResponsibility;
use crate::error::DomainError;

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_responsibility(
        &self,
        user_id: EntityId,
        organization_id: EntityId,
    ) -> Result<Option<OrganizationResponsibility>, DomainError>;

    /// User ids responsible for the organization.
    async fn list_responsibles(&self, organization_id: EntityId) -> Result<Vec<EntityId>, DomainError>;
}
