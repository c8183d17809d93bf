//! Tender repository trait (port)

use async_trait::async_trait;
use tender_shared::EntityId;

use crate::domain::{NewTender, ServiceType, Tender, TenderStatus, Version, VersionContent};
use crate::error::DomainError;

#[async_trait]
pub trait TenderRepository: Send + Sync {
    /// Inserts the tender and its version 1 in one write.
    async fn create(
        &self,
        tender: &NewTender,
        content: &VersionContent,
    ) -> Result<(Tender, Version), DomainError>;

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Tender>, DomainError>;

    /// All tenders, optionally restricted to one service type, ordered by id.
    async fn list(&self, service_type: Option<ServiceType>) -> Result<Vec<Tender>, DomainError>;

    async fn find_by_creator_id(&self, creator_id: EntityId) -> Result<Vec<Tender>, DomainError>;

    /// Compare-and-set: writes `target` only while the row is still at
    /// `expected`. Returns `false` when the row moved on.
    async fn update_status(
        &self,
        id: EntityId,
        expected: TenderStatus,
        target: TenderStatus,
    ) -> Result<bool, DomainError>;

    /// Removes the tender with its versions, bids, bid versions and votes.
    async fn delete(&self, id: EntityId) -> Result<bool, DomainError>;
}
