//! Tender domain entity

use serde::{Deserialize, Serialize};
use tender_shared::{types::now, EntityId, Timestamp};
use validator::Validate;

use super::service_type::ServiceType;
use super::status::TenderStatus;
use super::version::{Version, VersionContent};
use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tender {
    pub id: EntityId,
    pub organization_id: EntityId,
    pub creator_id: EntityId,
    pub status: TenderStatus,
    /// Mirrors the service type of the latest version.
    pub service_type: ServiceType,
    pub created_at: Timestamp,
}

impl Tender {
    pub fn is_closed(&self) -> bool {
        self.status == TenderStatus::Closed
    }
}

/// Tender row to insert; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTender {
    pub organization_id: EntityId,
    pub creator_id: EntityId,
    pub status: TenderStatus,
    pub service_type: ServiceType,
    pub created_at: Timestamp,
}

impl NewTender {
    pub fn new(organization_id: EntityId, creator_id: EntityId, service_type: ServiceType) -> Self {
        Self {
            organization_id,
            creator_id,
            status: TenderStatus::default(),
            service_type,
            created_at: now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTender {
    #[validate(range(min = 1))]
    pub organization_id: EntityId,

    #[validate(range(min = 1))]
    pub creator_id: EntityId,

    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
}

impl CreateTender {
    /// Validates the ids and splits the request into the row and its first version.
    pub fn into_parts(self) -> Result<(NewTender, VersionContent), DomainError> {
        self.validate()?;
        let content = VersionContent::for_tender(self.name, self.description, self.service_type)?;
        Ok((
            NewTender::new(self.organization_id, self.creator_id, self.service_type),
            content,
        ))
    }
}

/// Partial content update; `None` keeps the current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTender {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<ServiceType>,
}

/// A tender together with its current content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenderView {
    pub id: EntityId,
    pub organization_id: EntityId,
    pub creator_id: EntityId,
    pub status: TenderStatus,
    pub service_type: ServiceType,
    pub name: String,
    pub description: String,
    pub version: i32,
    pub created_at: Timestamp,
}

impl TenderView {
    pub fn new(tender: Tender, version: Version) -> Self {
        Self {
            id: tender.id,
            organization_id: tender.organization_id,
            creator_id: tender.creator_id,
            status: tender.status,
            service_type: version.content.service_type.unwrap_or(tender.service_type),
            name: version.content.name,
            description: version.content.description,
            version: version.number,
            created_at: tender.created_at,
        }
    }
}
