// ============================================================================
// Tender Core - Tender Service
// File: crates/tender-core/src/services/tender_service.rs
// ============================================================================
//! Tender creation, content versioning and publication lifecycle

use std::sync::Arc;
use std::time::Duration;

use tender_shared::EntityId;
use tracing::{info, warn};

use super::authorization::AuthorizationGate;
use super::retry::{retry_on_conflict, with_deadline, RetryPolicy};
use super::version_ledger::VersionLedger;
use crate::domain::{
    transition, CreateTender, EntityKind, LifecycleStatus, ServiceType, Tender, TenderStatus,
    TenderView, UpdateTender, Version,
};
use crate::error::DomainError;
use crate::repositories::{OrganizationRepository, TenderRepository, VersionRepository};

pub struct TenderService<T, V, O>
where
    T: TenderRepository,
    V: VersionRepository,
    O: OrganizationRepository,
{
    tender_repo: Arc<T>,
    ledger: Arc<VersionLedger<V>>,
    gate: Arc<AuthorizationGate<O>>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl<T, V, O> TenderService<T, V, O>
where
    T: TenderRepository,
    V: VersionRepository,
    O: OrganizationRepository,
{
    pub fn new(
        tender_repo: Arc<T>,
        ledger: Arc<VersionLedger<V>>,
        gate: Arc<AuthorizationGate<O>>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            tender_repo,
            ledger,
            gate,
            retry,
            timeout,
        }
    }

    /// Creates a tender in `CREATED` together with version 1. The creator must
    /// be responsible for the organization.
    pub async fn create_tender(&self, request: CreateTender) -> Result<TenderView, DomainError> {
        with_deadline(self.timeout, "create_tender", async {
            let (new_tender, content) = request.into_parts()?;

            self.gate
                .ensure_responsible(new_tender.creator_id, new_tender.organization_id)
                .await?;

            let (tender, version) = self.tender_repo.create(&new_tender, &content).await?;
            info!(
                "Tender {} created for organization {} by user {}",
                tender.id, tender.organization_id, tender.creator_id
            );
            Ok::<_, DomainError>(TenderView::new(tender, version))
        })
        .await
    }

    /// Appends a new version when the merged content differs from the latest one.
    pub async fn update_tender(&self, id: EntityId, update: UpdateTender) -> Result<TenderView, DomainError> {
        with_deadline(self.timeout, "update_tender", async {
            let mut tender = self.load(id).await?;
            let version = self
                .ledger
                .update_with(EntityKind::Tender, id, |current| {
                    current.merge(
                        update.name.clone(),
                        update.description.clone(),
                        update.service_type,
                    )
                })
                .await?;
            if let Some(service_type) = version.content.service_type {
                tender.service_type = service_type;
            }
            Ok::<_, DomainError>(TenderView::new(tender, version))
        })
        .await
    }

    pub async fn get_tender(&self, id: EntityId) -> Result<TenderView, DomainError> {
        with_deadline(self.timeout, "get_tender", async {
            let tender = self.load(id).await?;
            self.view(tender).await
        })
        .await
    }

    pub async fn list_tenders(&self, service_type: Option<ServiceType>) -> Result<Vec<TenderView>, DomainError> {
        with_deadline(self.timeout, "list_tenders", async {
            let tenders = self.tender_repo.list(service_type).await?;
            self.views(tenders).await
        })
        .await
    }

    pub async fn tenders_by_creator(&self, creator_id: EntityId) -> Result<Vec<TenderView>, DomainError> {
        with_deadline(self.timeout, "tenders_by_creator", async {
            let tenders = self.tender_repo.find_by_creator_id(creator_id).await?;
            self.views(tenders).await
        })
        .await
    }

    pub async fn publish_tender(&self, id: EntityId) -> Result<TenderView, DomainError> {
        with_deadline(self.timeout, "publish_tender", async {
            let tender = retry_on_conflict(self.retry, "publish_tender", || {
                self.change_status(id, TenderStatus::Published)
            })
            .await?;
            self.view(tender).await
        })
        .await
    }

    /// Closing an already closed tender succeeds without writing.
    pub async fn close_tender(&self, id: EntityId) -> Result<TenderView, DomainError> {
        with_deadline(self.timeout, "close_tender", async {
            let tender = retry_on_conflict(self.retry, "close_tender", || {
                self.change_status(id, TenderStatus::Closed)
            })
            .await?;
            self.view(tender).await
        })
        .await
    }

    pub async fn rollback_tender(&self, id: EntityId, version: i32) -> Result<TenderView, DomainError> {
        with_deadline(self.timeout, "rollback_tender", async {
            let mut tender = self.load(id).await?;
            let restored = self.ledger.rollback_to(EntityKind::Tender, id, version).await?;
            if let Some(service_type) = restored.content.service_type {
                tender.service_type = service_type;
            }
            info!(
                "Tender {} rolled back to version {} as version {}",
                id, version, restored.number
            );
            Ok::<_, DomainError>(TenderView::new(tender, restored))
        })
        .await
    }

    pub async fn tender_history(&self, id: EntityId) -> Result<Vec<Version>, DomainError> {
        with_deadline(self.timeout, "tender_history", async {
            self.ledger.history(EntityKind::Tender, id).await
        })
        .await
    }

    pub async fn tender_version(&self, id: EntityId, version: i32) -> Result<Version, DomainError> {
        with_deadline(self.timeout, "tender_version", async {
            self.ledger
                .version_by_number(EntityKind::Tender, id, version)
                .await
        })
        .await
    }

    /// Removes the tender with its history and all of its bids.
    pub async fn delete_tender(&self, id: EntityId) -> Result<(), DomainError> {
        with_deadline(self.timeout, "delete_tender", async {
            if !self.tender_repo.delete(id).await? {
                return Err(DomainError::TenderNotFound(id));
            }
            info!("Tender {} deleted", id);
            Ok::<_, DomainError>(())
        })
        .await
    }

    async fn change_status(&self, id: EntityId, target: TenderStatus) -> Result<Tender, DomainError> {
        let mut tender = self.load(id).await?;
        if target == TenderStatus::Closed && tender.is_closed() {
            return Ok(tender);
        }

        let next = transition(tender.status, target).map_err(|e| {
            warn!("Tender {} rejected status change: {}", id, e);
            e
        })?;
        if !self.tender_repo.update_status(id, tender.status, next).await? {
            return Err(DomainError::ConcurrentModification(format!(
                "tender {} left status {}",
                id,
                tender.status.as_str()
            )));
        }

        info!("Tender {} moved {} -> {}", id, tender.status.as_str(), next.as_str());
        tender.status = next;
        Ok(tender)
    }

    async fn load(&self, id: EntityId) -> Result<Tender, DomainError> {
        self.tender_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::TenderNotFound(id))
    }

    async fn view(&self, tender: Tender) -> Result<TenderView, DomainError> {
        let version = self.ledger.latest_version(EntityKind::Tender, tender.id).await?;
        Ok(TenderView::new(tender, version))
    }

    async fn views(&self, tenders: Vec<Tender>) -> Result<Vec<TenderView>, DomainError> {
        let mut views = Vec::with_capacity(tenders.len());
        for tender in tenders {
            views.push(self.view(tender).await?);
        }
        Ok(views)
    }
}
