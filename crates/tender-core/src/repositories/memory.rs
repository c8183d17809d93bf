//! In-memory adapter for all repository ports.
//!
//! One `RwLock` guards the whole state, so every trait method is a single
//! atomic step. Used by tests and by embedders without a database.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use tender_shared::{constants::FIRST_VERSION, EntityId};

use super::{BidRepository, OrganizationRepository, TenderRepository, VersionRepository};
use crate::domain::{
    Bid, BidDecision, BidVote, EntityKind, NewBid, NewTender, OrganizationResponsibility, ServiceType,
    Tender, TenderStatus, Version, VersionContent, VoteDecision,
};
use crate::error::DomainError;

#[derive(Default)]
struct MemoryState {
    last_tender_id: EntityId,
    last_bid_id: EntityId,
    tenders: BTreeMap<EntityId, Tender>,
    bids: BTreeMap<EntityId, Bid>,
    versions: HashMap<(EntityKind, EntityId), Vec<Version>>,
    votes: HashMap<EntityId, Vec<BidVote>>,
    responsibles: HashMap<EntityId, BTreeSet<EntityId>>,
}

impl MemoryState {
    fn parent_exists(&self, kind: EntityKind, parent_id: EntityId) -> bool {
        match kind {
            EntityKind::Tender => self.tenders.contains_key(&parent_id),
            EntityKind::Bid => self.bids.contains_key(&parent_id),
        }
    }

    fn remove_bid(&mut self, bid_id: EntityId) -> bool {
        self.versions.remove(&(EntityKind::Bid, bid_id));
        self.votes.remove(&bid_id);
        self.bids.remove(&bid_id).is_some()
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_responsibility(&self, organization_id: EntityId, user_id: EntityId) {
        self.state
            .write()
            .responsibles
            .entry(organization_id)
            .or_default()
            .insert(user_id);
    }

    pub fn revoke_responsibility(&self, organization_id: EntityId, user_id: EntityId) {
        if let Some(users) = self.state.write().responsibles.get_mut(&organization_id) {
            users.remove(&user_id);
        }
    }
}

#[async_trait]
impl TenderRepository for InMemoryStore {
    async fn create(
        &self,
        tender: &NewTender,
        content: &VersionContent,
    ) -> Result<(Tender, Version), DomainError> {
        let mut state = self.state.write();
        state.last_tender_id += 1;

        let created = Tender {
            id: state.last_tender_id,
            organization_id: tender.organization_id,
            creator_id: tender.creator_id,
            status: tender.status,
            service_type: tender.service_type,
            created_at: tender.created_at,
        };
        let version = Version::new(EntityKind::Tender, created.id, FIRST_VERSION, content.clone());

        state.tenders.insert(created.id, created.clone());
        state
            .versions
            .insert((EntityKind::Tender, created.id), vec![version.clone()]);
        Ok((created, version))
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Tender>, DomainError> {
        Ok(self.state.read().tenders.get(&id).cloned())
    }

    async fn list(&self, service_type: Option<ServiceType>) -> Result<Vec<Tender>, DomainError> {
        Ok(self
            .state
            .read()
            .tenders
            .values()
            .filter(|t| service_type.map_or(true, |s| t.service_type == s))
            .cloned()
            .collect())
    }

    async fn find_by_creator_id(&self, creator_id: EntityId) -> Result<Vec<Tender>, DomainError> {
        Ok(self
            .state
            .read()
            .tenders
            .values()
            .filter(|t| t.creator_id == creator_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: EntityId,
        expected: TenderStatus,
        target: TenderStatus,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.write();
        match state.tenders.get_mut(&id) {
            Some(tender) if tender.status == expected => {
                tender.status = target;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(DomainError::TenderNotFound(id)),
        }
    }

    async fn delete(&self, id: EntityId) -> Result<bool, DomainError> {
        let mut state = self.state.write();
        let bid_ids: Vec<EntityId> = state
            .bids
            .values()
            .filter(|b| b.tender_id == id)
            .map(|b| b.id)
            .collect();
        for bid_id in bid_ids {
            state.remove_bid(bid_id);
        }
        state.versions.remove(&(EntityKind::Tender, id));
        Ok(state.tenders.remove(&id).is_some())
    }
}

#[async_trait]
impl BidRepository for InMemoryStore {
    async fn create(&self, bid: &NewBid, content: &VersionContent) -> Result<(Bid, Version), DomainError> {
        let mut state = self.state.write();
        if !state.tenders.contains_key(&bid.tender_id) {
            return Err(DomainError::TenderNotFound(bid.tender_id));
        }
        state.last_bid_id += 1;

        let created = Bid {
            id: state.last_bid_id,
            tender_id: bid.tender_id,
            organization_id: bid.organization_id,
            creator_id: bid.creator_id,
            status: bid.status,
            approval_count: 0,
            revision: 0,
            created_at: bid.created_at,
        };
        let version = Version::new(EntityKind::Bid, created.id, FIRST_VERSION, content.clone());

        state.bids.insert(created.id, created.clone());
        state
            .versions
            .insert((EntityKind::Bid, created.id), vec![version.clone()]);
        Ok((created, version))
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Bid>, DomainError> {
        Ok(self.state.read().bids.get(&id).cloned())
    }

    async fn find_by_tender_id(&self, tender_id: EntityId) -> Result<Vec<Bid>, DomainError> {
        Ok(self
            .state
            .read()
            .bids
            .values()
            .filter(|b| b.tender_id == tender_id)
            .cloned()
            .collect())
    }

    async fn find_by_creator_id(&self, creator_id: EntityId) -> Result<Vec<Bid>, DomainError> {
        Ok(self
            .state
            .read()
            .bids
            .values()
            .filter(|b| b.creator_id == creator_id)
            .cloned()
            .collect())
    }

    async fn commit_decision(&self, decision: &BidDecision) -> Result<bool, DomainError> {
        let mut state = self.state.write();

        let revision = state
            .bids
            .get(&decision.bid_id)
            .map(|b| b.revision)
            .ok_or(DomainError::BidNotFound(decision.bid_id))?;
        if revision != decision.expected_revision {
            return Ok(false);
        }

        let vote = &decision.vote;
        if let Some(basis) = &decision.quorum_basis {
            let responsibles = state.responsibles.get(&basis.organization_id);
            if !basis.holds(responsibles.into_iter().flatten(), vote.user_id) {
                return Ok(false);
            }
        }

        if vote.decision == VoteDecision::Approve {
            let already = state.votes.get(&decision.bid_id).is_some_and(|votes| {
                votes
                    .iter()
                    .any(|v| v.user_id == vote.user_id && v.decision == VoteDecision::Approve)
            });
            if already {
                return Err(DomainError::AlreadyVoted {
                    bid_id: decision.bid_id,
                    user_id: vote.user_id,
                });
            }
        }

        if let Some(tender_id) = decision.close_tender {
            let tender = state
                .tenders
                .get_mut(&tender_id)
                .ok_or(DomainError::TenderNotFound(tender_id))?;
            match tender.status {
                TenderStatus::Published => tender.status = TenderStatus::Closed,
                TenderStatus::Closed => {}
                TenderStatus::Created => return Ok(false),
            }
        }

        if let Some(bid) = state.bids.get_mut(&decision.bid_id) {
            decision.apply_to(bid);
        }
        state.votes.entry(decision.bid_id).or_default().push(vote.clone());
        Ok(true)
    }

    async fn list_votes(&self, bid_id: EntityId) -> Result<Vec<BidVote>, DomainError> {
        Ok(self.state.read().votes.get(&bid_id).cloned().unwrap_or_default())
    }

    async fn delete(&self, id: EntityId) -> Result<bool, DomainError> {
        Ok(self.state.write().remove_bid(id))
    }
}

#[async_trait]
impl VersionRepository for InMemoryStore {
    async fn parent_exists(&self, kind: EntityKind, parent_id: EntityId) -> Result<bool, DomainError> {
        Ok(self.state.read().parent_exists(kind, parent_id))
    }

    async fn max_version_number(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
    ) -> Result<Option<i32>, DomainError> {
        Ok(self
            .state
            .read()
            .versions
            .get(&(kind, parent_id))
            .and_then(|versions| versions.iter().map(|v| v.number).max()))
    }

    async fn insert_version(&self, version: &Version) -> Result<(), DomainError> {
        let mut state = self.state.write();
        if !state.parent_exists(version.kind, version.parent_id) {
            return Err(DomainError::not_found(version.kind, version.parent_id));
        }

        let history = state.versions.entry((version.kind, version.parent_id)).or_default();
        if history.iter().any(|v| v.number == version.number) {
            return Err(DomainError::ConcurrentModification(format!(
                "{} {} version {} already exists",
                version.kind, version.parent_id, version.number
            )));
        }
        history.push(version.clone());
        history.sort_by_key(|v| v.number);

        if let (EntityKind::Tender, Some(service_type)) = (version.kind, version.content.service_type) {
            if let Some(tender) = state.tenders.get_mut(&version.parent_id) {
                tender.service_type = service_type;
            }
        }
        Ok(())
    }

    async fn latest_version(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
    ) -> Result<Option<Version>, DomainError> {
        Ok(self
            .state
            .read()
            .versions
            .get(&(kind, parent_id))
            .and_then(|versions| versions.iter().max_by_key(|v| v.number).cloned()))
    }

    async fn find_version(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        number: i32,
    ) -> Result<Option<Version>, DomainError> {
        Ok(self
            .state
            .read()
            .versions
            .get(&(kind, parent_id))
            .and_then(|versions| versions.iter().find(|v| v.number == number).cloned()))
    }

    async fn list_versions(&self, kind: EntityKind, parent_id: EntityId) -> Result<Vec<Version>, DomainError> {
        Ok(self
            .state
            .read()
            .versions
            .get(&(kind, parent_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryStore {
    async fn find_responsibility(
        &self,
        user_id: EntityId,
        organization_id: EntityId,
    ) -> Result<Option<OrganizationResponsibility>, DomainError> {
        let state = self.state.read();
        let found = state
            .responsibles
            .get(&organization_id)
            .is_some_and(|users| users.contains(&user_id));
        Ok(found.then_some(OrganizationResponsibility {
            organization_id,
            user_id,
        }))
    }

    async fn list_responsibles(&self, organization_id: EntityId) -> Result<Vec<EntityId>, DomainError> {
        Ok(self
            .state
            .read()
            .responsibles
            .get(&organization_id)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default())
    }
}
