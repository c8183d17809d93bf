// ============================================================================
// Tender Infrastructure - PostgreSQL Bid Repository
// File: crates/tender-infrastructure/src/database/postgres/bid_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use tender_core::domain::{
    Bid, BidDecision, BidStatus, BidVote, EntityKind, LifecycleStatus, NewBid, TenderStatus, Version,
    VersionContent, VoteDecision,
};
use tender_core::error::DomainError;
use tender_core::repositories::BidRepository;
use tender_shared::{constants::FIRST_VERSION, EntityId};

use super::version_repo_impl::VersionRow;
use super::{corrupt_column, is_foreign_key_violation, store_error, unique_violation};

/// Partial unique index allowing one APPROVE per user and bid.
const SINGLE_APPROVAL_INDEX: &str = "bid_votes_single_approval";

pub struct PgBidRepository {
    pool: PgPool,
}

impl PgBidRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct BidRow {
    pub id: i64,
    pub tender_id: i64,
    pub organization_id: i64,
    pub creator_id: i64,
    pub status: String,
    pub approval_count: i32,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BidRow> for Bid {
    type Error = DomainError;

    fn try_from(row: BidRow) -> Result<Self, Self::Error> {
        let status =
            BidStatus::from_str(&row.status).ok_or_else(|| corrupt_column("bids.status", &row.status))?;
        let approval_count = u32::try_from(row.approval_count)
            .map_err(|_| corrupt_column("bids.approval_count", &row.approval_count.to_string()))?;

        Ok(Bid {
            id: row.id,
            tender_id: row.tender_id,
            organization_id: row.organization_id,
            creator_id: row.creator_id,
            status,
            approval_count,
            revision: row.revision,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct VoteRow {
    pub bid_id: i64,
    pub user_id: i64,
    pub decision: String,
    pub decided_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for BidVote {
    type Error = DomainError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let decision = VoteDecision::from_str(&row.decision)
            .ok_or_else(|| corrupt_column("bid_votes.decision", &row.decision))?;
        Ok(BidVote {
            bid_id: row.bid_id,
            user_id: row.user_id,
            decision,
            decided_at: row.decided_at,
        })
    }
}

fn into_bids(rows: Vec<BidRow>) -> Result<Vec<Bid>, DomainError> {
    rows.into_iter().map(Bid::try_from).collect()
}

async fn exists(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    id: EntityId,
) -> Result<bool, DomainError> {
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", table);
    sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| store_error("checking row existence", e))
}

#[async_trait]
impl BidRepository for PgBidRepository {
    async fn create(&self, bid: &NewBid, content: &VersionContent) -> Result<(Bid, Version), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("starting bid transaction", e))?;

        let row: BidRow = sqlx::query_as(
            r#"
            INSERT INTO bids (tender_id, organization_id, creator_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, tender_id, organization_id, creator_id, status, approval_count, revision, created_at
            "#,
        )
        .bind(bid.tender_id)
        .bind(bid.organization_id)
        .bind(bid.creator_id)
        .bind(bid.status.as_str())
        .bind(bid.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DomainError::TenderNotFound(bid.tender_id)
            } else {
                store_error("creating bid", e)
            }
        })?;

        let created = Bid::try_from(row)?;

        let version: VersionRow = sqlx::query_as(
            r#"
            INSERT INTO bid_versions (bid_id, version, name, description, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING bid_id AS parent_id, version, name, description, NULL::VARCHAR AS service_type, updated_at
            "#,
        )
        .bind(created.id)
        .bind(FIRST_VERSION)
        .bind(&content.name)
        .bind(&content.description)
        .bind(created.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| store_error("creating first bid version", e))?;

        tx.commit()
            .await
            .map_err(|e| store_error("committing bid", e))?;

        info!("Bid {} stored on tender {}", created.id, created.tender_id);
        let version = version.into_version(EntityKind::Bid)?;
        Ok((created, version))
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Bid>, DomainError> {
        let row: Option<BidRow> = sqlx::query_as(
            r#"
            SELECT id, tender_id, organization_id, creator_id, status, approval_count, revision, created_at
            FROM bids
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("finding bid by id", e))?;

        row.map(Bid::try_from).transpose()
    }

    async fn find_by_tender_id(&self, tender_id: EntityId) -> Result<Vec<Bid>, DomainError> {
        let rows: Vec<BidRow> = sqlx::query_as(
            r#"
            SELECT id, tender_id, organization_id, creator_id, status, approval_count, revision, created_at
            FROM bids
            WHERE tender_id = $1
            ORDER BY id
            "#,
        )
        .bind(tender_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("finding bids by tender", e))?;

        into_bids(rows)
    }

    async fn find_by_creator_id(&self, creator_id: EntityId) -> Result<Vec<Bid>, DomainError> {
        let rows: Vec<BidRow> = sqlx::query_as(
            r#"
            SELECT id, tender_id, organization_id, creator_id, status, approval_count, revision, created_at
            FROM bids
            WHERE creator_id = $1
            ORDER BY id
            "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("finding bids by creator", e))?;

        into_bids(rows)
    }

    async fn commit_decision(&self, decision: &BidDecision) -> Result<bool, DomainError> {
        // Returning early drops `tx`, which rolls everything back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("starting decision transaction", e))?;

        // 1. Quorum basis, locked against removal until commit
        if let Some(basis) = &decision.quorum_basis {
            let responsibles: Vec<i64> = sqlx::query_scalar(
                r#"
                SELECT user_id
                FROM organization_responsibles
                WHERE organization_id = $1
                FOR SHARE
                "#,
            )
            .bind(basis.organization_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| store_error("rechecking responsibles", e))?;

            if !basis.holds(&responsibles, decision.vote.user_id) {
                debug!(
                    "Responsibles of organization {} changed since quorum was computed",
                    basis.organization_id
                );
                return Ok(false);
            }
        }

        // 2. Revision-checked bid update
        let updated = sqlx::query(
            r#"
            UPDATE bids
            SET approval_count = $2, status = $3, revision = revision + 1
            WHERE id = $1 AND revision = $4
            "#,
        )
        .bind(decision.bid_id)
        .bind(decision.approval_count as i32)
        .bind(decision.status.as_str())
        .bind(decision.expected_revision)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("updating bid decision", e))?;

        if updated.rows_affected() == 0 {
            if !exists(&mut tx, "bids", decision.bid_id).await? {
                return Err(DomainError::BidNotFound(decision.bid_id));
            }
            debug!(
                "Bid {} moved past revision {}",
                decision.bid_id, decision.expected_revision
            );
            return Ok(false);
        }

        // 3. Vote audit row
        let vote = &decision.vote;
        sqlx::query(
            r#"
            INSERT INTO bid_votes (bid_id, user_id, decision, decided_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(vote.bid_id)
        .bind(vote.user_id)
        .bind(vote.decision.as_str())
        .bind(vote.decided_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) if constraint == SINGLE_APPROVAL_INDEX => DomainError::AlreadyVoted {
                bid_id: vote.bid_id,
                user_id: vote.user_id,
            },
            _ => store_error("recording vote", e),
        })?;

        // 4. Cascading tender close
        if let Some(tender_id) = decision.close_tender {
            let closed = sqlx::query(
                r#"
                UPDATE tenders
                SET status = $2
                WHERE id = $1 AND status IN ($2, $3)
                "#,
            )
            .bind(tender_id)
            .bind(TenderStatus::Closed.as_str())
            .bind(TenderStatus::Published.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| store_error("closing tender", e))?;

            if closed.rows_affected() == 0 {
                if !exists(&mut tx, "tenders", tender_id).await? {
                    return Err(DomainError::TenderNotFound(tender_id));
                }
                debug!("Tender {} is no longer closable", tender_id);
                return Ok(false);
            }
        }

        tx.commit()
            .await
            .map_err(|e| store_error("committing decision", e))?;
        Ok(true)
    }

    async fn list_votes(&self, bid_id: EntityId) -> Result<Vec<BidVote>, DomainError> {
        let rows: Vec<VoteRow> = sqlx::query_as(
            r#"
            SELECT bid_id, user_id, decision, decided_at
            FROM bid_votes
            WHERE bid_id = $1
            ORDER BY id
            "#,
        )
        .bind(bid_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("listing votes", e))?;

        rows.into_iter().map(BidVote::try_from).collect()
    }

    async fn delete(&self, id: EntityId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM bids WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("deleting bid", e))?;

        Ok(result.rows_affected() > 0)
    }
}
