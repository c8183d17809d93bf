//! Common types

use chrono::{DateTime, Utc};

/// Primary key of tenders, bids, users and organizations.
pub type EntityId = i64;

pub type Timestamp = DateTime<Utc>;

pub fn now() -> Timestamp {
    Utc::now()
}

