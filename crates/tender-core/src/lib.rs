//! # Tender Core
//! 
//! Domain entities, lifecycle rules, repository traits, and services for the
//! tender marketplace: versioned content, status state machines, and quorum
//! approval of bids.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod error;
pub mod marketplace;

// Re-export domain entities
pub use domain::*;
pub use error::{DomainError, ErrorKind};
pub use marketplace::Marketplace;
