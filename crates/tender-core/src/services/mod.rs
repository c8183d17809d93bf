//! Domain services (business logic)

pub mod authorization;
pub mod bid_service;
pub mod quorum;
pub mod retry;
pub mod tender_service;
pub mod version_ledger;

pub use authorization::AuthorizationGate;
pub use bid_service::BidService;
pub use quorum::QuorumEngine;
pub use retry::RetryPolicy;
pub use tender_service::TenderService;
pub use version_ledger::VersionLedger;
