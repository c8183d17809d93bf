//! Repository traits (ports)

pub mod bid_repository;
pub mod memory;
pub mod organization_repository;
pub mod tender_repository;
pub mod version_repository;

pub use bid_repository::BidRepository;
pub use memory::InMemoryStore;
pub use organization_repository::OrganizationRepository;
pub use tender_repository::TenderRepository;
pub use version_repository::VersionRepository;
