pub mod emi;
pub mod memory_repository;
pub mod repository;
pub mod routes;
pub mod seed;

pub use memory_repository::InMemoryLedgerRepository;
pub use repository::LedgerRepository;
pub use seed::SeedDocument;
