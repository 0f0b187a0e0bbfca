// Service exports
pub mod cache;
pub mod catalog;
pub mod ledger_store;
pub mod postgres;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use catalog::{CatalogClient, CatalogCollections, CatalogError};
pub use ledger_store::{InMemoryLedgerStore, LedgerStore, StoreError, VersionedLedger};
pub use postgres::{PostgresLedgerStore, StatusColumn};
