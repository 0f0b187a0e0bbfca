use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::quota::UsageLedger;

/// Errors that can occur when reading or writing usage ledgers
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// A ledger together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedLedger {
    pub ledger: UsageLedger,
    pub version: i64,
}

/// Backing store for usage ledgers
///
/// Writes are conditional on the version that was read, so two concurrent
/// read-modify-write cycles on the same user cannot silently overwrite each
/// other: the loser gets `StoreError::Conflict` and must re-read.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the ledger for a user, if one exists
    async fn load(&self, user_id: &str) -> Result<Option<VersionedLedger>, StoreError>;

    /// Create a ledger; fails with `Conflict` if the user already has one
    async fn insert(&self, ledger: &UsageLedger) -> Result<i64, StoreError>;

    /// Replace a ledger only if it is still at `expected_version`
    async fn compare_and_swap(
        &self,
        ledger: &UsageLedger,
        expected_version: i64,
    ) -> Result<i64, StoreError>;

    /// Health check for the backing store
    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Process-local ledger store
///
/// Used for tests and single-instance development setups.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    ledgers: RwLock<HashMap<String, VersionedLedger>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ledger_count(&self) -> usize {
        self.ledgers.read().await.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn load(&self, user_id: &str) -> Result<Option<VersionedLedger>, StoreError> {
        Ok(self.ledgers.read().await.get(user_id).cloned())
    }

    async fn insert(&self, ledger: &UsageLedger) -> Result<i64, StoreError> {
        let mut ledgers = self.ledgers.write().await;
        if ledgers.contains_key(&ledger.user_id) {
            return Err(StoreError::Conflict(format!(
                "ledger for {} already exists",
                ledger.user_id
            )));
        }

        ledgers.insert(
            ledger.user_id.clone(),
            VersionedLedger {
                ledger: ledger.clone(),
                version: 1,
            },
        );
        Ok(1)
    }

    async fn compare_and_swap(
        &self,
        ledger: &UsageLedger,
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        let mut ledgers = self.ledgers.write().await;
        let current = ledgers.get_mut(&ledger.user_id).ok_or_else(|| {
            StoreError::Conflict(format!("ledger for {} disappeared", ledger.user_id))
        })?;

        if current.version != expected_version {
            return Err(StoreError::Conflict(format!(
                "ledger for {} is at version {}, expected {}",
                ledger.user_id, current.version, expected_version
            )));
        }

        current.ledger = ledger.clone();
        current.version += 1;
        Ok(current.version)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
