// Subscription quota exports
pub mod ledger;
pub mod service;
pub mod tiers;

use thiserror::Error;

use crate::services::StoreError;

pub use ledger::{reconcile, Reconciliation, SubscriptionStatus, UsageLedger};
pub use service::{QuotaDecision, QuotaService, Remaining, SubscriptionView};
pub use tiers::{FeatureKey, Limit, SubscriptionTier, TierRegistry, FREE_TIER};

/// Errors that can occur while enforcing quotas
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    #[error("Invalid tier configuration: {0}")]
    InvalidTier(String),

    #[error("No usage ledger for user {0}")]
    NoLedger(String),

    #[error("Ledger write conflict for user {user_id} after {attempts} attempts")]
    LedgerWriteConflict { user_id: String, attempts: u32 },

    #[error("Ledger store error: {0}")]
    Store(#[from] StoreError),
}
