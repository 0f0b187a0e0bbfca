use serde::{Deserialize, Serialize};

use crate::models::domain::RankedUniversity;
use crate::quota::{FeatureKey, SubscriptionTier};
use crate::services::CacheStats;

/// Response for the ranking endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankResponse {
    pub matches: Vec<RankedUniversity>,
    pub total_candidates: usize,
    pub rejected: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub ledger_store: bool,
    pub cache: Option<CacheStats>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Record usage response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsageResponse {
    pub success: bool,
    pub user_id: String,
    pub feature: FeatureKey,
}

/// Tier listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiersResponse {
    pub tiers: Vec<SubscriptionTier>,
}
