use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{AcademicProfile, UniversityFilter, UniversityRecord};
use crate::quota::FeatureKey;

/// Request to rank a supplied candidate set
///
/// `profile` may be null when the caller's profile store had no record;
/// that is reported as invalid input rather than a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    #[serde(default)]
    pub profile: Option<AcademicProfile>,
    #[serde(default)]
    pub candidates: Vec<UniversityRecord>,
    pub limit: Option<usize>,
}

/// Request to rank the catalog for a stored profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FindMatchesRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(default)]
    pub filter: UniversityFilter,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 200))]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Request naming a user and a metered feature
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuotaRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
    pub feature: FeatureKey,
}

/// Request to move a user onto a paid tier
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "plan_id")]
    pub plan_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "payment_ref")]
    pub payment_ref: String,
}

/// Request to cancel a subscription at the end of its period
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
}
