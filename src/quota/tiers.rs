use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use super::QuotaError;

/// Tier every user starts on and falls back to when a paid plan expires
pub const FREE_TIER: &str = "free";

/// Raw limit value meaning "no cap"
pub const UNLIMITED: i64 = -1;

/// Metered features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKey {
    // config lowercases keys read from files and the environment
    #[serde(alias = "pathwayspermonth")]
    PathwaysPerMonth,
    Comparisons,
    #[serde(alias = "pdfexports")]
    PdfExports,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 3] = [
        FeatureKey::PathwaysPerMonth,
        FeatureKey::Comparisons,
        FeatureKey::PdfExports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::PathwaysPerMonth => "pathwaysPerMonth",
            FeatureKey::Comparisons => "comparisons",
            FeatureKey::PdfExports => "pdfExports",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown feature: {}", s))
    }
}

/// Per-feature allowance; serialized as a count with -1 for unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Limit {
    Unlimited,
    Count(u32),
}

impl TryFrom<i64> for Limit {
    type Error = String;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            UNLIMITED => Ok(Limit::Unlimited),
            n if n >= 0 => u32::try_from(n)
                .map(Limit::Count)
                .map_err(|_| format!("limit {} is too large", n)),
            n => Err(format!("limit {} is invalid, use -1 for unlimited", n)),
        }
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Unlimited => UNLIMITED,
            Limit::Count(n) => n as i64,
        }
    }
}

/// Immutable plan definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    pub id: String,
    pub limits: BTreeMap<FeatureKey, Limit>,
}

impl SubscriptionTier {
    fn new(id: &str, limits: [(FeatureKey, Limit); 3]) -> Self {
        Self {
            id: id.to_string(),
            limits: limits.into_iter().collect(),
        }
    }

    /// Limit for a feature; a feature missing from the table is not granted
    pub fn limit(&self, feature: FeatureKey) -> Limit {
        self.limits.get(&feature).copied().unwrap_or(Limit::Count(0))
    }
}

/// Source of truth for plan limits, built once at startup
#[derive(Debug, Clone)]
pub struct TierRegistry {
    tiers: BTreeMap<String, SubscriptionTier>,
}

impl TierRegistry {
    /// Registry with the built-in free/premium/pro plans
    pub fn with_defaults() -> Self {
        use FeatureKey::*;
        use Limit::*;

        let tiers = [
            SubscriptionTier::new(
                FREE_TIER,
                [(PathwaysPerMonth, Count(1)), (Comparisons, Count(3)), (PdfExports, Count(0))],
            ),
            SubscriptionTier::new(
                "premium",
                [(PathwaysPerMonth, Unlimited), (Comparisons, Count(10)), (PdfExports, Unlimited)],
            ),
            SubscriptionTier::new(
                "pro",
                [(PathwaysPerMonth, Unlimited), (Comparisons, Unlimited), (PdfExports, Unlimited)],
            ),
        ];

        Self {
            tiers: tiers.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Built-in plans with per-tier overrides from configuration
    ///
    /// Overrides replace individual feature limits and may declare new tiers.
    pub fn with_overrides(
        overrides: &HashMap<String, HashMap<FeatureKey, i64>>,
    ) -> Result<Self, QuotaError> {
        let mut registry = Self::with_defaults();

        for (tier_id, limits) in overrides {
            let tier_id = tier_id.trim().to_lowercase();
            if tier_id.is_empty() {
                return Err(QuotaError::InvalidTier("tier id must not be empty".to_string()));
            }

            let tier = registry
                .tiers
                .entry(tier_id.clone())
                .or_insert_with(|| SubscriptionTier {
                    id: tier_id.clone(),
                    limits: BTreeMap::new(),
                });

            for (feature, raw) in limits {
                let limit = Limit::try_from(*raw)
                    .map_err(|e| QuotaError::InvalidTier(format!("{}.{}: {}", tier_id, feature, e)))?;
                tier.limits.insert(*feature, limit);
            }
        }

        Ok(registry)
    }

    pub fn get(&self, tier_id: &str) -> Result<&SubscriptionTier, QuotaError> {
        self.tiers
            .get(tier_id)
            .ok_or_else(|| QuotaError::UnknownTier(tier_id.to_string()))
    }

    pub fn get_limits(&self, tier_id: &str) -> Result<&BTreeMap<FeatureKey, Limit>, QuotaError> {
        self.get(tier_id).map(|tier| &tier.limits)
    }

    pub fn limit(&self, tier_id: &str, feature: FeatureKey) -> Result<Limit, QuotaError> {
        self.get(tier_id).map(|tier| tier.limit(feature))
    }

    pub fn contains(&self, tier_id: &str) -> bool {
        self.tiers.contains_key(tier_id)
    }

    pub fn list(&self) -> impl Iterator<Item = &SubscriptionTier> {
        self.tiers.values()
    }
}

impl Default for TierRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
