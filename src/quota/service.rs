use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::ledger::{add_months, month_start, reconcile, SubscriptionStatus, UsageLedger};
use super::tiers::{FeatureKey, Limit, TierRegistry};
use super::QuotaError;
use crate::services::{LedgerStore, StoreError};

/// Default number of compare-and-set attempts per operation
pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 5;

/// Units left in the current window, `"unlimited"` on the wire when uncapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Unlimited,
    Count(u32),
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Remaining::Unlimited => serializer.serialize_str("unlimited"),
            Remaining::Count(n) => serializer.serialize_u32(*n),
        }
    }
}

impl<'de> Deserialize<'de> for Remaining {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Ok(Remaining::Count(n)),
            Raw::Text(s) if s == "unlimited" => Ok(Remaining::Unlimited),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a count or \"unlimited\", got {:?}",
                s
            ))),
        }
    }
}

/// Answer to "may this user use this feature now"
///
/// Running out of quota is a normal outcome (`allowed == false`), not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaDecision {
    pub allowed: bool,
    pub remaining: Remaining,
    pub plan_id: String,
    pub feature: FeatureKey,
}

/// What `update` does when the user has no stored ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnMissing {
    /// Persist a fresh free ledger
    Create,
    /// Work on a fresh free ledger without saving it
    Unsaved,
    /// Fail with `QuotaError::NoLedger`
    Reject,
}

/// Reconciled ledger plus the limits of its plan, for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub ledger: UsageLedger,
    pub limits: BTreeMap<FeatureKey, Limit>,
}

/// Quota enforcement - the only component that mutates usage ledgers
///
/// Every operation runs one read-reconcile-modify-write cycle against the
/// ledger store, retried on version conflicts up to `max_write_retries` times.
#[derive(Clone)]
pub struct QuotaService {
    registry: Arc<TierRegistry>,
    store: Arc<dyn LedgerStore>,
    max_write_retries: u32,
}

impl QuotaService {
    pub fn new(registry: Arc<TierRegistry>, store: Arc<dyn LedgerStore>) -> Self {
        Self {
            registry,
            store,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
        }
    }

    pub fn with_max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = retries.max(1);
        self
    }

    pub fn registry(&self) -> &TierRegistry {
        &self.registry
    }

    pub async fn health_check(&self) -> Result<bool, StoreError> {
        self.store.health_check().await
    }

    /// Check whether `user_id` may use `feature` now
    pub async fn check_quota(
        &self,
        user_id: &str,
        feature: FeatureKey,
    ) -> Result<QuotaDecision, QuotaError> {
        self.check_quota_at(user_id, feature, Utc::now()).await
    }

    pub async fn check_quota_at(
        &self,
        user_id: &str,
        feature: FeatureKey,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, QuotaError> {
        let decision = self
            .update(user_id, now, OnMissing::Create, |ledger, registry| {
                decide(ledger, registry, feature)
            })
            .await?;

        tracing::debug!(
            "Quota check for {} on {}: allowed={}, remaining={:?}",
            user_id,
            feature,
            decision.allowed,
            decision.remaining
        );

        Ok(decision)
    }

    /// Record one consumed unit of `feature`
    ///
    /// Callers must have received `allowed == true` from `check_quota` first;
    /// this does not re-check the limit. Fails with `NoLedger` if the user was
    /// never checked.
    pub async fn record_usage(&self, user_id: &str, feature: FeatureKey) -> Result<(), QuotaError> {
        self.record_usage_at(user_id, feature, Utc::now()).await
    }

    pub async fn record_usage_at(
        &self,
        user_id: &str,
        feature: FeatureKey,
        now: DateTime<Utc>,
    ) -> Result<(), QuotaError> {
        let used = self
            .update(user_id, now, OnMissing::Reject, |ledger, _| {
                ledger.increment(feature);
                Ok(ledger.used(feature))
            })
            .await?;

        tracing::debug!("Recorded usage for {} on {} ({} this window)", user_id, feature, used);
        Ok(())
    }

    /// Check and record in a single atomic write
    ///
    /// The returned decision reflects the state after consumption.
    pub async fn consume(&self, user_id: &str, feature: FeatureKey) -> Result<QuotaDecision, QuotaError> {
        self.consume_at(user_id, feature, Utc::now()).await
    }

    pub async fn consume_at(
        &self,
        user_id: &str,
        feature: FeatureKey,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, QuotaError> {
        let decision = self
            .update(user_id, now, OnMissing::Create, |ledger, registry| {
                let decision = decide(ledger, registry, feature)?;
                if !decision.allowed {
                    return Ok(decision);
                }
                ledger.increment(feature);
                decide(ledger, registry, feature).map(|after| QuotaDecision {
                    allowed: true,
                    ..after
                })
            })
            .await?;

        tracing::debug!(
            "Quota consume for {} on {}: allowed={}",
            user_id,
            feature,
            decision.allowed
        );

        Ok(decision)
    }

    /// Activate `plan_id` after a payment the gateway has already confirmed
    pub async fn upgrade(&self, user_id: &str, plan_id: &str, payment_ref: &str) -> Result<UsageLedger, QuotaError> {
        self.upgrade_at(user_id, plan_id, payment_ref, Utc::now()).await
    }

    pub async fn upgrade_at(
        &self,
        user_id: &str,
        plan_id: &str,
        payment_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<UsageLedger, QuotaError> {
        let tier_id = self.registry.get(plan_id)?.id.clone();

        let ledger = self
            .update(user_id, now, OnMissing::Create, |ledger, _| {
                ledger.plan_id = tier_id.clone();
                ledger.status = SubscriptionStatus::Active;
                ledger.expires_at = Some(add_months(now, 1));
                ledger.clear_usage();
                ledger.usage_reset_at = month_start(now);
                Ok(ledger.clone())
            })
            .await?;

        tracing::info!(
            "Upgraded {} to {} (payment {}), expires {:?}",
            user_id,
            ledger.plan_id,
            payment_ref,
            ledger.expires_at
        );

        Ok(ledger)
    }

    /// Cancel at period end; plan and usage stay until `expires_at` passes
    ///
    /// A ledger without a paid period has nothing to cancel and is returned
    /// as is.
    pub async fn cancel(&self, user_id: &str) -> Result<UsageLedger, QuotaError> {
        self.cancel_at(user_id, Utc::now()).await
    }

    pub async fn cancel_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<UsageLedger, QuotaError> {
        let ledger = self
            .update(user_id, now, OnMissing::Reject, |ledger, _| {
                if ledger.expires_at.is_some() {
                    ledger.status = SubscriptionStatus::Cancelled;
                }
                Ok(ledger.clone())
            })
            .await?;

        match ledger.expires_at {
            Some(expires_at) => tracing::info!(
                "Cancelled subscription for {} on {}, effective {}",
                user_id,
                ledger.plan_id,
                expires_at
            ),
            None => tracing::debug!("Nothing to cancel for {} on {}", user_id, ledger.plan_id),
        }

        Ok(ledger)
    }

    /// Reconciled ledger and plan limits for display
    ///
    /// Users without a ledger see the free plan; nothing is stored for them.
    pub async fn status(&self, user_id: &str) -> Result<SubscriptionView, QuotaError> {
        self.status_at(user_id, Utc::now()).await
    }

    pub async fn status_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<SubscriptionView, QuotaError> {
        self.update(user_id, now, OnMissing::Unsaved, |ledger, registry| {
            Ok(SubscriptionView {
                ledger: ledger.clone(),
                limits: registry.get_limits(&ledger.plan_id)?.clone(),
            })
        })
        .await
    }

    /// Single read-modify-write path for every ledger mutation
    ///
    /// Resolves the ledger (what happens for a user without one is up to
    /// `missing`), runs `reconcile`, applies `apply`, and persists with a
    /// version-checked write when anything changed. `apply` may run more than
    /// once on conflict.
    async fn update<T, F>(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        missing: OnMissing,
        mut apply: F,
    ) -> Result<T, QuotaError>
    where
        F: FnMut(&mut UsageLedger, &TierRegistry) -> Result<T, QuotaError>,
    {
        let registry: &TierRegistry = &self.registry;

        for attempt in 1..=self.max_write_retries {
            let (mut ledger, version) = match self.store.load(user_id).await? {
                Some(stored) => (stored.ledger, Some(stored.version)),
                None if missing == OnMissing::Reject => {
                    return Err(QuotaError::NoLedger(user_id.to_string()));
                }
                None => (UsageLedger::new_free(user_id, now), None),
            };
            let before = ledger.clone();

            let reconciliation = reconcile(&mut ledger, now);
            if reconciliation.changed() && version.is_some() {
                tracing::info!(
                    "Reconciled ledger for {}: downgraded={}, reset={}, plan now {}",
                    user_id,
                    reconciliation.downgraded,
                    reconciliation.reset,
                    ledger.plan_id
                );
            }

            let output = apply(&mut ledger, registry)?;

            let write = match version {
                Some(_) if ledger == before => return Ok(output),
                Some(version) => self.store.compare_and_swap(&ledger, version).await,
                None if missing == OnMissing::Unsaved => return Ok(output),
                None => self.store.insert(&ledger).await,
            };

            match write {
                Ok(_) => return Ok(output),
                Err(StoreError::Conflict(reason)) => {
                    tracing::debug!(
                        "Ledger write conflict for {} (attempt {}/{}): {}",
                        user_id,
                        attempt,
                        self.max_write_retries,
                        reason
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            "Giving up on ledger update for {} after {} conflicting attempts",
            user_id,
            self.max_write_retries
        );

        Err(QuotaError::LedgerWriteConflict {
            user_id: user_id.to_string(),
            attempts: self.max_write_retries,
        })
    }
}

fn decide(ledger: &UsageLedger, registry: &TierRegistry, feature: FeatureKey) -> Result<QuotaDecision, QuotaError> {
    let limit = registry.limit(&ledger.plan_id, feature)?;
    let used = ledger.used(feature);

    let (allowed, remaining) = match limit {
        Limit::Unlimited => (true, Remaining::Unlimited),
        Limit::Count(max) => (used < max, Remaining::Count(max.saturating_sub(used))),
    };

    Ok(QuotaDecision {
        allowed,
        remaining,
        plan_id: ledger.plan_id.clone(),
        feature,
    })
}
