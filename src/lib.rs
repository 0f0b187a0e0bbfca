//! uni-match - University compatibility scoring and subscription quotas
//!
//! Scores how well a student's academic profile fits a university's
//! admission requirements, ranks candidate universities, and enforces
//! per-tier monthly usage quotas for metered features.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod quota;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{calculate_match, MatchError, Matcher, RankResult};
pub use models::{
    AcademicProfile, MatchCategory, MatchResult, RankedUniversity, ScoringWeights, UniversityRecord,
};
pub use quota::{FeatureKey, QuotaDecision, QuotaError, QuotaService, TierRegistry, UsageLedger};
