// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AcademicProfile, MatchCategory, MatchDetails, MatchResult, RankedUniversity, ScoringWeights,
    UniversityFilter, UniversityRecord, UniversityType,
};
pub use requests::{CancelRequest, FindMatchesRequest, QuotaRequest, RankRequest, UpgradeRequest};
pub use responses::{ErrorResponse, HealthResponse, RankResponse, RecordUsageResponse, TiersResponse};
