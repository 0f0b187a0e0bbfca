// Core algorithm exports
pub mod filters;
pub mod matcher;
pub mod scoring;

pub use filters::{matches_country, matches_fields, matches_preferences};
pub use matcher::{MatchError, Matcher, RankResult};
pub use scoring::calculate_match;
