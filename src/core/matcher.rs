use std::cmp::Ordering;
use thiserror::Error;

use crate::core::{filters::matches_preferences, scoring::calculate_match};
use crate::models::{AcademicProfile, RankedUniversity, ScoringWeights, UniversityRecord};

/// Errors raised by the ranking pipeline
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result of the ranking process
#[derive(Debug)]
pub struct RankResult {
    pub matches: Vec<RankedUniversity>,
    pub total_candidates: usize,
    pub rejected: usize,
}

/// Ranking orchestrator - applies the scoring engine across a candidate set
///
/// # Pipeline Stages
/// 1. Profile validation
/// 2. Candidate validation (malformed records are skipped)
/// 3. Hard preference filters (country, field of study)
/// 4. Scoring and ranking
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Rank candidate universities for a profile
    ///
    /// # Arguments
    /// * `profile` - The student's academic profile, `None` when the store had none
    /// * `candidates` - Universities to consider
    /// * `limit` - Optional cap on the number of ranked results
    ///
    /// # Returns
    /// RankResult with results sorted by score (desc), overall ranking (asc,
    /// unranked last) and name (asc)
    pub fn rank(
        &self,
        profile: Option<&AcademicProfile>,
        candidates: Vec<UniversityRecord>,
        limit: Option<usize>,
    ) -> Result<RankResult, MatchError> {
        let profile = profile
            .ok_or_else(|| MatchError::InvalidInput("profile is required".to_string()))?;

        profile
            .check()
            .map_err(|e| MatchError::InvalidInput(format!("profile: {}", e)))?;

        let total_candidates = candidates.len();
        let mut rejected = 0;

        let mut ranked: Vec<RankedUniversity> = candidates
            .into_iter()
            .filter(|university| match university.check() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Skipping malformed university {}: {}", university.id, e);
                    rejected += 1;
                    false
                }
            })
            .filter(|university| matches_preferences(university, profile))
            .map(|university| {
                let match_result = calculate_match(profile, &university, &self.weights);
                RankedUniversity {
                    university,
                    match_result,
                }
            })
            .collect();

        ranked.sort_by(compare_ranked);

        if let Some(limit) = limit {
            ranked.truncate(limit);
        }

        Ok(RankResult {
            matches: ranked,
            total_candidates,
            rejected,
        })
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

fn compare_ranked(a: &RankedUniversity, b: &RankedUniversity) -> Ordering {
    b.match_result
        .score
        .cmp(&a.match_result.score)
        .then_with(|| {
            match (a.university.ranking_overall, b.university.ranking_overall) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
        .then_with(|| a.university.name.cmp(&b.university.name))
}
