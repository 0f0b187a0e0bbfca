use crate::models::{AcademicProfile, MatchCategory, MatchDetails, MatchResult, ScoringWeights, UniversityRecord};

/// Running tally of earned points against the points that were on offer
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    score: u32,
    max_score: u32,
}

impl Tally {
    #[inline]
    fn add(&mut self, earned: u32, possible: u32) {
        self.score += earned;
        self.max_score += possible;
    }

    fn percentage(&self) -> u8 {
        if self.max_score == 0 {
            return 0;
        }
        let pct = (100.0 * self.score as f64 / self.max_score as f64).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

/// Calculate the compatibility (0-100) of a profile with a university
///
/// Scoring formula, evaluated per dimension only when both sides expose it:
///   cgpa     ratio >= 1.0 -> w, >= 0.9 -> 3w/4, >= 0.8 -> w/2
///   english  best of IELTS/TOEFL: ratio >= 1.0 -> w, >= 0.9 -> 2w/3, >= 0.8 -> w/3
///   budget   covers tuition max -> w, covers tuition min -> w/2
///   gre      ratio >= 1.0 -> w, >= 0.9 -> w/2
///
/// score = round(100 * earned / possible), 0 when nothing was evaluated.
pub fn calculate_match(
    profile: &AcademicProfile,
    university: &UniversityRecord,
    weights: &ScoringWeights,
) -> MatchResult {
    let mut tally = Tally::default();
    let mut details = MatchDetails::default();

    // CGPA
    if let (Some(cgpa), Some(required)) = (profile.cgpa, university.cgpa_requirement) {
        tally.add(cgpa_points(ratio(cgpa, required), weights.cgpa), weights.cgpa);
        details.cgpa_match = Some(cgpa >= required);
    }

    // English proficiency: one qualifying test is enough
    let ielts = profile.ielts_score.zip(university.ielts_requirement);
    let toefl = profile
        .toefl_score
        .zip(university.toefl_requirement)
        .map(|(score, required)| (score as f64, required as f64));

    let best_english = [ielts, toefl]
        .into_iter()
        .flatten()
        .map(|(score, required)| english_points(ratio(score, required), weights.english))
        .max();

    if let Some(points) = best_english {
        tally.add(points, weights.english);
        details.english_match = Some(
            [ielts, toefl]
                .into_iter()
                .flatten()
                .any(|(score, required)| score >= required),
        );
    }

    // Budget
    if let Some(budget_max) = profile.budget_max {
        let tuition_max = university.tuition_max.or(university.tuition_min);
        let tuition_min = university.tuition_min.or(university.tuition_max);

        if let (Some(tuition_max), Some(tuition_min)) = (tuition_max, tuition_min) {
            tally.add(
                budget_points(budget_max, tuition_min, tuition_max, weights.budget),
                weights.budget,
            );
            details.budget_match = Some(budget_max >= tuition_min);
        }
    }

    // GRE
    if let (Some(gre), Some(required)) = (profile.gre_score, university.gre_requirement) {
        tally.add(
            gre_points(ratio(gre as f64, required as f64), weights.gre),
            weights.gre,
        );
        details.gre_match = Some(gre >= required);
    }

    let score = tally.percentage();

    MatchResult {
        score,
        category: MatchCategory::from_score(score),
        details,
    }
}

/// Ratio of achieved to required; any value meets a zero requirement
#[inline]
fn ratio(actual: f64, required: f64) -> f64 {
    if required <= 0.0 {
        return f64::INFINITY;
    }
    actual / required
}

#[inline]
fn cgpa_points(ratio: f64, weight: u32) -> u32 {
    if ratio >= 1.0 {
        weight
    } else if ratio >= 0.9 {
        weight * 3 / 4
    } else if ratio >= 0.8 {
        weight / 2
    } else {
        0
    }
}

#[inline]
fn english_points(ratio: f64, weight: u32) -> u32 {
    if ratio >= 1.0 {
        weight
    } else if ratio >= 0.9 {
        weight * 2 / 3
    } else if ratio >= 0.8 {
        weight / 3
    } else {
        0
    }
}

#[inline]
fn budget_points(budget_max: u64, tuition_min: u64, tuition_max: u64, weight: u32) -> u32 {
    if budget_max >= tuition_max {
        weight
    } else if budget_max >= tuition_min {
        weight / 2
    } else {
        0
    }
}

#[inline]
fn gre_points(ratio: f64, weight: u32) -> u32 {
    if ratio >= 1.0 {
        weight
    } else if ratio >= 0.9 {
        weight / 2
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UniversityType;

    fn create_test_university() -> UniversityRecord {
        UniversityRecord {
            id: "u1".to_string(),
            name: "Test University".to_string(),
            country: "Canada".to_string(),
            kind: UniversityType::Public,
            cgpa_requirement: None,
            ielts_requirement: None,
            toefl_requirement: None,
            gre_requirement: None,
            tuition_min: None,
            tuition_max: None,
            programs_offered: vec!["Computer Science".to_string()],
            ranking_overall: None,
        }
    }

    #[test]
    fn test_default_band_points() {
        let weights = ScoringWeights::default();

        assert_eq!(cgpa_points(1.1, weights.cgpa), 40);
        assert_eq!(cgpa_points(0.95, weights.cgpa), 30);
        assert_eq!(cgpa_points(0.85, weights.cgpa), 20);
        assert_eq!(cgpa_points(0.5, weights.cgpa), 0);

        assert_eq!(english_points(1.0, weights.english), 30);
        assert_eq!(english_points(0.9, weights.english), 20);
        assert_eq!(english_points(0.8, weights.english), 10);
        assert_eq!(english_points(0.79, weights.english), 0);

        assert_eq!(budget_points(40_000, 20_000, 35_000, weights.budget), 20);
        assert_eq!(budget_points(25_000, 20_000, 35_000, weights.budget), 10);
        assert_eq!(budget_points(10_000, 20_000, 35_000, weights.budget), 0);

        assert_eq!(gre_points(1.0, weights.gre), 10);
        assert_eq!(gre_points(0.92, weights.gre), 5);
        assert_eq!(gre_points(0.89, weights.gre), 0);
    }

    #[test]
    fn test_reference_scenario() {
        let profile = AcademicProfile {
            cgpa: Some(3.8),
            ielts_score: Some(7.0),
            budget_max: Some(40_000),
            ..Default::default()
        };
        let university = UniversityRecord {
            cgpa_requirement: Some(3.5),
            ielts_requirement: Some(6.5),
            tuition_min: Some(20_000),
            tuition_max: Some(35_000),
            ..create_test_university()
        };

        let result = calculate_match(&profile, &university, &ScoringWeights::default());

        assert_eq!(result.score, 100);
        assert_eq!(result.category, MatchCategory::Safety);
        assert_eq!(result.details.cgpa_match, Some(true));
        assert_eq!(result.details.english_match, Some(true));
        assert_eq!(result.details.budget_match, Some(true));
        assert_eq!(result.details.gre_match, None);
    }

    #[test]
    fn test_no_requirements_scores_zero() {
        let profile = AcademicProfile {
            cgpa: Some(3.9),
            ielts_score: Some(8.0),
            gre_score: Some(330),
            budget_max: Some(100_000),
            ..Default::default()
        };

        let result = calculate_match(&profile, &create_test_university(), &ScoringWeights::default());

        assert_eq!(result.score, 0);
        assert_eq!(result.category, MatchCategory::Ambitious);
        assert_eq!(result.details, MatchDetails::default());
    }

    #[test]
    fn test_missing_profile_data_not_penalized() {
        // Only CGPA can be evaluated; English and GRE requirements are ignored
        let profile = AcademicProfile {
            cgpa: Some(3.6),
            ..Default::default()
        };
        let university = UniversityRecord {
            cgpa_requirement: Some(3.5),
            ielts_requirement: Some(7.0),
            gre_requirement: Some(320),
            ..create_test_university()
        };

        let result = calculate_match(&profile, &university, &ScoringWeights::default());

        assert_eq!(result.score, 100);
        assert_eq!(result.details.english_match, None);
        assert_eq!(result.details.gre_match, None);
    }

    #[test]
    fn test_english_takes_best_test() {
        // IELTS well below, TOEFL clears
        let profile = AcademicProfile {
            ielts_score: Some(5.0),
            toefl_score: Some(100),
            ..Default::default()
        };
        let university = UniversityRecord {
            ielts_requirement: Some(7.0),
            toefl_requirement: Some(90),
            ..create_test_university()
        };

        let result = calculate_match(&profile, &university, &ScoringWeights::default());

        assert_eq!(result.score, 100);
        assert_eq!(result.details.english_match, Some(true));
    }

    #[test]
    fn test_partial_bands_round() {
        // cgpa ratio ~0.93 -> 30/40, gre ratio ~0.94 -> 5/10 => 35/50 = 70
        let profile = AcademicProfile {
            cgpa: Some(2.8),
            gre_score: Some(300),
            ..Default::default()
        };
        let university = UniversityRecord {
            cgpa_requirement: Some(3.0),
            gre_requirement: Some(320),
            ..create_test_university()
        };

        let result = calculate_match(&profile, &university, &ScoringWeights::default());

        assert_eq!(result.score, 70);
        assert_eq!(result.category, MatchCategory::Target);
        assert_eq!(result.details.cgpa_match, Some(false));
        assert_eq!(result.details.gre_match, Some(false));
    }

    #[test]
    fn test_zero_requirement_is_met() {
        let profile = AcademicProfile {
            cgpa: Some(0.0),
            ..Default::default()
        };
        let university = UniversityRecord {
            cgpa_requirement: Some(0.0),
            ..create_test_university()
        };

        let result = calculate_match(&profile, &university, &ScoringWeights::default());

        assert_eq!(result.score, 100);
        assert_eq!(result.details.cgpa_match, Some(true));
    }

    #[test]
    fn test_budget_partial() {
        let profile = AcademicProfile {
            budget_max: Some(25_000),
            ..Default::default()
        };
        let university = UniversityRecord {
            tuition_min: Some(20_000),
            tuition_max: Some(35_000),
            ..create_test_university()
        };

        let result = calculate_match(&profile, &university, &ScoringWeights::default());

        assert_eq!(result.score, 50);
        assert_eq!(result.details.budget_match, Some(true));
    }
}
