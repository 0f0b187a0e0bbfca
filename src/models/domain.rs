use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::{Validate, ValidationError, ValidationErrors};

/// Student academic profile used as scoring input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AcademicProfile {
    #[serde(default)]
    #[validate(range(min = 0.0, max = 4.0))]
    pub cgpa: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 9.0))]
    pub ielts_score: Option<f64>,
    #[serde(default)]
    #[validate(range(max = 120))]
    pub toefl_score: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 260, max = 340))]
    pub gre_score: Option<u32>,
    #[serde(default)]
    pub budget_min: Option<u64>,
    #[serde(default)]
    pub budget_max: Option<u64>,
    #[serde(default)]
    pub preferred_countries: BTreeSet<String>,
    #[serde(default)]
    pub preferred_fields: BTreeSet<String>,
}

impl AcademicProfile {
    /// Field-level validation plus the budget ordering invariant
    pub fn check(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        check_ordered_range(self.budget_min, self.budget_max, "budget")
    }
}

/// Institution ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniversityType {
    Public,
    Private,
}

/// Institution requirements and costs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UniversityRecord {
    #[validate(length(min = 1))]
    pub id: String,
    pub name: String,
    pub country: String,
    #[serde(rename = "type")]
    pub kind: UniversityType,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 4.0))]
    pub cgpa_requirement: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 9.0))]
    pub ielts_requirement: Option<f64>,
    #[serde(default)]
    #[validate(range(max = 120))]
    pub toefl_requirement: Option<u32>,
    #[serde(default)]
    #[validate(range(max = 340))]
    pub gre_requirement: Option<u32>,
    #[serde(default)]
    pub tuition_min: Option<u64>,
    #[serde(default)]
    pub tuition_max: Option<u64>,
    #[serde(default)]
    pub programs_offered: Vec<String>,
    #[serde(default)]
    pub ranking_overall: Option<u32>,
}

impl UniversityRecord {
    /// Field-level validation plus the tuition ordering invariant
    pub fn check(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        check_ordered_range(self.tuition_min, self.tuition_max, "tuition")
    }
}

fn check_ordered_range(
    min: Option<u64>,
    max: Option<u64>,
    field: &'static str,
) -> Result<(), ValidationErrors> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => {
            let mut errors = ValidationErrors::new();
            let mut error = ValidationError::new("range_order");
            error.message = Some(format!("{field} minimum {min} exceeds maximum {max}").into());
            errors.add(field, error);
            Err(errors)
        }
        _ => Ok(()),
    }
}

/// Admission fit bucket derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchCategory {
    Safety,
    Target,
    Ambitious,
}

impl MatchCategory {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            MatchCategory::Safety
        } else if score >= 60 {
            MatchCategory::Target
        } else {
            MatchCategory::Ambitious
        }
    }
}

/// Plain requirement comparisons for display, independent of the weighted score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetails {
    pub cgpa_match: Option<bool>,
    pub english_match: Option<bool>,
    pub budget_match: Option<bool>,
    pub gre_match: Option<bool>,
}

/// Compatibility of one profile with one university
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: u8,
    pub category: MatchCategory,
    pub details: MatchDetails,
}

/// University record annotated with its match against a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedUniversity {
    #[serde(flatten)]
    pub university: UniversityRecord,
    #[serde(rename = "match")]
    pub match_result: MatchResult,
}

/// Scoring weights, one per evaluated dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWeights {
    pub cgpa: u32,
    pub english: u32,
    pub budget: u32,
    pub gre: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cgpa: 40,
            english: 30,
            budget: 20,
            gre: 10,
        }
    }
}

/// Catalog query passed to the university store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityFilter {
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_thresholds() {
        assert_eq!(MatchCategory::from_score(100), MatchCategory::Safety);
        assert_eq!(MatchCategory::from_score(80), MatchCategory::Safety);
        assert_eq!(MatchCategory::from_score(79), MatchCategory::Target);
        assert_eq!(MatchCategory::from_score(60), MatchCategory::Target);
        assert_eq!(MatchCategory::from_score(59), MatchCategory::Ambitious);
        assert_eq!(MatchCategory::from_score(0), MatchCategory::Ambitious);
    }

    #[test]
    fn test_profile_out_of_bounds_rejected() {
        let profile = AcademicProfile {
            cgpa: Some(4.5),
            ..Default::default()
        };
        assert!(profile.check().is_err());

        let profile = AcademicProfile {
            ielts_score: Some(7.5),
            toefl_score: Some(100),
            ..Default::default()
        };
        assert!(profile.check().is_ok());
    }

    #[test]
    fn test_budget_order_rejected() {
        let profile = AcademicProfile {
            budget_min: Some(50_000),
            budget_max: Some(10_000),
            ..Default::default()
        };
        let errors = profile.check().unwrap_err();
        assert!(errors.to_string().contains("budget"));
    }

    #[test]
    fn test_university_wire_format() {
        let json = r#"{
            "id": "u1",
            "name": "Example University",
            "country": "Canada",
            "type": "public",
            "cgpaRequirement": 3.0,
            "tuitionMin": 20000,
            "tuitionMax": 30000,
            "programsOffered": ["Computer Science"]
        }"#;

        let university: UniversityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(university.kind, UniversityType::Public);
        assert_eq!(university.cgpa_requirement, Some(3.0));
        assert_eq!(university.ielts_requirement, None);
        assert_eq!(university.ranking_overall, None);
        assert!(university.check().is_ok());
    }

    #[test]
    fn test_inverted_tuition_rejected() {
        let json = r#"{
            "id": "u1",
            "name": "Example University",
            "country": "Canada",
            "type": "private",
            "tuitionMin": 40000,
            "tuitionMax": 30000
        }"#;

        let university: UniversityRecord = serde_json::from_str(json).unwrap();
        assert!(university.check().is_err());
    }
}
