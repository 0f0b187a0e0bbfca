use crate::models::{AcademicProfile, UniversityRecord};

/// Check if a university is located in one of the preferred countries
///
/// An empty preference set accepts every country.
#[inline]
pub fn matches_country(university: &UniversityRecord, profile: &AcademicProfile) -> bool {
    profile.preferred_countries.is_empty()
        || profile
            .preferred_countries
            .iter()
            .any(|country| country.trim().eq_ignore_ascii_case(university.country.trim()))
}

/// Check if a university offers a program in one of the preferred fields
///
/// A program matches a field when either name contains the other, ignoring case.
/// An empty preference set accepts every university.
#[inline]
pub fn matches_fields(university: &UniversityRecord, profile: &AcademicProfile) -> bool {
    if profile.preferred_fields.is_empty() {
        return true;
    }

    let fields: Vec<String> = profile
        .preferred_fields
        .iter()
        .map(|field| field.trim().to_lowercase())
        .filter(|field| !field.is_empty())
        .collect();

    university.programs_offered.iter().any(|program| {
        let program = program.trim().to_lowercase();
        !program.is_empty()
            && fields
                .iter()
                .any(|field| program.contains(field.as_str()) || field.contains(program.as_str()))
    })
}

/// Hard preference filter applied before scoring
#[inline]
pub fn matches_preferences(university: &UniversityRecord, profile: &AcademicProfile) -> bool {
    matches_country(university, profile) && matches_fields(university, profile)
}
