//! Eligibility Filter: deterministic comparison of listings against a profile.
//!
//! Only `Criteria::Structured` listings can pass. Free-text or absent
//! criteria mean "criteria unknown" and the listing is left out; malformed
//! criteria skip the listing with a warning.

use campusfed_core::listing::{Criteria, Listing, StructuredCriteria};
use campusfed_core::student::Profile;
use tracing::{debug, warn};

/// A CGPA on a 10-point scale times this factor is a percentage.
pub const CGPA_TO_PERCENTAGE: f64 = 9.5;

/// Which dimensions are compared. Disabled dimensions always pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityOptions {
    pub income: bool,
    pub academic: bool,
    pub skills: bool,
}

impl Default for EligibilityOptions {
    fn default() -> Self {
        Self {
            income: true,
            academic: true,
            skills: true,
        }
    }
}

impl From<&campusfed_config::EligibilityToggles> for EligibilityOptions {
    fn from(t: &campusfed_config::EligibilityToggles) -> Self {
        Self {
            income: t.income,
            academic: t.academic,
            skills: t.skills,
        }
    }
}

/// The first dimension a listing failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failed {
    Income,
    Percentage,
    Cgpa,
    Degree,
    Skills,
}

/// Compare structured criteria against a profile.
pub fn check(criteria: &StructuredCriteria, profile: &Profile, options: EligibilityOptions) -> Result<(), Failed> {
    if options.income && !income_passes(criteria.max_income, profile.annual_income) {
        return Err(Failed::Income);
    }

    if options.academic {
        if let Some(min) = criteria.min_percentage
            && profile.highest_percentage < min
        {
            return Err(Failed::Percentage);
        }
        if let Some(min) = criteria.min_cgpa
            && profile.highest_percentage / CGPA_TO_PERCENTAGE < min
        {
            return Err(Failed::Cgpa);
        }
        if !criteria.degrees.is_empty() && !criteria.degrees.iter().any(|d| profile.has_degree(d)) {
            return Err(Failed::Degree);
        }
    }

    if options.skills
        && !criteria.required_skills.is_empty()
        && !criteria.required_skills.iter().any(|s| profile.has_skill(s))
    {
        return Err(Failed::Skills);
    }

    Ok(())
}

/// Income passes when either side is unknown; otherwise income must not
/// exceed the ceiling.
fn income_passes(max_income: Option<u64>, annual_income: Option<u64>) -> bool {
    match (max_income, annual_income) {
        (Some(max), Some(income)) => income <= max,
        _ => true,
    }
}

/// Keep the listings the profile is eligible for, in their original order.
pub fn filter_eligible(listings: Vec<Listing>, profile: &Profile, options: EligibilityOptions) -> Vec<Listing> {
    listings
        .into_iter()
        .filter(|listing| match &listing.criteria {
            Criteria::Structured(criteria) => match check(criteria, profile, options) {
                Ok(()) => true,
                Err(dimension) => {
                    debug!(listing = %listing.title, ?dimension, "Not eligible");
                    false
                }
            },
            Criteria::Malformed(e) => {
                warn!(listing = %listing.title, field = %e.field, reason = %e.reason, "Skipping listing with malformed criteria");
                false
            }
            Criteria::Unstructured(_) | Criteria::Absent => {
                debug!(listing = %listing.title, "Criteria unknown, excluding");
                false
            }
        })
        .collect()
}
