//! Student, profile, and document domain types.
//!
//! A `Profile` is the structured summary of a student's verified documents.
//! It is only ever mutated by merging a `ProfileUpdate`: set-valued fields
//! take the union, numeric fields keep the maximum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Opaque identifier of a student (the caller identity of a query).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub i64);

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A student's structured eligibility profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub owner: StudentId,
    pub full_name: String,
    #[serde(default)]
    pub highest_percentage: f64,
    #[serde(default)]
    pub degrees: BTreeSet<String>,
    #[serde(default)]
    pub annual_income: Option<u64>,
    #[serde(default)]
    pub verified_skills: BTreeSet<String>,
}

impl Profile {
    /// An empty profile, as created alongside a new student.
    pub fn empty(owner: StudentId, full_name: impl Into<String>) -> Self {
        Self {
            owner,
            full_name: full_name.into(),
            highest_percentage: 0.0,
            degrees: BTreeSet::new(),
            annual_income: None,
            verified_skills: BTreeSet::new(),
        }
    }

    /// Merge extracted values into this profile. Never overwrites or removes.
    pub fn merge(&mut self, update: &ProfileUpdate) {
        if let Some(pct) = update.percentage
            && pct.is_finite()
            && pct > self.highest_percentage
        {
            self.highest_percentage = pct;
        }
        if let Some(income) = update.annual_income {
            self.annual_income = Some(self.annual_income.map_or(income, |old| old.max(income)));
        }
        self.degrees.extend(update.degrees.iter().cloned());
        self.verified_skills.extend(update.skills.iter().cloned());
    }

    /// Case-insensitive skill membership.
    pub fn has_skill(&self, skill: &str) -> bool {
        self.verified_skills.iter().any(|s| s.eq_ignore_ascii_case(skill.trim()))
    }

    /// Case-insensitive degree membership.
    pub fn has_degree(&self, degree: &str) -> bool {
        self.degrees.iter().any(|d| d.eq_ignore_ascii_case(degree.trim()))
    }
}

/// Values extracted from one document, ready to merge into a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub annual_income: Option<u64>,
    #[serde(default)]
    pub degrees: BTreeSet<String>,
    #[serde(default)]
    pub skills: BTreeSet<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.percentage.is_none()
            && self.annual_income.is_none()
            && self.degrees.is_empty()
            && self.skills.is_empty()
    }
}

/// Verification state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Verified => "Verified",
            Self::Rejected => "Rejected",
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

/// A document record as seen by the pipeline (read-only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: i64,
    pub owner: StudentId,
    pub document_type: String,
    pub verification_status: VerificationStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// Input for creating a student (used by seeding and tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}
