//! External listings (jobs and scholarships) from the partner catalog.
//!
//! The catalog schema is loose: eligibility may arrive as a structured
//! object, as a JSON string holding an object, as free text, or not at all.
//! `Listing::from_value` probes the known keys once and records the outcome
//! as a tagged `Criteria` value that downstream code pattern-matches on.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FilterDataError;

const TITLE_KEYS: &[&str] = &["title", "job_title", "scholarship_name", "name"];
const SOURCE_KEYS: &[&str] = &["source_url", "url", "job_id", "scholarship_id", "id"];
const CRITERIA_OBJECT_KEYS: &[&str] = &["eligibility_criteria", "criteria"];
const CRITERIA_TEXT_KEYS: &[&str] = &["eligibility", "eligibility_text"];
const DESCRIPTION_KEYS: &[&str] = &["description", "job_description"];

const MAX_INCOME_KEYS: &[&str] = &["max_income", "max_income_pa", "max_annual_income", "income_limit"];
const MIN_PERCENTAGE_KEYS: &[&str] = &["min_percentage", "minimum_percentage"];
const MIN_CGPA_KEYS: &[&str] = &["min_cgpa", "minimum_cgpa"];
const DEGREE_KEYS: &[&str] = &["degree_required", "required_degree", "degree", "degrees"];
const SKILL_KEYS: &[&str] = &["required_skills", "skills"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    Job,
    Scholarship,
}

/// Eligibility thresholds a listing states explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredCriteria {
    pub max_income: Option<u64>,
    pub min_percentage: Option<f64>,
    pub min_cgpa: Option<f64>,
    /// Any one of these degrees satisfies the requirement.
    pub degrees: Vec<String>,
    pub required_skills: Vec<String>,
}

impl StructuredCriteria {
    /// Parse criteria from a JSON object, probing for every known key.
    pub fn from_object(listing: &str, obj: &Map<String, Value>) -> Result<Self, FilterDataError> {
        let malformed = |field: &str, reason: String| FilterDataError {
            listing: listing.to_string(),
            field: field.to_string(),
            reason,
        };

        let max_income = match probe(obj, MAX_INCOME_KEYS) {
            Some((key, v)) => number(v)
                .map_err(|r| malformed(key, r))?
                .map(|n| n.round() as u64),
            None => None,
        };
        let min_percentage = match probe(obj, MIN_PERCENTAGE_KEYS) {
            Some((key, v)) => number(v).map_err(|r| malformed(key, r))?,
            None => None,
        };
        let min_cgpa = match probe(obj, MIN_CGPA_KEYS) {
            Some((key, v)) => number(v).map_err(|r| malformed(key, r))?,
            None => None,
        };
        let degrees = match probe(obj, DEGREE_KEYS) {
            Some((key, v)) => string_list(v).map_err(|r| malformed(key, r))?,
            None => Vec::new(),
        };
        let required_skills = match probe(obj, SKILL_KEYS) {
            Some((key, v)) => string_list(v).map_err(|r| malformed(key, r))?,
            None => Vec::new(),
        };

        Ok(Self {
            max_income,
            min_percentage,
            min_cgpa,
            degrees,
            required_skills,
        })
    }

    /// True when no dimension carries a threshold.
    pub fn is_empty(&self) -> bool {
        self.max_income.is_none()
            && self.min_percentage.is_none()
            && self.min_cgpa.is_none()
            && self.degrees.is_empty()
            && self.required_skills.is_empty()
    }
}

/// What the catalog told us about a listing's eligibility.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    Structured(StructuredCriteria),
    /// Free text that needs a secondary extraction step to become comparable.
    Unstructured(String),
    /// A criteria object was present but could not be read.
    Malformed(FilterDataError),
    Absent,
}

/// A job or scholarship listing with its probed criteria.
#[derive(Debug, Clone)]
pub struct Listing {
    pub kind: ListingKind,
    pub title: String,
    pub source: String,
    pub criteria: Criteria,
    /// The listing exactly as the catalog returned it.
    pub raw: Value,
}

impl Listing {
    pub fn from_value(kind: ListingKind, raw: Value) -> Self {
        let (title, source, criteria) = match raw.as_object() {
            Some(obj) => {
                let title = probe(obj, TITLE_KEYS)
                    .and_then(|(_, v)| scalar_text(v))
                    .unwrap_or_else(|| "untitled".to_string());
                let source = probe(obj, SOURCE_KEYS)
                    .and_then(|(_, v)| scalar_text(v))
                    .unwrap_or_else(|| "partner-catalog".to_string());
                let criteria = criteria_of(&title, obj);
                (title, source, criteria)
            }
            None => (
                "untitled".to_string(),
                "partner-catalog".to_string(),
                Criteria::Malformed(FilterDataError {
                    listing: "untitled".into(),
                    field: "<listing>".into(),
                    reason: "listing is not a JSON object".into(),
                }),
            ),
        };

        Self {
            kind,
            title,
            source,
            criteria,
            raw,
        }
    }

    /// Parse every element of a catalog array.
    pub fn from_array(kind: ListingKind, values: &[Value]) -> Vec<Self> {
        values.iter().cloned().map(|v| Self::from_value(kind, v)).collect()
    }
}

fn criteria_of(title: &str, obj: &Map<String, Value>) -> Criteria {
    if let Some((key, value)) = probe(obj, CRITERIA_OBJECT_KEYS) {
        match value {
            Value::Object(inner) => return structured(title, inner),
            // Catalogs backed by SQLite ship the criteria object as TEXT.
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(inner)) => return structured(title, &inner),
                _ if !text.trim().is_empty() => return Criteria::Unstructured(text.clone()),
                _ => {}
            },
            Value::Null => {}
            other => {
                return Criteria::Malformed(FilterDataError {
                    listing: title.to_string(),
                    field: key.to_string(),
                    reason: format!("expected object or text, got {}", kind_name(other)),
                });
            }
        }
    }

    for keys in [CRITERIA_TEXT_KEYS, DESCRIPTION_KEYS] {
        if let Some((_, Value::String(text))) = probe(obj, keys)
            && !text.trim().is_empty()
        {
            return Criteria::Unstructured(text.clone());
        }
    }

    Criteria::Absent
}

fn structured(title: &str, obj: &Map<String, Value>) -> Criteria {
    match StructuredCriteria::from_object(title, obj) {
        Ok(c) => Criteria::Structured(c),
        Err(e) => Criteria::Malformed(e),
    }
}

/// First present, non-null key from `keys`.
fn probe<'a>(obj: &'a Map<String, Value>, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()).map(|v| (*k, v)))
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Lenient numeric read: numbers, or strings like "5,00,000" / "85.5%".
fn number(v: &Value) -> Result<Option<f64>, String> {
    let n = match v {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("unrepresentable number {n}"))?,
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, ',' | '%' | ' ' | '_'))
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<f64>()
                .map_err(|_| format!("not a number: {s:?}"))?
        }
        other => return Err(format!("expected number, got {}", kind_name(other))),
    };
    if !n.is_finite() || n < 0.0 {
        return Err(format!("out of range: {n}"));
    }
    Ok(Some(n))
}

/// Accepts an array of strings or a single comma-separated string.
fn string_list(v: &Value) -> Result<Vec<String>, String> {
    match v {
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("any"))
            .map(String::from)
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|i| {
                i.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| format!("expected string item, got {}", kind_name(i)))
            })
            .filter(|r| r.as_ref().map_or(true, |s| !s.is_empty() && !s.eq_ignore_ascii_case("any")))
            .collect(),
        other => Err(format!("expected string or array, got {}", kind_name(other))),
    }
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
