//! Promotion candidate selection.
//!
//! A selection request names a cut-off date, a grade and an officer category. Personnel in
//! that grade and category who have served at least the required whole years in grade by the
//! cut-off date become the new candidate roster.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{CandidateCategory, CandidateId, CandidateRecord, PersonnelRecord};

pub const REQUIRED_FIELDS: [&str; 3] = ["fecha", "grado", "categoria"];

/// Raw request body. Every field is optional so missing values surface as validation errors
/// instead of extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionPayload {
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub grado: Option<Value>,
    #[serde(default)]
    pub categoria: Option<String>,
}

/// Validated selection criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionRequest {
    pub as_of: NaiveDate,
    pub grade: i32,
    pub category: CandidateCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", missing.join(", "))]
    MissingFields { missing: Vec<&'static str> },
    #[error("invalid category '{received}'")]
    InvalidCategory { received: String },
    #[error("invalid date '{received}', expected YYYY-MM-DD")]
    InvalidDate { received: String },
    #[error("invalid grade '{received}'")]
    InvalidGrade { received: String },
}

impl SelectionPayload {
    pub fn validate(self) -> Result<SelectionRequest, ValidationError> {
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .into_iter()
            .zip([
                self.fecha.as_deref().map_or(true, |raw| raw.trim().is_empty()),
                self.grado.as_ref().map_or(true, Value::is_null),
                self.categoria
                    .as_deref()
                    .map_or(true, |raw| raw.trim().is_empty()),
            ])
            .filter_map(|(field, absent)| absent.then_some(field))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields { missing });
        }

        let raw_category = self.categoria.unwrap_or_default();
        let category = CandidateCategory::from_code(&raw_category).ok_or_else(|| {
            ValidationError::InvalidCategory {
                received: raw_category.clone(),
            }
        })?;

        let raw_date = self.fecha.unwrap_or_default();
        let as_of = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d").map_err(|_| {
            ValidationError::InvalidDate {
                received: raw_date.clone(),
            }
        })?;

        let grade = match self.grado {
            Some(Value::Number(number)) => number
                .as_i64()
                .and_then(|grade| i32::try_from(grade).ok())
                .ok_or_else(|| ValidationError::InvalidGrade {
                    received: number.to_string(),
                })?,
            Some(Value::String(raw)) => {
                raw.trim()
                    .parse::<i32>()
                    .map_err(|_| ValidationError::InvalidGrade {
                        received: raw.clone(),
                    })?
            }
            other => {
                return Err(ValidationError::InvalidGrade {
                    received: other.map(|value| value.to_string()).unwrap_or_default(),
                })
            }
        };

        Ok(SelectionRequest {
            as_of,
            grade,
            category,
        })
    }
}

/// Whole years between the last promotion and the cut-off date, truncated toward zero.
pub fn years_in_grade(last_promotion: NaiveDate, as_of: NaiveDate) -> i64 {
    let days = (as_of - last_promotion).num_days();
    (days as f64 / 365.0).trunc() as i64
}

/// Selected person with the fields reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedCandidate {
    pub id: CandidateId,
    pub full_name: String,
    pub grade: i32,
    pub category: CandidateCategory,
    pub category_description: &'static str,
    pub last_promotion: NaiveDate,
    pub required_years: u32,
    pub years_in_grade: i64,
}

impl SelectedCandidate {
    pub fn to_candidate(&self) -> CandidateRecord {
        CandidateRecord {
            id: self.id.clone(),
            current_grade: self.grade,
            category: self.category,
        }
    }
}

/// Applies the eligibility rule and orders the result by years in grade, then id.
pub fn select_candidates(
    personnel: &[PersonnelRecord],
    request: &SelectionRequest,
) -> Vec<SelectedCandidate> {
    let mut selected: Vec<SelectedCandidate> = personnel
        .iter()
        .filter(|person| person.grade == request.grade && person.category == request.category)
        .filter_map(|person| {
            let years = years_in_grade(person.last_promotion, request.as_of);
            (years >= i64::from(person.required_years)).then(|| SelectedCandidate {
                id: person.id.clone(),
                full_name: person.full_name.trim().to_string(),
                grade: person.grade,
                category: person.category,
                category_description: person.category.description(),
                last_promotion: person.last_promotion,
                required_years: person.required_years,
                years_in_grade: years,
            })
        })
        .collect();

    selected.sort_by(|a, b| {
        a.years_in_grade
            .cmp(&b.years_in_grade)
            .then_with(|| a.id.cmp(&b.id))
    });
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn person(
        id: &str,
        grade: i32,
        category: CandidateCategory,
        promoted: NaiveDate,
    ) -> PersonnelRecord {
        PersonnelRecord {
            id: CandidateId::new(id),
            full_name: format!("Person {id}"),
            grade,
            category,
            last_promotion: promoted,
            required_years: 4,
        }
    }

    fn payload(value: serde_json::Value) -> SelectionPayload {
        serde_json::from_value(value).expect("payload deserializes")
    }

    #[test]
    fn validate_reports_every_missing_field() {
        match SelectionPayload::default().validate() {
            Err(ValidationError::MissingFields { missing }) => {
                assert_eq!(missing, vec!["fecha", "grado", "categoria"])
            }
            other => panic!("expected missing fields, got {other:?}"),
        }
    }

    #[test]
    fn validate_normalizes_category_and_accepts_string_grades() {
        let request = payload(json!({"fecha": "2025-06-30", "grado": "8", "categoria": "c"}))
            .validate()
            .expect("valid request");

        assert_eq!(request.category, CandidateCategory::Comando);
        assert_eq!(request.grade, 8);
        assert_eq!(request.as_of, date(2025, 6, 30));
    }

    #[test]
    fn validate_rejects_unknown_categories_and_dates() {
        let category =
            payload(json!({"fecha": "2025-06-30", "grado": 8, "categoria": "X"})).validate();
        assert_eq!(
            category,
            Err(ValidationError::InvalidCategory {
                received: "X".to_string()
            })
        );

        let bad_date =
            payload(json!({"fecha": "30/06/2025", "grado": 8, "categoria": "T"})).validate();
        assert!(matches!(bad_date, Err(ValidationError::InvalidDate { .. })));

        let grade =
            payload(json!({"fecha": "2025-06-30", "grado": true, "categoria": "T"})).validate();
        assert!(matches!(grade, Err(ValidationError::InvalidGrade { .. })));
    }

    #[test]
    fn years_in_grade_truncates_partial_years() {
        assert_eq!(years_in_grade(date(2020, 7, 2), date(2025, 6, 30)), 4);
        assert_eq!(years_in_grade(date(2020, 6, 1), date(2025, 6, 30)), 5);
        assert_eq!(years_in_grade(date(2026, 1, 1), date(2025, 6, 30)), 0);
    }

    #[test]
    fn selection_filters_by_grade_category_and_time_in_grade() {
        let as_of = date(2025, 6, 30);
        let personnel = vec![
            person("300", 8, CandidateCategory::Comando, date(2018, 1, 1)),
            person("100", 8, CandidateCategory::Comando, date(2020, 1, 1)),
            person("200", 8, CandidateCategory::Comando, date(2018, 1, 1)),
            person("400", 8, CandidateCategory::Comando, date(2023, 1, 1)),
            person("500", 7, CandidateCategory::Comando, date(2010, 1, 1)),
            person("600", 8, CandidateCategory::Tecnico, date(2010, 1, 1)),
        ];
        let request = SelectionRequest {
            as_of,
            grade: 8,
            category: CandidateCategory::Comando,
        };

        let selected = select_candidates(&personnel, &request);
        let ids: Vec<&str> = selected.iter().map(|c| c.id.as_str()).collect();

        assert_eq!(ids, vec!["100", "200", "300"]);
        assert_eq!(selected[0].years_in_grade, 5);
        assert_eq!(selected[0].category_description, "COMANDO");
        assert_eq!(selected[0].to_candidate().current_grade, 8);
    }
}
