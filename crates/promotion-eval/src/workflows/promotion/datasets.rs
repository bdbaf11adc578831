//! CSV exports of the personnel system.
//!
//! Headers are matched by name after trimming. Grade and level columns of the achievement
//! files are kept as text so malformed values reach the scoring rules, which skip and report
//! them instead of failing the whole import.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::domain::{
    CandidateCategory, CandidateId, CandidateRecord, CivilianCourseRecord, Dimension,
    InstitutionalWorkRecord, LanguageRecord, PersonnelRecord,
};
use super::evaluation::AchievementSet;

#[derive(Debug)]
pub enum DatasetImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, message: String },
}

impl fmt::Display for DatasetImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetImportError::Io(err) => write!(f, "failed to read dataset: {}", err),
            DatasetImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
            DatasetImportError::InvalidRow { line, message } => {
                write!(f, "invalid row on line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for DatasetImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetImportError::Io(err) => Some(err),
            DatasetImportError::Csv(err) => Some(err),
            DatasetImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for DatasetImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for DatasetImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub fn open(path: &Path) -> Result<File, DatasetImportError> {
    Ok(File::open(path)?)
}

/// Deserializes every row, pairing each with its 1-based line number (header is line 1).
fn read_rows<R: Read, T: DeserializeOwned>(
    reader: R,
) -> Result<Vec<(usize, T)>, DatasetImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for (index, row) in csv_reader.deserialize::<T>().enumerate() {
        rows.push((index + 2, row?));
    }
    Ok(rows)
}

fn parse_category(line: usize, raw: &str) -> Result<CandidateCategory, DatasetImportError> {
    CandidateCategory::from_code(raw).ok_or_else(|| DatasetImportError::InvalidRow {
        line,
        message: format!("unknown category '{raw}'"),
    })
}

#[derive(Debug, Deserialize)]
struct CandidateRow {
    id: String,
    current_grade: i32,
    category: String,
}

/// Roster export: `id,current_grade,category`.
pub fn load_candidates<R: Read>(reader: R) -> Result<Vec<CandidateRecord>, DatasetImportError> {
    read_rows::<_, CandidateRow>(reader)?
        .into_iter()
        .map(|(line, row)| -> Result<CandidateRecord, DatasetImportError> {
            Ok(CandidateRecord {
                id: CandidateId::new(row.id),
                current_grade: row.current_grade,
                category: parse_category(line, &row.category)?,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct PersonnelRow {
    id: String,
    full_name: String,
    grade: i32,
    category: String,
    last_promotion: String,
    required_years: u32,
}

/// Personnel directory export:
/// `id,full_name,grade,category,last_promotion,required_years`.
pub fn load_personnel<R: Read>(reader: R) -> Result<Vec<PersonnelRecord>, DatasetImportError> {
    read_rows::<_, PersonnelRow>(reader)?
        .into_iter()
        .map(|(line, row)| -> Result<PersonnelRecord, DatasetImportError> {
            let last_promotion = NaiveDate::parse_from_str(&row.last_promotion, "%Y-%m-%d")
                .map_err(|err| DatasetImportError::InvalidRow {
                    line,
                    message: format!(
                        "failed to parse '{}' as YYYY-MM-DD ({err})",
                        row.last_promotion
                    ),
                })?;
            Ok(PersonnelRecord {
                id: CandidateId::new(row.id),
                full_name: row.full_name,
                grade: row.grade,
                category: parse_category(line, &row.category)?,
                last_promotion,
                required_years: row.required_years,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct CivilianRow {
    id: String,
    grade: String,
    level_code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct LanguageRow {
    id: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct InstitutionalRow {
    id: String,
    grade: String,
    #[serde(default)]
    description: String,
}

fn group<T>(rows: impl IntoIterator<Item = (String, T)>) -> HashMap<CandidateId, Vec<T>> {
    let mut grouped: HashMap<CandidateId, Vec<T>> = HashMap::new();
    for (id, record) in rows {
        grouped.entry(CandidateId::new(id)).or_default().push(record);
    }
    grouped
}

/// Achievement export for one dimension, grouped by candidate id.
///
/// - civilian courses: `id,grade,level_code,description`
/// - languages: `id,language`
/// - institutional work: `id,grade,description`
///
/// Military scoring reads the rubric catalog, so no file is consumed for it.
pub fn load_achievements<R: Read>(
    dimension: Dimension,
    reader: R,
) -> Result<AchievementSet, DatasetImportError> {
    let set = match dimension {
        Dimension::MilitaryCourses => AchievementSet::MilitaryCourses,
        Dimension::CivilianCourses => {
            let rows = read_rows::<_, CivilianRow>(reader)?;
            AchievementSet::CivilianCourses(group(rows.into_iter().map(|(_, row)| {
                (
                    row.id,
                    CivilianCourseRecord {
                        grade: row.grade,
                        level_code: row.level_code,
                        description: row.description,
                    },
                )
            })))
        }
        Dimension::Languages => {
            let rows = read_rows::<_, LanguageRow>(reader)?;
            AchievementSet::Languages(group(rows.into_iter().map(|(_, row)| {
                (
                    row.id,
                    LanguageRecord {
                        language: row.language,
                    },
                )
            })))
        }
        Dimension::InstitutionalWork => {
            let rows = read_rows::<_, InstitutionalRow>(reader)?;
            AchievementSet::InstitutionalWork(group(rows.into_iter().map(|(_, row)| {
                (
                    row.id,
                    InstitutionalWorkRecord {
                        grade: row.grade,
                        description: row.description,
                    },
                )
            })))
        }
    };
    Ok(set)
}
