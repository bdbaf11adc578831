use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// National identity number used as the candidate key across every dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Officer category a candidate is evaluated under. Serialized as the one-letter roster code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandidateCategory {
    #[serde(rename = "T")]
    Tecnico,
    #[serde(rename = "C")]
    Comando,
    #[serde(rename = "S")]
    TropaProfesional,
    #[serde(rename = "A")]
    Asimilado,
    #[serde(rename = "W")]
    AsimiladoTecnico,
}

impl CandidateCategory {
    pub const ALL: [CandidateCategory; 5] = [
        CandidateCategory::Tecnico,
        CandidateCategory::Comando,
        CandidateCategory::TropaProfesional,
        CandidateCategory::Asimilado,
        CandidateCategory::AsimiladoTecnico,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            CandidateCategory::Tecnico => "T",
            CandidateCategory::Comando => "C",
            CandidateCategory::TropaProfesional => "S",
            CandidateCategory::Asimilado => "A",
            CandidateCategory::AsimiladoTecnico => "W",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CandidateCategory::Tecnico => "TECNICO",
            CandidateCategory::Comando => "COMANDO",
            CandidateCategory::TropaProfesional => "TROPA PROFESIONAL",
            CandidateCategory::Asimilado => "ASIMILADO",
            CandidateCategory::AsimiladoTecnico => "ASIMILADO TECNICO",
        }
    }

    /// Case-insensitive lookup by roster code.
    pub fn from_code(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|category| category.code() == code)
    }
}

impl fmt::Display for CandidateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Candidate base record supplied by the roster for every scoring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub current_grade: i32,
    pub category: CandidateCategory,
}

/// Independently scored evaluation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dimension {
    MilitaryCourses,
    CivilianCourses,
    Languages,
    InstitutionalWork,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::MilitaryCourses,
        Dimension::CivilianCourses,
        Dimension::Languages,
        Dimension::InstitutionalWork,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Dimension::MilitaryCourses => "military-courses",
            Dimension::CivilianCourses => "civilian-courses",
            Dimension::Languages => "languages",
            Dimension::InstitutionalWork => "institutional-work",
        }
    }

    pub fn from_slug(raw: &str) -> Option<Self> {
        let slug = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|dimension| dimension.slug() == slug)
    }

    /// Nominal share of the overall evaluation, in points.
    pub fn max_points(&self) -> f64 {
        match self {
            Dimension::MilitaryCourses => 6.0,
            Dimension::CivilianCourses => 2.4,
            Dimension::Languages => 1.8,
            Dimension::InstitutionalWork => 1.8,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::MilitaryCourses => "Military courses",
            Dimension::CivilianCourses => "Civilian courses",
            Dimension::Languages => "Languages",
            Dimension::InstitutionalWork => "Institutional-value work",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseKind {
    Mandatory,
    Other,
}

/// Entry of the required military course catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilitaryCourseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_code: Option<String>,
    pub course_code: String,
    pub kind: CourseKind,
}

impl MilitaryCourseRecord {
    pub fn mandatory(grade: i32, category_code: Option<&str>, course_code: &str) -> Self {
        Self {
            grade: Some(grade),
            category_code: category_code.map(str::to_string),
            course_code: course_code.to_string(),
            kind: CourseKind::Mandatory,
        }
    }

    pub fn other(course_code: &str) -> Self {
        Self {
            grade: None,
            category_code: None,
            course_code: course_code.to_string(),
            kind: CourseKind::Other,
        }
    }
}

/// Civilian postgraduate/undergraduate study as exported by the personnel system. Grade and
/// level arrive as text and are parsed during scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CivilianCourseRecord {
    pub grade: String,
    pub level_code: String,
    #[serde(default)]
    pub description: String,
}

/// One language the candidate is certified in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRecord {
    pub language: String,
}

/// Institutional-value work recognized while the candidate held `grade`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionalWorkRecord {
    pub grade: String,
    #[serde(default)]
    pub description: String,
}

/// Personnel directory entry used to decide promotion eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonnelRecord {
    pub id: CandidateId,
    pub full_name: String,
    pub grade: i32,
    pub category: CandidateCategory,
    pub last_promotion: NaiveDate,
    /// Minimum whole years in grade required for this grade/category pair.
    pub required_years: u32,
}
