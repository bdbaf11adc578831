use serde::{Deserialize, Serialize};

use super::super::domain::{Dimension, MilitaryCourseRecord};

/// Rubric configuration for all four dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricConfig {
    pub military: MilitaryRubric,
    pub civilian: CivilianRubric,
    pub languages: StepRubric,
    pub institutional_work: StepRubric,
    /// Percentage of the overall evaluation the step-scored dimensions represent.
    pub weighted_share_percent: f64,
}

impl Default for RubricConfig {
    fn default() -> Self {
        Self {
            military: MilitaryRubric::default(),
            civilian: CivilianRubric::default(),
            languages: StepRubric {
                points_by_count: vec![0.0, 0.54, 1.08, 1.8],
                max_points: Dimension::Languages.max_points(),
            },
            // Step values follow the published table, not the percentages of a 3.6 cap that
            // older rubric notes quote for this dimension.
            institutional_work: StepRubric {
                points_by_count: vec![0.0, 0.45, 1.08, 1.8],
                max_points: Dimension::InstitutionalWork.max_points(),
            },
            weighted_share_percent: 15.0,
        }
    }
}

impl RubricConfig {
    pub fn max_points(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::MilitaryCourses => self.military.max_points,
            Dimension::CivilianCourses => self.civilian.max_points,
            Dimension::Languages => self.languages.max_points,
            Dimension::InstitutionalWork => self.institutional_work.max_points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilitaryRubric {
    pub grade_match_points: f64,
    pub category_bonus_points: f64,
    pub other_course_points: f64,
    /// Only `other` entries with this course code are awarded.
    pub other_course_code: String,
    pub max_points: f64,
    pub catalog: Vec<MilitaryCourseRecord>,
}

impl Default for MilitaryRubric {
    fn default() -> Self {
        Self {
            grade_match_points: 4.2,
            category_bonus_points: 0.5,
            other_course_points: 1.8,
            other_course_code: "F".to_string(),
            max_points: Dimension::MilitaryCourses.max_points(),
            catalog: vec![
                MilitaryCourseRecord::mandatory(9, Some("A"), "R"),
                MilitaryCourseRecord::mandatory(8, None, "S"),
                MilitaryCourseRecord::mandatory(7, None, "T"),
                MilitaryCourseRecord::mandatory(6, None, "U"),
                MilitaryCourseRecord::mandatory(5, None, "V"),
                MilitaryCourseRecord::mandatory(4, None, "M"),
                MilitaryCourseRecord::mandatory(24, None, "R"),
                MilitaryCourseRecord::mandatory(23, None, "S"),
                MilitaryCourseRecord::other("F"),
            ],
        }
    }
}

/// Points for one academic level, keyed by the personnel system's level code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRule {
    pub label: String,
    pub code: i32,
    pub points: f64,
    /// Share of the parent bucket, reported in the evaluation structure.
    pub percentage: f64,
}

impl LevelRule {
    fn new(label: &str, code: i32, points: f64, percentage: f64) -> Self {
        Self {
            label: label.to_string(),
            code,
            points,
            percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CivilianRubric {
    pub primary_levels: Vec<LevelRule>,
    pub other_levels: Vec<LevelRule>,
    pub other_cap: f64,
    pub other_percentage: f64,
    pub max_points: f64,
}

impl Default for CivilianRubric {
    fn default() -> Self {
        Self {
            primary_levels: vec![
                LevelRule::new("doctorate", 19, 0.72, 30.0),
                LevelRule::new("masters", 18, 0.60, 23.0),
                LevelRule::new("specialization", 17, 0.48, 20.0),
                LevelRule::new("undergraduate", 16, 0.36, 15.0),
            ],
            other_levels: vec![
                LevelRule::new("technologist_superior", 15, 0.132, 55.0),
                LevelRule::new("diploma", 24, 0.060, 25.0),
                LevelRule::new("other_studies", 20, 0.048, 20.0),
            ],
            other_cap: 0.24,
            other_percentage: 10.0,
            max_points: Dimension::CivilianCourses.max_points(),
        }
    }
}

/// Count-based step function. `points_by_count[n]` applies to a count of `n`; the last entry
/// applies to every larger count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRubric {
    pub points_by_count: Vec<f64>,
    pub max_points: f64,
}

impl StepRubric {
    pub fn points_for(&self, count: usize) -> f64 {
        let points = match self.points_by_count.last() {
            Some(last) => self.points_by_count.get(count).copied().unwrap_or(*last),
            None => 0.0,
        };
        points.clamp(0.0, self.max_points)
    }
}
