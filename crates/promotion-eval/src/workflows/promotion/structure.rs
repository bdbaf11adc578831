//! Evaluation structure: the aspect → variable → indicator → specificity hierarchy the
//! rubric is published as, with percentages and maximum points at every level.
//!
//! Loading the structure is comparatively expensive for a database-backed loader, so
//! readers go through [`StructureCache`], which keeps the last loaded tree until an
//! administrator invalidates it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::Serialize;
use tracing::info;

use super::domain::{CourseKind, Dimension};
use super::evaluation::{RubricConfig, StepRubric};
use super::repository::RepositoryError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationStructure {
    pub aspects: Vec<Aspect>,
    pub loaded_at: DateTime<Utc>,
}

impl EvaluationStructure {
    pub fn variable(&self, dimension: Dimension) -> Option<&Variable> {
        self.aspects
            .iter()
            .flat_map(|aspect| aspect.variables.iter())
            .find(|variable| variable.dimension == Some(dimension))
    }

    /// Sum of the variables' maximum points across every aspect, to the thousandth.
    pub fn total_max_points(&self) -> f64 {
        let total: f64 = self
            .aspects
            .iter()
            .flat_map(|aspect| aspect.variables.iter())
            .map(|variable| variable.max_points)
            .sum();
        (total * 1000.0).round() / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aspect {
    pub name: String,
    pub percentage: f64,
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<Dimension>,
    pub percentage: f64,
    pub max_points: f64,
    pub indicators: Vec<Indicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    pub max_points: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub specificities: Vec<Specificity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specificity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    pub max_points: f64,
}

/// Source of the evaluation structure.
pub trait StructureLoader: Send + Sync {
    fn load(&self) -> Result<EvaluationStructure, RepositoryError>;
}

/// Publishes the active rubric as the evaluation structure.
#[derive(Debug, Clone, Default)]
pub struct RubricStructureLoader {
    rubric: RubricConfig,
}

impl RubricStructureLoader {
    pub fn new(rubric: RubricConfig) -> Self {
        Self { rubric }
    }
}

impl StructureLoader for RubricStructureLoader {
    fn load(&self) -> Result<EvaluationStructure, RepositoryError> {
        let rubric = &self.rubric;
        let nominal_total: f64 = Dimension::ALL
            .iter()
            .map(|dimension| rubric.max_points(*dimension))
            .sum();
        let share = |dimension: Dimension| {
            if nominal_total <= 0.0 {
                0.0
            } else {
                (rubric.max_points(dimension) / nominal_total * 10_000.0).round() / 100.0
            }
        };

        let variables = vec![
            military_variable(rubric, share(Dimension::MilitaryCourses)),
            civilian_variable(rubric, share(Dimension::CivilianCourses)),
            step_variable(
                Dimension::Languages,
                &rubric.languages,
                "language",
                share(Dimension::Languages),
            ),
            step_variable(
                Dimension::InstitutionalWork,
                &rubric.institutional_work,
                "work",
                share(Dimension::InstitutionalWork),
            ),
        ];

        Ok(EvaluationStructure {
            aspects: vec![Aspect {
                name: "Professional development".to_string(),
                percentage: 100.0,
                variables,
            }],
            loaded_at: Utc::now(),
        })
    }
}

fn military_variable(rubric: &RubricConfig, percentage: f64) -> Variable {
    let military = &rubric.military;
    let mut mandatory = Vec::new();
    let mut other = Vec::new();
    for entry in &military.catalog {
        match entry.kind {
            CourseKind::Mandatory => {
                let bonus = if entry.category_code.is_some() {
                    military.category_bonus_points
                } else {
                    0.0
                };
                let grade = entry
                    .grade
                    .map(|grade| grade.to_string())
                    .unwrap_or_else(|| "any".to_string());
                let name = match entry.category_code.as_deref() {
                    Some(category) => format!("grade {grade}/{category}: {}", entry.course_code),
                    None => format!("grade {grade}: {}", entry.course_code),
                };
                mandatory.push(Specificity {
                    name,
                    percentage: None,
                    max_points: military.grade_match_points + bonus,
                });
            }
            CourseKind::Other => other.push(Specificity {
                name: entry.course_code.clone(),
                percentage: None,
                max_points: military.other_course_points,
            }),
        }
    }

    let mandatory_max = mandatory
        .iter()
        .map(|specificity| specificity.max_points)
        .fold(0.0, f64::max);
    Variable {
        name: Dimension::MilitaryCourses.label().to_string(),
        dimension: Some(Dimension::MilitaryCourses),
        percentage,
        max_points: military.max_points,
        indicators: vec![
            Indicator {
                name: "mandatory".to_string(),
                percentage: None,
                max_points: mandatory_max,
                specificities: mandatory,
            },
            Indicator {
                name: "other".to_string(),
                percentage: None,
                max_points: military.other_course_points,
                specificities: other,
            },
        ],
    }
}

fn civilian_variable(rubric: &RubricConfig, percentage: f64) -> Variable {
    let civilian = &rubric.civilian;
    let mut indicators: Vec<Indicator> = civilian
        .primary_levels
        .iter()
        .map(|level| Indicator {
            name: level.label.clone(),
            percentage: Some(level.percentage),
            max_points: level.points,
            specificities: Vec::new(),
        })
        .collect();
    indicators.push(Indicator {
        name: "other".to_string(),
        percentage: Some(civilian.other_percentage),
        max_points: civilian.other_cap,
        specificities: civilian
            .other_levels
            .iter()
            .map(|level| Specificity {
                name: level.label.clone(),
                percentage: Some(level.percentage),
                max_points: level.points,
            })
            .collect(),
    });

    Variable {
        name: Dimension::CivilianCourses.label().to_string(),
        dimension: Some(Dimension::CivilianCourses),
        percentage,
        max_points: civilian.max_points,
        indicators,
    }
}

fn step_variable(
    dimension: Dimension,
    rubric: &StepRubric,
    noun: &str,
    percentage: f64,
) -> Variable {
    let last = rubric.points_by_count.len().saturating_sub(1);
    let specificities = rubric
        .points_by_count
        .iter()
        .enumerate()
        .skip(1)
        .map(|(count, points)| {
            let plural = if count == 1 { "" } else { "s" };
            let suffix = if count == last { " or more" } else { "" };
            Specificity {
                name: format!("{count} {noun}{plural}{suffix}"),
                percentage: None,
                max_points: *points,
            }
        })
        .collect();

    Variable {
        name: dimension.label().to_string(),
        dimension: Some(dimension),
        percentage,
        max_points: rubric.max_points,
        indicators: vec![Indicator {
            name: dimension.slug().replace('-', "_"),
            percentage: None,
            max_points: rubric.max_points,
            specificities,
        }],
    }
}

/// Explicit cache for the evaluation structure. `get` loads on first use and serves the
/// stored tree afterwards; `invalidate` forces the next `get` to reload. Concurrent first
/// reads share a single load.
pub struct StructureCache {
    loader: Arc<dyn StructureLoader>,
    cached: Cache<(), Arc<EvaluationStructure>>,
}

impl StructureCache {
    pub fn new(loader: Arc<dyn StructureLoader>) -> Self {
        Self {
            loader,
            cached: Cache::builder().max_capacity(1).build(),
        }
    }

    pub fn get(&self) -> Result<Arc<EvaluationStructure>, RepositoryError> {
        self.cached
            .try_get_with((), || -> Result<_, RepositoryError> {
                let structure = self.loader.load()?;
                info!(
                    aspects = structure.aspects.len(),
                    "evaluation structure loaded"
                );
                Ok(Arc::new(structure))
            })
            .map_err(|shared: Arc<RepositoryError>| {
                Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone())
            })
    }

    /// Drops the cached tree. Returns whether anything was cached.
    pub fn invalidate(&self) -> bool {
        let cached = self.cached.contains_key(&());
        self.cached.invalidate(&());
        cached
    }
}

impl std::fmt::Debug for StructureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructureCache")
            .field("cached", &self.cached.contains_key(&()))
            .finish()
    }
}
