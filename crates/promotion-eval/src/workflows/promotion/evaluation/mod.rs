mod config;
mod rounding;
mod rules;

pub use config::{CivilianRubric, LevelRule, MilitaryRubric, RubricConfig, StepRubric};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    CandidateCategory, CandidateId, CandidateRecord, CivilianCourseRecord, Dimension,
    InstitutionalWorkRecord, LanguageRecord,
};

/// Stateless evaluator applying the rubric to one candidate at a time.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: RubricConfig,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(RubricConfig::default())
    }
}

impl ScoringEngine {
    pub fn new(config: RubricConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RubricConfig {
        &self.config
    }

    pub fn score_military(&self, candidate: &CandidateRecord) -> ScoreBreakdown {
        rules::military::score(candidate, &self.config.military)
    }

    pub fn score_civilian(
        &self,
        candidate: &CandidateRecord,
        courses: &[CivilianCourseRecord],
    ) -> ScoreBreakdown {
        rules::civilian::score(candidate, courses, &self.config.civilian)
    }

    pub fn score_languages(
        &self,
        candidate: &CandidateRecord,
        languages: &[LanguageRecord],
    ) -> ScoreBreakdown {
        rules::languages::score(
            candidate,
            languages,
            &self.config.languages,
            self.config.weighted_share_percent,
        )
    }

    pub fn score_institutional_work(
        &self,
        candidate: &CandidateRecord,
        works: &[InstitutionalWorkRecord],
    ) -> ScoreBreakdown {
        rules::institutional::score(
            candidate,
            works,
            &self.config.institutional_work,
            self.config.weighted_share_percent,
        )
    }

    /// Scores every candidate for the dimension described by `achievements` and returns the
    /// breakdowns ranked by total, highest first. Candidates without records score zero.
    pub fn score_all(
        &self,
        candidates: &[CandidateRecord],
        achievements: &AchievementSet,
    ) -> Vec<ScoreBreakdown> {
        let mut results: Vec<ScoreBreakdown> = candidates
            .iter()
            .map(|candidate| match achievements {
                AchievementSet::MilitaryCourses => self.score_military(candidate),
                AchievementSet::CivilianCourses(by_candidate) => {
                    self.score_civilian(candidate, records_for(by_candidate, &candidate.id))
                }
                AchievementSet::Languages(by_candidate) => {
                    self.score_languages(candidate, records_for(by_candidate, &candidate.id))
                }
                AchievementSet::InstitutionalWork(by_candidate) => self
                    .score_institutional_work(candidate, records_for(by_candidate, &candidate.id)),
            })
            .collect();

        for breakdown in &results {
            for issue in &breakdown.skipped {
                warn!(
                    candidate = %issue.candidate_id,
                    dimension = %issue.dimension,
                    field = ?issue.field,
                    value = %issue.value,
                    "skipping malformed achievement record"
                );
            }
        }

        rank_by_total(&mut results);
        results
    }
}

fn records_for<'a, T>(by_candidate: &'a HashMap<CandidateId, Vec<T>>, id: &CandidateId) -> &'a [T] {
    by_candidate.get(id).map(Vec::as_slice).unwrap_or(&[])
}

/// Sorts breakdowns by total, highest first. The sort is stable so ties keep input order.
pub fn rank_by_total(results: &mut [ScoreBreakdown]) {
    results.sort_by(|a, b| b.total_points.total_cmp(&a.total_points));
}

/// Raw achievement records for one dimension, grouped by candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum AchievementSet {
    /// Military scoring is driven by the course catalog in the rubric.
    MilitaryCourses,
    CivilianCourses(HashMap<CandidateId, Vec<CivilianCourseRecord>>),
    Languages(HashMap<CandidateId, Vec<LanguageRecord>>),
    InstitutionalWork(HashMap<CandidateId, Vec<InstitutionalWorkRecord>>),
}

impl AchievementSet {
    pub fn empty(dimension: Dimension) -> Self {
        match dimension {
            Dimension::MilitaryCourses => AchievementSet::MilitaryCourses,
            Dimension::CivilianCourses => AchievementSet::CivilianCourses(HashMap::new()),
            Dimension::Languages => AchievementSet::Languages(HashMap::new()),
            Dimension::InstitutionalWork => AchievementSet::InstitutionalWork(HashMap::new()),
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            AchievementSet::MilitaryCourses => Dimension::MilitaryCourses,
            AchievementSet::CivilianCourses(_) => Dimension::CivilianCourses,
            AchievementSet::Languages(_) => Dimension::Languages,
            AchievementSet::InstitutionalWork(_) => Dimension::InstitutionalWork,
        }
    }
}

/// Discrete contribution to a dimension total, kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub label: String,
    pub points: f64,
    /// Record that earned the points, when one specific record did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ScoreComponent {
    pub(crate) fn new(label: impl Into<String>, points: f64) -> Self {
        Self {
            label: label.into(),
            points,
            source: None,
        }
    }

    pub(crate) fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Count-based dimensions report the count and its share of the weighted overall total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub count: usize,
    pub weighted_percentage: f64,
}

/// Per-candidate result for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub candidate_id: CandidateId,
    pub current_grade: i32,
    pub category: CandidateCategory,
    pub dimension: Dimension,
    pub total_points: f64,
    pub components: Vec<ScoreComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tally: Option<Tally>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<ComputationError>,
}

impl ScoreBreakdown {
    pub(crate) fn new(candidate: &CandidateRecord, dimension: Dimension) -> Self {
        Self {
            candidate_id: candidate.id.clone(),
            current_grade: candidate.current_grade,
            category: candidate.category,
            dimension,
            total_points: 0.0,
            components: Vec::new(),
            tally: None,
            skipped: Vec::new(),
        }
    }

    pub fn component(&self, label: &str) -> Option<&ScoreComponent> {
        self.components
            .iter()
            .find(|component| component.label == label)
    }

    pub fn component_points(&self) -> f64 {
        self.components.iter().map(|component| component.points).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Grade,
    LevelCode,
    Language,
}

/// Malformed achievement record. The record is left out of the total; the run continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{dimension} record for candidate {candidate_id} has malformed {field:?}: {value:?}")]
pub struct ComputationError {
    pub candidate_id: CandidateId,
    pub dimension: Dimension,
    pub field: RecordField,
    pub value: String,
}

impl ComputationError {
    pub(crate) fn new(
        candidate: &CandidateRecord,
        dimension: Dimension,
        field: RecordField,
        value: &str,
    ) -> Self {
        Self {
            candidate_id: candidate.id.clone(),
            dimension,
            field,
            value: value.to_string(),
        }
    }
}

/// Parses a grade or level code the way the personnel exports write them (`"09"`, `" 9 "`).
pub(crate) fn parse_code(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok()
}
