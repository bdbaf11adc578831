use std::collections::BTreeSet;

use super::super::super::domain::{CandidateRecord, Dimension, LanguageRecord};
use super::super::config::StepRubric;
use super::super::rounding::{round_to, weighted_share};
use super::super::{ComputationError, RecordField, ScoreBreakdown, ScoreComponent, Tally};

pub(crate) fn score(
    candidate: &CandidateRecord,
    languages: &[LanguageRecord],
    rubric: &StepRubric,
    weight_percent: f64,
) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::new(candidate, Dimension::Languages);
    let mut distinct = BTreeSet::new();

    for record in languages {
        let name = record.language.trim().to_lowercase();
        if name.is_empty() {
            breakdown.skipped.push(ComputationError::new(
                candidate,
                Dimension::Languages,
                RecordField::Language,
                &record.language,
            ));
            continue;
        }
        distinct.insert(name);
    }

    let count = distinct.len();
    let points = round_to(rubric.points_for(count), 2);
    let mut component = ScoreComponent::new("languages", points);
    if !distinct.is_empty() {
        component = component.with_source(distinct.into_iter().collect::<Vec<_>>().join(","));
    }
    breakdown.components.push(component);
    breakdown.total_points = points;
    breakdown.tally = Some(Tally {
        count,
        weighted_percentage: weighted_share(points, rubric.max_points, weight_percent),
    });
    breakdown
}
