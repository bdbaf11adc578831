use super::super::super::domain::{CandidateRecord, Dimension, InstitutionalWorkRecord};
use super::super::config::StepRubric;
use super::super::rounding::{round_to, weighted_share};
use super::super::{parse_code, ComputationError, RecordField, ScoreBreakdown, ScoreComponent, Tally};

/// Only work recognized at the candidate's current grade counts toward the step function.
pub(crate) fn score(
    candidate: &CandidateRecord,
    works: &[InstitutionalWorkRecord],
    rubric: &StepRubric,
    weight_percent: f64,
) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::new(candidate, Dimension::InstitutionalWork);
    let mut count = 0;

    for work in works {
        match parse_code(&work.grade) {
            Some(grade) if grade == candidate.current_grade => count += 1,
            Some(_) => {}
            None => breakdown.skipped.push(ComputationError::new(
                candidate,
                Dimension::InstitutionalWork,
                RecordField::Grade,
                &work.grade,
            )),
        }
    }

    let points = round_to(rubric.points_for(count), 2);
    breakdown
        .components
        .push(ScoreComponent::new("institutional_work", points));
    breakdown.total_points = points;
    breakdown.tally = Some(Tally {
        count,
        weighted_percentage: weighted_share(points, rubric.max_points, weight_percent),
    });
    breakdown
}
