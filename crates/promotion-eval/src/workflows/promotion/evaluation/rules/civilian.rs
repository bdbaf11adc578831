use std::collections::HashSet;

use super::super::super::domain::{CandidateRecord, CivilianCourseRecord, Dimension};
use super::super::config::{CivilianRubric, LevelRule};
use super::super::rounding::{from_thousandths, to_thousandths};
use super::super::{parse_code, ComputationError, RecordField, ScoreBreakdown, ScoreComponent};

struct ParsedCourse<'a> {
    grade: i32,
    level_code: i32,
    description: &'a str,
}

fn parse_courses<'a>(
    candidate: &CandidateRecord,
    courses: &'a [CivilianCourseRecord],
    skipped: &mut Vec<ComputationError>,
) -> Vec<ParsedCourse<'a>> {
    let mut parsed = Vec::with_capacity(courses.len());
    for course in courses {
        let Some(grade) = parse_code(&course.grade) else {
            skipped.push(ComputationError::new(
                candidate,
                Dimension::CivilianCourses,
                RecordField::Grade,
                &course.grade,
            ));
            continue;
        };
        let Some(level_code) = parse_code(&course.level_code) else {
            skipped.push(ComputationError::new(
                candidate,
                Dimension::CivilianCourses,
                RecordField::LevelCode,
                &course.level_code,
            ));
            continue;
        };
        parsed.push(ParsedCourse {
            grade,
            level_code,
            description: course.description.trim(),
        });
    }
    parsed
}

fn level_for(levels: &[LevelRule], code: i32) -> Option<&LevelRule> {
    levels.iter().find(|level| level.code == code)
}

/// Two passes over the courses held at the candidate's current grade: primary levels pay
/// once each, then the "other" sub-levels fill the remaining room under the bucket cap.
pub(crate) fn score(
    candidate: &CandidateRecord,
    courses: &[CivilianCourseRecord],
    rubric: &CivilianRubric,
) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::new(candidate, Dimension::CivilianCourses);
    let parsed = parse_courses(candidate, courses, &mut breakdown.skipped);
    let eligible: Vec<&ParsedCourse<'_>> = parsed
        .iter()
        .filter(|course| course.grade == candidate.current_grade)
        .collect();

    let max = to_thousandths(rubric.max_points);
    let mut total: i64 = 0;

    let mut primary_awarded: HashSet<&str> = HashSet::new();
    for course in &eligible {
        let Some(level) = level_for(&rubric.primary_levels, course.level_code) else {
            continue;
        };
        if !primary_awarded.insert(level.label.as_str()) {
            continue;
        }
        let points = to_thousandths(level.points);
        total += points;
        breakdown.components.push(
            ScoreComponent::new(level.label.clone(), from_thousandths(points))
                .with_source(course.description),
        );
    }

    let other_cap = to_thousandths(rubric.other_cap);
    let mut other_total: i64 = 0;
    let mut other_awarded: HashSet<&str> = HashSet::new();
    for course in &eligible {
        if total >= max {
            break;
        }
        let Some(level) = level_for(&rubric.other_levels, course.level_code) else {
            continue;
        };
        if other_awarded.contains(level.label.as_str()) {
            continue;
        }
        let points = to_thousandths(level.points);
        if other_total + points > other_cap {
            continue;
        }
        other_awarded.insert(level.label.as_str());
        other_total += points;
        total += points;
        breakdown.components.push(
            ScoreComponent::new(format!("other/{}", level.label), from_thousandths(points))
                .with_source(course.description),
        );
    }

    breakdown.total_points = from_thousandths(total.clamp(0, max));
    breakdown
}
