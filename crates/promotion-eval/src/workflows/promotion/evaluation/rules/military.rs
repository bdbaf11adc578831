use super::super::super::domain::{CandidateRecord, CourseKind, Dimension};
use super::super::config::MilitaryRubric;
use super::super::rounding::round_to;
use super::super::{ScoreBreakdown, ScoreComponent};

/// Points for one catalog entry. Mandatory entries pay on a grade match plus an exact
/// category bonus; the designated `other` course pays unconditionally.
fn entry_points(
    candidate: &CandidateRecord,
    grade: Option<i32>,
    category_code: Option<&str>,
    course_code: &str,
    kind: CourseKind,
    rubric: &MilitaryRubric,
) -> f64 {
    let mut points = 0.0;
    match kind {
        CourseKind::Mandatory => {
            if grade == Some(candidate.current_grade) {
                points += rubric.grade_match_points;
            }
            if let Some(code) = category_code.filter(|code| !code.trim().is_empty()) {
                if code.trim() == candidate.category.code() {
                    points += rubric.category_bonus_points;
                }
            }
        }
        CourseKind::Other => {
            if course_code == rubric.other_course_code {
                points += rubric.other_course_points;
            }
        }
    }
    round_to(points, 2)
}

pub(crate) fn score(candidate: &CandidateRecord, rubric: &MilitaryRubric) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::new(candidate, Dimension::MilitaryCourses);
    let mut mandatory = 0.0;
    let mut other = 0.0;
    let mut awarded: Vec<&str> = Vec::new();

    for entry in &rubric.catalog {
        let points = entry_points(
            candidate,
            entry.grade,
            entry.category_code.as_deref(),
            &entry.course_code,
            entry.kind,
            rubric,
        );
        if points <= 0.0 {
            continue;
        }
        match entry.kind {
            CourseKind::Mandatory => {
                mandatory += points;
                awarded.push(entry.course_code.as_str());
            }
            CourseKind::Other => other += points,
        }
    }

    let mandatory = round_to(mandatory, 2);
    let other = round_to(other, 2);
    let mut mandatory_component = ScoreComponent::new("mandatory", mandatory);
    if !awarded.is_empty() {
        mandatory_component = mandatory_component.with_source(awarded.join(","));
    }
    breakdown.components.push(mandatory_component);
    breakdown.components.push(ScoreComponent::new("other", other));
    breakdown.total_points = round_to((mandatory + other).min(rubric.max_points), 2);
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::promotion::domain::{
        CandidateCategory, CandidateId, MilitaryCourseRecord,
    };

    fn candidate(grade: i32, category: CandidateCategory) -> CandidateRecord {
        CandidateRecord {
            id: CandidateId::new("1001"),
            current_grade: grade,
            category,
        }
    }

    #[test]
    fn grade_match_without_category_scores_base_plus_other() {
        let rubric = MilitaryRubric::default();
        let breakdown = score(&candidate(8, CandidateCategory::Comando), &rubric);

        assert_eq!(breakdown.component("mandatory").map(|c| c.points), Some(4.2));
        assert_eq!(breakdown.component("other").map(|c| c.points), Some(1.8));
        assert_eq!(breakdown.total_points, 6.0);
    }

    #[test]
    fn category_bonus_applies_once_on_exact_match() {
        let rubric = MilitaryRubric::default();
        let breakdown = score(&candidate(9, CandidateCategory::Asimilado), &rubric);

        assert_eq!(breakdown.component("mandatory").map(|c| c.points), Some(4.7));
        assert_eq!(breakdown.total_points, 6.0, "capped at the dimension maximum");
    }

    #[test]
    fn category_bonus_is_paid_even_without_grade_match() {
        let rubric = MilitaryRubric::default();
        let breakdown = score(&candidate(3, CandidateCategory::Asimilado), &rubric);

        assert_eq!(breakdown.component("mandatory").map(|c| c.points), Some(0.5));
        assert_eq!(breakdown.total_points, 2.3);
    }

    #[test]
    fn unmatched_grade_keeps_only_other_course() {
        let rubric = MilitaryRubric::default();
        let breakdown = score(&candidate(12, CandidateCategory::Tecnico), &rubric);

        assert_eq!(breakdown.component("mandatory").map(|c| c.points), Some(0.0));
        assert_eq!(breakdown.total_points, 1.8);
    }

    #[test]
    fn multiple_grade_entries_accumulate_before_the_cap() {
        let mut rubric = MilitaryRubric::default();
        rubric.catalog = vec![
            MilitaryCourseRecord::mandatory(7, None, "T"),
            MilitaryCourseRecord::mandatory(7, None, "T2"),
        ];
        let breakdown = score(&candidate(7, CandidateCategory::Comando), &rubric);

        assert_eq!(breakdown.component("mandatory").map(|c| c.points), Some(8.4));
        assert_eq!(breakdown.total_points, 6.0);
    }

    #[test]
    fn without_other_course_grade_match_scores_exactly_base_points() {
        let mut rubric = MilitaryRubric::default();
        rubric
            .catalog
            .retain(|entry| entry.kind == CourseKind::Mandatory);
        let plain = score(&candidate(9, CandidateCategory::Comando), &rubric);
        let bonus = score(&candidate(9, CandidateCategory::Asimilado), &rubric);

        assert_eq!(plain.total_points, 4.2);
        assert_eq!(bonus.total_points, 4.7);
    }
}
