use clap::Args;
use promotion_eval::error::AppError;
use promotion_eval::workflows::promotion::{
    datasets, load_achievements, load_candidates, AchievementSet, Dimension, ScoreBreakdown,
    ScoringEngine,
};
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Dimension to score: military-courses, civilian-courses, languages, institutional-work
    #[arg(value_parser = parse_dimension)]
    pub(crate) dimension: Dimension,
    /// Candidate roster CSV (id,current_grade,category)
    #[arg(long)]
    pub(crate) candidates: PathBuf,
    /// Achievement records CSV for the dimension. Not used for military courses.
    #[arg(long)]
    pub(crate) records: Option<PathBuf>,
    /// Print the ranked breakdowns as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn parse_dimension(raw: &str) -> Result<Dimension, String> {
    Dimension::from_slug(raw).ok_or_else(|| {
        let known: Vec<&str> = Dimension::ALL.iter().map(Dimension::slug).collect();
        format!("unknown dimension '{raw}' (expected one of {})", known.join(", "))
    })
}

pub(crate) fn run_score_report(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        dimension,
        candidates,
        records,
        json,
    } = args;

    let achievements = achievements_for(dimension, records.as_deref())?;
    let candidates = load_candidates(datasets::open(&candidates)?)?;

    let engine = ScoringEngine::default();
    let results = engine.score_all(&candidates, &achievements);
    let max_points = engine.config().max_points(dimension);

    if json {
        let payload = json!({
            "dimension": dimension,
            "max_points": max_points,
            "count": results.len(),
            "results": results,
        });
        println!("{payload:#}");
    } else {
        print!("{}", render_table(dimension, max_points, &results));
    }
    Ok(())
}

/// Military scoring reads the rubric catalog; every other dimension needs its records file.
pub(crate) fn achievements_for(
    dimension: Dimension,
    records: Option<&Path>,
) -> Result<AchievementSet, AppError> {
    match (dimension, records) {
        (Dimension::MilitaryCourses, _) => Ok(AchievementSet::MilitaryCourses),
        (_, Some(path)) => Ok(load_achievements(dimension, datasets::open(path)?)?),
        (_, None) => Err(AppError::Usage(format!(
            "--records is required to score {dimension}"
        ))),
    }
}

/// Plain-text ranking: one row per candidate, highest total first.
pub(crate) fn render_table(
    dimension: Dimension,
    max_points: f64,
    results: &[ScoreBreakdown],
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ranking (max {max_points} points, {} candidates)",
        dimension.label(),
        results.len()
    );
    let _ = writeln!(
        out,
        "{:>4}  {:<12} {:>5} {:<4} {:>8}  {}",
        "#", "candidate", "grade", "cat", "points", "detail"
    );

    for (position, result) in results.iter().enumerate() {
        let detail = match result.tally {
            Some(tally) => format!("{} counted, {}% weighted", tally.count, tally.weighted_percentage),
            None => result
                .components
                .iter()
                .map(|component| format!("{} {}", component.label, component.points))
                .collect::<Vec<_>>()
                .join(", "),
        };
        let _ = writeln!(
            out,
            "{:>4}  {:<12} {:>5} {:<4} {:>8.3}  {}",
            position + 1,
            result.candidate_id.as_str(),
            result.current_grade,
            result.category.code(),
            result.total_points,
            detail
        );
        for issue in &result.skipped {
            let _ = writeln!(out, "      skipped: {issue}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "id,current_grade,category\n1001,8,C\n1002,7,T\n";

    #[test]
    fn parses_dimension_slugs() {
        assert_eq!(parse_dimension("languages"), Ok(Dimension::Languages));
        assert_eq!(
            parse_dimension("Civilian_Courses"),
            Ok(Dimension::CivilianCourses)
        );
        let err = parse_dimension("sports").expect_err("unknown slug rejected");
        assert!(err.contains("institutional-work"));
    }

    #[test]
    fn record_based_dimensions_require_a_records_file() {
        for dimension in [
            Dimension::CivilianCourses,
            Dimension::Languages,
            Dimension::InstitutionalWork,
        ] {
            match achievements_for(dimension, None) {
                Err(AppError::Usage(message)) => {
                    assert!(message.contains(dimension.slug()), "{message}")
                }
                other => panic!("expected usage error for {dimension}, got {other:?}"),
            }
        }

        let military = achievements_for(Dimension::MilitaryCourses, None)
            .expect("military reads the catalog");
        assert_eq!(military, AchievementSet::MilitaryCourses);
    }

    #[test]
    fn table_lists_candidates_in_rank_order() {
        let candidates = load_candidates(ROSTER.as_bytes()).expect("roster loads");
        let records = "id,language\n1002,en\n1002,fr\n1001,en\n";
        let set = load_achievements(Dimension::Languages, records.as_bytes())
            .expect("languages load");
        let results = ScoringEngine::default().score_all(&candidates, &set);

        let table = render_table(Dimension::Languages, 1.8, &results);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Languages ranking"));
        assert!(lines[2].contains("1002"));
        assert!(lines[2].contains("1.080"));
        assert!(lines[2].contains("2 counted"));
        assert!(lines[3].contains("1001"));
    }

    #[test]
    fn table_reports_skipped_records() {
        let candidates = load_candidates(ROSTER.as_bytes()).expect("roster loads");
        let records = "id,grade,level_code,description\n1002,7,xx,Bad code\n";
        let set = load_achievements(Dimension::CivilianCourses, records.as_bytes())
            .expect("civilian load");
        let results = ScoringEngine::default().score_all(&candidates, &set);

        let table = render_table(Dimension::CivilianCourses, 2.4, &results);
        assert!(table.contains("skipped:"));
        assert!(table.contains("\"xx\""));
    }
}
