use super::domain::{CandidateId, CandidateRecord, Dimension, PersonnelRecord};
use super::evaluation::{AchievementSet, ScoreBreakdown};

/// Current candidate roster. Selection runs replace it wholesale.
pub trait CandidateRoster: Send + Sync {
    /// Candidates ordered by id.
    fn candidates(&self) -> Result<Vec<CandidateRecord>, RepositoryError>;
    fn replace_candidates(&self, candidates: Vec<CandidateRecord>)
        -> Result<usize, RepositoryError>;
}

/// Per-dimension achievement datasets keyed by candidate.
pub trait AchievementSource: Send + Sync {
    fn achievements(
        &self,
        dimension: Dimension,
        candidate_ids: &[CandidateId],
    ) -> Result<AchievementSet, RepositoryError>;
}

/// Personnel directory consulted when selecting promotion candidates.
pub trait PersonnelDirectory: Send + Sync {
    fn personnel(&self) -> Result<Vec<PersonnelRecord>, RepositoryError>;
}

/// Everything the scoring service reads from the personnel data layer.
pub trait PersonnelStore: CandidateRoster + AchievementSource + PersonnelDirectory {}

impl<T> PersonnelStore for T where T: CandidateRoster + AchievementSource + PersonnelDirectory {}

/// Persisted score tables, one per dimension.
pub trait ResultSink: Send + Sync {
    /// Clears the dimension's table and writes `results` as one atomic unit. Either every row
    /// lands or the previous table is left untouched.
    fn replace_results(
        &self,
        dimension: Dimension,
        results: &[ScoreBreakdown],
    ) -> Result<usize, RepositoryError>;

    fn results(&self, dimension: Dimension) -> Result<Vec<ScoreBreakdown>, RepositoryError>;
}

/// Error enumeration for data-access failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("dataset for {dimension} does not match the request")]
    DimensionMismatch { dimension: Dimension },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
