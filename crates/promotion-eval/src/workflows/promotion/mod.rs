//! Promotion candidate evaluation.
//!
//! Candidates selected for promotion are scored in four independent dimensions: military
//! courses, civilian courses, languages and institutional-value work. Each scoring run reads
//! the roster and the dimension's achievement records, applies the rubric, ranks the
//! breakdowns and replaces the dimension's persisted result table in one step.

pub mod access;
pub mod datasets;
pub mod domain;
pub mod evaluation;
pub mod repository;
pub mod router;
pub mod selection;
pub mod service;
pub mod structure;

#[cfg(test)]
mod tests;

pub use access::{require_token, AccessDenied, AccessPolicy, Caller, CallerRole};
pub use datasets::{load_achievements, load_candidates, load_personnel, DatasetImportError};
pub use domain::{
    CandidateCategory, CandidateId, CandidateRecord, CivilianCourseRecord, CourseKind, Dimension,
    InstitutionalWorkRecord, LanguageRecord, MilitaryCourseRecord, PersonnelRecord,
};
pub use evaluation::{
    rank_by_total, AchievementSet, ComputationError, RecordField, RubricConfig, ScoreBreakdown,
    ScoreComponent, ScoringEngine, Tally,
};
pub use repository::{
    AchievementSource, CandidateRoster, PersonnelDirectory, PersonnelStore, RepositoryError,
    ResultSink,
};
pub use router::promotion_router;
pub use selection::{SelectedCandidate, SelectionPayload, SelectionRequest, ValidationError};
pub use service::{PromotionScoringService, ScoringRun, ScoringServiceError, SelectionOutcome};
pub use structure::{EvaluationStructure, RubricStructureLoader, StructureCache, StructureLoader};
