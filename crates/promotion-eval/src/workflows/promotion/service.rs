use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::{CandidateId, CandidateRecord, Dimension};
use super::evaluation::{AchievementSet, RubricConfig, ScoreBreakdown, ScoringEngine};
use super::repository::{PersonnelStore, RepositoryError, ResultSink};
use super::selection::{
    select_candidates, SelectedCandidate, SelectionPayload, SelectionRequest, ValidationError,
};
use super::structure::{
    EvaluationStructure, RubricStructureLoader, StructureCache, StructureLoader,
};

/// Service composing the personnel store, the result sink and the scoring engine.
pub struct PromotionScoringService<D, S> {
    store: Arc<D>,
    sink: Arc<S>,
    engine: Arc<ScoringEngine>,
    structure: StructureCache,
    run_locks: HashMap<Dimension, Mutex<()>>,
}

impl<D, S> PromotionScoringService<D, S>
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    pub fn new(store: Arc<D>, sink: Arc<S>, rubric: RubricConfig) -> Self {
        let loader = Arc::new(RubricStructureLoader::new(rubric.clone()));
        Self::with_structure_loader(store, sink, rubric, loader)
    }

    pub fn with_structure_loader(
        store: Arc<D>,
        sink: Arc<S>,
        rubric: RubricConfig,
        loader: Arc<dyn StructureLoader>,
    ) -> Self {
        let run_locks = Dimension::ALL
            .into_iter()
            .map(|dimension| (dimension, Mutex::new(())))
            .collect();

        Self {
            store,
            sink,
            engine: Arc::new(ScoringEngine::new(rubric)),
            structure: StructureCache::new(loader),
            run_locks,
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Current roster ordered by id.
    pub fn candidates(&self) -> Result<Vec<CandidateRecord>, ScoringServiceError> {
        let mut candidates = self.store.candidates()?;
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(candidates)
    }

    /// Validates the selection criteria, picks the eligible personnel and replaces the
    /// roster with them.
    pub fn select(
        &self,
        payload: SelectionPayload,
    ) -> Result<SelectionOutcome, ScoringServiceError> {
        let request = payload.validate()?;
        let personnel = self.store.personnel()?;
        let selected = select_candidates(&personnel, &request);
        let roster = selected.iter().map(SelectedCandidate::to_candidate).collect();
        let replaced = self.store.replace_candidates(roster)?;

        info!(
            grade = request.grade,
            category = %request.category,
            as_of = %request.as_of,
            selected = selected.len(),
            "candidate roster replaced"
        );

        Ok(SelectionOutcome {
            request,
            selected,
            replaced,
        })
    }

    /// Scores every rostered candidate for `dimension` and replaces the dimension's stored
    /// results. Runs for the same dimension are serialized; nothing is written when reading
    /// the inputs fails.
    pub fn run(&self, dimension: Dimension) -> Result<ScoringRun, ScoringServiceError> {
        let _guard = self.lock_dimension(dimension);

        let candidates = self.store.candidates()?;
        let achievements = match dimension {
            Dimension::MilitaryCourses => AchievementSet::MilitaryCourses,
            _ => {
                let ids: Vec<CandidateId> = candidates
                    .iter()
                    .map(|candidate| candidate.id.clone())
                    .collect();
                self.store.achievements(dimension, &ids)?
            }
        };
        if achievements.dimension() != dimension {
            return Err(RepositoryError::DimensionMismatch { dimension }.into());
        }

        let results = self.engine.score_all(&candidates, &achievements);
        let persisted = self.sink.replace_results(dimension, &results)?;
        let skipped: usize = results.iter().map(|result| result.skipped.len()).sum();

        info!(
            dimension = %dimension,
            candidates = candidates.len(),
            persisted,
            skipped,
            "scoring run completed"
        );

        Ok(ScoringRun {
            dimension,
            max_points: self.engine.config().max_points(dimension),
            results,
            persisted,
            computed_at: Utc::now(),
        })
    }

    /// Last persisted results for `dimension`, highest total first.
    pub fn results(
        &self,
        dimension: Dimension,
    ) -> Result<Vec<ScoreBreakdown>, ScoringServiceError> {
        Ok(self.sink.results(dimension)?)
    }

    pub fn evaluation_structure(&self) -> Result<Arc<EvaluationStructure>, ScoringServiceError> {
        Ok(self.structure.get()?)
    }

    /// Drops the cached evaluation structure. Returns whether a cached copy existed.
    pub fn refresh_structure(&self) -> bool {
        let cleared = self.structure.invalidate();
        info!(cleared, "evaluation structure cache invalidated");
        cleared
    }

    fn lock_dimension(&self, dimension: Dimension) -> Option<MutexGuard<'_, ()>> {
        self.run_locks
            .get(&dimension)
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Result of a selection request.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    pub request: SelectionRequest,
    pub selected: Vec<SelectedCandidate>,
    /// Rows now in the roster.
    pub replaced: usize,
}

/// Result of one scoring run.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringRun {
    pub dimension: Dimension,
    pub max_points: f64,
    pub results: Vec<ScoreBreakdown>,
    pub persisted: usize,
    pub computed_at: DateTime<Utc>,
}

/// Error raised by the promotion scoring service.
#[derive(Debug, thiserror::Error)]
pub enum ScoringServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    DataAccess(#[from] RepositoryError),
}
