use metrics_exporter_prometheus::PrometheusHandle;
use promotion_eval::workflows::promotion::{
    datasets, load_achievements, load_candidates, load_personnel, AchievementSet,
    AchievementSource, CandidateId, CandidateRecord, CandidateRoster, DatasetImportError,
    Dimension, PersonnelDirectory, PersonnelRecord, RepositoryError, ResultSink, ScoreBreakdown,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

pub(crate) const PERSONNEL_FILE: &str = "personnel.csv";
pub(crate) const CANDIDATES_FILE: &str = "candidates.csv";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// CSV file holding the achievement records for `dimension`, if it reads one.
pub(crate) fn achievement_file(dimension: Dimension) -> Option<&'static str> {
    match dimension {
        Dimension::MilitaryCourses => None,
        Dimension::CivilianCourses => Some("civilian_courses.csv"),
        Dimension::Languages => Some("languages.csv"),
        Dimension::InstitutionalWork => Some("institutional_work.csv"),
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPersonnelStore {
    personnel: Arc<Mutex<Vec<PersonnelRecord>>>,
    roster: Arc<Mutex<Vec<CandidateRecord>>>,
    achievements: Arc<Mutex<HashMap<Dimension, AchievementSet>>>,
}

impl InMemoryPersonnelStore {
    /// Seeds the store from the CSV exports found in `dir`. Missing files leave that part empty.
    pub(crate) fn from_data_dir(dir: &Path) -> Result<Self, DatasetImportError> {
        let store = Self::default();

        let path = dir.join(PERSONNEL_FILE);
        if path.exists() {
            let personnel = load_personnel(datasets::open(&path)?)?;
            info!(path = %path.display(), rows = personnel.len(), "personnel loaded");
            *store.personnel.lock().expect("personnel mutex poisoned") = personnel;
        }

        let path = dir.join(CANDIDATES_FILE);
        if path.exists() {
            let mut candidates = load_candidates(datasets::open(&path)?)?;
            candidates.sort_by(|a, b| a.id.cmp(&b.id));
            info!(path = %path.display(), rows = candidates.len(), "candidate roster loaded");
            *store.roster.lock().expect("roster mutex poisoned") = candidates;
        }

        for dimension in Dimension::ALL {
            let Some(file) = achievement_file(dimension) else {
                continue;
            };
            let path = dir.join(file);
            if !path.exists() {
                continue;
            }
            let set = load_achievements(dimension, datasets::open(&path)?)?;
            info!(path = %path.display(), %dimension, "achievement records loaded");
            store.set_achievements(set);
        }

        Ok(store)
    }

    pub(crate) fn set_achievements(&self, set: AchievementSet) {
        self.achievements
            .lock()
            .expect("achievement mutex poisoned")
            .insert(set.dimension(), set);
    }

    #[cfg(test)]
    pub(crate) fn set_personnel(&self, personnel: Vec<PersonnelRecord>) {
        *self.personnel.lock().expect("personnel mutex poisoned") = personnel;
    }
}

impl CandidateRoster for InMemoryPersonnelStore {
    fn candidates(&self) -> Result<Vec<CandidateRecord>, RepositoryError> {
        Ok(self.roster.lock().expect("roster mutex poisoned").clone())
    }

    fn replace_candidates(
        &self,
        mut candidates: Vec<CandidateRecord>,
    ) -> Result<usize, RepositoryError> {
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        let mut guard = self.roster.lock().expect("roster mutex poisoned");
        *guard = candidates;
        Ok(guard.len())
    }
}

impl AchievementSource for InMemoryPersonnelStore {
    fn achievements(
        &self,
        dimension: Dimension,
        _candidate_ids: &[CandidateId],
    ) -> Result<AchievementSet, RepositoryError> {
        let guard = self.achievements.lock().expect("achievement mutex poisoned");
        Ok(guard
            .get(&dimension)
            .cloned()
            .unwrap_or_else(|| AchievementSet::empty(dimension)))
    }
}

impl PersonnelDirectory for InMemoryPersonnelStore {
    fn personnel(&self) -> Result<Vec<PersonnelRecord>, RepositoryError> {
        Ok(self.personnel.lock().expect("personnel mutex poisoned").clone())
    }
}

/// Score tables kept behind one lock so a replace is never observed half-written.
#[derive(Default, Clone)]
pub(crate) struct InMemoryResultStore {
    tables: Arc<Mutex<HashMap<Dimension, Vec<ScoreBreakdown>>>>,
}

impl ResultSink for InMemoryResultStore {
    fn replace_results(
        &self,
        dimension: Dimension,
        results: &[ScoreBreakdown],
    ) -> Result<usize, RepositoryError> {
        let mut guard = self.tables.lock().expect("result mutex poisoned");
        guard.insert(dimension, results.to_vec());
        Ok(results.len())
    }

    fn results(&self, dimension: Dimension) -> Result<Vec<ScoreBreakdown>, RepositoryError> {
        let guard = self.tables.lock().expect("result mutex poisoned");
        guard.get(&dimension).cloned().ok_or(RepositoryError::NotFound)
    }
}
