use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::promotion::domain::{
    CandidateCategory, CandidateId, CandidateRecord, CivilianCourseRecord, Dimension,
    InstitutionalWorkRecord, LanguageRecord, PersonnelRecord,
};
use crate::workflows::promotion::evaluation::{AchievementSet, RubricConfig, ScoreBreakdown};
use crate::workflows::promotion::repository::{
    AchievementSource, CandidateRoster, PersonnelDirectory, RepositoryError, ResultSink,
};
use crate::workflows::promotion::{
    promotion_router, AccessPolicy, CallerRole, PersonnelStore, PromotionScoringService,
};

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn candidate(id: &str, grade: i32, category: CandidateCategory) -> CandidateRecord {
    CandidateRecord {
        id: CandidateId::new(id),
        current_grade: grade,
        category,
    }
}

pub(super) fn roster() -> Vec<CandidateRecord> {
    vec![
        candidate("1001", 8, CandidateCategory::Comando),
        candidate("1002", 9, CandidateCategory::Asimilado),
        candidate("1003", 7, CandidateCategory::Tecnico),
    ]
}

pub(super) fn personnel() -> Vec<PersonnelRecord> {
    let person = |id: &str, grade: i32, category: CandidateCategory, promoted: NaiveDate| {
        PersonnelRecord {
            id: CandidateId::new(id),
            full_name: format!("Officer {id}"),
            grade,
            category,
            last_promotion: promoted,
            required_years: 4,
        }
    };
    vec![
        person("2003", 8, CandidateCategory::Comando, date(2018, 3, 1)),
        person("2001", 8, CandidateCategory::Comando, date(2020, 1, 1)),
        person("2002", 8, CandidateCategory::Comando, date(2023, 1, 1)),
        person("2004", 8, CandidateCategory::Tecnico, date(2015, 1, 1)),
    ]
}

pub(super) fn languages(entries: Vec<(&str, Vec<&str>)>) -> AchievementSet {
    let mut by_candidate = HashMap::new();
    for (id, names) in entries {
        let records = names
            .iter()
            .map(|name| LanguageRecord {
                language: name.to_string(),
            })
            .collect::<Vec<_>>();
        by_candidate.insert(CandidateId::new(id), records);
    }
    AchievementSet::Languages(by_candidate)
}

pub(super) fn civilian(entries: &[(&str, &str, &str)]) -> AchievementSet {
    let mut by_candidate: HashMap<CandidateId, Vec<CivilianCourseRecord>> = HashMap::new();
    for (id, grade, level) in entries {
        by_candidate
            .entry(CandidateId::new(*id))
            .or_default()
            .push(CivilianCourseRecord {
                grade: grade.to_string(),
                level_code: level.to_string(),
                description: format!("course {level}"),
            });
    }
    AchievementSet::CivilianCourses(by_candidate)
}

pub(super) fn institutional(entries: &[(&str, &str)]) -> AchievementSet {
    let mut by_candidate: HashMap<CandidateId, Vec<InstitutionalWorkRecord>> = HashMap::new();
    for (id, grade) in entries {
        by_candidate
            .entry(CandidateId::new(*id))
            .or_default()
            .push(InstitutionalWorkRecord {
                grade: grade.to_string(),
                description: "published doctrine".to_string(),
            });
    }
    AchievementSet::InstitutionalWork(by_candidate)
}

#[derive(Default)]
pub(super) struct MemoryStore {
    pub(super) candidates: Mutex<Vec<CandidateRecord>>,
    pub(super) personnel: Mutex<Vec<PersonnelRecord>>,
    pub(super) achievements: Mutex<HashMap<Dimension, AchievementSet>>,
    pub(super) achievement_reads: AtomicUsize,
}

impl MemoryStore {
    pub(super) fn with_roster(candidates: Vec<CandidateRecord>) -> Self {
        let store = Self::default();
        *store.candidates.lock().expect("roster mutex poisoned") = candidates;
        *store.personnel.lock().expect("personnel mutex poisoned") = personnel();
        store
    }

    pub(super) fn set_achievements(&self, set: AchievementSet) {
        self.achievements
            .lock()
            .expect("achievement mutex poisoned")
            .insert(set.dimension(), set);
    }
}

impl CandidateRoster for MemoryStore {
    fn candidates(&self) -> Result<Vec<CandidateRecord>, RepositoryError> {
        Ok(self.candidates.lock().expect("roster mutex poisoned").clone())
    }

    fn replace_candidates(
        &self,
        candidates: Vec<CandidateRecord>,
    ) -> Result<usize, RepositoryError> {
        let mut guard = self.candidates.lock().expect("roster mutex poisoned");
        *guard = candidates;
        Ok(guard.len())
    }
}

impl AchievementSource for MemoryStore {
    fn achievements(
        &self,
        dimension: Dimension,
        _candidate_ids: &[CandidateId],
    ) -> Result<AchievementSet, RepositoryError> {
        self.achievement_reads.fetch_add(1, Ordering::SeqCst);
        let guard = self.achievements.lock().expect("achievement mutex poisoned");
        Ok(guard
            .get(&dimension)
            .cloned()
            .unwrap_or_else(|| AchievementSet::empty(dimension)))
    }
}

impl PersonnelDirectory for MemoryStore {
    fn personnel(&self) -> Result<Vec<PersonnelRecord>, RepositoryError> {
        Ok(self.personnel.lock().expect("personnel mutex poisoned").clone())
    }
}

/// Store whose achievement reads fail while the roster stays readable.
pub(super) struct OfflineAchievements {
    pub(super) roster: Vec<CandidateRecord>,
}

impl CandidateRoster for OfflineAchievements {
    fn candidates(&self) -> Result<Vec<CandidateRecord>, RepositoryError> {
        Ok(self.roster.clone())
    }

    fn replace_candidates(
        &self,
        _candidates: Vec<CandidateRecord>,
    ) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }
}

impl AchievementSource for OfflineAchievements {
    fn achievements(
        &self,
        _dimension: Dimension,
        _candidate_ids: &[CandidateId],
    ) -> Result<AchievementSet, RepositoryError> {
        Err(RepositoryError::Unavailable("achievement export offline".to_string()))
    }
}

impl PersonnelDirectory for OfflineAchievements {
    fn personnel(&self) -> Result<Vec<PersonnelRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemorySink {
    tables: Mutex<HashMap<Dimension, Vec<ScoreBreakdown>>>,
    pub(super) writes: AtomicUsize,
}

impl MemorySink {
    pub(super) fn stored(&self, dimension: Dimension) -> Option<Vec<ScoreBreakdown>> {
        self.tables
            .lock()
            .expect("sink mutex poisoned")
            .get(&dimension)
            .cloned()
    }
}

impl ResultSink for MemorySink {
    fn replace_results(
        &self,
        dimension: Dimension,
        results: &[ScoreBreakdown],
    ) -> Result<usize, RepositoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.tables
            .lock()
            .expect("sink mutex poisoned")
            .insert(dimension, results.to_vec());
        Ok(results.len())
    }

    fn results(&self, dimension: Dimension) -> Result<Vec<ScoreBreakdown>, RepositoryError> {
        self.stored(dimension).ok_or(RepositoryError::NotFound)
    }
}

pub(super) struct UnavailableSink;

impl ResultSink for UnavailableSink {
    fn replace_results(
        &self,
        _dimension: Dimension,
        _results: &[ScoreBreakdown],
    ) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn results(&self, _dimension: Dimension) -> Result<Vec<ScoreBreakdown>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Sink that flags any overlap between two `replace_results` calls.
#[derive(Default)]
pub(super) struct OverlapDetectingSink {
    in_flight: AtomicUsize,
    pub(super) overlapped: AtomicBool,
    pub(super) writes: AtomicUsize,
}

impl ResultSink for OverlapDetectingSink {
    fn replace_results(
        &self,
        _dimension: Dimension,
        results: &[ScoreBreakdown],
    ) -> Result<usize, RepositoryError> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(5));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(results.len())
    }

    fn results(&self, _dimension: Dimension) -> Result<Vec<ScoreBreakdown>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) fn build_service() -> (
    PromotionScoringService<MemoryStore, MemorySink>,
    Arc<MemoryStore>,
    Arc<MemorySink>,
) {
    let store = Arc::new(MemoryStore::with_roster(roster()));
    let sink = Arc::new(MemorySink::default());
    let service =
        PromotionScoringService::new(store.clone(), sink.clone(), RubricConfig::default());
    (service, store, sink)
}

pub(super) fn token_policy() -> AccessPolicy {
    let mut policy = AccessPolicy::default();
    policy.grant("reader-token", CallerRole::Reader);
    policy.grant("admin-token", CallerRole::Admin);
    policy
}

pub(super) fn router_with_service<D, S>(
    service: PromotionScoringService<D, S>,
    policy: AccessPolicy,
) -> axum::Router
where
    D: PersonnelStore + 'static,
    S: ResultSink + 'static,
{
    promotion_router(Arc::new(service), Arc::new(policy))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
