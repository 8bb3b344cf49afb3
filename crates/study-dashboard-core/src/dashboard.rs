//! Dashboard entry point: dataset cache, scoring and notes behind one object.

use std::sync::Arc;

use thiserror::Error;

use crate::config::DashboardConfig;
use crate::models::{NoteFields, PatientRecord, SaveOutcome};
use crate::report::PatientReport;
use crate::scoring::{
    MadrsItemScore, MadrsTotal, Phq9DayScore, Pid5DimensionScore, ScoreUnavailable, Scorer,
};
use crate::store::{Dataset, DatasetCache, NoteStore, SaveResult, SchemaError};

/// Errors from per-patient queries.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Unknown patient: {0}")]
    UnknownPatient(String),

    #[error(transparent)]
    Unavailable(#[from] ScoreUnavailable),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// One open study dataset and its note store.
#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    cache: DatasetCache,
    notes: NoteStore,
}

impl Dashboard {
    /// Open the dataset named by `config`.
    ///
    /// Fails only on identifier violations. An unreadable file opens as an
    /// empty dataset; see [`Dashboard::dataset_warning`].
    pub fn open(config: DashboardConfig) -> Result<Self, SchemaError> {
        let dashboard = Self {
            notes: NoteStore::new(config.notes_path()),
            cache: DatasetCache::new(),
            config,
        };
        let dataset = dashboard.dataset()?;
        tracing::info!(
            data = %dashboard.config.data_path.display(),
            notes = %dashboard.notes.path().display(),
            patients = dataset.len(),
            "dashboard opened"
        );
        Ok(dashboard)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Current dataset, reloaded if the file changed since the last call.
    pub fn dataset(&self) -> Result<Arc<Dataset>, SchemaError> {
        self.cache.get(&self.config.data_path)
    }

    /// Drop the cached dataset and load it again.
    pub fn reload(&self) -> Result<Arc<Dataset>, SchemaError> {
        self.cache.invalidate(&self.config.data_path);
        self.dataset()
    }

    /// Why the dataset is empty, if it could not be read.
    pub fn dataset_warning(&self) -> Result<Option<String>, SchemaError> {
        Ok(self.dataset()?.load_failure().map(str::to_string))
    }

    /// Patient identifiers in selector order.
    pub fn patient_ids(&self) -> Result<Vec<String>, SchemaError> {
        Ok(self.dataset()?.patient_ids())
    }

    /// Full report for one patient, with notes read fresh from the note store.
    pub fn report(&self, id: &str) -> QueryResult<PatientReport> {
        let dataset = self.dataset()?;
        let notes = self.notes.load_notes(id);
        PatientReport::build(&dataset, id, notes)
            .ok_or_else(|| QueryError::UnknownPatient(id.to_string()))
    }

    pub fn madrs_total(&self, id: &str) -> QueryResult<MadrsTotal> {
        self.score(id, |scorer, record| Ok(scorer.madrs_total(record)))
    }

    pub fn madrs_items(&self, id: &str) -> QueryResult<Vec<MadrsItemScore>> {
        self.score(id, |scorer, record| Ok(scorer.madrs_items(record)))
    }

    pub fn pid5_dimensions(&self, id: &str) -> QueryResult<Vec<Pid5DimensionScore>> {
        self.score(id, |scorer, record| scorer.pid5_dimensions(record))
    }

    pub fn phq9_progression(&self, id: &str) -> QueryResult<Vec<Phq9DayScore>> {
        self.score(id, |scorer, record| scorer.phq9_progression(record))
    }

    pub fn load_notes(&self, id: &str) -> NoteFields {
        self.notes.load_notes(id)
    }

    /// Save notes for `id`. When notes share the dataset file the cached
    /// dataset is dropped so the next read sees the new row.
    pub fn save_notes(&self, id: &str, notes: &NoteFields) -> SaveResult<SaveOutcome> {
        let outcome = self.notes.save_notes(id, notes)?;
        if self.notes.path() == self.config.data_path.as_path() {
            self.cache.invalidate(&self.config.data_path);
        }
        Ok(outcome)
    }

    fn score<T>(
        &self,
        id: &str,
        f: impl FnOnce(Scorer<'_>, &PatientRecord) -> Result<T, ScoreUnavailable>,
    ) -> QueryResult<T> {
        let dataset = self.dataset()?;
        let record = dataset
            .get(id)
            .ok_or_else(|| QueryError::UnknownPatient(id.to_string()))?;
        Ok(f(Scorer::new(dataset.schema()), record)?)
    }
}
