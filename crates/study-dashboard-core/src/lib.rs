//! Study Dashboard Core Library
//!
//! Patient-level view of a clinical depression study: demographics, MADRS,
//! PID-5 and PHQ-9 scores, and nurse care notes, read from one flat table.
//!
//! # Architecture
//!
//! ```text
//!  patients.csv ──► Table (UTF-8 / Latin-1) ──► Schema + Dataset (ID checks)
//!                                                     │
//!                                              DatasetCache (path + fingerprint)
//!                                                     │
//!                              ┌──────────────────────┼───────────────────┐
//!                              ▼                      ▼                   ▼
//!                        Scorer (MADRS,         PatientReport        NoteStore
//!                        PID-5, PHQ-9)          (JSON payload)    (locked RMW + CAS)
//! ```
//!
//! # Core Principle
//!
//! **A score is either complete or unavailable.** Missing instrument columns
//! never produce partial sums; only the MADRS total defaults to 0.
//!
//! # Modules
//!
//! - [`store`]: CSV table, schema, dataset loader, cache and note store
//! - [`models`]: Domain types (PatientRecord, Demographics, NoteFields, etc.)
//! - [`scoring`]: MADRS, PID-5 and PHQ-9 aggregation
//! - [`report`]: Per-patient report payload
//! - [`config`]: Dashboard configuration file
//! - [`dashboard`]: The [`Dashboard`] entry point

pub mod config;
pub mod dashboard;
pub mod models;
pub mod report;
pub mod scoring;
pub mod store;

// Re-export commonly used types
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, QueryError, QueryResult};
pub use models::{NoteFields, PatientRecord, SaveOutcome};
pub use report::PatientReport;
pub use scoring::{ScoreUnavailable, Scorer};
pub use store::{Dataset, DatasetCache, NoteStore, SaveError, SchemaError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

use scoring::{MadrsItemScore, Phq9DayScore, Pid5DimensionScore};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DashboardError {
    #[error("Dataset error: {0}")]
    SchemaError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Score unavailable: {0}")]
    ScoreUnavailable(String),

    #[error("Save failed: {0}")]
    SaveError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<SchemaError> for DashboardError {
    fn from(e: SchemaError) -> Self {
        DashboardError::SchemaError(e.to_string())
    }
}

impl From<QueryError> for DashboardError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Schema(e) => e.into(),
            QueryError::UnknownPatient(id) => DashboardError::NotFound(id),
            QueryError::Unavailable(e) => DashboardError::ScoreUnavailable(e.to_string()),
        }
    }
}

impl From<SaveError> for DashboardError {
    fn from(e: SaveError) -> Self {
        DashboardError::SaveError(e.to_string())
    }
}

impl From<config::ConfigError> for DashboardError {
    fn from(e: config::ConfigError) -> Self {
        DashboardError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        DashboardError::SerializationError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open a dashboard on a dataset file, with notes stored in the same file.
#[uniffi::export]
pub fn open_dashboard(data_path: String) -> Result<Arc<StudyDashboardCore>, DashboardError> {
    let dashboard = Dashboard::open(DashboardConfig::for_data(data_path))?;
    Ok(Arc::new(StudyDashboardCore { dashboard }))
}

/// Open a dashboard described by a JSON config file.
#[uniffi::export]
pub fn open_dashboard_with_config(
    config_path: String,
) -> Result<Arc<StudyDashboardCore>, DashboardError> {
    let config = DashboardConfig::load(&config_path)?;
    let dashboard = Dashboard::open(config)?;
    Ok(Arc::new(StudyDashboardCore { dashboard }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe dashboard handle for FFI. Locking happens inside the cache
/// and note store.
#[derive(uniffi::Object)]
pub struct StudyDashboardCore {
    dashboard: Dashboard,
}

#[uniffi::export]
impl StudyDashboardCore {
    // =========================================================================
    // Dataset
    // =========================================================================

    /// Patient identifiers in selector order.
    pub fn patient_ids(&self) -> Result<Vec<String>, DashboardError> {
        Ok(self.dashboard.patient_ids()?)
    }

    /// Message explaining why the dataset is empty, if it failed to load.
    pub fn dataset_warning(&self) -> Result<Option<String>, DashboardError> {
        Ok(self.dashboard.dataset_warning()?)
    }

    /// Drop the cached dataset and read the file again.
    pub fn reload(&self) -> Result<u32, DashboardError> {
        let dataset = self.dashboard.reload()?;
        Ok(u32::try_from(dataset.len()).unwrap_or(u32::MAX))
    }

    // =========================================================================
    // Scores
    // =========================================================================

    /// Full patient report as JSON.
    pub fn patient_report_json(&self, id: String) -> Result<String, DashboardError> {
        let report = self.dashboard.report(&id)?;
        Ok(report.to_json()?)
    }

    pub fn madrs_total(&self, id: String) -> Result<FfiMadrsTotal, DashboardError> {
        let total = self.dashboard.madrs_total(&id)?;
        Ok(FfiMadrsTotal {
            baseline: total.baseline,
            follow_up: total.follow_up,
        })
    }

    pub fn madrs_items(&self, id: String) -> Result<Vec<FfiMadrsItem>, DashboardError> {
        let items = self.dashboard.madrs_items(&id)?;
        Ok(items.into_iter().map(|i| i.into()).collect())
    }

    pub fn pid5_dimensions(
        &self,
        id: String,
    ) -> Result<Vec<FfiPid5Dimension>, DashboardError> {
        let dimensions = self.dashboard.pid5_dimensions(&id)?;
        Ok(dimensions.into_iter().map(|d| d.into()).collect())
    }

    pub fn phq9_progression(&self, id: String) -> Result<Vec<FfiPhq9Day>, DashboardError> {
        let days = self.dashboard.phq9_progression(&id)?;
        Ok(days.into_iter().map(|d| d.into()).collect())
    }

    // =========================================================================
    // Notes
    // =========================================================================

    pub fn load_notes(&self, id: String) -> FfiNotes {
        self.dashboard.load_notes(&id).into()
    }

    pub fn save_notes(
        &self,
        id: String,
        objectives: String,
        tasks: String,
        comments: String,
    ) -> Result<FfiSaveOutcome, DashboardError> {
        let notes = NoteFields::new(objectives, tasks, comments);
        Ok(self.dashboard.save_notes(&id, &notes)?.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMadrsTotal {
    pub baseline: f64,
    pub follow_up: f64,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMadrsItem {
    pub item: u8,
    pub label: String,
    /// "Baseline" or "Day 30"
    pub phase: String,
    pub score: f64,
}

impl From<MadrsItemScore> for FfiMadrsItem {
    fn from(s: MadrsItemScore) -> Self {
        Self {
            item: s.item,
            label: s.label.to_string(),
            phase: s.phase.label().to_string(),
            score: s.score,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPid5Dimension {
    pub dimension: String,
    pub baseline: f64,
    pub baseline_answered: u32,
    pub follow_up: f64,
    pub follow_up_answered: u32,
}

impl From<Pid5DimensionScore> for FfiPid5Dimension {
    fn from(s: Pid5DimensionScore) -> Self {
        Self {
            dimension: s.label.to_string(),
            baseline: s.baseline.total,
            baseline_answered: s.baseline.answered as u32,
            follow_up: s.follow_up.total,
            follow_up_answered: s.follow_up.answered as u32,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPhq9Day {
    pub day: u8,
    pub label: String,
    pub total: f64,
    pub answered: u32,
}

impl From<Phq9DayScore> for FfiPhq9Day {
    fn from(s: Phq9DayScore) -> Self {
        Self {
            day: s.day,
            label: s.label,
            total: s.total,
            answered: s.answered as u32,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNotes {
    pub objectives: String,
    pub tasks: String,
    pub comments: String,
}

impl From<NoteFields> for FfiNotes {
    fn from(n: NoteFields) -> Self {
        Self {
            objectives: n.objectives,
            tasks: n.tasks,
            comments: n.comments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiSaveOutcome {
    Updated,
    Appended,
}

impl From<SaveOutcome> for FfiSaveOutcome {
    fn from(o: SaveOutcome) -> Self {
        match o {
            SaveOutcome::Updated => FfiSaveOutcome::Updated,
            SaveOutcome::Appended => FfiSaveOutcome::Appended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_core(csv: &str) -> (tempfile::TempDir, Arc<StudyDashboardCore>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patients.csv");
        std::fs::write(&path, csv).unwrap();
        let core = open_dashboard(path.display().to_string()).unwrap();
        (dir, core)
    }

    #[test]
    fn test_open_and_list() {
        let (_dir, core) = setup_core("ID,age\nP10,40\nP2,35\n");
        assert_eq!(core.patient_ids().unwrap(), vec!["P2", "P10"]);
        assert_eq!(core.dataset_warning().unwrap(), None);
    }

    #[test]
    fn test_open_invalid_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patients.csv");
        std::fs::write(&path, "ID,age\n,40\n").unwrap();
        assert!(matches!(
            open_dashboard(path.display().to_string()),
            Err(DashboardError::SchemaError(_))
        ));
    }

    #[test]
    fn test_error_mapping() {
        let (_dir, core) = setup_core("ID,pid5_1_bl\nP1,2\n");
        assert!(matches!(
            core.madrs_total("P9".into()),
            Err(DashboardError::NotFound(id)) if id == "P9"
        ));
        assert!(matches!(
            core.pid5_dimensions("P1".into()),
            Err(DashboardError::ScoreUnavailable(_))
        ));
        assert!(matches!(
            core.save_notes(" ".into(), String::new(), String::new(), String::new()),
            Err(DashboardError::SaveError(_))
        ));
    }

    #[test]
    fn test_null_marker_save_keeps_dashboard_usable() {
        let (_dir, core) = setup_core("ID\nP1\n");
        assert!(matches!(
            core.save_notes("N/A".into(), "o".into(), String::new(), String::new()),
            Err(DashboardError::SaveError(_))
        ));
        assert_eq!(core.patient_ids().unwrap(), vec!["P1"]);
        assert_eq!(core.dataset_warning().unwrap(), None);
    }

    #[test]
    fn test_notes_round_trip() {
        let (_dir, core) = setup_core("ID\nP1\n");
        let outcome = core
            .save_notes("P1".into(), "o".into(), "t".into(), "c".into())
            .unwrap();
        assert_eq!(outcome, FfiSaveOutcome::Updated);

        let notes = core.load_notes("P1".into());
        assert_eq!(
            (notes.objectives.as_str(), notes.tasks.as_str(), notes.comments.as_str()),
            ("o", "t", "c")
        );
    }

    #[test]
    fn test_report_json() {
        let (_dir, core) = setup_core("ID,madrs_score_fu,madrs_1_bl\nP3,18,2\n");
        let json: serde_json::Value =
            serde_json::from_str(&core.patient_report_json("P3".into()).unwrap()).unwrap();
        assert_eq!(json["madrs_total"]["follow_up"], 18.0);
        assert_eq!(json["madrs_items"][0]["label"], "Apparent Sadness");
    }
}
