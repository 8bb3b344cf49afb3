//! Per-patient dashboard report.

use serde::Serialize;

use crate::models::{NoteFields, PatientRecord};
use crate::scoring::{
    MadrsItemScore, MadrsTotal, Phq9DayScore, Pid5DimensionScore, ScoreResult, ScoreUnavailable,
    Scorer,
};
use crate::store::Dataset;

/// Everything the dashboard shows for one patient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientReport {
    pub metadata: ReportMetadata,
    pub demographics: DemographicsSection,
    pub clinical: ClinicalSection,
    pub madrs_total: MadrsTotal,
    /// Empty when no MADRS item was answered
    pub madrs_items: Vec<MadrsItemScore>,
    pub pid5: ScoreSection<Vec<Pid5DimensionScore>>,
    pub phq9: ScoreSection<Vec<Phq9DayScore>>,
    pub notes: NoteFields,
}

/// Report provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub patient_id: String,
    /// Dataset file the report was built from
    pub source: Option<String>,
    /// SHA-256 of the dataset file contents
    pub dataset_digest: Option<String>,
    /// RFC 3339 timestamp
    pub generated_at: String,
}

/// Demographics with display labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemographicsSection {
    pub age: Option<f64>,
    pub sex: String,
    pub education_years: Option<f64>,
    pub income: String,
}

/// Clinical profile with `N/A` for missing values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicalSection {
    pub comorbidities: String,
    pub pregnant: String,
    pub cigarettes: String,
    pub alcohol: String,
    pub cocaine: String,
}

/// A score block that may be unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreSection<T> {
    Available { scores: T },
    /// Instrument not part of this study; shown as a notice
    NotCollected,
    /// Instrument partially present; shown as a warning
    Incomplete { missing: Vec<String> },
}

impl<T> ScoreSection<T> {
    pub fn scores(&self) -> Option<&T> {
        match self {
            ScoreSection::Available { scores } => Some(scores),
            _ => None,
        }
    }
}

impl<T> From<ScoreResult<T>> for ScoreSection<T> {
    fn from(result: ScoreResult<T>) -> Self {
        match result {
            Ok(scores) => ScoreSection::Available { scores },
            Err(ScoreUnavailable::NotCollected { .. }) => ScoreSection::NotCollected,
            Err(ScoreUnavailable::Incomplete { missing, .. }) => {
                ScoreSection::Incomplete { missing }
            }
        }
    }
}

impl PatientReport {
    /// Build the report for `id`, or `None` if the dataset has no such patient.
    ///
    /// `notes` should come from the note store, which may be newer than the
    /// dataset snapshot.
    pub fn build(dataset: &Dataset, id: &str, notes: NoteFields) -> Option<Self> {
        let record = dataset.get(id)?;
        let scores = Scorer::new(dataset.schema()).score_all(record);

        Some(Self {
            metadata: ReportMetadata {
                patient_id: record.id.clone(),
                source: dataset.source().map(|p| p.display().to_string()),
                dataset_digest: dataset.digest().map(str::to_string),
                generated_at: chrono::Utc::now().to_rfc3339(),
            },
            demographics: demographics_section(record),
            clinical: clinical_section(record),
            madrs_total: scores.madrs_total,
            madrs_items: scores.madrs_items,
            pid5: scores.pid5.into(),
            phq9: scores.phq9.into(),
            notes,
        })
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn demographics_section(record: &PatientRecord) -> DemographicsSection {
    let demo = &record.demographics;
    DemographicsSection {
        age: demo.age,
        sex: demo.sex.label().to_string(),
        education_years: demo.education_years,
        income: demo.income_label(),
    }
}

fn clinical_section(record: &PatientRecord) -> ClinicalSection {
    let clinical = &record.clinical;
    let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| "N/A".to_string());
    ClinicalSection {
        comorbidities: or_na(&clinical.comorbidities),
        pregnant: clinical.pregnancy.label().to_string(),
        cigarettes: or_na(&clinical.cigarettes),
        alcohol: or_na(&clinical.alcohol),
        cocaine: or_na(&clinical.cocaine),
    }
}
