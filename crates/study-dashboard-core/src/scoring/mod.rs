//! Score aggregation over a patient's assessment items.
//!
//! All scoring is pure: a [`Scorer`] borrows the dataset schema and reads
//! values from a [`PatientRecord`].
//!
//! - [`madrs`]: total and per-item MADRS scores
//! - [`pid5`]: PID-5 personality dimension sums
//! - [`phq9`]: PHQ-9 day-by-day progression

mod madrs;
mod phq9;
mod pid5;

pub use madrs::*;
pub use phq9::*;
pub use pid5::*;

use serde::Serialize;
use thiserror::Error;

use crate::models::PatientRecord;
use crate::store::{Instrument, ItemKey, Schema};

/// Why an instrument's scores cannot be shown.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreUnavailable {
    /// No column of the instrument exists in the dataset
    #[error("{instrument} data is not available for this study")]
    NotCollected { instrument: Instrument },

    /// Some required columns exist, others do not
    #[error("{instrument} data is incomplete: {} column(s) missing", .missing.len())]
    Incomplete {
        instrument: Instrument,
        missing: Vec<String>,
    },
}

pub type ScoreResult<T> = Result<T, ScoreUnavailable>;

/// Sum of the answered items of one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PhaseSum {
    pub total: f64,
    /// Items with a numeric value
    pub answered: usize,
}

impl PhaseSum {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.total += v;
            self.answered += 1;
        }
    }
}

/// Every score section for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientScores {
    pub madrs_total: MadrsTotal,
    pub madrs_items: Vec<MadrsItemScore>,
    pub pid5: ScoreResult<Vec<Pid5DimensionScore>>,
    pub phq9: ScoreResult<Vec<Phq9DayScore>>,
}

/// Computes scores against one dataset schema.
#[derive(Debug, Clone, Copy)]
pub struct Scorer<'a> {
    schema: &'a Schema,
}

impl<'a> Scorer<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Score every instrument.
    pub fn score_all(&self, record: &PatientRecord) -> PatientScores {
        PatientScores {
            madrs_total: self.madrs_total(record),
            madrs_items: self.madrs_items(record),
            pid5: self.pid5_dimensions(record),
            phq9: self.phq9_progression(record),
        }
    }

    /// Fail unless every `required` column exists.
    fn require(&self, instrument: Instrument, required: &[ItemKey]) -> ScoreResult<()> {
        if !self.schema.has_instrument(instrument) {
            return Err(ScoreUnavailable::NotCollected { instrument });
        }
        let missing = self.schema.missing_items(required);
        if missing.is_empty() {
            Ok(())
        } else {
            tracing::debug!(%instrument, missing = missing.len(), "instrument incomplete");
            Err(ScoreUnavailable::Incomplete {
                instrument,
                missing,
            })
        }
    }
}
