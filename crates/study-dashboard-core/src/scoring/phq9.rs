//! PHQ-9 progression over the 30-day follow-up.

use serde::Serialize;

use super::{ScoreResult, Scorer};
use crate::models::PatientRecord;
use crate::store::{Instrument, ItemKey};

/// Days on which the PHQ-9 is administered.
pub const PHQ9_DAYS: [u8; 6] = [5, 10, 15, 20, 25, 30];

/// Items per administration.
pub const PHQ9_ITEMS: u8 = 9;

/// Every `phq9_day{d}_item{i}` column the progression needs.
pub fn phq9_required_columns() -> Vec<ItemKey> {
    PHQ9_DAYS
        .iter()
        .flat_map(|&day| (1..=PHQ9_ITEMS).map(move |item| ItemKey::Phq9 { day, item }))
        .collect()
}

/// Total for one administration day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phq9DayScore {
    pub day: u8,
    pub label: String,
    pub total: f64,
    pub answered: usize,
}

impl Scorer<'_> {
    /// One total per checkpoint day, in day order.
    ///
    /// If any day lacks any of its nine columns the whole series is unavailable.
    pub fn phq9_progression(&self, record: &PatientRecord) -> ScoreResult<Vec<Phq9DayScore>> {
        self.require(Instrument::Phq9, &phq9_required_columns())?;

        Ok(PHQ9_DAYS
            .iter()
            .map(|&day| {
                let values: Vec<f64> = (1..=PHQ9_ITEMS)
                    .filter_map(|item| record.item(ItemKey::Phq9 { day, item }))
                    .collect();
                Phq9DayScore {
                    day,
                    label: format!("Day {day}"),
                    total: values.iter().sum(),
                    answered: values.len(),
                }
            })
            .collect())
    }
}
