//! MADRS (Montgomery-Åsberg Depression Rating Scale).

use serde::Serialize;

use super::Scorer;
use crate::models::PatientRecord;
use crate::store::{ItemKey, Phase};

/// Display labels for items 1 to 10.
pub const MADRS_ITEM_LABELS: [&str; 10] = [
    "Apparent Sadness",
    "Reported Sadness",
    "Inner Tension",
    "Reduced Sleep",
    "Reduced Appetite",
    "Concentration Difficulties",
    "Lassitude",
    "Inability to Feel",
    "Pessimistic Thoughts",
    "Suicidal Thoughts",
];

/// Label for a MADRS item number, if it is one of the ten scored items.
pub fn madrs_item_label(item: u8) -> Option<&'static str> {
    let index = usize::from(item).checked_sub(1)?;
    MADRS_ITEM_LABELS.get(index).copied()
}

/// Baseline and day-30 totals. Missing values count as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MadrsTotal {
    pub baseline: f64,
    pub follow_up: f64,
}

impl MadrsTotal {
    pub fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Baseline => self.baseline,
            Phase::FollowUp => self.follow_up,
        }
    }
}

/// One answered MADRS item at one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MadrsItemScore {
    pub item: u8,
    pub label: &'static str,
    pub phase: Phase,
    pub score: f64,
}

impl Scorer<'_> {
    /// MADRS totals from `madrs_score_bl` / `madrs_score_fu`.
    pub fn madrs_total(&self, record: &PatientRecord) -> MadrsTotal {
        let total = |phase| record.item(ItemKey::MadrsTotal(phase)).unwrap_or(0.0);
        MadrsTotal {
            baseline: total(Phase::Baseline),
            follow_up: total(Phase::FollowUp),
        }
    }

    /// Answered MADRS items, ordered by item then phase.
    ///
    /// Items outside 1..=10 and unanswered cells are left out. An empty list
    /// means there is nothing to show.
    pub fn madrs_items(&self, record: &PatientRecord) -> Vec<MadrsItemScore> {
        record
            .items
            .iter()
            .filter_map(|(key, value)| match *key {
                ItemKey::Madrs { item, phase } => Some(MadrsItemScore {
                    item,
                    label: madrs_item_label(item)?,
                    phase,
                    score: (*value)?,
                }),
                _ => None,
            })
            .collect()
    }
}
