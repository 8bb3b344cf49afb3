//! PID-5 (Personality Inventory for DSM-5) dimension scores.

use serde::Serialize;

use super::{PhaseSum, ScoreResult, Scorer};
use crate::models::PatientRecord;
use crate::store::{Instrument, ItemKey, Phase};

/// The five PID-5 personality trait domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pid5Dimension {
    NegativeAffectivity,
    Detachment,
    Antagonism,
    Disinhibition,
    Psychoticism,
}

impl Pid5Dimension {
    pub const ALL: [Pid5Dimension; 5] = [
        Pid5Dimension::NegativeAffectivity,
        Pid5Dimension::Detachment,
        Pid5Dimension::Antagonism,
        Pid5Dimension::Disinhibition,
        Pid5Dimension::Psychoticism,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Pid5Dimension::NegativeAffectivity => "Negative Affectivity",
            Pid5Dimension::Detachment => "Detachment",
            Pid5Dimension::Antagonism => "Antagonism",
            Pid5Dimension::Disinhibition => "Disinhibition",
            Pid5Dimension::Psychoticism => "Psychoticism",
        }
    }

    /// Item numbers summed for this dimension.
    pub fn items(self) -> [u8; 5] {
        match self {
            Pid5Dimension::NegativeAffectivity => [8, 9, 10, 11, 15],
            Pid5Dimension::Detachment => [4, 13, 14, 16, 18],
            Pid5Dimension::Antagonism => [17, 19, 20, 22, 25],
            Pid5Dimension::Disinhibition => [1, 2, 3, 5, 6],
            Pid5Dimension::Psychoticism => [7, 12, 21, 23, 24],
        }
    }
}

/// The 50 columns (25 items, two phases) a PID-5 score needs.
pub fn pid5_required_columns() -> Vec<ItemKey> {
    Pid5Dimension::ALL
        .iter()
        .flat_map(|d| d.items())
        .flat_map(|item| Phase::ALL.map(|phase| ItemKey::Pid5 { item, phase }))
        .collect()
}

/// One dimension's baseline and follow-up sums.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pid5DimensionScore {
    pub dimension: Pid5Dimension,
    pub label: &'static str,
    pub baseline: PhaseSum,
    pub follow_up: PhaseSum,
}

impl Scorer<'_> {
    /// Dimension sums for both phases, or why they cannot be computed.
    ///
    /// Requires all 50 PID-5 columns; never returns a partial dimension set.
    pub fn pid5_dimensions(&self, record: &PatientRecord) -> ScoreResult<Vec<Pid5DimensionScore>> {
        self.require(Instrument::Pid5, &pid5_required_columns())?;

        Ok(Pid5Dimension::ALL
            .iter()
            .map(|&dimension| {
                let sum = |phase| {
                    let mut sum = PhaseSum::default();
                    for item in dimension.items() {
                        sum.add(record.item(ItemKey::Pid5 { item, phase }));
                    }
                    sum
                };
                Pid5DimensionScore {
                    dimension,
                    label: dimension.label(),
                    baseline: sum(Phase::Baseline),
                    follow_up: sum(Phase::FollowUp),
                }
            })
            .collect())
    }
}
