//! Patient models.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::NoteFields;
use crate::store::ItemKey;

/// One row of the study dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    /// Study identifier, opaque string (never numeric)
    pub id: String,
    /// 1-based data row in the source file
    pub row: usize,
    pub demographics: Demographics,
    pub clinical: ClinicalProfile,
    /// Nurse notes as of load time (the note store is authoritative)
    pub notes: NoteFields,
    /// Assessment values for every item column present in the schema.
    /// `None` means the cell is empty or not numeric.
    pub items: BTreeMap<ItemKey, Option<f64>>,
}

impl PatientRecord {
    /// Value of an item cell, if the column exists and the cell is numeric.
    pub fn item(&self, key: ItemKey) -> Option<f64> {
        self.items.get(&key).copied().flatten()
    }
}

/// Baseline demographics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: Option<f64>,
    pub sex: Sex,
    /// Years of education at baseline
    pub education_years: Option<f64>,
    /// Income at baseline
    pub income: Option<f64>,
    /// Income cell as written, for values like `45000-50000`
    pub income_text: Option<String>,
}

impl Demographics {
    /// Income as `$12,345` when it is a whole number, otherwise the cell
    /// text behind a `$`. `N/A` when unknown.
    pub fn income_label(&self) -> String {
        match (self.income, self.income_text.as_deref()) {
            (Some(value), _) if value.fract() == 0.0 => format_currency(value),
            (_, Some(raw)) => format!("${}", raw),
            (Some(value), None) => format!("${}", value),
            (None, None) => "N/A".to_string(),
        }
    }
}

/// Baseline clinical profile. Substance-use fields are free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalProfile {
    pub comorbidities: Option<String>,
    pub pregnancy: Pregnancy,
    pub cigarettes: Option<String>,
    pub alcohol: Option<String>,
    pub cocaine: Option<String>,
}

/// Canonical sex coding.
///
/// Accepted inputs: `1`/`M`/`H`/`male`/`homme` and `2`/`F`/`female`/`femme`.
/// Any other non-empty value maps to `Other`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Other,
    #[default]
    Unknown,
}

impl Sex {
    pub fn from_code(code: Option<&str>) -> Self {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Sex::Unknown;
        };
        if let Some(n) = numeric_code(code) {
            return match n {
                1 => Sex::Male,
                2 => Sex::Female,
                _ => Sex::Other,
            };
        }
        match code.to_lowercase().as_str() {
            "m" | "h" | "male" | "homme" => Sex::Male,
            "f" | "female" | "femme" => Sex::Female,
            _ => Sex::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Other => "Other",
            Sex::Unknown => "N/A",
        }
    }
}

/// Canonical pregnancy coding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pregnancy {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Pregnancy {
    pub fn from_code(code: Option<&str>) -> Self {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Pregnancy::Unknown;
        };
        if let Some(n) = numeric_code(code) {
            return match n {
                1 => Pregnancy::Yes,
                0 => Pregnancy::No,
                _ => Pregnancy::Unknown,
            };
        }
        match code.to_lowercase().as_str() {
            "yes" | "y" | "oui" | "true" => Pregnancy::Yes,
            "no" | "n" | "non" | "false" => Pregnancy::No,
            _ => Pregnancy::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Pregnancy::Yes => "Yes",
            Pregnancy::No => "No",
            Pregnancy::Unknown => "N/A",
        }
    }
}

/// Integral numeric code, accepting `1` and `1.0` alike.
fn numeric_code(code: &str) -> Option<i64> {
    let value: f64 = code.parse().ok()?;
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

/// Whole-dollar amount with thousands separators.
fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}", sign, group_thousands(&format!("{:.0}", value.abs())))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Ordering key for patient identifiers: the first run of digits, read as
/// an integer. Identifiers without digits sort after all others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SortKey {
    /// Saturates at `u128::MAX` for absurdly long digit runs
    Number(u128),
    NoDigits,
}

/// Compute the [`SortKey`] of an identifier.
pub fn sort_key(id: &str) -> SortKey {
    let Some(start) = id.find(|c: char| c.is_ascii_digit()) else {
        return SortKey::NoDigits;
    };
    let run = &id[start..];
    let end = run.find(|c: char| !c.is_ascii_digit()).unwrap_or(run.len());
    let value = run[..end].bytes().fold(0u128, |acc, b| {
        acc.saturating_mul(10).saturating_add(u128::from(b - b'0'))
    });
    SortKey::Number(value)
}

/// Total order on identifiers: by [`SortKey`], ties broken by the identifier text.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b)).then_with(|| a.cmp(b))
}
