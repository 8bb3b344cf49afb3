//! Column schema for the patient table.
//!
//! Columns are addressed by string name only here: the header row is mapped
//! once into a [`Schema`], and everything downstream works with typed
//! [`Field`] and [`ItemKey`] lookups.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header name of the identifier column (matched case-insensitively).
pub const ID_COLUMN: &str = "ID";

/// Cell values treated as null, in addition to blank cells.
const MISSING_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Primary-key integrity violations. These are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("The 'ID' column is missing from the patient file")]
    MissingIdColumn,

    #[error("Row {row} has an empty 'ID'")]
    NullId { row: usize },

    #[error("Duplicate 'ID' {id:?} on rows {first_row} and {row}")]
    DuplicateId {
        id: String,
        first_row: usize,
        row: usize,
    },
}

/// Measurement phase of an assessment item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Baseline,
    FollowUp,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Baseline, Phase::FollowUp];

    /// Column-name suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            Phase::Baseline => "bl",
            Phase::FollowUp => "fu",
        }
    }

    /// Display label. Follow-up is collected on day 30.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Baseline => "Baseline",
            Phase::FollowUp => "Day 30",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "bl" => Some(Phase::Baseline),
            "fu" => Some(Phase::FollowUp),
            _ => None,
        }
    }
}

/// Scalar (non-item) columns with a fixed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Age,
    Sex,
    EducationYears,
    Income,
    Comorbidities,
    Pregnant,
    Cigarettes,
    Alcohol,
    Cocaine,
    Objectives,
    Tasks,
    Comments,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Age,
        Field::Sex,
        Field::EducationYears,
        Field::Income,
        Field::Comorbidities,
        Field::Pregnant,
        Field::Cigarettes,
        Field::Alcohol,
        Field::Cocaine,
        Field::Objectives,
        Field::Tasks,
        Field::Comments,
    ];

    /// The three free-text note columns.
    pub const NOTES: [Field; 3] = [Field::Objectives, Field::Tasks, Field::Comments];

    pub fn column_name(self) -> &'static str {
        match self {
            Field::Age => "age",
            Field::Sex => "sexe",
            Field::EducationYears => "annees_education_bl",
            Field::Income => "revenu_bl",
            Field::Comorbidities => "comorbidities",
            Field::Pregnant => "pregnant",
            Field::Cigarettes => "cigarette_bl",
            Field::Alcohol => "alcool_bl",
            Field::Cocaine => "cocaine_bl",
            Field::Objectives => "objectives",
            Field::Tasks => "tasks",
            Field::Comments => "comments",
        }
    }
}

/// Assessment instrument families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Madrs,
    Pid5,
    Phq9,
}

impl Instrument {
    /// Lowercase header prefix shared by every column of the instrument.
    pub fn column_prefix(self) -> &'static str {
        match self {
            Instrument::Madrs => "madrs",
            Instrument::Pid5 => "pid5_",
            Instrument::Phq9 => "phq9_",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Instrument::Madrs => "MADRS",
            Instrument::Pid5 => "PID-5",
            Instrument::Phq9 => "PHQ-9",
        })
    }
}

/// A numeric assessment column, parsed from its header.
///
/// Grammar:
/// - `madrs_score_{bl|fu}`
/// - `madrs{sep}{n}{sep}{bl|fu}` where `sep` is `_` or `.`
/// - `pid5_{n}_{bl|fu}`
/// - `phq9_day{d}_item{i}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    MadrsTotal(Phase),
    Madrs { item: u8, phase: Phase },
    Pid5 { item: u8, phase: Phase },
    Phq9 { day: u8, item: u8 },
}

impl ItemKey {
    /// Parse a header into an item key. Case-insensitive.
    pub fn parse(header: &str) -> Option<Self> {
        let name = header.trim().to_ascii_lowercase();

        if let Some(rest) = name.strip_prefix("madrs_score_") {
            return Phase::from_suffix(rest).map(ItemKey::MadrsTotal);
        }
        if let Some(rest) = name.strip_prefix("madrs") {
            let (item, phase) = parse_item_phase(rest, &['_', '.'])?;
            return Some(ItemKey::Madrs { item, phase });
        }
        if let Some(rest) = name.strip_prefix("pid5") {
            let (item, phase) = parse_item_phase(rest, &['_'])?;
            return Some(ItemKey::Pid5 { item, phase });
        }
        if let Some(rest) = name.strip_prefix("phq9_day") {
            let (day, item) = rest.split_once("_item")?;
            return Some(ItemKey::Phq9 {
                day: parse_small_number(day)?,
                item: parse_small_number(item)?,
            });
        }
        None
    }

    /// Canonical column name for this key.
    pub fn column_name(&self) -> String {
        match *self {
            ItemKey::MadrsTotal(phase) => format!("madrs_score_{}", phase.suffix()),
            ItemKey::Madrs { item, phase } => format!("madrs_{}_{}", item, phase.suffix()),
            ItemKey::Pid5 { item, phase } => format!("pid5_{}_{}", item, phase.suffix()),
            ItemKey::Phq9 { day, item } => format!("phq9_day{}_item{}", day, item),
        }
    }

    pub fn instrument(&self) -> Instrument {
        match self {
            ItemKey::MadrsTotal(_) | ItemKey::Madrs { .. } => Instrument::Madrs,
            ItemKey::Pid5 { .. } => Instrument::Pid5,
            ItemKey::Phq9 { .. } => Instrument::Phq9,
        }
    }
}

/// Parse `{sep}{n}{sep}{bl|fu}`.
fn parse_item_phase(rest: &str, separators: &[char]) -> Option<(u8, Phase)> {
    let rest = rest.strip_prefix(|c: char| separators.contains(&c))?;
    let split = rest.find(|c: char| separators.contains(&c))?;
    let (item, suffix) = rest.split_at(split);
    let phase = Phase::from_suffix(&suffix[1..])?;
    Some((parse_small_number(item)?, phase))
}

fn parse_small_number(s: &str) -> Option<u8> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Typed column map for one loaded table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    headers: Vec<String>,
    id_column: Option<usize>,
    fields: HashMap<Field, usize>,
    items: BTreeMap<ItemKey, usize>,
}

impl Schema {
    /// Build the schema from a header row. Fails if there is no identifier column.
    pub fn from_headers(headers: &[String]) -> Result<Self, SchemaError> {
        let id_column = id_column_index(headers).ok_or(SchemaError::MissingIdColumn)?;

        let mut fields = HashMap::new();
        let mut items = BTreeMap::new();
        for (index, header) in headers.iter().enumerate() {
            let name = header.trim();
            if let Some(field) = Field::ALL.iter().find(|f| f.column_name() == name) {
                fields.entry(*field).or_insert(index);
            } else if let Some(key) = ItemKey::parse(name) {
                if items.contains_key(&key) {
                    tracing::debug!(column = name, "duplicate item column ignored");
                } else {
                    items.insert(key, index);
                }
            }
        }

        Ok(Self {
            headers: headers.to_vec(),
            id_column: Some(id_column),
            fields,
            items,
        })
    }

    /// Header row as read from the file.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Identifier column index. `None` only for the schema of an empty dataset.
    pub fn id_column(&self) -> Option<usize> {
        self.id_column
    }

    pub fn field(&self, field: Field) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    pub fn item(&self, key: ItemKey) -> Option<usize> {
        self.items.get(&key).copied()
    }

    pub fn has_item(&self, key: ItemKey) -> bool {
        self.items.contains_key(&key)
    }

    /// All item columns present, in key order.
    pub fn items(&self) -> impl Iterator<Item = (ItemKey, usize)> + '_ {
        self.items.iter().map(|(k, v)| (*k, *v))
    }

    /// True if any header carries the instrument's prefix, even one that
    /// does not parse as an item (`phq9_total`, `pid5_notes`).
    pub fn has_instrument(&self, instrument: Instrument) -> bool {
        let prefix = instrument.column_prefix();
        self.headers
            .iter()
            .any(|h| h.trim().to_ascii_lowercase().starts_with(prefix))
    }

    /// Column names from `required` that this schema lacks.
    pub fn missing_items(&self, required: &[ItemKey]) -> Vec<String> {
        required
            .iter()
            .filter(|key| !self.has_item(**key))
            .map(ItemKey::column_name)
            .collect()
    }
}

/// Index of the identifier column, matched case-insensitively on the trimmed header.
pub fn id_column_index(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(ID_COLUMN))
}

/// Trimmed cell content, or `None` for blank cells and missing-value markers.
pub fn present(cell: &str) -> Option<&str> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(trimmed)
    }
}

/// Numeric cell value. Unparsable or non-finite values count as missing.
pub fn parse_number(cell: &str) -> Option<f64> {
    present(cell)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_madrs_keys() {
        assert_eq!(
            ItemKey::parse("madrs_3_bl"),
            Some(ItemKey::Madrs {
                item: 3,
                phase: Phase::Baseline
            })
        );
        assert_eq!(
            ItemKey::parse("madrs.10.fu"),
            Some(ItemKey::Madrs {
                item: 10,
                phase: Phase::FollowUp
            })
        );
        assert_eq!(
            ItemKey::parse("MADRS_2.bl"),
            Some(ItemKey::Madrs {
                item: 2,
                phase: Phase::Baseline
            })
        );
        assert_eq!(
            ItemKey::parse("madrs_score_fu"),
            Some(ItemKey::MadrsTotal(Phase::FollowUp))
        );
        assert_eq!(ItemKey::parse("madrs_3_xx"), None);
        assert_eq!(ItemKey::parse("madrs_3_bl_extra"), None);
        assert_eq!(ItemKey::parse("madrs__bl"), None);
    }

    #[test]
    fn test_parse_pid5_and_phq9_keys() {
        assert_eq!(
            ItemKey::parse("pid5_15_fu"),
            Some(ItemKey::Pid5 {
                item: 15,
                phase: Phase::FollowUp
            })
        );
        assert_eq!(ItemKey::parse("pid5.15.fu"), None);
        assert_eq!(
            ItemKey::parse("phq9_day25_item9"),
            Some(ItemKey::Phq9 { day: 25, item: 9 })
        );
        assert_eq!(ItemKey::parse("phq9_day_item9"), None);
        assert_eq!(ItemKey::parse("age"), None);
    }

    #[test]
    fn test_column_name_round_trip() {
        for name in ["madrs_score_bl", "madrs_7_fu", "pid5_22_bl", "phq9_day5_item1"] {
            assert_eq!(ItemKey::parse(name).unwrap().column_name(), name);
        }
    }

    #[test]
    fn test_id_column_case_insensitive() {
        assert_eq!(id_column_index(&headers(&["age", "id"])), Some(1));
        assert_eq!(id_column_index(&headers(&[" ID ", "age"])), Some(0));
        assert_eq!(id_column_index(&headers(&["patient", "age"])), None);
    }

    #[test]
    fn test_schema_requires_id() {
        let result = Schema::from_headers(&headers(&["age", "sexe"]));
        assert_eq!(result, Err(SchemaError::MissingIdColumn));
    }

    #[test]
    fn test_schema_maps_fields_and_items() {
        let schema = Schema::from_headers(&headers(&[
            "ID",
            "age",
            "comments",
            "madrs_1_bl",
            "pid5_8_bl",
            "free_text",
        ]))
        .unwrap();

        assert_eq!(schema.id_column(), Some(0));
        assert_eq!(schema.field(Field::Age), Some(1));
        assert_eq!(schema.field(Field::Comments), Some(2));
        assert_eq!(schema.field(Field::Sex), None);
        assert!(schema.has_instrument(Instrument::Madrs));
        assert!(schema.has_instrument(Instrument::Pid5));
        assert!(!schema.has_instrument(Instrument::Phq9));
        assert_eq!(schema.items().count(), 2);
    }

    #[test]
    fn test_unparsed_prefixed_column_counts_as_collected() {
        let schema = Schema::from_headers(&headers(&["ID", "PHQ9_total", "pid5_notes"])).unwrap();
        assert_eq!(schema.items().count(), 0);
        assert!(schema.has_instrument(Instrument::Phq9));
        assert!(schema.has_instrument(Instrument::Pid5));
        assert!(!schema.has_instrument(Instrument::Madrs));
    }

    #[test]
    fn test_missing_markers() {
        assert_eq!(present("  "), None);
        assert_eq!(present("NA"), None);
        assert_eq!(present("NaN"), None);
        assert_eq!(present(" P1 "), Some("P1"));
        assert_eq!(parse_number("3"), Some(3.0));
        assert_eq!(parse_number("2.5"), Some(2.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }
}
