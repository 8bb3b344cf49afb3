//! Validated, typed patient dataset.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::schema::{parse_number, present, Field, Schema, SchemaError};
use super::table::{LoadedTable, Table, TextEncoding};
use crate::models::{
    compare_ids, ClinicalProfile, Demographics, NoteFields, PatientRecord, Pregnancy, Sex,
};

/// The study dataset: one [`PatientRecord`] per row, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    source: Option<PathBuf>,
    schema: Schema,
    records: Vec<PatientRecord>,
    index: HashMap<String, usize>,
    encoding: Option<TextEncoding>,
    digest: Option<String>,
    load_failure: Option<String>,
}

impl Dataset {
    /// Load and validate the dataset at `path`.
    ///
    /// I/O and parse failures never surface as `Err`: they produce an empty
    /// dataset whose [`load_failure`](Self::load_failure) describes the problem.
    /// Only primary-key violations are returned as errors.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        match Table::read(path) {
            Ok(loaded) => {
                let dataset = Self::from_loaded(loaded, Some(path.to_path_buf()))?;
                tracing::info!(
                    path = %path.display(),
                    patients = dataset.len(),
                    columns = dataset.schema.headers().len(),
                    "dataset loaded"
                );
                Ok(dataset)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load dataset");
                Ok(Self::empty(Some(path.to_path_buf()), Some(e.to_string())))
            }
        }
    }

    /// Build a dataset from an in-memory table.
    pub fn from_table(table: Table) -> Result<Self, SchemaError> {
        Self::build(table, None)
    }

    fn from_loaded(loaded: LoadedTable, source: Option<PathBuf>) -> Result<Self, SchemaError> {
        let mut dataset = Self::build(loaded.table, source)?;
        dataset.encoding = Some(loaded.encoding);
        dataset.digest = Some(loaded.digest);
        Ok(dataset)
    }

    fn build(table: Table, source: Option<PathBuf>) -> Result<Self, SchemaError> {
        let schema = Schema::from_headers(&table.headers)?;
        let id_col = schema.id_column().ok_or(SchemaError::MissingIdColumn)?;

        let mut records: Vec<PatientRecord> = Vec::with_capacity(table.rows.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(table.rows.len());

        for (i, row) in table.rows.iter().enumerate() {
            let row_number = i + 1;
            let id = &row[id_col];
            if present(id).is_none() {
                return Err(SchemaError::NullId { row: row_number });
            }
            if let Some(&first) = index.get(id.as_str()) {
                return Err(SchemaError::DuplicateId {
                    id: id.clone(),
                    first_row: records[first].row,
                    row: row_number,
                });
            }

            index.insert(id.clone(), records.len());
            records.push(build_record(&schema, id_col, row_number, row));
        }

        Ok(Self {
            source,
            schema,
            records,
            index,
            encoding: None,
            digest: None,
            load_failure: None,
        })
    }

    /// An empty dataset, optionally carrying the reason it is empty.
    pub fn empty(source: Option<PathBuf>, load_failure: Option<String>) -> Self {
        Self {
            source,
            load_failure,
            ..Self::default()
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Records in file order.
    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&PatientRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identifiers ordered by their embedded number, for patient selection.
    pub fn patient_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.iter().map(|r| r.id.clone()).collect();
        ids.sort_by(|a, b| compare_ids(a, b));
        ids
    }

    /// Why the dataset is empty, if loading failed.
    pub fn load_failure(&self) -> Option<&str> {
        self.load_failure.as_deref()
    }

    /// Encoding the file was decoded with.
    pub fn encoding(&self) -> Option<TextEncoding> {
        self.encoding
    }

    /// SHA-256 (hex) of the file contents this dataset was built from.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

fn build_record(schema: &Schema, id_col: usize, row_number: usize, row: &[String]) -> PatientRecord {
    let text = |field: Field| -> Option<String> {
        schema
            .field(field)
            .and_then(|i| present(&row[i]))
            .map(str::to_string)
    };
    let number = |field: Field| -> Option<f64> {
        schema.field(field).and_then(|i| parse_number(&row[i]))
    };
    // Notes keep their raw text so a save/load round trip is exact
    let note = |field: Field| -> String {
        schema
            .field(field)
            .map(|i| row[i].clone())
            .unwrap_or_default()
    };

    PatientRecord {
        id: row[id_col].clone(),
        row: row_number,
        demographics: Demographics {
            age: number(Field::Age),
            sex: Sex::from_code(text(Field::Sex).as_deref()),
            education_years: number(Field::EducationYears),
            income: number(Field::Income),
            income_text: text(Field::Income),
        },
        clinical: ClinicalProfile {
            comorbidities: text(Field::Comorbidities),
            pregnancy: Pregnancy::from_code(text(Field::Pregnant).as_deref()),
            cigarettes: text(Field::Cigarettes),
            alcohol: text(Field::Alcohol),
            cocaine: text(Field::Cocaine),
        },
        notes: NoteFields {
            objectives: note(Field::Objectives),
            tasks: note(Field::Tasks),
            comments: note(Field::Comments),
        },
        items: schema
            .items()
            .map(|(key, i)| (key, parse_number(&row[i])))
            .collect(),
    }
}
