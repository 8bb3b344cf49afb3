//! Nurse note store.
//!
//! Notes live in the same kind of flat table as the dataset (by default the
//! dataset file itself). Every save is a read-modify-write cycle:
//!
//! 1. take the store's writer lock
//! 2. read the table and remember the digest of the bytes read
//! 3. update or append the patient's row
//! 4. check the file still has that digest, then atomically replace it

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use super::schema::{id_column_index, present, Field, ID_COLUMN};
use super::table::{file_digest, Table};
use super::{TableError, TableResult};
use crate::models::{NoteFields, SaveOutcome};

/// Note save failures. None of these leave a partially written file.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("The note file has no 'ID' column")]
    MissingIdColumn,

    #[error("Patient identifier is empty or a missing-value marker")]
    InvalidId,

    #[error("{} was modified by another writer, reload and retry", .path.display())]
    Conflict { path: PathBuf },
}

pub type SaveResult<T> = Result<T, SaveError>;

/// Read-modify-write store for the three note fields.
#[derive(Debug)]
pub struct NoteStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// A table read for modification, with the digest of its source bytes.
#[derive(Debug)]
pub(crate) struct PendingSave {
    table: Table,
    /// `None` when the file did not exist yet
    source_digest: Option<String>,
    outcome: SaveOutcome,
}

impl NoteStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Notes for `id`, read fresh from disk.
    ///
    /// A missing file, missing row or missing column yields empty fields.
    pub fn try_load_notes(&self, id: &str) -> TableResult<NoteFields> {
        let table = match Table::read(&self.path) {
            Ok(loaded) => loaded.table,
            Err(e) if e.is_not_found() => return Ok(NoteFields::default()),
            Err(e) => return Err(e),
        };

        let Some(id_col) = id_column_index(&table.headers) else {
            tracing::warn!(path = %self.path.display(), "note file has no ID column");
            return Ok(NoteFields::default());
        };
        let Some(row) = table.rows.iter().find(|row| row[id_col] == id) else {
            return Ok(NoteFields::default());
        };

        let cell = |field: Field| -> String {
            table
                .column(field.column_name())
                .map(|i| row[i].clone())
                .unwrap_or_default()
        };
        Ok(NoteFields {
            objectives: cell(Field::Objectives),
            tasks: cell(Field::Tasks),
            comments: cell(Field::Comments),
        })
    }

    /// Notes for `id`. Read failures are logged and yield empty fields.
    pub fn load_notes(&self, id: &str) -> NoteFields {
        self.try_load_notes(id).unwrap_or_else(|e| {
            tracing::error!(path = %self.path.display(), id, error = %e, "failed to load notes");
            NoteFields::default()
        })
    }

    /// Write the notes for `id`, updating its row or appending a new one.
    pub fn save_notes(&self, id: &str, notes: &NoteFields) -> SaveResult<SaveOutcome> {
        // An ID the loader would read as null must never reach the file
        if present(id).is_none() {
            return Err(SaveError::InvalidId);
        }

        // The guard protects no data, only the file, so a poisoned lock is usable
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let pending = self.prepare(id, notes)?;
        let outcome = self.commit(pending)?;
        tracing::info!(path = %self.path.display(), id, ?outcome, "notes saved");
        Ok(outcome)
    }

    /// Read the current table and apply the notes in memory.
    pub(crate) fn prepare(&self, id: &str, notes: &NoteFields) -> SaveResult<PendingSave> {
        let (mut table, source_digest) = match Table::read(&self.path) {
            Ok(loaded) => (loaded.table, Some(loaded.digest)),
            Err(e) if e.is_not_found() => {
                let headers = std::iter::once(ID_COLUMN)
                    .chain(Field::NOTES.iter().map(|f| f.column_name()));
                (Table::new(headers), None)
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = apply_notes(&mut table, id, notes)?;
        Ok(PendingSave {
            table,
            source_digest,
            outcome,
        })
    }

    /// Replace the file with the pending table if nobody wrote it meanwhile.
    pub(crate) fn commit(&self, pending: PendingSave) -> SaveResult<SaveOutcome> {
        let current = file_digest(&self.path)?;
        if current != pending.source_digest {
            tracing::warn!(path = %self.path.display(), "note file changed during save");
            return Err(SaveError::Conflict {
                path: self.path.clone(),
            });
        }
        pending.table.write_atomic(&self.path)?;
        Ok(pending.outcome)
    }
}

/// Update the first row whose identifier equals `id`, or append one.
fn apply_notes(table: &mut Table, id: &str, notes: &NoteFields) -> SaveResult<SaveOutcome> {
    let id_col = id_column_index(&table.headers).ok_or(SaveError::MissingIdColumn)?;

    let mut columns = [0usize; 3];
    for (slot, field) in columns.iter_mut().zip(Field::NOTES) {
        *slot = match table.column(field.column_name()) {
            Some(index) => index,
            None => table.push_column(field.column_name()),
        };
    }

    let (row, outcome) = match table.rows.iter().position(|row| row[id_col] == id) {
        Some(index) => (&mut table.rows[index], SaveOutcome::Updated),
        None => {
            let row = table.push_empty_row();
            row[id_col] = id.to_string();
            (row, SaveOutcome::Appended)
        }
    };

    for (col, value) in columns.into_iter().zip(notes.values()) {
        row[col] = value.to_string();
    }
    Ok(outcome)
}
