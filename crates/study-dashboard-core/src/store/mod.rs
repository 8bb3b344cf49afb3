//! Storage layer: the flat patient table on disk.
//!
//! - [`table`]: CSV codec with encoding fallback and atomic rewrite
//! - [`schema`]: typed column descriptor built once per load
//! - [`dataset`]: validated, typed dataset loader
//! - [`cache`]: fingerprint-keyed dataset cache
//! - [`notes`]: read-modify-write nurse note store

pub mod cache;
pub mod dataset;
pub mod notes;
pub mod schema;
pub mod table;

pub use cache::*;
pub use dataset::*;
pub use notes::*;
pub use schema::*;
pub use table::{LoadedTable, Table, TextEncoding};

use std::path::PathBuf;
use thiserror::Error;

/// Table read/write errors.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File is empty")]
    Empty,

    #[error("Row {row} has {found} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Could not replace {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type TableResult<T> = Result<T, TableError>;

impl TableError {
    /// True when the underlying file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TableError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
