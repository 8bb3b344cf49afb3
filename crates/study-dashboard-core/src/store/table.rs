//! Delimited-text table codec.
//!
//! Handles:
//! - Encoding fallback (UTF-8, then ISO-8859-1)
//! - Header + row parsing via `csv`, rows padded to header width
//! - Atomic rewrite (sibling temp file, then rename)

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{TableError, TableResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encoding a table was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    /// ISO-8859-1 fallback for files exported by legacy tools
    Latin1,
}

/// An in-memory delimited table. Every row has exactly one cell per header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A table read from disk, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    pub encoding: TextEncoding,
    /// SHA-256 (hex) of the raw file bytes
    pub digest: String,
}

impl Table {
    /// Create an empty table with the given headers.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Read and decode a table from a file.
    pub fn read<P: AsRef<Path>>(path: P) -> TableResult<LoadedTable> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (table, encoding) = Self::parse(&bytes)?;
        if encoding == TextEncoding::Latin1 {
            tracing::warn!(
                path = %path.display(),
                "file is not valid UTF-8, decoded as ISO-8859-1"
            );
        }

        Ok(LoadedTable {
            table,
            encoding,
            digest: digest(&bytes),
        })
    }

    /// Decode raw bytes and parse them as CSV.
    pub fn parse(bytes: &[u8]) -> TableResult<(Self, TextEncoding)> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(TableError::Empty);
        }
        let (text, encoding) = decode(bytes);
        Ok((Self::from_csv_str(&text)?, encoding))
    }

    /// Parse already-decoded CSV text.
    pub fn from_csv_str(text: &str) -> TableResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let width = headers.len();

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > width {
                return Err(TableError::RaggedRow {
                    row: index + 1,
                    expected: width,
                    found: record.len(),
                });
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column whose trimmed header equals `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Append a column, filling existing rows with empty cells. Returns its index.
    pub fn push_column(&mut self, name: &str) -> usize {
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Append an empty row and return a mutable handle to it.
    pub fn push_empty_row(&mut self) -> &mut Vec<String> {
        self.rows.push(vec![String::new(); self.headers.len()]);
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    /// Rewrite `path` with this table, atomically from a reader's point of view.
    ///
    /// The table is written to a temp file in the target directory which is
    /// then renamed over `path`. On failure the previous file is untouched.
    pub fn write_atomic<P: AsRef<Path>>(&self, path: P) -> TableResult<()> {
        let path = path.as_ref();
        let io_err = |source: io::Error| TableError::Io {
            path: path.to_path_buf(),
            source,
        };

        let dir = parent_dir(path);
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            self.write_records(&mut writer)?;
            writer.flush().map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;

        // Keep the permissions of the file being replaced
        if let Ok(meta) = fs::metadata(path) {
            fs::set_permissions(tmp.path(), meta.permissions()).map_err(io_err)?;
        }

        tmp.persist(path).map_err(|e| TableError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        tracing::debug!(path = %path.display(), rows = self.rows.len(), "table written");
        Ok(())
    }

    fn write_records<W: io::Write>(&self, writer: &mut csv::Writer<W>) -> TableResult<()> {
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        Ok(())
    }
}

/// Decode bytes as UTF-8 (BOM stripped), falling back to ISO-8859-1.
///
/// ISO-8859-1 maps every byte to the code point of the same value, so the
/// fallback never fails.
pub fn decode(bytes: &[u8]) -> (Cow<'_, str>, TextEncoding) {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(text) => (Cow::Borrowed(text), TextEncoding::Utf8),
        Err(_) => (
            Cow::Owned(body.iter().map(|&b| b as char).collect()),
            TextEncoding::Latin1,
        ),
    }
}

/// SHA-256 of `bytes`, hex encoded.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Digest of the file currently at `path`, or `None` if it does not exist.
pub fn file_digest(path: &Path) -> TableResult<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(digest(&bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(TableError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utf8() {
        let (table, encoding) = Table::parse("ID,age\nP1,34\nP2,51\n".as_bytes()).unwrap();
        assert_eq!(encoding, TextEncoding::Utf8);
        assert_eq!(table.headers, vec!["ID", "age"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], vec!["P2", "51"]);
    }

    #[test]
    fn test_latin1_fallback() {
        // "è" encoded as the single byte 0xE8
        let bytes = b"ID,comorbidities\nP1,Diab\xE8te\n";
        let (table, encoding) = Table::parse(bytes).unwrap();
        assert_eq!(encoding, TextEncoding::Latin1);
        assert_eq!(table.rows[0][1], "Diabète");
    }

    #[test]
    fn test_bom_stripped() {
        let bytes = b"\xEF\xBB\xBFID,age\nP1,30\n";
        let (table, encoding) = Table::parse(bytes).unwrap();
        assert_eq!(encoding, TextEncoding::Utf8);
        assert_eq!(table.headers[0], "ID");
    }

    #[test]
    fn test_short_rows_padded() {
        let table = Table::from_csv_str("ID,a,b\nP1,1\n").unwrap();
        assert_eq!(table.rows[0], vec!["P1", "1", ""]);
    }

    #[test]
    fn test_long_row_rejected() {
        let result = Table::from_csv_str("ID,a\nP1,1,2\n");
        assert!(matches!(
            result,
            Err(TableError::RaggedRow {
                row: 1,
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(Table::parse(b""), Err(TableError::Empty)));
        assert!(matches!(Table::parse(b"\n  \n"), Err(TableError::Empty)));
    }

    #[test]
    fn test_push_column_pads_rows() {
        let mut table = Table::from_csv_str("ID\nP1\nP2\n").unwrap();
        let idx = table.push_column("comments");
        assert_eq!(idx, 1);
        assert!(table.rows.iter().all(|r| r.len() == 2 && r[1].is_empty()));
    }

    #[test]
    fn test_write_atomic_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");

        let mut table = Table::new(["ID", "comments"]);
        table.rows.push(vec!["P1".into(), "line one\nline \"two\", with comma".into()]);
        table.write_atomic(&path).unwrap();

        let loaded = Table::read(&path).unwrap();
        assert_eq!(loaded.table, table);
        assert_eq!(loaded.encoding, TextEncoding::Utf8);
        assert_eq!(loaded.digest.len(), 64);
    }

    #[test]
    fn test_file_digest_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(file_digest(&dir.path().join("absent.csv")).unwrap(), None);
    }
}
