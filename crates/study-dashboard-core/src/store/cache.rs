//! Dataset cache keyed by path and file fingerprint.
//!
//! A cached dataset is served only while the file's size and modification
//! time are unchanged; any change forces a reload. Entries can also be
//! dropped explicitly.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use super::dataset::Dataset;
use super::schema::SchemaError;

/// Cheap identity of a file's current contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl Fingerprint {
    pub fn of(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug)]
struct CacheEntry {
    fingerprint: Fingerprint,
    dataset: Arc<Dataset>,
}

/// Process-wide dataset cache, owned by the dashboard.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the dataset for `path`, loading it if absent or stale.
    ///
    /// Failed loads (empty dataset with a failure message) are returned but
    /// not cached, so the next call retries.
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Result<Arc<Dataset>, SchemaError> {
        let path = path.as_ref();
        let mut entries = self.lock();

        let fingerprint = match Fingerprint::of(path) {
            Ok(fp) => fp,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot stat dataset");
                entries.remove(path);
                return Dataset::load(path).map(Arc::new);
            }
        };

        if let Some(entry) = entries.get(path) {
            if entry.fingerprint == fingerprint {
                return Ok(Arc::clone(&entry.dataset));
            }
            tracing::info!(path = %path.display(), "dataset changed on disk, reloading");
        }

        let dataset = Arc::new(Dataset::load(path)?);
        if dataset.load_failure().is_none() {
            entries.insert(
                path.to_path_buf(),
                CacheEntry {
                    fingerprint,
                    dataset: Arc::clone(&dataset),
                },
            );
        } else {
            entries.remove(path);
        }
        Ok(dataset)
    }

    /// Drop the entry for `path`. Returns whether one was present.
    pub fn invalidate<P: AsRef<Path>>(&self, path: P) -> bool {
        self.lock().remove(path.as_ref()).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic mid-load leaves the map itself consistent, so recover it
    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
