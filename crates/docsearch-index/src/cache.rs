//! On-disk snapshot cache for the document index.
//!
//! A single JSON file under the cache directory holds the last complete
//! index together with its build time and the schema version that wrote it.
//! Anything that makes the file unusable is a cache miss: the caller falls
//! back to a rebuild and never sees an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use docsearch_types::DocumentRecord;

use crate::error::IndexError;

/// File name of the snapshot inside the cache directory.
pub const INDEX_FILE_NAME: &str = "search-index.json";

/// Schema version written by this build.
pub const SCHEMA_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One complete generation of the index as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub entries: Vec<DocumentRecord>,

    /// Build time (milliseconds since epoch)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    pub version: String,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    entries: &'a [DocumentRecord],
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    version: &'a str,
}

/// Reason a snapshot could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMiss {
    Absent,
    Unreadable(String),
    VersionMismatch { expected: String, found: String },
    Expired { age_ms: i64 },
}

impl std::fmt::Display for CacheMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheMiss::Absent => write!(f, "no snapshot on disk"),
            CacheMiss::Unreadable(e) => write!(f, "snapshot unreadable: {}", e),
            CacheMiss::VersionMismatch { expected, found } => {
                write!(f, "version mismatch (expected {}, got {})", expected, found)
            }
            CacheMiss::Expired { age_ms } => {
                write!(f, "snapshot expired (age: {} minutes)", age_ms / 1000 / 60)
            }
        }
    }
}

/// Snapshot persistence used by the index builder.
///
/// Implementations must never fail the caller: `load` returns an empty
/// sequence on any miss and `save` swallows write errors.
pub trait SnapshotCache: Send + Sync {
    fn load(&self) -> Vec<DocumentRecord>;
    fn save(&self, entries: &[DocumentRecord]);
    fn is_valid(&self) -> bool;
}

/// Summary of the snapshot file, for status reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub valid: bool,
    pub entries: Option<usize>,
    pub age_ms: Option<i64>,
    pub version: Option<String>,
    pub expected_version: String,
    pub max_age_ms: u64,
}

/// JSON snapshot file under a base directory.
#[derive(Debug)]
pub struct DiskCache {
    base_dir: PathBuf,
    max_age_ms: u64,
    version: String,
    dir_ready: OnceLock<()>,
}

impl DiskCache {
    /// Create a cache writing snapshots tagged with `version`.
    pub fn new(base_dir: impl Into<PathBuf>, max_age_ms: u64, version: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_age_ms,
            version: version.into(),
            dir_ready: OnceLock::new(),
        }
    }

    /// Cache tagged with this crate's schema version.
    pub fn with_schema_version(base_dir: impl Into<PathBuf>, max_age_ms: u64) -> Self {
        Self::new(base_dir, max_age_ms, SCHEMA_VERSION)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(INDEX_FILE_NAME)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn ensure_dir(&self) -> bool {
        if self.dir_ready.get().is_some() {
            return true;
        }
        if !self.base_dir.exists() {
            if let Err(e) = fs::create_dir_all(&self.base_dir) {
                warn!(path = ?self.base_dir, error = %e, "Failed to create cache directory");
                return false;
            }
            info!(path = ?self.base_dir, "Created cache directory");
        }
        let _ = self.dir_ready.set(());
        true
    }

    fn read_file(&self) -> Result<IndexSnapshot, CacheMiss> {
        if !self.ensure_dir() {
            return Err(CacheMiss::Unreadable("cache directory unavailable".to_string()));
        }
        let path = self.index_path();
        if !path.exists() {
            return Err(CacheMiss::Absent);
        }
        let content = fs::read_to_string(&path).map_err(|e| CacheMiss::Unreadable(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| CacheMiss::Unreadable(e.to_string()))
    }

    fn check(&self, snapshot: &IndexSnapshot) -> Result<i64, CacheMiss> {
        if snapshot.version != self.version {
            return Err(CacheMiss::VersionMismatch {
                expected: self.version.clone(),
                found: snapshot.version.clone(),
            });
        }
        let age_ms = (Utc::now() - snapshot.timestamp).num_milliseconds();
        if age_ms > i64::try_from(self.max_age_ms).unwrap_or(i64::MAX) {
            return Err(CacheMiss::Expired { age_ms });
        }
        Ok(age_ms)
    }

    /// Read and validate the snapshot, reporting why it is unusable.
    pub fn read_snapshot(&self) -> Result<IndexSnapshot, CacheMiss> {
        let snapshot = self.read_file()?;
        self.check(&snapshot)?;
        Ok(snapshot)
    }

    /// Write a snapshot stamped with `timestamp`.
    ///
    /// The file is written beside the target and renamed into place so a
    /// concurrent reader never sees a half-written snapshot.
    pub fn write_snapshot(
        &self,
        entries: &[DocumentRecord],
        timestamp: DateTime<Utc>,
    ) -> Result<usize, IndexError> {
        if !self.ensure_dir() {
            fs::create_dir_all(&self.base_dir)?;
        }
        let snapshot = SnapshotRef {
            entries,
            timestamp,
            version: &self.version,
        };
        let bytes = serde_json::to_vec(&snapshot)?;
        let path = self.index_path();
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, &path)?;
        Ok(bytes.len())
    }

    /// Describe the snapshot file without loading it into an index.
    pub fn inspect(&self) -> CacheStatus {
        let snapshot = self.read_file().ok();
        let age_ms = snapshot
            .as_ref()
            .map(|s| (Utc::now() - s.timestamp).num_milliseconds());
        CacheStatus {
            path: self.index_path(),
            exists: self.index_path().exists(),
            valid: snapshot.as_ref().is_some_and(|s| self.check(s).is_ok()),
            entries: snapshot.as_ref().map(|s| s.entries.len()),
            age_ms,
            version: snapshot.map(|s| s.version),
            expected_version: self.version.clone(),
            max_age_ms: self.max_age_ms,
        }
    }
}

impl SnapshotCache for DiskCache {
    fn load(&self) -> Vec<DocumentRecord> {
        let snapshot = match self.read_file() {
            Ok(snapshot) => snapshot,
            Err(CacheMiss::Absent) => {
                debug!(path = ?self.index_path(), "No cached index on disk");
                return Vec::new();
            }
            Err(miss) => {
                warn!(reason = %miss, "Failed to load cached index");
                return Vec::new();
            }
        };

        match self.check(&snapshot) {
            Ok(age_ms) => {
                info!(
                    entries = snapshot.entries.len(),
                    age_secs = age_ms / 1000,
                    "Loaded index from disk cache"
                );
                snapshot.entries
            }
            Err(miss) => {
                info!(reason = %miss, "Cached index rejected, rebuilding");
                Vec::new()
            }
        }
    }

    fn save(&self, entries: &[DocumentRecord]) {
        match self.write_snapshot(entries, Utc::now()) {
            Ok(bytes) => info!(
                entries = entries.len(),
                size_kb = bytes / 1024,
                "Saved index to disk cache"
            ),
            Err(e) => warn!(error = %e, path = ?self.index_path(), "Failed to save index to disk cache"),
        }
    }

    fn is_valid(&self) -> bool {
        self.read_snapshot().is_ok()
    }
}
