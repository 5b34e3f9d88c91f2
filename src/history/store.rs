//! Append-only analysis history backed by a JSON file
//!
//! The whole log is read once on open and kept in memory. Every append
//! rewrites the file through a temporary sibling that is fsynced and then
//! atomically renamed over the original, so a crash mid-write leaves either
//! the old or the new log, never a truncated one.

use crate::error::{DiagnosticError, Result};
use crate::model::AnalysisRecord;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Durable, ordered history of analysis records
#[derive(Debug)]
pub struct AnalysisHistoryStore {
    path: PathBuf,
    records: Vec<AnalysisRecord>,
}

impl AnalysisHistoryStore {
    /// Open the history at `path`
    ///
    /// A missing or zero-length file is an empty log. A file that does not
    /// parse is reported as `CorruptHistory` and left untouched.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                log::info!("History file {:?} is empty, starting a new log", path);
                Vec::new()
            }
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                DiagnosticError::CorruptHistory {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No history at {:?}, starting a new log", path);
                Vec::new()
            }
            Err(source) => {
                return Err(DiagnosticError::PersistenceFailure {
                    path,
                    source,
                    record: None,
                    spectrogram: None,
                })
            }
        };

        log::debug!("Loaded {} history entries from {:?}", records.len(), path);

        Ok(Self { path, records })
    }

    /// Append a record and commit it to disk before returning
    ///
    /// On failure the in-memory log is unchanged and the record is handed
    /// back inside the error.
    pub fn append(&mut self, record: AnalysisRecord) -> Result<()> {
        self.records.push(record);

        if let Err(source) = self.commit() {
            let record = self.records.pop().map(Box::new);
            return Err(DiagnosticError::PersistenceFailure {
                path: self.path.clone(),
                source,
                record,
                spectrogram: None,
            });
        }

        log::debug!(
            "History committed: {} entries in {:?}",
            self.records.len(),
            self.path
        );
        Ok(())
    }

    /// The complete log, oldest first
    pub fn all(&self) -> &[AnalysisRecord] {
        &self.records
    }

    /// The last `n` records, most recent first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &AnalysisRecord> {
        self.records.iter().rev().take(n)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Location of the history file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full log through a temporary file and rename it into place
    fn commit(&self) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_vec_pretty(&self.records).map_err(io::Error::other)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        sync_dir(&dir);
        Ok(())
    }
}

/// Flush the directory entry so the rename itself survives a crash
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        log::warn!("Failed to sync history directory {:?}: {}", dir, e);
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EngineType, FeatureVector, HealthStatus};
    use chrono::{Duration, Local, TimeZone};
    use tempfile::TempDir;

    fn record(n: i64) -> AnalysisRecord {
        AnalysisRecord {
            timestamp: Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(n),
            source_name: format!("sample{}.wav", n),
            engine_type: EngineType::Gasoline,
            status: HealthStatus::Healthy,
            risk_score: 0,
            features: FeatureVector::default(),
            advice: "normal operation.".to_string(),
        }
    }

    #[test]
    fn test_missing_file_opens_empty_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let store = AnalysisHistoryStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_append_then_all_preserves_order() {
        let dir = TempDir::new().unwrap();
        let mut store = AnalysisHistoryStore::open(dir.path().join("history.json")).unwrap();

        for n in 0..3 {
            store.append(record(n)).unwrap();
        }
        let before = store.all().to_vec();

        store.append(record(3)).unwrap();

        let mut expected = before;
        expected.push(record(3));
        assert_eq!(store.all(), expected.as_slice());
    }

    #[test]
    fn test_history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.json");

        {
            let mut store = AnalysisHistoryStore::open(&path).unwrap();
            store.append(record(0)).unwrap();
            store.append(record(1)).unwrap();
        }

        let reopened = AnalysisHistoryStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.all()[0], record(0));
        assert_eq!(reopened.all()[1], record(1));
    }

    #[test]
    fn test_recent_is_reverse_chronological() {
        let dir = TempDir::new().unwrap();
        let mut store = AnalysisHistoryStore::open(dir.path().join("history.json")).unwrap();
        for n in 0..5 {
            store.append(record(n)).unwrap();
        }

        let recent: Vec<&AnalysisRecord> = store.recent(3).collect();
        assert_eq!(recent, vec![&record(4), &record(3), &record(2)]);

        assert_eq!(store.recent(10).count(), 5);
        assert_eq!(store.recent(0).count(), 0);
    }

    #[test]
    fn test_corrupt_history_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, b"[{\"timestamp\": ").unwrap();

        let result = AnalysisHistoryStore::open(&path);
        assert!(matches!(result, Err(DiagnosticError::CorruptHistory { .. })));

        // The unreadable file is left for the user to inspect
        assert_eq!(fs::read(&path).unwrap(), b"[{\"timestamp\": ");
    }

    #[test]
    fn test_empty_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, b"").unwrap();

        let store = AnalysisHistoryStore::open(&path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_append_returns_record_and_keeps_log() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        let mut store = AnalysisHistoryStore::open(blocker.join("history.json")).unwrap();

        // A plain file where the history directory should be
        fs::write(&blocker, b"file").unwrap();
        let err = store.append(record(7)).unwrap_err();

        assert!(matches!(err, DiagnosticError::PersistenceFailure { .. }));
        assert_eq!(err.unsaved_record(), Some(&record(7)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let mut store = AnalysisHistoryStore::open(dir.path().join("history.json")).unwrap();
        store.append(record(0)).unwrap();
        store.append(record(1)).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_file_is_a_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let mut store = AnalysisHistoryStore::open(&path).unwrap();
        store.append(record(0)).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["sourceName"], "sample0.wav");
        assert_eq!(entries[0]["riskScore"], 0);
        assert_eq!(entries[0]["highFreqRatio"], 0.0);
    }
}
