//! Backup restoration for casefile
//!
//! Restoring copies a snapshot back over the live data file. If the live
//! file exists it is first saved as a `before_restore_` safety snapshot,
//! which is not counted by retention and not shown in the backup listing.
//!
//! A record store reading the same file keeps its old cache until the
//! caller refreshes it.

use std::fs;
use std::io;

use serde::Serialize;
use tracing::info;

use crate::error::{CaseError, CaseResult};
use crate::storage::file_io::{copy_file_atomic, read_json_opt};
use crate::storage::records::StoredRecords;

use super::manager::BackupManager;
use super::naming::validate_snapshot_name;

/// Result of checking a snapshot's content
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotValidation {
    /// Snapshot filename
    pub filename: String,
    /// Number of records the snapshot holds
    pub record_count: usize,
    /// Size in bytes
    pub size_bytes: u64,
}

impl SnapshotValidation {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} record(s), {} bytes",
            self.filename, self.record_count, self.size_bytes
        )
    }
}

impl BackupManager {
    /// Restore the live data file from the snapshot `name`
    ///
    /// Fails with `NotFound` (leaving the live file untouched) if the
    /// snapshot doesn't exist.
    pub fn restore(&self, name: &str) -> CaseResult<bool> {
        validate_snapshot_name(name)?;

        let source = self.backup_dir.join(name);
        if !source.is_file() {
            return Err(CaseError::backup_not_found(name));
        }

        let mut sequence = self.lock_sequence()?;
        let _guard = self.file_lock.acquire()?;

        if self.data_file.exists() {
            let safety_name =
                self.next_free_name(&mut sequence, |stamp| self.naming.safety_name(stamp));
            copy_file_atomic(&self.data_file, self.backup_dir.join(&safety_name))?;
            info!(snapshot = %safety_name, "Saved current data before restore");
        }

        copy_file_atomic(&source, &self.data_file)?;
        info!(backup = %name, "Restored backup");

        Ok(true)
    }

    /// Restore the newest snapshot
    pub fn restore_latest(&self) -> CaseResult<bool> {
        let latest = self
            .list_backups()?
            .into_iter()
            .next()
            .ok_or_else(|| CaseError::backup_not_found("latest"))?;

        self.restore(&latest)
    }

    /// Check that a snapshot parses as a record collection
    pub fn validate_snapshot(&self, name: &str) -> CaseResult<SnapshotValidation> {
        validate_snapshot_name(name)?;

        let path = self.backup_dir.join(name);
        let size_bytes = match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            Ok(_) => return Err(CaseError::backup_not_found(name)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CaseError::backup_not_found(name))
            }
            Err(e) => return Err(CaseError::Io(format!("Failed to read backup: {}", e))),
        };

        let records = read_json_opt::<StoredRecords<serde_json::Value>, _>(&path)?
            .ok_or_else(|| CaseError::backup_not_found(name))?
            .into_records();

        Ok(SnapshotValidation {
            filename: name.to_string(),
            record_count: records.len(),
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::storage::RecordStore;
    use tempfile::TempDir;

    fn create_test_env() -> (RecordStore, BackupManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store: RecordStore =
            RecordStore::open(temp_dir.path().join("data").join("records.json")).unwrap();
        let manager = BackupManager::new(store.path(), temp_dir.path().join("backups"))
            .with_file_lock(store.file_lock());
        (store, manager, temp_dir)
    }

    fn name_of(path: &std::path::Path) -> String {
        path.file_name().unwrap().to_string_lossy().to_string()
    }

    #[test]
    fn test_restore_is_byte_for_byte() {
        let (store, manager, _temp) = create_test_env();
        store.save(Record::with_id("a").with_field("name", "before")).unwrap();
        let at_backup = fs::read(store.path()).unwrap();

        let backup = manager.backup().unwrap();

        store.save(Record::with_id("a").with_field("name", "after")).unwrap();
        store.save(Record::with_id("b")).unwrap();
        assert_ne!(fs::read(store.path()).unwrap(), at_backup);

        assert!(manager.restore(&name_of(&backup)).unwrap());
        assert_eq!(fs::read(store.path()).unwrap(), at_backup);

        store.refresh().unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(store.find_by_id("a").unwrap().get_str("name"), Some("before"));
    }

    #[test]
    fn test_restore_takes_safety_snapshot() {
        let (store, manager, _temp) = create_test_env();
        store.save(Record::with_id("a")).unwrap();
        let backup = manager.backup().unwrap();

        store.save(Record::with_id("b")).unwrap();
        let before_restore = fs::read(store.path()).unwrap();

        manager.restore(&name_of(&backup)).unwrap();

        let safety = manager.list_safety_snapshots().unwrap();
        assert_eq!(safety.len(), 1);
        assert!(safety[0].starts_with("before_restore_"));
        assert_eq!(
            fs::read(manager.backup_dir().join(&safety[0])).unwrap(),
            before_restore
        );

        // Safety snapshots stay out of the primary listing
        assert_eq!(manager.list_backups().unwrap(), vec![name_of(&backup)]);
    }

    #[test]
    fn test_restore_without_live_file_skips_safety_snapshot() {
        let (store, manager, _temp) = create_test_env();
        store.save(Record::with_id("a")).unwrap();
        let backup = manager.backup().unwrap();

        fs::remove_file(store.path()).unwrap();
        manager.restore(&name_of(&backup)).unwrap();

        assert!(store.path().exists());
        assert!(manager.list_safety_snapshots().unwrap().is_empty());
    }

    #[test]
    fn test_restore_missing_snapshot_leaves_live_file() {
        let (store, manager, _temp) = create_test_env();
        store.save(Record::with_id("a")).unwrap();
        let live = fs::read(store.path()).unwrap();

        let err = manager.restore("nonexistent.snap").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fs::read(store.path()).unwrap(), live);
        assert!(manager.list_safety_snapshots().unwrap().is_empty());
    }

    #[test]
    fn test_restore_rejects_path_escape() {
        let (store, manager, _temp) = create_test_env();
        store.save(Record::with_id("a")).unwrap();

        let err = manager.restore("../data/records.json").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_restore_latest() {
        let (store, manager, _temp) = create_test_env();

        let err = manager.restore_latest().unwrap_err();
        assert!(err.is_not_found());

        store.save(Record::with_id("a")).unwrap();
        manager.backup().unwrap();
        store.save(Record::with_id("b")).unwrap();
        manager.backup().unwrap();
        store.save(Record::with_id("c")).unwrap();

        assert!(manager.restore_latest().unwrap());
        assert_eq!(store.refresh().unwrap().len(), 2);
    }

    #[test]
    fn test_stray_prefixed_file_is_not_a_snapshot() {
        let (store, manager, _temp) = create_test_env();
        let manager = manager.with_max_backup_count(2);
        store.save(Record::with_id("a")).unwrap();

        fs::create_dir_all(manager.backup_dir()).unwrap();
        let stray = manager.backup_dir().join("backup_manual.json");
        fs::write(&stray, "stray").unwrap();

        let created: Vec<String> = (0..3).map(|_| name_of(&manager.backup().unwrap())).collect();

        assert_eq!(
            manager.list_backups().unwrap(),
            vec![created[2].clone(), created[1].clone()]
        );
        assert!(stray.exists());

        store.save(Record::with_id("b")).unwrap();
        manager.restore_latest().unwrap();
        assert_eq!(store.refresh().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_saves_and_snapshots_stay_whole() {
        use std::sync::Arc;
        use std::thread;

        let (store, manager, _temp) = create_test_env();
        let manager = Arc::new(manager.with_max_backup_count(1000));
        let store = Arc::new(store);
        store.save(Record::with_id("seed")).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..200 {
                    let record = Record::with_id(format!("r{}", i))
                        .with_field("body", "x".repeat(2048));
                    store.save(record).unwrap();
                }
            })
        };

        let snapshotter = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for i in 0..40 {
                    let path = manager.backup().unwrap();
                    if i % 10 == 9 {
                        manager.restore(&name_of(&path)).unwrap();
                    }
                }
            })
        };

        writer.join().unwrap();
        snapshotter.join().unwrap();

        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 40);
        for name in backups.iter().chain(manager.list_safety_snapshots().unwrap().iter()) {
            let validation = manager.validate_snapshot(name).unwrap();
            assert!(validation.record_count >= 1);
        }
        assert!(store.refresh().is_ok());
    }

    #[test]
    fn test_validate_snapshot() {
        let (store, manager, _temp) = create_test_env();
        store.save(Record::with_id("a")).unwrap();
        store.save(Record::with_id("b")).unwrap();
        let backup = manager.backup().unwrap();
        let name = name_of(&backup);

        let validation = manager.validate_snapshot(&name).unwrap();
        assert_eq!(validation.record_count, 2);
        assert_eq!(validation.size_bytes, fs::metadata(&backup).unwrap().len());
        assert!(validation.summary().contains("2 record(s)"));

        fs::write(&backup, "garbage").unwrap();
        assert!(manager.validate_snapshot(&name).unwrap_err().is_io());

        assert!(manager
            .validate_snapshot("backup_19990101_000000_000.json")
            .unwrap_err()
            .is_not_found());
    }
}
