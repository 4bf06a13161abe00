//! Backup manager for casefile
//!
//! Copies the live data file into the retention directory under a
//! timestamped name and prunes the oldest snapshots beyond the configured
//! count.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::paths::CasefilePaths;
use crate::config::settings::Settings;
use crate::error::{CaseError, CaseResult};
use crate::storage::file_io::copy_file_atomic;
use crate::storage::lock::FileLock;

use super::naming::{validate_snapshot_name, SnapshotNaming, StampSequence};

/// Default number of snapshots kept
pub const DEFAULT_MAX_BACKUP_COUNT: usize = 10;

/// Metadata about a backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// When the backup was created (from the name, else the file mtime)
    pub created_at: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Manages snapshot creation, listing and retention
pub struct BackupManager {
    /// Live data file being snapshotted
    pub(super) data_file: PathBuf,
    /// Retention directory
    pub(super) backup_dir: PathBuf,
    pub(super) naming: SnapshotNaming,
    max_backup_count: AtomicUsize,
    pub(super) file_lock: FileLock,
    /// Held for the duration of a backup or restore
    pub(super) sequence: Mutex<StampSequence>,
}

impl BackupManager {
    /// Create a manager for `data_file` keeping snapshots in `backup_dir`
    pub fn new(data_file: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            backup_dir: backup_dir.into(),
            naming: SnapshotNaming::default(),
            max_backup_count: AtomicUsize::new(DEFAULT_MAX_BACKUP_COUNT),
            file_lock: FileLock::new(),
            sequence: Mutex::new(StampSequence::new()),
        }
    }

    /// Create a manager from persisted settings
    pub fn from_settings(settings: &Settings, paths: &CasefilePaths) -> CaseResult<Self> {
        let naming = SnapshotNaming::new(
            settings.backup.prefix.clone(),
            settings.backup.extension.clone(),
        )?;

        Ok(Self::new(settings.data_file(paths), settings.backup_dir(paths))
            .with_naming(naming)
            .with_max_backup_count(settings.backup.max_backup_count))
    }

    pub fn with_naming(mut self, naming: SnapshotNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_max_backup_count(self, count: usize) -> Self {
        self.set_max_backup_count(count);
        self
    }

    /// Share the data file lock with a record store
    pub fn with_file_lock(mut self, file_lock: FileLock) -> Self {
        self.file_lock = file_lock;
        self
    }

    /// Snapshot the data file, then prune old snapshots
    ///
    /// Returns the path of the new snapshot.
    pub fn backup(&self) -> CaseResult<PathBuf> {
        let mut sequence = self.lock_sequence()?;

        let backup_path = {
            let _guard = self.file_lock.acquire()?;

            if !self.data_file.is_file() {
                return Err(CaseError::data_file_not_found(
                    self.data_file.display().to_string(),
                ));
            }

            fs::create_dir_all(&self.backup_dir).map_err(|e| {
                CaseError::Io(format!("Failed to create backup directory: {}", e))
            })?;

            let filename = self.next_free_name(&mut sequence, |stamp| {
                self.naming.snapshot_name(stamp)
            });
            let backup_path = self.backup_dir.join(&filename);

            let bytes = copy_file_atomic(&self.data_file, &backup_path)?;
            info!(backup = %filename, bytes, "Created backup");
            backup_path
        };

        self.prune()?;

        Ok(backup_path)
    }

    /// Delete snapshots beyond the retention count, oldest first
    ///
    /// Returns the deleted paths.
    pub fn enforce_retention(&self) -> CaseResult<Vec<PathBuf>> {
        let _sequence = self.lock_sequence()?;
        self.prune()
    }

    fn prune(&self) -> CaseResult<Vec<PathBuf>> {
        let keep = self.max_backup_count();
        let mut deleted = Vec::new();

        for name in self.list_backups()?.into_iter().skip(keep) {
            let path = self.backup_dir.join(&name);
            fs::remove_file(&path).map_err(|e| {
                CaseError::Io(format!("Failed to delete old backup {}: {}", name, e))
            })?;
            debug!(backup = %name, "Pruned backup");
            deleted.push(path);
        }

        if !deleted.is_empty() {
            info!(deleted = deleted.len(), keep, "Enforced backup retention");
        }

        Ok(deleted)
    }

    /// List primary snapshot names, newest first
    pub fn list_backups(&self) -> CaseResult<Vec<String>> {
        self.list_matching(|name| self.naming.matches(name))
    }

    /// List safety snapshots taken before restores, newest first
    pub fn list_safety_snapshots(&self) -> CaseResult<Vec<String>> {
        self.list_matching(|name| self.naming.is_safety(name))
    }

    fn list_matching(&self, keep: impl Fn(&str) -> bool) -> CaseResult<Vec<String>> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CaseError::Io(format!(
                    "Failed to read backup directory: {}",
                    e
                )))
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| CaseError::Io(format!("Failed to read directory entry: {}", e)))?;

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            if let Some(name) = entry.file_name().to_str() {
                if keep(name) {
                    names.push(name.to_string());
                }
            }
        }

        // Newest stamp first; name breaks ties between resolutions
        names.sort_unstable_by(|a, b| {
            let a_key = (self.naming.parse_timestamp(a), a);
            let b_key = (self.naming.parse_timestamp(b), b);
            b_key.cmp(&a_key)
        });
        Ok(names)
    }

    /// List primary snapshots with metadata, newest first
    pub fn list_backup_info(&self) -> CaseResult<Vec<BackupInfo>> {
        let mut backups = Vec::new();
        for name in self.list_backups()? {
            if let Some(info) = self.backup_info(&name) {
                backups.push(info);
            }
        }
        Ok(backups)
    }

    /// Get a specific backup by filename
    pub fn get_backup(&self, name: &str) -> CaseResult<Option<BackupInfo>> {
        validate_snapshot_name(name)?;
        Ok(self.backup_info(name))
    }

    /// Get the most recent backup
    pub fn latest_backup(&self) -> CaseResult<Option<BackupInfo>> {
        Ok(self
            .list_backups()?
            .first()
            .and_then(|name| self.backup_info(name)))
    }

    fn backup_info(&self, name: &str) -> Option<BackupInfo> {
        let path = self.backup_dir.join(name);
        let metadata = fs::metadata(&path).ok()?;
        if !metadata.is_file() {
            return None;
        }

        let created_at = self
            .naming
            .parse_timestamp(name)
            .or_else(|| metadata.modified().ok().map(DateTime::<Utc>::from))?;

        Some(BackupInfo {
            filename: name.to_string(),
            path,
            created_at,
            size_bytes: metadata.len(),
        })
    }

    /// Delete a snapshot; returns false if it did not exist
    pub fn delete_backup(&self, name: &str) -> CaseResult<bool> {
        validate_snapshot_name(name)?;

        match fs::remove_file(self.backup_dir.join(name)) {
            Ok(()) => {
                info!(backup = %name, "Deleted backup");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CaseError::Io(format!(
                "Failed to delete backup {}: {}",
                name, e
            ))),
        }
    }

    /// Size of a snapshot in bytes
    pub fn backup_size(&self, name: &str) -> CaseResult<u64> {
        validate_snapshot_name(name)?;

        match fs::metadata(self.backup_dir.join(name)) {
            Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
            Ok(_) => Err(CaseError::backup_not_found(name)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CaseError::backup_not_found(name)),
            Err(e) => Err(CaseError::Io(format!(
                "Failed to read backup {}: {}",
                name, e
            ))),
        }
    }

    pub fn max_backup_count(&self) -> usize {
        self.max_backup_count.load(Ordering::SeqCst)
    }

    /// Change the retention count
    ///
    /// Applies from the next pruning pass. At least one snapshot is always
    /// kept, so a backup never deletes the file it just created.
    pub fn set_max_backup_count(&self, count: usize) {
        self.max_backup_count.store(count.max(1), Ordering::SeqCst);
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn naming(&self) -> &SnapshotNaming {
        &self.naming
    }

    pub(super) fn lock_sequence(&self) -> CaseResult<MutexGuard<'_, StampSequence>> {
        self.sequence
            .lock()
            .map_err(|e| CaseError::Storage(format!("Failed to acquire backup lock: {}", e)))
    }

    /// Next stamped name that does not exist in the retention directory
    pub(super) fn next_free_name(
        &self,
        sequence: &mut StampSequence,
        make_name: impl Fn(&DateTime<Utc>) -> String,
    ) -> String {
        let mut stamp = sequence.next(Utc::now());
        loop {
            let name = make_name(&stamp);
            if !self.backup_dir.join(&name).exists() {
                return name;
            }
            stamp = sequence.next(stamp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_manager() -> (BackupManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let data_file = temp_dir.path().join("data").join("records.json");
        fs::create_dir_all(data_file.parent().unwrap()).unwrap();
        fs::write(&data_file, r#"{"schema_version":1,"records":[]}"#).unwrap();

        let manager = BackupManager::new(data_file, temp_dir.path().join("backups"))
            .with_max_backup_count(3);
        (manager, temp_dir)
    }

    #[test]
    fn test_create_backup() {
        let (manager, _temp) = create_test_manager();

        let backup_path = manager.backup().unwrap();
        assert!(backup_path.exists());

        let name = backup_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(manager.naming().matches(&name));
        assert_eq!(
            fs::read(&backup_path).unwrap(),
            fs::read(manager.data_file()).unwrap()
        );
    }

    #[test]
    fn test_backup_missing_data_file_is_not_found() {
        let (manager, _temp) = create_test_manager();
        fs::remove_file(manager.data_file()).unwrap();

        let err = manager.backup().unwrap_err();
        assert!(err.is_not_found());
        assert!(manager.list_backups().unwrap().is_empty());
    }

    #[test]
    fn test_list_backups_newest_first() {
        let (manager, _temp) = create_test_manager();
        manager.set_max_backup_count(10);

        let first = manager.backup().unwrap();
        let second = manager.backup().unwrap();
        let third = manager.backup().unwrap();

        let names = manager.list_backups().unwrap();
        let expected: Vec<String> = [third, second, first]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_retention_keeps_newest() {
        let (manager, _temp) = create_test_manager();

        let created: Vec<String> = (0..5)
            .map(|_| {
                let path = manager.backup().unwrap();
                path.file_name().unwrap().to_string_lossy().to_string()
            })
            .collect();

        let remaining = manager.list_backups().unwrap();
        assert_eq!(remaining.len(), 3);
        assert_eq!(remaining, vec![
            created[4].clone(),
            created[3].clone(),
            created[2].clone(),
        ]);
    }

    #[test]
    fn test_retention_change_applies_on_next_backup() {
        let (manager, _temp) = create_test_manager();
        manager.set_max_backup_count(5);
        for _ in 0..5 {
            manager.backup().unwrap();
        }

        manager.set_max_backup_count(2);
        assert_eq!(manager.list_backups().unwrap().len(), 5);

        manager.backup().unwrap();
        assert_eq!(manager.list_backups().unwrap().len(), 2);
    }

    #[test]
    fn test_max_backup_count_is_at_least_one() {
        let (manager, _temp) = create_test_manager();
        manager.set_max_backup_count(0);
        assert_eq!(manager.max_backup_count(), 1);

        let path = manager.backup().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_enforce_retention() {
        let (manager, _temp) = create_test_manager();
        manager.set_max_backup_count(10);
        for _ in 0..5 {
            manager.backup().unwrap();
        }

        manager.set_max_backup_count(3);
        let deleted = manager.enforce_retention().unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(deleted.iter().all(|p| !p.exists()));
        assert_eq!(manager.list_backups().unwrap().len(), 3);
    }

    #[test]
    fn test_listing_ignores_other_files() {
        let (manager, _temp) = create_test_manager();
        manager.backup().unwrap();

        let dir = manager.backup_dir();
        fs::write(dir.join("notes.txt"), "x").unwrap();
        fs::write(dir.join("before_restore_20250101_000000_000.json"), "x").unwrap();
        fs::write(dir.join("backup_20250101_000000_000.json.tmp"), "x").unwrap();
        fs::create_dir(dir.join("backup_20250101_000001_000.json")).unwrap();

        assert_eq!(manager.list_backups().unwrap().len(), 1);
        assert_eq!(manager.list_safety_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let (manager, _temp) = create_test_manager();
        assert!(!manager.backup_dir().exists());
        assert!(manager.list_backups().unwrap().is_empty());
        assert!(manager.latest_backup().unwrap().is_none());
    }

    #[test]
    fn test_backup_info() {
        let (manager, _temp) = create_test_manager();
        let path = manager.backup().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();

        let info = manager.get_backup(&name).unwrap().unwrap();
        assert_eq!(info.path, path);
        assert_eq!(info.size_bytes, fs::metadata(&path).unwrap().len());
        assert!((Utc::now() - info.created_at).num_seconds() < 60);

        let latest = manager.latest_backup().unwrap().unwrap();
        assert_eq!(latest.filename, name);

        assert!(manager.get_backup("backup_19990101_000000_000.json").unwrap().is_none());
        assert_eq!(manager.list_backup_info().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_backup() {
        let (manager, _temp) = create_test_manager();
        let path = manager.backup().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();

        assert!(manager.delete_backup(&name).unwrap());
        assert!(!path.exists());
        assert!(!manager.delete_backup(&name).unwrap());
        assert!(manager.delete_backup("../records.json").unwrap_err().is_validation());
    }

    #[test]
    fn test_backup_size() {
        let (manager, _temp) = create_test_manager();
        let path = manager.backup().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();

        let expected = fs::metadata(manager.data_file()).unwrap().len();
        assert_eq!(manager.backup_size(&name).unwrap(), expected);

        let err = manager.backup_size("backup_19990101_000000_000.json").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_backup_never_overwrites_existing() {
        let (manager, _temp) = create_test_manager();
        manager.set_max_backup_count(10);

        // A name already on disk is never overwritten
        let existing = manager.backup().unwrap();
        fs::write(&existing, "older content").unwrap();
        let next = manager.backup().unwrap();

        assert_ne!(existing, next);
        assert_eq!(fs::read_to_string(&existing).unwrap(), "older content");
    }

    #[test]
    fn test_from_settings() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CasefilePaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut settings = Settings::default();
        settings.backup.max_backup_count = 4;
        settings.backup.prefix = "cases-".into();

        let manager = BackupManager::from_settings(&settings, &paths).unwrap();
        assert_eq!(manager.max_backup_count(), 4);
        assert_eq!(manager.data_file(), paths.records_file());
        assert_eq!(manager.backup_dir(), paths.backup_dir());
        assert_eq!(manager.naming().prefix(), "cases-");

        settings.backup.prefix = String::new();
        assert!(BackupManager::from_settings(&settings, &paths).is_err());
    }
}
