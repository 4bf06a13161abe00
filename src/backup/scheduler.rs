//! Backup scheduler
//!
//! Wraps a [`BackupManager`] with at most one periodic background backup.
//! Manual operations run on the caller's thread and are serialized with the
//! timer's backups by the manager's own locks.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::info;

use crate::config::paths::CasefilePaths;
use crate::config::settings::Settings;
use crate::error::{CaseError, CaseResult};

use super::manager::{BackupInfo, BackupManager};
use super::restore::SnapshotValidation;
use super::timer::AutoBackupTimer;

/// How long `stop_auto_backup` waits for an in-flight backup
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Snapshots, retention, restore and scheduled backups for one data file
pub struct BackupScheduler {
    manager: Arc<BackupManager>,
    timer: Mutex<Option<AutoBackupTimer>>,
}

impl BackupScheduler {
    pub fn new(manager: BackupManager) -> Self {
        Self {
            manager: Arc::new(manager),
            timer: Mutex::new(None),
        }
    }

    /// Build from settings, starting the timer if auto-backup is enabled
    pub fn from_settings(settings: &Settings, paths: &CasefilePaths) -> CaseResult<Self> {
        let scheduler = Self::new(BackupManager::from_settings(settings, paths)?);

        if settings.backup.auto_backup_enabled {
            scheduler.start_auto_backup(settings.backup.interval())?;
        }

        Ok(scheduler)
    }

    /// The underlying manager
    pub fn manager(&self) -> &BackupManager {
        &self.manager
    }

    pub fn backup(&self) -> CaseResult<PathBuf> {
        self.manager.backup()
    }

    pub fn restore(&self, name: &str) -> CaseResult<bool> {
        self.manager.restore(name)
    }

    pub fn restore_latest(&self) -> CaseResult<bool> {
        self.manager.restore_latest()
    }

    pub fn list_backups(&self) -> CaseResult<Vec<String>> {
        self.manager.list_backups()
    }

    pub fn list_backup_info(&self) -> CaseResult<Vec<BackupInfo>> {
        self.manager.list_backup_info()
    }

    pub fn delete_backup(&self, name: &str) -> CaseResult<bool> {
        self.manager.delete_backup(name)
    }

    pub fn get_backup_size(&self, name: &str) -> CaseResult<u64> {
        self.manager.backup_size(name)
    }

    pub fn validate_snapshot(&self, name: &str) -> CaseResult<SnapshotValidation> {
        self.manager.validate_snapshot(name)
    }

    pub fn max_backup_count(&self) -> usize {
        self.manager.max_backup_count()
    }

    /// Takes effect on the next pruning pass, including the timer's
    pub fn set_max_backup_count(&self, count: usize) {
        self.manager.set_max_backup_count(count);
    }

    pub fn data_file(&self) -> &Path {
        self.manager.data_file()
    }

    pub fn backup_dir(&self) -> &Path {
        self.manager.backup_dir()
    }

    /// Start periodic backups every `interval`
    ///
    /// A timer that is already running is stopped first. The first backup
    /// runs after one full interval.
    pub fn start_auto_backup(&self, interval: Duration) -> CaseResult<()> {
        if interval.is_zero() {
            return Err(CaseError::Validation(
                "Auto-backup interval must be greater than zero".into(),
            ));
        }

        let mut timer = self.lock_timer();
        if let Some(previous) = timer.take() {
            previous.stop(STOP_GRACE_PERIOD);
        }

        *timer = Some(AutoBackupTimer::start(Arc::clone(&self.manager), interval)?);
        Ok(())
    }

    /// Start periodic backups every `hours` hours
    pub fn start_auto_backup_hours(&self, hours: u64) -> CaseResult<()> {
        self.start_auto_backup(Duration::from_secs(hours.saturating_mul(3600)))
    }

    /// Stop periodic backups; returns whether a timer was running
    pub fn stop_auto_backup(&self) -> bool {
        match self.lock_timer().take() {
            Some(timer) => {
                timer.stop(STOP_GRACE_PERIOD);
                info!("Auto-backup disabled");
                true
            }
            None => false,
        }
    }

    pub fn is_auto_backup_running(&self) -> bool {
        self.lock_timer().is_some()
    }

    /// Interval of the running timer, if any
    pub fn auto_backup_interval(&self) -> Option<Duration> {
        self.lock_timer().as_ref().map(AutoBackupTimer::interval)
    }

    // The slot only holds a handle, so a poisoned lock is still usable
    fn lock_timer(&self) -> MutexGuard<'_, Option<AutoBackupTimer>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BackupScheduler {
    fn drop(&mut self) {
        self.stop_auto_backup();
    }
}
