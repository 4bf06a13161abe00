//! Backup system for casefile
//!
//! Point-in-time snapshots of the record store's data file, retention
//! pruning, restore, and an optional periodic background backup.
//!
//! # Architecture
//!
//! - `BackupManager`: creates, lists, prunes, deletes and restores snapshots
//! - `BackupScheduler`: a `BackupManager` plus at most one auto-backup timer
//!
//! # Snapshot Format
//!
//! A snapshot is a byte-for-byte copy of the data file named
//! `<prefix><YYYYMMDD_HHMMSS_mmm><extension>` (default `backup_<stamp>.json`).
//! Names sort in creation order. Copies go through a temp file and a rename,
//! so a failed backup leaves no partial snapshot behind.
//!
//! # Retention Policy
//!
//! After every backup only the newest `max_backup_count` snapshots are kept.
//! Safety snapshots (`before_restore_<stamp>`) taken before a restore are not
//! counted and never pruned.
//!
//! # Example
//!
//! ```rust,ignore
//! use casefile::backup::{BackupManager, BackupScheduler};
//! use casefile::storage::RecordStore;
//!
//! let store: RecordStore = RecordStore::open("data/records.json")?;
//! let manager = BackupManager::new(store.path(), "backups")
//!     .with_max_backup_count(3)
//!     .with_file_lock(store.file_lock());
//! let scheduler = BackupScheduler::new(manager);
//!
//! let snapshot = scheduler.backup()?;
//! scheduler.start_auto_backup_hours(24)?;
//! ```

mod manager;
mod naming;
mod restore;
mod scheduler;
mod timer;

pub use manager::{BackupInfo, BackupManager, DEFAULT_MAX_BACKUP_COUNT};
pub use naming::{validate_snapshot_name, SnapshotNaming, StampSequence, SAFETY_PREFIX};
pub use restore::SnapshotValidation;
pub use scheduler::{BackupScheduler, STOP_GRACE_PERIOD};
