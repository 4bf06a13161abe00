//! casefile - JSON record store with timestamped backups
//!
//! This library provides the persistence layer of a case-management tool:
//! a whole-file JSON record store and a snapshot/retention/restore
//! subsystem with an optional periodic background backup.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Record model and the `Document` trait
//! - `storage`: JSON file storage layer
//! - `backup`: Snapshot, retention, restore and scheduled backups
//! - `cli`: Command handlers for the `casefile` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use casefile::backup::{BackupManager, BackupScheduler};
//! use casefile::config::{CasefilePaths, Settings};
//! use casefile::models::Record;
//! use casefile::storage::RecordStore;
//!
//! let paths = CasefilePaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//!
//! let store: RecordStore = RecordStore::open(settings.data_file(&paths))?;
//! store.load_all()?;
//! store.save(Record::with_id("a").with_field("name", "Jane Roe"))?;
//!
//! let manager = BackupManager::from_settings(&settings, &paths)?
//!     .with_file_lock(store.file_lock());
//! let scheduler = BackupScheduler::new(manager);
//! scheduler.backup()?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use error::{CaseError, CaseResult};
