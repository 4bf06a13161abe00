//! Configuration module for casefile
//!
//! This module provides configuration management including:
//! - Platform path resolution
//! - Settings persistence (storage location, backup retention and schedule)

pub mod paths;
pub mod settings;

pub use paths::CasefilePaths;
pub use settings::{BackupSettings, Settings, StorageSettings};
