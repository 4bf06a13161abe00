//! Path management for casefile
//!
//! ## Path Resolution Order
//!
//! 1. `CASEFILE_DATA_DIR` environment variable (if set)
//! 2. The platform config directory for `casefile` (via `directories`)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::CaseError;

/// Manages all paths used by casefile
#[derive(Debug, Clone)]
pub struct CasefilePaths {
    /// Base directory for all casefile data
    base_dir: PathBuf,
}

impl CasefilePaths {
    /// Create a new CasefilePaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no platform config directory can be determined.
    pub fn new() -> Result<Self, CaseError> {
        let base_dir = if let Ok(custom) = std::env::var("CASEFILE_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create CasefilePaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (`<base>/data/`)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the backup directory (`<base>/backups/`)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to records.json, the default backing file
    pub fn records_file(&self) -> PathBuf {
        self.data_dir().join("records.json")
    }

    /// Ensure the base directory exists
    ///
    /// The data and backup directories are created lazily by the store and
    /// the backup scheduler, since either may be overridden in settings.
    pub fn ensure_base_dir(&self) -> Result<(), CaseError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| CaseError::Io(format!("Failed to create base directory: {}", e)))
    }
}

fn resolve_default_path() -> Result<PathBuf, CaseError> {
    ProjectDirs::from("", "", "casefile")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| CaseError::Config("Could not determine home directory".into()))
}
