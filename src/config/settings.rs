//! User settings for casefile
//!
//! Holds the storage location overrides and the backup retention and
//! scheduling preferences. Settings are read once at startup and handed to
//! the store and the backup scheduler; they are not re-read afterwards.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::CasefilePaths;
use crate::error::CaseError;

/// Storage location settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Override for the backing file (defaults to `<base>/data/records.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

/// Backup retention and scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Override for the retention directory (defaults to `<base>/backups`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    /// Maximum number of snapshots kept after each backup
    #[serde(default = "default_max_backup_count")]
    pub max_backup_count: usize,

    /// Whether the periodic background backup should run
    #[serde(default)]
    pub auto_backup_enabled: bool,

    /// Hours between scheduled backups
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Snapshot filename prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Snapshot filename extension, including the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_max_backup_count() -> usize {
    10
}

fn default_interval_hours() -> u64 {
    24
}

fn default_prefix() -> String {
    "backup_".to_string()
}

fn default_extension() -> String {
    ".json".to_string()
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            backup_dir: None,
            max_backup_count: default_max_backup_count(),
            auto_backup_enabled: false,
            interval_hours: default_interval_hours(),
            prefix: default_prefix(),
            extension: default_extension(),
        }
    }
}

impl BackupSettings {
    /// Scheduled backup interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.saturating_mul(3600))
    }
}

/// User settings for casefile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub backup: BackupSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            storage: StorageSettings::default(),
            backup: BackupSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &CasefilePaths) -> Result<Self, CaseError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| CaseError::Config(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents)
                .map_err(|e| CaseError::Config(format!("Failed to parse settings file: {}", e)))?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &CasefilePaths) -> Result<(), CaseError> {
        paths.ensure_base_dir()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| CaseError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| CaseError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Resolve the backing file path
    pub fn data_file(&self, paths: &CasefilePaths) -> PathBuf {
        self.storage
            .data_file
            .clone()
            .unwrap_or_else(|| paths.records_file())
    }

    /// Resolve the retention directory
    pub fn backup_dir(&self, paths: &CasefilePaths) -> PathBuf {
        self.backup
            .backup_dir
            .clone()
            .unwrap_or_else(|| paths.backup_dir())
    }
}
