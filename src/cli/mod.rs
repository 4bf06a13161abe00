//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the record store and the
//! backup scheduler.

pub mod backup;
pub mod record;

pub use backup::{handle_backup_command, BackupCommands};
pub use record::{handle_record_command, RecordCommands};
