//! Record CLI commands
//!
//! Implements CLI commands for record management.

use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;

use crate::error::{CaseError, CaseResult};
use crate::models::Record;
use crate::storage::RecordStore;

/// Record subcommands
#[derive(Subcommand)]
pub enum RecordCommands {
    /// List all records
    List,

    /// Show a record as JSON
    Show {
        /// Record ID
        id: String,
    },

    /// Create or replace a record from a JSON object
    Put {
        /// JSON object (fields other than id and timestamps are payload)
        #[arg(required_unless_present = "file")]
        json: Option<String>,

        /// Read the JSON object from a file instead
        #[arg(short, long, conflicts_with = "json")]
        file: Option<PathBuf>,
    },

    /// Delete one or more records
    Delete {
        /// Record IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Print the number of records
    Count,

    /// Delete all records
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a record command
pub fn handle_record_command(store: &RecordStore, cmd: RecordCommands) -> CaseResult<()> {
    match cmd {
        RecordCommands::List => {
            let records = store.all();

            if records.is_empty() {
                println!("No records found.");
                return Ok(());
            }

            println!("{:38} {:30} {:20}", "ID", "Name", "Updated");
            println!("{}", "-".repeat(90));

            for record in &records {
                println!(
                    "{:38} {:30} {:20}",
                    truncate(record.id.as_str(), 38),
                    truncate(record.get_str("name").unwrap_or("-"), 30),
                    record.updated_at.format("%Y-%m-%d %H:%M:%S"),
                );
            }

            println!("\nTotal: {} record(s)", records.len());
        }

        RecordCommands::Show { id } => {
            let record = store
                .find_by_id(&id)
                .ok_or_else(|| CaseError::record_not_found(&id))?;

            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        RecordCommands::Put { json, file } => {
            let raw = match (json, file) {
                (Some(json), _) => json,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
                    CaseError::Io(format!("Failed to read {}: {}", path.display(), e))
                })?,
                (None, None) => {
                    return Err(CaseError::Validation("No record JSON given".into()));
                }
            };

            let value: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| CaseError::Validation(format!("Invalid JSON: {}", e)))?;

            let mut record = Record::from_value(value).ok_or_else(|| {
                CaseError::Validation("Record must be a JSON object with a string id".into())
            })?;

            let existing = store.find_by_id(record.id.as_str());
            if let Some(existing) = &existing {
                record.created_at = existing.created_at;
                record.updated_at = Utc::now();
            }

            let id = record.id.clone();
            store.save(record)?;

            if existing.is_some() {
                println!("Updated record: {}", id);
            } else {
                println!("Created record: {}", id);
            }
        }

        RecordCommands::Delete { ids } => {
            let removed = if ids.len() == 1 {
                usize::from(store.delete(&ids[0])?)
            } else {
                store.batch_delete(&ids)?
            };

            println!("Deleted {} record(s).", removed);
        }

        RecordCommands::Count => {
            println!("{}", store.count());
        }

        RecordCommands::Clear { force } => {
            if !force {
                println!(
                    "This will delete all {} record(s). Run again with --force to proceed.",
                    store.count()
                );
                return Ok(());
            }

            store.clear()?;
            println!("All records deleted.");
        }
    }

    Ok(())
}

/// Truncate a string to max length
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
