//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use std::io::BufRead;
use std::time::Duration;

use clap::Subcommand;

use crate::backup::BackupScheduler;
use crate::config::settings::Settings;
use crate::error::{CaseError, CaseResult};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create,

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show information about a specific backup
    Info {
        /// Backup filename
        backup: String,
    },

    /// Delete a backup
    Delete {
        /// Backup filename
        backup: String,
    },

    /// Run scheduled backups in the foreground until Enter is pressed
    Watch {
        /// Hours between backups (defaults to the configured interval)
        #[arg(long)]
        interval_hours: Option<u64>,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    scheduler: &BackupScheduler,
    settings: &Settings,
    cmd: BackupCommands,
) -> CaseResult<()> {
    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            let backup_path = scheduler.backup()?;
            let filename = backup_path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| backup_path.display().to_string());
            println!("Backup created: {}", filename);
            println!("Location: {}", backup_path.display());
        }

        BackupCommands::List { verbose } => {
            let backups = scheduler.list_backup_info()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: casefile backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                let age = chrono::Utc::now().signed_duration_since(backup.created_at);
                let age_str = format_duration(age);

                if verbose {
                    println!(
                        "{}. {}\n   Created: {}\n   Size: {}\n   Age: {}\n",
                        i + 1,
                        backup.filename,
                        backup.created_at.format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                        format_size(backup.size_bytes),
                        age_str,
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {})",
                        i + 1,
                        backup.filename,
                        age_str,
                        format_size(backup.size_bytes),
                    );
                }
            }

            println!();
            println!(
                "Total: {} backup(s), keeping at most {}",
                backups.len(),
                scheduler.max_backup_count()
            );
        }

        BackupCommands::Restore { backup, force } => {
            let name = resolve_backup_name(scheduler, &backup)?;
            let validation = scheduler.validate_snapshot(&name)?;

            println!("Backup Information");
            println!("==================");
            println!("File: {}", scheduler.backup_dir().join(&name).display());
            println!("Status: {}", validation.summary());
            println!();

            if !force {
                println!("WARNING: This will overwrite ALL current records!");
                println!("To proceed, run again with --force flag:");
                println!("  casefile backup restore {} --force", backup);
                return Ok(());
            }

            println!("Restoring from backup...");
            scheduler.restore(&name)?;

            println!("Restore complete!");
            if let Some(safety) = scheduler.manager().list_safety_snapshots()?.first() {
                println!("Previous data saved as: {}", safety);
            }
        }

        BackupCommands::Info { backup } => {
            let name = resolve_backup_name(scheduler, &backup)?;
            let size = scheduler.get_backup_size(&name)?;
            let info = scheduler.manager().get_backup(&name)?;
            let validation = scheduler.validate_snapshot(&name)?;

            println!("Backup Details");
            println!("==============");
            println!("File: {}", scheduler.backup_dir().join(&name).display());
            println!("Size: {}", format_size(size));
            if let Some(info) = info {
                println!(
                    "Created: {}",
                    info.created_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
                );
            }
            println!("Records: {}", validation.record_count);
        }

        BackupCommands::Delete { backup } => {
            if scheduler.delete_backup(&backup)? {
                println!("Deleted backup: {}", backup);
            } else {
                return Err(CaseError::backup_not_found(backup));
            }
        }

        BackupCommands::Watch { interval_hours } => {
            let interval = match interval_hours {
                Some(hours) => Duration::from_secs(hours.saturating_mul(3600)),
                None if settings.backup.auto_backup_enabled => settings.backup.interval(),
                None => {
                    return Err(CaseError::Validation(
                        "Auto-backup is disabled in settings; set backup.auto_backup_enabled \
                         or pass --interval-hours"
                            .into(),
                    ))
                }
            };

            let every = describe_interval(interval);
            scheduler.start_auto_backup(interval)?;
            println!("Auto-backup running every {}. Press Enter to stop.", every);

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;

            scheduler.stop_auto_backup();
            println!("Auto-backup stopped.");
        }
    }

    Ok(())
}

/// Resolve a backup identifier to a filename in the backup directory
fn resolve_backup_name(scheduler: &BackupScheduler, backup: &str) -> CaseResult<String> {
    if backup.eq_ignore_ascii_case("latest") {
        return scheduler
            .list_backups()?
            .into_iter()
            .next()
            .ok_or_else(|| CaseError::backup_not_found("latest"));
    }

    let dir = scheduler.backup_dir();
    if dir.join(backup).is_file() {
        return Ok(backup.to_string());
    }

    // Allow omitting the extension
    let extension = scheduler.manager().naming().extension();
    let with_ext = format!("{}{}", backup, extension);
    if !extension.is_empty() && dir.join(&with_ext).is_file() {
        return Ok(with_ext);
    }

    Err(CaseError::backup_not_found(backup))
}

/// Format a timer interval, falling back to whole hours past chrono's range
fn describe_interval(interval: Duration) -> String {
    match chrono::Duration::from_std(interval) {
        Ok(duration) => format_duration(duration),
        Err(_) => format!("{}h", interval.as_secs() / 3600),
    }
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    let months = days / 30;
    format!("{}mo", months)
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
