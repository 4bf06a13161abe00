use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use casefile::backup::{BackupManager, BackupScheduler};
use casefile::cli::{handle_backup_command, handle_record_command, BackupCommands, RecordCommands};
use casefile::config::{paths::CasefilePaths, settings::Settings};
use casefile::storage::RecordStore;

#[derive(Parser)]
#[command(
    name = "casefile",
    version,
    about = "Case record store with timestamped backups",
    long_about = "casefile keeps case records in a single JSON document and \
                  maintains timestamped snapshots of it with retention, restore \
                  and optional scheduled backups."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record management commands
    #[command(subcommand)]
    Record(RecordCommands),

    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Write default settings and an empty data file
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if matches!(cli.command, Some(Commands::Backup(BackupCommands::Watch { .. }))) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let paths = CasefilePaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    let store: RecordStore = RecordStore::open(settings.data_file(&paths))?;

    match cli.command {
        Some(Commands::Record(cmd)) => {
            store.load_all()?;
            handle_record_command(&store, cmd)?;
        }
        Some(Commands::Backup(cmd)) => {
            let manager = BackupManager::from_settings(&settings, &paths)?
                .with_file_lock(store.file_lock());
            let scheduler = BackupScheduler::new(manager);
            handle_backup_command(&scheduler, &settings, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing casefile at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            if !store.path().exists() {
                store.clear()?;
            }
            println!("Data file: {}", store.path().display());
            println!("Initialization complete!");
        }
        Some(Commands::Config) => {
            println!("casefile Configuration");
            println!("======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!("Data file:        {}", store.path().display());
            println!("Backup directory: {}", settings.backup_dir(&paths).display());
            println!();
            println!("Backups:");
            println!("  Max backup count: {}", settings.backup.max_backup_count);
            println!("  Auto-backup:      {}", settings.backup.auto_backup_enabled);
            println!("  Interval (hours): {}", settings.backup.interval_hours);
            println!(
                "  Naming:           {}<timestamp>{}",
                settings.backup.prefix, settings.backup.extension
            );
        }
        None => {
            println!("casefile - case record store with timestamped backups");
            println!();
            println!("Run 'casefile --help' for usage information.");
        }
    }

    Ok(())
}
