// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Blurwatch: keeps an editor background image blurred

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use blurwatch::config::AppConfig;
use blurwatch::history::History;
use blurwatch::watcher::{check_target, wait_for_stable, Debouncer, FileWatcher, WatchEvent};
use blurwatch::{BlurwatchError, Outcome, Processor, Result};

/// Blurwatch CLI - blurred backgrounds for editor settings files
#[derive(Parser, Debug)]
#[command(name = "blurwatch")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Watches a settings file and keeps its background image blurred", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to blurwatch's own configuration file (JSON format)
    #[arg(short, long, default_value = "blurwatch.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch a settings file and blur its background image on change
    Watch {
        /// Settings file to watch
        path: PathBuf,

        /// Seconds after a run during which further changes are ignored (overrides config)
        #[arg(long)]
        cooldown: Option<u64>,

        /// Exit on the first failed run instead of logging and continuing
        #[arg(long)]
        fail_fast: bool,

        /// Dry run mode (don't write images or touch the settings file)
        #[arg(long)]
        dry_run: bool,
    },

    /// Process a settings file once and exit
    Process {
        /// Settings file to process
        path: PathBuf,

        /// Dry run mode (show what would change)
        #[arg(long)]
        dry_run: bool,
    },

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent history entries
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Undo the latest rewrite of a settings file
    Undo {
        /// Settings file to restore
        path: PathBuf,

        /// Keep the blurred image on disk
        #[arg(long)]
        keep_image: bool,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "blurwatch.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Watch { path, cooldown, fail_fast, dry_run } => {
            run_watch(config, path, cooldown, fail_fast, dry_run).await
        }
        Commands::Process { path, dry_run } => run_process(config, path, dry_run),
        Commands::History { action } => run_history_command(config, action),
        Commands::Config { action } => run_config_command(config, action),
    }
}

/// Resolve the settings path once so history entries match across runs
fn settings_path(path: &Path) -> Result<PathBuf> {
    check_target(path)?;
    Ok(std::fs::canonicalize(path)?)
}

/// Run the watch loop
async fn run_watch(
    mut config: AppConfig,
    path: PathBuf,
    cooldown: Option<u64>,
    fail_fast: bool,
    dry_run: bool,
) -> Result<()> {
    let path = settings_path(&path)?;
    info!("path: {:?}", path);

    if let Some(secs) = cooldown {
        config.watch.cooldown_secs = secs;
    }
    if dry_run {
        warn!("DRY RUN MODE - nothing will be written");
    }

    let watch_config = config.watch.clone();
    let processor = Arc::new(Processor::new(config));
    let mut watcher = FileWatcher::new(&path)?;
    let mut debouncer = Debouncer::new(watch_config.cooldown());

    // Setup graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = terminate => info!("Received SIGTERM, shutting down..."),
        }

        let _ = shutdown_tx.send(true);
    });

    info!("Running... (cooldown {}s). Press Ctrl+C to stop.", debouncer.cooldown().as_secs());

    // Main event loop
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let triggered = match watcher.next_event(watch_config.poll()) {
            Some(WatchEvent::Changed(changed)) => {
                debug!("Change event: {:?}", changed);
                true
            }
            Some(WatchEvent::Removed(removed)) => {
                debug!("Remove event: {:?}", removed);
                watcher.disarm();
                false
            }
            Some(WatchEvent::Error(e)) => {
                warn!("error: {}", e);
                false
            }
            None => false,
        };

        // A replaced file counts as a change once it is back
        let rearmed = match watcher.rearm() {
            Ok(rearmed) => rearmed,
            Err(e) => {
                warn!("Failed to re-watch {:?}: {}", path, e);
                false
            }
        };

        if !(triggered || rearmed) {
            continue;
        }

        if !debouncer.should_fire(Instant::now()) {
            info!("skipping");
            continue;
        }

        if !wait_for_stable(&path, watch_config.settle_interval(), watch_config.settle_max()).await {
            debug!("Settings file disappeared during stability check: {:?}", path);
            continue;
        }

        let task_processor = Arc::clone(&processor);
        let task_path = path.clone();
        let result = tokio::task::spawn_blocking(move || task_processor.run(&task_path, dry_run))
            .await
            .map_err(|e| BlurwatchError::Task(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(outcome) => log_outcome(&outcome),
            Err(e) if fail_fast => return Err(e),
            Err(e) => error!("Failed to process {:?}: {}", path, e),
        }
    }

    info!("Blurwatch stopped.");
    Ok(())
}

/// Run the process step once
fn run_process(config: AppConfig, path: PathBuf, dry_run: bool) -> Result<()> {
    let path = settings_path(&path)?;
    let processor = Processor::new(config);
    let outcome = processor.run(&path, dry_run)?;
    log_outcome(&outcome);
    Ok(())
}

fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Skipped(reason) => debug!("Skipped: {}", reason),
        Outcome::Blurred(report) => {
            let prefix = if report.dry_run { "DRY RUN: " } else { "" };
            info!(
                "{}Blurred {} (radius {}) -> {:?}",
                prefix, report.source_image, report.radius, report.output_path
            );
        }
    }
}

/// The undo log, or an error naming the switch when it is turned off
fn history_for(config: &AppConfig) -> Result<History> {
    if !config.history.enabled {
        return Err(BlurwatchError::History(
            "history is disabled; set \"history.enabled\": true in the blurwatch config".to_string(),
        ));
    }
    Ok(History::new(config.history.path.clone()))
}

/// Run history commands
fn run_history_command(config: AppConfig, action: HistoryCommands) -> Result<()> {
    let history = history_for(&config)?;

    match action {
        HistoryCommands::List { count } => {
            let entries = history.get_recent(count)?;
            if entries.is_empty() {
                println!("No history entries found.");
                return Ok(());
            }

            println!("Blur History ({} entries):", entries.len());
            println!("{:-<80}", "");
            for (i, entry) in entries.iter().enumerate() {
                let status = if entry.undone { " [undone]" } else { "" };
                println!(
                    "{:3}. [{}] r{} {} -> {}{}",
                    i + 1,
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.radius,
                    entry.source_image,
                    entry.blurred_image.display(),
                    status
                );
                println!("     {}", entry.settings_path.display());
            }
        }
        HistoryCommands::Undo { path, keep_image, dry_run } => {
            let path = settings_path(&path)?;
            match history.undo(&path, keep_image, dry_run)? {
                Some(entry) => {
                    let prefix = if dry_run { "Would restore" } else { "Restored" };
                    println!("{} {} in {}", prefix, entry.source_image, path.display());
                }
                None => println!("Nothing to undo for {}", path.display()),
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                println!("This will delete all history. Use --force to confirm.");
                return Ok(());
            }
            history.clear()?;
            println!("History cleared.");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("\nBlurred images go to: {}", config.output.resolve_dir().display());
        }
        ConfigCommands::Generate { output, force } => {
            if output.exists() && !force {
                return Err(BlurwatchError::Config(format!(
                    "{} already exists. Use --force to overwrite",
                    output.display()
                )));
            }
            AppConfig::default().save(&output)?;
            println!("Configuration written to {}", output.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["blurwatch"]).is_err());
    }

    #[test]
    fn test_cli_watch_command() {
        let cli = Cli::try_parse_from([
            "blurwatch", "watch", "/tmp/settings.json", "--cooldown", "3", "--fail-fast"
        ]).unwrap();

        match cli.command {
            Commands::Watch { path, cooldown, fail_fast, dry_run } => {
                assert_eq!(path, PathBuf::from("/tmp/settings.json"));
                assert_eq!(cooldown, Some(3));
                assert!(fail_fast);
                assert!(!dry_run);
            }
            _ => panic!("Expected Watch command"),
        }
        assert_eq!(cli.config, PathBuf::from("blurwatch.json"));
    }

    #[test]
    fn test_cli_process_command() {
        let cli = Cli::try_parse_from([
            "blurwatch", "-v", "process", "settings.json", "--dry-run"
        ]).unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Process { path, dry_run } => {
                assert!(dry_run);
                assert_eq!(path, PathBuf::from("settings.json"));
            }
            _ => panic!("Expected Process command"),
        }
    }

    #[test]
    fn test_cli_history_undo() {
        let cli = Cli::try_parse_from([
            "blurwatch", "history", "undo", "settings.json", "--keep-image"
        ]).unwrap();

        match cli.command {
            Commands::History { action: HistoryCommands::Undo { keep_image, dry_run, .. } } => {
                assert!(keep_image);
                assert!(!dry_run);
            }
            _ => panic!("Expected History Undo command"),
        }
    }

    #[test]
    fn test_history_commands_need_history_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        std::fs::write(&file, "{}").unwrap();

        let undo = HistoryCommands::Undo { path: file.clone(), keep_image: false, dry_run: true };
        let err = run_history_command(AppConfig::default(), undo).unwrap_err();
        assert!(matches!(err, BlurwatchError::History(_)));
        assert!(err.to_string().contains("history.enabled"));

        let mut config = AppConfig::default();
        config.history.enabled = true;
        config.history.path = dir.path().join("history.jsonl");
        let undo = HistoryCommands::Undo { path: file, keep_image: false, dry_run: true };
        assert!(run_history_command(config, undo).is_ok());
    }

    #[test]
    fn test_settings_path_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(settings_path(dir.path()).is_err());

        let file = dir.path().join("settings.json");
        std::fs::write(&file, "{}").unwrap();
        assert!(settings_path(&file).unwrap().is_absolute());
    }
}
