//! coub-backup main entry point
//!
//! This is the command-line interface for the coub-backup archiver.

use clap::Parser;
use coub_backup::backup::{Backup, BlobFetcher, ProgressState};
use coub_backup::config::{load_config_with_hash, Config};
use coub_backup::remote::{build_http_client, HeaderTemplate, TimelineClient};
use coub_backup::storage::{open_storage, FsBlobStore, MetadataStore};
use coub_backup::{server, Feed};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// coub-backup: archives coub channel timelines and like-lists
///
/// Pages through each configured feed, downloads the best video and audio
/// rendition of every item not saved before, and records the raw item
/// payloads in SQLite. Reruns only fetch what is new.
#[derive(Parser, Debug)]
#[command(name = "coub-backup")]
#[command(version)]
#[command(about = "Archives coub timelines and like-lists", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    /// Validate config and show what would be backed up without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.json);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_backup(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, json: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("coub_backup=info,warn"),
            1 => EnvFilter::new("coub_backup=debug,info"),
            2 => EnvFilter::new("coub_backup=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Loads the session header template, if one is configured
fn load_session(config: &Config) -> Result<HeaderTemplate, coub_backup::BackupError> {
    match &config.remote.headers_file {
        Some(path) => HeaderTemplate::load(Path::new(path)),
        None => Ok(HeaderTemplate::empty()),
    }
}

/// Handles the --dry-run mode: validates config and shows what would be backed up
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== coub-backup Dry Run ===\n");

    println!("Remote:");
    println!("  Base URL: {}", config.remote.base_url);
    println!("  User agent: {}", config.remote.user_agent);
    println!("  Timeout: {}s", config.remote.timeout_secs);
    match &config.remote.headers_file {
        Some(path) => {
            let session = load_session(config)?;
            println!("  Session headers: {} ({} headers)", path, session.len());
        }
        None => println!("  Session headers: none (anonymous)"),
    }

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Blob directory: {}", config.storage.blob_directory);

    match &config.server {
        Some(server) => println!("\nProgress server: http://{}/state", server.bind),
        None => println!("\nProgress server: disabled"),
    }

    println!("\nChannel Timelines ({}):", config.backup.profiles.len());
    for profile in &config.backup.profiles {
        println!("  - {}", profile);
    }

    println!("\nLike-lists ({}):", config.backup.likes.len());
    for profile in &config.backup.likes {
        println!("  - {}", profile);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would back up {} feeds",
        config.backup.profiles.len() + config.backup.likes.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use coub_backup::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main backup operation
async fn handle_backup(
    config: Config,
    config_hash: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(Path::new(&config.storage.database_path))?;
    let interrupted = storage.interrupt_stale_runs()?;
    if interrupted > 0 {
        tracing::warn!(
            "Marked {} unfinished runs from a previous process as interrupted",
            interrupted
        );
    }

    let blobs = FsBlobStore::open(&config.storage.blob_directory).await?;
    let session = load_session(&config)?;
    if session.is_empty() {
        tracing::info!("No session headers configured, using anonymous access");
    }

    let client = build_http_client(&config.remote)?;
    let pages = TimelineClient::new(
        client.clone(),
        &config.remote.base_url,
        Arc::new(session),
    )?;
    let progress = Arc::new(ProgressState::new());

    let backup = Backup::new(
        Arc::new(pages),
        BlobFetcher::new(client, Arc::new(blobs)),
        storage,
        Arc::clone(&progress),
    )
    .with_config_hash(config_hash);

    let feeds: Vec<(Feed, String)> = config
        .backup
        .profiles
        .iter()
        .map(|p| (Feed::Channel, p.clone()))
        .chain(config.backup.likes.iter().map(|p| (Feed::Likes, p.clone())))
        .collect();

    let mut backup_task = tokio::spawn(run_feeds(backup, feeds));

    match &config.server {
        Some(server_config) => {
            let bind: SocketAddr = server_config.bind.parse()?;
            server::serve(bind, progress, shutdown_signal()).await?;
            if !backup_task.is_finished() {
                tracing::warn!("Shutting down with a backup in progress");
                backup_task.abort();
            }
            Ok(())
        }
        None => {
            tokio::select! {
                result = &mut backup_task => {
                    let failed = result?;
                    if failed > 0 {
                        return Err(format!("{} feeds failed", failed).into());
                    }
                    Ok(())
                }
                _ = shutdown_signal() => {
                    tracing::warn!("Interrupted, stopping backup");
                    backup_task.abort();
                    Ok(())
                }
            }
        }
    }
}

/// Runs every feed in order; a failed feed is logged and the next one starts
///
/// Returns the number of feeds that failed.
async fn run_feeds(mut backup: Backup, feeds: Vec<(Feed, String)>) -> usize {
    let mut failed = 0;

    for (feed, profile) in &feeds {
        match backup.run(*feed, profile).await {
            Ok(summary) => tracing::info!(
                %feed,
                profile = %profile,
                saved = summary.items_saved,
                skipped = summary.items_skipped,
                "Feed backed up"
            ),
            Err(e) => {
                failed += 1;
                tracing::error!(%feed, profile = %profile, error = %e, "Feed backup failed");
            }
        }
    }

    tracing::info!(
        "Backup finished: {} of {} feeds succeeded",
        feeds.len() - failed,
        feeds.len()
    );
    failed
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
