/**
 * cradlesync command line
 *
 * Diagnostics, backup and manual sync for a local durability database.
 */

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cradlesync::durability::DurabilityLayer;
use cradlesync::shared::{DurabilityConfig, SystemClock};
use cradlesync::sync::{HttpTransport, NetworkStatus, ReachabilityHandle, SyncEngine, TcpProbe};

#[derive(Parser)]
#[command(name = "cradlesync")]
#[command(about = "Inspect, back up and sync a local cradlesync database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, env = "CRADLESYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overriding the configuration
    #[arg(long)]
    db: Option<PathBuf>,

    /// Sync endpoint base URL, overriding the configuration
    #[arg(long)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit local storage and print the report as JSON
    Health,
    /// Print pending queue statistics
    Queue,
    /// Write a snapshot of local state to a file
    Export { path: PathBuf },
    /// Replace local state with a snapshot file
    Import { path: PathBuf },
    /// Retain a backup inside the database
    Backup,
    /// List retained backups, newest first
    Backups,
    /// Replace local state with a retained backup
    Restore { id: String },
    /// Drain the queue against the sync endpoint once
    Sync,
    /// Drop the local cache and every pending change
    ClearCache {
        /// Required; unsynced changes are lost
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let clock = Arc::new(SystemClock::new());
    let layer = DurabilityLayer::open(config, transport.clone(), clock.clone()).await?;

    let result = run(&layer, cli.command, transport, clock).await;
    layer.shutdown().await;
    result
}

fn load_config(cli: &Cli) -> Result<DurabilityConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => DurabilityConfig::load(path)?,
        None => DurabilityConfig::from_env()?,
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(
    layer: &DurabilityLayer,
    command: Commands,
    transport: Arc<HttpTransport>,
    clock: Arc<SystemClock>,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Health => {
            let report = layer.health_check().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_healthy {
                return Err(format!("{} issue(s) found", report.issues.len()).into());
            }
        }
        Commands::Queue => {
            let stats = layer.queue().stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Export { path } => {
            let snapshot = layer.snapshots().write_to_file(&path).await?;
            println!(
                "exported {} entity types and {} pending items to {}",
                snapshot.entities.len(),
                snapshot.pending_items.len(),
                path.display()
            );
        }
        Commands::Import { path } => {
            let snapshot = layer.snapshots().read_from_file(&path).await?;
            layer.import_snapshot(&snapshot).await?;
            println!(
                "imported snapshot {} from {}",
                snapshot.version,
                path.display()
            );
        }
        Commands::Backup => {
            let record = layer.create_backup().await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Backups => {
            let backups = layer.snapshots().list_backups().await?;
            println!("{}", serde_json::to_string_pretty(&backups)?);
        }
        Commands::Restore { id } => {
            layer.snapshots().restore_backup(&id).await?;
            println!("restored backup {}", id);
        }
        Commands::Sync => {
            let config = layer.config();
            let probe = TcpProbe::for_url(&config.server_url, Duration::from_secs(5), Duration::from_secs(5))?;
            if probe.probe_once().await != NetworkStatus::Online {
                tracing::warn!(address = %probe.address(), "sync endpoint unreachable");
                println!("offline: {} is unreachable", probe.address());
                return Ok(());
            }

            // One-shot pass: the probe above stands in for the debounced monitor
            let engine = SyncEngine::new(
                layer.queue().clone(),
                transport,
                ReachabilityHandle::always_online(),
                clock,
                config.item_timeout,
            );
            let outcome = engine.attempt_sync().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::ClearCache { yes } => {
            if !yes {
                println!("refusing to clear without --yes; unsynced changes would be lost");
                return Ok(());
            }
            let (entities, items) = layer.clear_cache().await?;
            println!("removed {} cached entity types and {} pending items", entities, items);
        }
    }

    Ok(())
}
