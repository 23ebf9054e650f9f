//! plsnap-etl - Playlist snapshot ETL
//!
//! Commands:
//! - `run`: fetch a snapshot, publish it raw, process everything pending
//! - `process`: process what is already pending
//! - `list`: show pending raw files
//! - `init-config`: write a config file with defaults

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use plsnap_common::config::{self, TomlConfig};
use plsnap_etl::models::{EntityKind, PipelineRun};
use plsnap_etl::services::{
    LocalObjectStore, ObjectStore, PipelineOrchestrator, SnapshotSource, SpotifyClient,
    TimedObjectStore,
};

/// Command-line arguments for plsnap-etl
#[derive(Parser, Debug)]
#[command(name = "plsnap-etl")]
#[command(about = "Playlist snapshot ETL")]
#[command(version)]
struct Args {
    /// Config file (default: $PLSNAP_CONFIG, then the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Local bucket root, overriding storage.root
    #[arg(short, long, global = true, env = "PLSNAP_BUCKET")]
    bucket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a fresh snapshot and run the whole pipeline
    Run {
        /// Playlist URL or id (default: spotify.playlist_url)
        #[arg(short, long)]
        playlist: Option<String>,
    },
    /// Process pending raw files without fetching
    Process,
    /// List pending raw files
    List,
    /// Write a config file populated with defaults
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { path } = &args.command {
        config::write_toml_config(&TomlConfig::default(), path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let mut config = config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(bucket) = args.bucket {
        config.storage.root = bucket;
    }

    plsnap_common::logging::init_logging(&config.logging)
        .context("Failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bucket = %config.storage.root.display(),
        "Starting plsnap-etl"
    );

    let store: Arc<dyn ObjectStore> = Arc::new(TimedObjectStore::new(
        LocalObjectStore::new(config.storage.root.clone()),
        plsnap_common::time::millis_to_duration(config.storage.timeout_ms),
    ));
    let orchestrator = PipelineOrchestrator::new(store, &config.storage);

    match args.command {
        Command::List => {
            let pending = orchestrator
                .raw_files()
                .list_pending()
                .await
                .context("Failed to list pending raw files")?;
            for id in &pending {
                println!("{}", id);
            }
            info!(pending = pending.len(), "Listed pending raw files");
        }
        Command::Process => {
            let cancel_token = cancel_on_signal();
            let run = orchestrator
                .run_pending(&cancel_token)
                .await
                .context("Pipeline run failed")?;
            print_report(&run);
        }
        Command::Run { playlist } => {
            let playlist = playlist
                .or_else(|| config.spotify.playlist_url.clone())
                .context("No playlist given (--playlist or spotify.playlist_url)")?;

            // missing credentials only fail the fetch phase
            let orchestrator = match spotify_source(&config) {
                Ok(source) => orchestrator.with_source(source),
                Err(e) => {
                    tracing::warn!(error = %e, "Spotify client unavailable");
                    orchestrator
                }
            };

            let cancel_token = cancel_on_signal();
            let run = orchestrator
                .run_full(&playlist, &cancel_token)
                .await
                .context("Pipeline run failed")?;
            print_report(&run);
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

fn spotify_source(config: &TomlConfig) -> Result<Arc<dyn SnapshotSource>> {
    let credentials = config.spotify.resolve_credentials()?;
    let client = SpotifyClient::new(credentials)?;
    Ok(Arc::new(client))
}

/// Cancel the run on Ctrl+C
fn cancel_on_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling run");
            child.cancel();
        }
    });
    token
}

fn print_report(run: &PipelineRun) {
    println!("run {} {:?}", run.run_id, run.state);
    if let Some(raw) = &run.report.raw_published {
        println!("  raw published: {}", raw);
    }
    println!(
        "  files read: {}  skipped: {}  advanced: {}",
        run.report.files_read.len(),
        run.report.files_skipped.len(),
        run.report.files_advanced.len()
    );
    for entity in EntityKind::ALL {
        if let Some(table) = run.report.table(entity) {
            println!(
                "  {:<6} {:>6} rows ({} candidates, {} malformed) -> {}",
                entity.name(),
                table.rows,
                table.candidates,
                table.malformed_skipped,
                table.key
            );
        }
    }
}
