//! L2PP Manager Daemon Entry Point

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nsc_cfgmgr_common::Orch;
use nsc_l2ppmgrd::topology::{InMemoryHostRegistry, InMemoryOverlayRegistry, InMemoryPlacementDirectory};
use nsc_l2ppmgrd::{L2ppMgr, L2ppMgrConfig, Reconciler, RenderContext, TopologySnapshot};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Network-service controller L2PP renderer
#[derive(Parser, Debug)]
#[command(name = "l2ppmgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = nsc_l2ppmgrd::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Topology snapshot, overriding the configured one
    #[arg(short = 's', long)]
    snapshot: Option<PathBuf>,

    /// Run a single reconciliation pass and exit
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error), overriding the configured one
    #[arg(short = 'l', long)]
    log_level: Option<String>,
}

/// Registries the renderer reads, refreshed from the snapshot file
struct Registries {
    placements: Arc<InMemoryPlacementDirectory>,
    hosts: Arc<InMemoryHostRegistry>,
    overlays: Arc<InMemoryOverlayRegistry>,
    loaded: TopologySnapshot,
}

impl Registries {
    fn new() -> Self {
        Self {
            placements: Arc::new(InMemoryPlacementDirectory::new()),
            hosts: Arc::new(InMemoryHostRegistry::new()),
            overlays: Arc::new(InMemoryOverlayRegistry::new()),
            loaded: TopologySnapshot::default(),
        }
    }

    /// Re-read the snapshot, re-rendering everything if registry facts changed
    fn refresh(&mut self, path: &Path, reconciler: &mut Reconciler) -> Result<()> {
        let snapshot = TopologySnapshot::load(path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        if snapshot == self.loaded {
            return Ok(());
        }

        let facts_changed = snapshot.hosts != self.loaded.hosts
            || snapshot.placements != self.loaded.placements
            || snapshot.overlays != self.loaded.overlays;
        snapshot.apply(&self.placements, &self.hosts, &self.overlays);
        reconciler.sync_services(snapshot.services.clone());
        if facts_changed {
            reconciler.mark_all_pending();
        }
        self.loaded = snapshot;
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusDump<'a> {
    last_pass: &'a [nsc_l2ppmgrd::ServiceRenderSummary],
    services: Vec<nsc_l2ppmgrd::NetworkService>,
}

fn write_status(path: &Path, reconciler: &Reconciler) -> Result<()> {
    let dump = StatusDump {
        last_pass: reconciler.last_pass(),
        services: reconciler.services(),
    };
    let json = serde_json::to_string_pretty(&dump).context("Failed to serialize status")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

async fn run(args: Args, config: L2ppMgrConfig) -> Result<()> {
    let snapshot_path = args.snapshot.unwrap_or_else(|| config.snapshot_path.clone());
    info!("Snapshot: {}", snapshot_path.display());
    info!("Workers: {}", config.workers);

    let mut registries = Registries::new();
    let ctx = RenderContext::with_defaults(
        registries.placements.clone(),
        registries.hosts.clone(),
        registries.overlays.clone(),
    );
    let mut reconciler = Reconciler::new(Arc::new(L2ppMgr::new(ctx)), config.workers);

    registries.refresh(&snapshot_path, &mut reconciler)?;

    let mut interval = tokio::time::interval(config.reconcile_interval());
    loop {
        if reconciler.has_pending_tasks() {
            reconciler.do_task().await;
            if let Some(ref output) = config.output_path {
                write_status(output, &reconciler)?;
            }
        }
        if args.once {
            break;
        }

        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Received SIGINT, shutting down");
                break;
            }
        }

        if let Err(e) = registries.refresh(&snapshot_path, &mut reconciler) {
            // keep rendering from the last good snapshot
            error!("{:#}", e);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match L2ppMgrConfig::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("l2ppmgrd: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = args.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting l2ppmgrd");

    match run(args, config).await {
        Ok(()) => {
            info!("l2ppmgrd shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
