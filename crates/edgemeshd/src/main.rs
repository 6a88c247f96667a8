//! edgemeshd — the edgemesh adaptation controller daemon.
//!
//! Single binary that assembles the edgemesh subsystems:
//! - State store (redb)
//! - Failure Monitor
//! - Placement Solver + Invocation-Path Solver
//! - Adaptation Controller
//! - optional read-only status API
//!
//! # Usage
//!
//! ```text
//! edgemeshd --application_file demo --edge_nodes demo
//! ```

mod completion;
mod controller;
mod descriptors;
mod error;
mod probe;
mod status_api;

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use controller::{Controller, DEFAULT_AGENT_TIMEOUT, DEFAULT_POLL_INTERVAL};

#[derive(Parser)]
#[command(name = "edgemeshd", about = "edgemesh adaptation controller")]
struct Cli {
    /// Name of the application model file (resolved to apps/NAME.json).
    #[arg(short = 'a', long = "application_file")]
    application_file: String,

    /// Name of the edge-node topology file (resolved to topologies/NAME.json).
    #[arg(short = 'e', long = "edge_nodes")]
    edge_nodes: String,

    /// Directory containing apps/ and topologies/, and where the state
    /// store's redb file lives.
    #[arg(long, env = "EDGEMESH_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Address to serve the read-only status API on. Disabled by default;
    /// this is purely an operability addition, not required by anything
    /// downstream.
    #[arg(long)]
    status_addr: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,edgemeshd=debug,edgemesh_solver=debug,edgemesh_monitor=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "adaptation controller exited with an error");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.data_dir)?;

    let app_path = descriptors::application_path(&cli.data_dir, &cli.application_file);
    let topology_path = descriptors::topology_path(&cli.data_dir, &cli.edge_nodes);
    info!(?app_path, ?topology_path, "loading descriptors");

    let application = descriptors::load_application(&app_path)?;
    let topology = descriptors::load_topology(&topology_path)?;

    let db_path = cli.data_dir.join("edgemesh.redb");
    let store = edgemesh_state::StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let mut controller = Controller::new(application, topology, store.clone(), DEFAULT_AGENT_TIMEOUT, DEFAULT_POLL_INTERVAL);

    let mut status_handle = None;
    if let Some(addr) = cli.status_addr {
        let api_state = status_api::ApiState {
            store: store.clone(),
            monitor: controller.monitor_handle(),
        };
        let router = status_api::build_router(api_state);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "status API listening");
        status_handle = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "status API server failed");
            }
        }));
    }

    let outcome = controller.run().await;

    if let Some(handle) = status_handle {
        handle.abort();
    }

    outcome.map_err(anyhow::Error::from)
}
