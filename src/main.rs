//! coold - cooling daemon serving the local IPC API.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coolipc::config::Config;
use coolipc::daemon;
use coolipc::device::{CoolingDevice, SimulatedDevice};
use coolipc::server::listener::Server;

#[derive(Parser)]
#[command(name = "coold", version, about = "Cooling device daemon", long_about = None)]
struct Cli {
    /// Unix socket to listen on.
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// YAML configuration file (defaults to $COOLIPC_CONFIG).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name reported by the simulated device.
    #[arg(long, default_value = "Simulated Cooler")]
    device_name: String,

    /// Number of fans on the simulated device.
    #[arg(long, default_value_t = 2)]
    fans: u32,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

async fn shutdown_signal() -> Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("installing SIGINT handler")?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(socket) = cli.socket {
        config.set_socket_path(socket);
    }
    init_tracing(cli.verbose, &config.log.level);

    let device = SimulatedDevice::new(cli.device_name, cli.fans);
    info!(device = device.name(), fans = cli.fans, "using simulated device");

    let mut server = Server::from_config(&config.server);
    daemon::register_routes(&mut server, Arc::new(Mutex::new(device)));

    let handle = server
        .serve()
        .with_context(|| format!("starting server on {}", config.server.socket_path.display()))?;
    let shutdown = handle.shutdown_handle();
    let mut worker = tokio::task::spawn_blocking(move || handle.wait_until_done());

    tokio::select! {
        finished = &mut worker => {
            finished.context("server worker task failed")??;
            bail!("server stopped unexpectedly");
        }
        received = shutdown_signal() => {
            match received {
                Ok(name) => info!(signal = name, "shutting down"),
                Err(e) => warn!(error = %e, "signal handling failed, shutting down"),
            }
            shutdown.terminate().context("sending stop command")?;
        }
    }

    worker.await.context("server worker task failed")??;
    info!("bye");
    Ok(())
}
