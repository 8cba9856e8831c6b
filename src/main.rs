mod daemon;

use anyhow::{Context, Result};
use daemon::Daemon;
use embedded_hal::delay::DelayNs;
use log::{error, info};
use snes_ctrl::config::Config;
use snes_ctrl::BitRegister;
use tokio::signal::unix::{signal, SignalKind};

const DEFAULT_CONFIG_PATH: &str = "/etc/snes-ctrl/config.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    // snes-ctrl-daemon [--dry-run] [config]
    let mut dry_run = false;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        if arg == "--dry-run" {
            dry_run = true;
        } else if config_path.is_none() {
            config_path = Some(arg);
        }
    }
    let config_path = config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    info!("SNES controller daemon starting...");
    info!("Loading configuration from: {}", config_path);

    let config = Config::load(&config_path)?;
    info!("Configuration loaded successfully");

    if dry_run {
        info!("Dry run: reading a simulated pad instead of GPIO");
        let (_bus, daemon) = daemon::open_dry_run(config)?;
        run(daemon, &config_path).await
    } else {
        let daemon = daemon::open_gpio(config)?;
        run(daemon, &config_path).await
    }
}

async fn run<R, D>(mut daemon: Daemon<R, D>, config_path: &str) -> Result<()>
where
    R: BitRegister,
    D: DelayNs,
{
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to setup SIGHUP handler")?;

    info!("Daemon started successfully");

    loop {
        tokio::select! {
            result = daemon.poll() => {
                if let Err(e) = result {
                    error!("Daemon poll error: {}", e);
                    return Err(e);
                }
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                match Config::load(config_path) {
                    Ok(new_config) => daemon.reload_config(new_config)?,
                    Err(e) => error!("Keeping previous configuration: {:#}", e),
                }
            }
        }
    }

    info!("SNES controller daemon shutdown complete");
    Ok(())
}

fn init_logger() {
    // Systemd/journald will capture stdout/stderr.
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
}
