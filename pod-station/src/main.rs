mod config;
mod display;
mod error;
mod panel;
mod serial;
mod station;
mod time;

use crate::{
    config::Config, display::TerminalDisplay, error::StationError, panel::spawn_console,
    serial::spawn_reader, station::Station, time::SystemClock,
};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use relay_controller::{
    Command, Polarity, Relay, RelayController, mock::MockController,
    serial::SerialRelayController,
};
use std::{
    io::Cursor,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use telemetry::Session;
use tokio::sync::mpsc;

/// Pod ground station
#[derive(Parser, Debug)]
#[command(version, about = "Pod ground station", long_about = None)]
struct Args {
    /// Serial port to use instead of the configured one
    #[arg(short, long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show telemetry and drive relays from the console (default)
    Monitor,

    /// Send a single relay command and exit
    Relay {
        /// brake-release, lv, launchpad, inverter or contactor
        relay: Relay,
        /// engage or release
        polarity: Polarity,
    },

    /// Engage the emergency brakes and exit
    Brake,

    /// Play recorded telemetry from a file; commands are not sent anywhere
    Replay {
        /// File holding raw serial output
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(Env::new().default_filter_or("info"));

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), StationError> {
    let mut config = Config::load()?;
    if let Some(port) = args.port {
        config.serial.port = port;
    }

    match args.command.unwrap_or(Commands::Monitor) {
        Commands::Monitor => monitor(&config).await,
        Commands::Relay { relay, polarity } => send_once(&config, Command::relay(relay, polarity)),
        Commands::Brake => send_once(&config, Command::EmergencyBrake),
        Commands::Replay { path } => replay(&config, &path).await,
    }
}

async fn monitor(config: &Config) -> Result<(), StationError> {
    info!(
        "[MAIN] Opening {} at {} baud",
        config.serial.port, config.serial.baud_rate
    );

    let controller = SerialRelayController::new(
        &config.serial.port,
        config.serial.baud_rate,
        config.serial.timeout(),
    )?;
    let port = controller.reader()?;

    let stop = Arc::new(AtomicBool::new(false));
    stop_on_ctrl_c(stop.clone());

    let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
    let reader = spawn_reader(port, chunk_tx, stop.clone());

    let (operator_tx, operator_rx) = mpsc::unbounded_channel();
    spawn_console(operator_tx);

    let mut station = Station::new(
        Session::new(config.session()),
        controller,
        TerminalDisplay::new(),
        SystemClock,
        config.liveness.tick(),
    );

    let link = station.run(chunk_rx, operator_rx, stop.clone()).await;

    stop.store(true, Ordering::Relaxed);
    reader.await?;

    info!(
        "[MAIN] Link {}: {} frames received, {} dropped",
        link,
        station.session().history().len(),
        station.session().dropped_frames()
    );

    Ok(())
}

fn send_once(config: &Config, command: Command) -> Result<(), StationError> {
    let mut controller = SerialRelayController::new(
        &config.serial.port,
        config.serial.baud_rate,
        config.serial.timeout(),
    )?;

    controller.send(&command)?;
    info!("[MAIN] Sent {} to {}", command, config.serial.port);

    Ok(())
}

async fn replay(config: &Config, path: &Path) -> Result<(), StationError> {
    let recording = std::fs::read(path).map_err(StationError::Replay)?;
    info!("[MAIN] Replaying {} bytes from {}", recording.len(), path.display());

    let stop = Arc::new(AtomicBool::new(false));
    stop_on_ctrl_c(stop.clone());

    let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
    let reader = spawn_reader(Cursor::new(recording), chunk_tx, stop.clone());

    // No console during a replay.
    let (_, operator_rx) = mpsc::unbounded_channel();

    let controller = MockController::new();
    let mut station = Station::new(
        Session::new(config.session()),
        controller.clone(),
        TerminalDisplay::new(),
        SystemClock,
        config.liveness.tick(),
    );

    station.run(chunk_rx, operator_rx, stop).await;
    reader.await?;

    info!(
        "[MAIN] Replay done: {} frames, {} dropped, {} commands",
        station.session().history().len(),
        station.session().dropped_frames(),
        controller.sent().len()
    );

    Ok(())
}

fn stop_on_ctrl_c(stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("[MAIN] Ctrl-C received, shutting down");
            stop.store(true, Ordering::Relaxed);
        }
    });
}
