use evo_ladder::{
    catalog::Catalog,
    commands::Commands,
    config::{Config, VERSION},
    database,
    services::{
        data::DataLayer,
        events::EventBus,
        leaderboard::Leaderboard,
        lifecycle::Lifecycle,
        matchmaking::Matchmaking,
        replays::{MpqHeaderParser, Replays},
        storage::ObjectStore,
    },
    utils::logging,
};
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Semaphore;

/// How often the lifecycle coordinator looks for timed-out matches
const TIMEOUT_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Bound on write-queue draining during shutdown
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration; the logger is not up yet so failures go to
    // stderr directly
    let config = match Config::from_env() {
        Ok(value) => value,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = std::fs::create_dir_all(&config.data_dir) {
        eprintln!("Failed to create data directory: {err}");
        return ExitCode::FAILURE;
    }

    // Initialize logging
    logging::setup(config.logging, &config.data_dir);

    info!("Starting evo-ladder (v{VERSION})");

    // Reference tables are loaded eagerly; a missing catalog is fatal
    let catalog = match Catalog::load(&config.data_dir.join("catalog")) {
        Ok(value) => Arc::new(value),
        Err(err) => {
            error!("Failed to load reference catalogs: {err}");
            return ExitCode::FAILURE;
        }
    };

    let db = match database::connect(&config).await {
        Ok(value) => value,
        Err(err) => {
            error!("Failed to connect to database: {err}");
            return ExitCode::FAILURE;
        }
    };

    // The data layer blocks until every frame is in memory
    let data = match DataLayer::new(db, config.data_dir.clone()).await {
        Ok(value) => value,
        Err(err) => {
            error!("Failed to load data layer frames: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Shared pool for CPU-bound offload (replay parsing, leaderboard
    // rank recomputation)
    let workers = Arc::new(Semaphore::new(config.worker_processes.max(1)));

    let bus = Arc::new(EventBus::default());
    let leaderboard = Arc::new(Leaderboard::new(data.clone(), workers.clone()));
    let matchmaking = Arc::new(Matchmaking::new(data.clone(), catalog.clone(), bus.clone()));
    let lifecycle = Arc::new(Lifecycle::new(
        data.clone(),
        bus.clone(),
        config.match_timeout,
    ));

    let store = ObjectStore::new(config.supabase.as_ref(), &config.data_dir);
    // Handed to the view-layer collaborator along with the command
    // surface below
    let _replays = Arc::new(Replays::new(
        data.clone(),
        bus.clone(),
        lifecycle.clone(),
        store,
        Arc::new(MpqHeaderParser),
        workers.clone(),
    ));
    let _commands = Arc::new(Commands::new(
        data.clone(),
        catalog.clone(),
        matchmaking.clone(),
        leaderboard.clone(),
        &config,
    ));

    // Background loops: wave scheduler, leaderboard refresh, timeout sweep
    tokio::spawn(matchmaking.clone().run(config.wave_period));
    tokio::spawn(leaderboard.clone().run(config.leaderboard_refresh));
    tokio::spawn(lifecycle.clone().run(TIMEOUT_SWEEP_PERIOD));

    info!("Ladder core running");

    _ = signal::ctrl_c().await;

    info!("Shutting down, draining write queue..");
    data.shutdown(SHUTDOWN_DRAIN_TIMEOUT).await;

    ExitCode::SUCCESS
}
