//! CharaSim - Facility actor simulation daemon
//!
//! Loads the facility catalog from configuration, builds the world grid
//! for the first configured map, seeds actor statuses, and streams live
//! status events over TCP. Movement commands arrive through the library
//! API ([`chara_sim::MovementSimulator`]); this binary keeps the world
//! and the feed alive.

use chara_sim::{
    ActorStatusStore, CharaConfig, MovementSimulator, Result, StatusPublisher, WorldCache,
};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Parse config path from command line arguments.
///
/// Supports:
/// - `chara-sim <path>` (positional)
/// - `chara-sim --config <path>` (flag-based)
/// - `chara-sim -c <path>` (short flag)
///
/// Defaults to `chara.toml` in the working directory.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "chara.toml".to_string()
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chara_sim=info".parse().unwrap()),
        )
        .init();

    let config_path = parse_config_path();
    let config = if Path::new(&config_path).exists() {
        info!("loading configuration from {}", config_path);
        CharaConfig::load(Path::new(&config_path))?
    } else {
        info!("using default configuration");
        CharaConfig::default()
    };

    info!("CharaSim v{}", env!("CARGO_PKG_VERSION"));

    let catalog = Arc::new(config.build_catalog());
    let world = Arc::new(WorldCache::new(catalog.clone(), config.grid.clone()));
    let statuses = Arc::new(ActorStatusStore::new());
    let _simulator = MovementSimulator::new(
        Arc::clone(&world),
        Arc::clone(&statuses),
        Duration::from_millis(config.sim.move_tick_ms),
    );

    statuses.seed_from_catalog(catalog.as_ref());
    info!("seeded {} actor statuses", statuses.current().len());

    // Build the first configured map so planning works immediately.
    match config.maps.first() {
        Some(map) => {
            let grid = world.build(map.id)?;
            info!(
                "active world: map={} ({}x{} cells)",
                map.id,
                grid.width_cells(),
                grid.height_cells()
            );
        }
        None => warn!("no maps configured; world builds on first request"),
    }

    let _publisher = StatusPublisher::start(
        &config.streaming.status_bind_address,
        statuses.subscribe(),
    )?;

    // The daemon runs until killed; feeds and movement threads carry the work.
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
