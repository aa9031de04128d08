//! Doodad Simulation Runtime
//!
//! Loads templates, opens the doodad store, spawns the scenario's doodads
//! and replays its interactions, logging every packet an observer would
//! receive.
//!
//! Run with: cargo run --bin doodad-sim -- data/sim.toml

mod config;
mod error;
mod scenario;
mod sim;

use config::RuntimeConfig;
use doodad_funcs::TemplateSet;
use error::RuntimeError;
use scenario::Scenario;
use sim::Simulation;

fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("doodad-sim: {}", e);
            std::process::exit(2);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("PANIC CAUGHT: {}", panic_info);
    }));

    if let Err(e) = run(&config) {
        log::error!("Simulation failed: {}", e);
        std::process::exit(1);
    }
}

fn load_config() -> Result<RuntimeConfig, RuntimeError> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

fn run(config: &RuntimeConfig) -> Result<(), RuntimeError> {
    log::info!("Doodad store: {}", config.store);

    let templates = match &config.templates {
        Some(path) => TemplateSet::load(path)?,
        None => {
            log::warn!("No template file configured; every doodad will be inert");
            TemplateSet::default()
        }
    };
    let scenario = match &config.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };

    let mut sim = Simulation::build(config, templates)?;
    let report = sim.run(&scenario)?;

    log::info!(
        "Done: {} restored, {} spawned, {} steps, {} packets, {} doodads live",
        report.loaded,
        report.spawned,
        report.steps,
        report.packets,
        report.live
    );
    Ok(())
}
