/// Windowless simulation runner
///
/// Runs the configured simulation for a bounded number of steps and prints
/// the final state as JSON.

use gridsim::config::{Config, ConfigSource, CONFIG_PATH};
use gridsim::{telemetry, Simulation};
use std::env;
use tracing::{error, info};

const DEFAULT_STEPS: u64 = 10_000;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: {} [steps] [config.toml]", args[0]);
        eprintln!("Runs the simulation without a window and prints a JSON summary");
        return;
    }

    let max_steps = match args.get(1).map(|s| s.parse::<u64>()) {
        None => DEFAULT_STEPS,
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            eprintln!("Invalid step count '{}': {}", args[1], e);
            std::process::exit(1);
        }
    };

    let (config, source) = match args.get(2) {
        Some(path) => match Config::load_from(path) {
            Ok(config) => (config, ConfigSource::File(path.clone())),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => Config::load_or_default(CONFIG_PATH),
    };
    // Logs go to stderr so stdout stays valid JSON
    telemetry::init_stderr(&config.logging.filter);
    source.log();

    let mut sim = match Simulation::new(config.generation_params(), config.simulation_settings()) {
        Ok(sim) => sim,
        Err(e) => {
            error!("cannot start simulation: {}", e);
            std::process::exit(1);
        }
    };

    while sim.steps() < max_steps && !sim.is_finished() {
        sim.step();
    }
    info!(steps = sim.steps(), finished = sim.is_finished(), "headless run complete");

    match serde_json::to_string_pretty(&sim.summary()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("failed to serialize summary: {}", e);
            std::process::exit(1);
        }
    }
}
