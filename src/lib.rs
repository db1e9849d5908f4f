pub mod address;
pub mod cache;
pub mod config;
pub mod error;
pub mod policy;
pub mod replay;
pub mod simulation;
pub mod trace;

pub use config::{Config, ConfigError, Policy};
pub use error::Error;
pub use replay::{Accesses, TraceReplayer, simulate_file};
pub use simulation::{CacheHit, Simulation, Statistics};

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use wasm_bindgen::prelude::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen]
pub fn run_simulation(
    sets: usize,
    ways: usize,
    block_size: usize,
    policy: &str,
    trace: &str,
) -> String {
    let config = match policy
        .parse::<Policy>()
        .and_then(|policy| Config::new(sets, ways, block_size, Some(policy)))
    {
        Ok(config) => config,
        Err(e) => return e.to_string(),
    };

    let mut simulation = Simulation::new(config);
    TraceReplayer::new(&mut simulation).replay_str(trace);

    simulation.statistics().to_string()
}
