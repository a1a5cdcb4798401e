//! Cycle Simulation Tool - headless runs of instruction cycles
//!
//! Run programs on levels without the interactive loop to check solutions,
//! sweep levels and search for programs.
//!
//! Usage:
//!   cargo run --bin simulate -- --help
//!   cargo run --bin simulate -- --level 2 --program "J W"
//!   cargo run --bin simulate -- --sweep --program "(W) C" --db db/runs.db
//!   cargo run --bin simulate -- --level Ledges --search 2000 --seed 7

use built_to_scale::simulation::{SimConfig, run_simulation};

fn main() {
    let config = SimConfig::from_args();
    if let Err(e) = run_simulation(config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
