//! Scenario test runner CLI
//!
//! Usage:
//!   cargo run --bin test-scenarios                       # Run all tests
//!   cargo run --bin test-scenarios -- checkpoints/       # Run category
//!   cargo run --bin test-scenarios -- hazards/swap_kill  # Run single test
//!   cargo run --bin test-scenarios -- --verbose          # Show expected/actual on failure

use std::path::Path;

use built_to_scale::testing::{SCENARIOS_DIR, run_scenarios};

fn main() {
    let mut detail = false;
    let mut filter = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--verbose" | "-v" => detail = true,
            a if !a.starts_with('-') => filter = Some(a.to_string()),
            _ => {}
        }
    }

    let base = Path::new(SCENARIOS_DIR);
    if !base.is_dir() {
        eprintln!("no scenarios at {}", SCENARIOS_DIR);
        std::process::exit(1);
    }

    let summary = run_scenarios(base, filter.as_deref(), detail);
    if summary == Default::default() {
        eprintln!("no scenarios matched {}", filter.as_deref().unwrap_or("*"));
        std::process::exit(1);
    }
    println!("\n{}", summary);
    if !summary.all_passed() {
        std::process::exit(1);
    }
}
