//! Headless simulation - runs cycle programs without the interactive loop
//!
//! Single runs, level sweeps and random program search, with metrics,
//! optional evlog output and a SQLite results database.

pub mod app_builder;
pub mod config;
pub mod db;
pub mod metrics;
pub mod parallel;
pub mod plugin;
pub mod runner;
pub mod search;

pub use app_builder::HeadlessAppBuilder;
pub use config::{SIM_SETTINGS_FILE, SIM_SETTINGS_TEMPLATE, SimConfig, SimMode};
pub use db::{LevelStats, SimDatabase};
pub use metrics::{BatchSummary, RunResult, SimMetrics};
pub use parallel::{init_parallel, run_sweep_parallel};
pub use plugin::{CycleSimPlugin, SimControl, SimEventLog, SimWorld, step_paused};
pub use runner::{build_world, resolve_level, run_level, run_simulation, run_world_direct};
pub use search::{SearchConfig, SearchOutcome, search_programs};
