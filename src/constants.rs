//! Tunable constants for built_to_scale
//!
//! Default values and file locations shared by the binaries.

use bevy::prelude::*;

// =============================================================================
// FILE LOCATIONS
// =============================================================================

/// Level definitions (plain text, see `levels::database`)
pub const LEVELS_FILE: &str = "config/levels.txt";

/// Directory for `.evlog` event logs
pub const LOG_DIR: &str = "logs";

/// Default SQLite database for run results and events
pub const RUNS_DB_FILE: &str = "db/runs.db";

// =============================================================================
// GRID DIRECTIONS (y points up, row 0 is the bottom map row)
// =============================================================================

pub const UP: IVec2 = IVec2::new(0, 1);
pub const DOWN: IVec2 = IVec2::new(0, -1);
pub const LEFT: IVec2 = IVec2::new(-1, 0);
pub const RIGHT: IVec2 = IVec2::new(1, 0);

// =============================================================================
// SIMULATION DEFAULTS
// =============================================================================

pub const TICK_SECONDS: f32 = 0.2; // Wall-clock length of one tick in paced mode
pub const MAX_TICKS: u64 = 500; // Runs stop with TimedOut after this many ticks
pub const MAX_FALL: i32 = 64; // Safety cap on tiles fallen in a single tick

// Levels start with only `Walk` and room for one command
pub const STARTING_COMMAND_COUNT: usize = 1;

// =============================================================================
// EVENT LOGGING
// =============================================================================

pub const TIMESTAMP_WRAP: u64 = 100_000; // Tick stamps use 5 digits in text logs
