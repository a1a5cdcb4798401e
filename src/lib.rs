//! Built to Scale - an instruction-cycle platformer
//!
//! A robot on a tile grid repeats a short program of movement commands, one
//! per tick. Checkpoints unlock new commands and raise the program budget;
//! hazards and the void send it back to the last checkpoint.

// Core modules
pub mod constants;
pub mod events;
pub mod helpers;
pub mod simulation;
pub mod snapshot;
pub mod testing;
pub mod tuning;

// Game logic modules
pub mod executor;
pub mod levels;
pub mod script;
pub mod world;

// Re-export commonly used types for convenience
pub use constants::*;
pub use events::{BusEvent, DeathCause, EventBuffer, EventBus, GameEvent};
pub use executor::{CompiledCycle, CycleExecutor, Dispatch, DispatchTrace, Op};
pub use helpers::*;
pub use levels::{CheckpointDef, HazardDef, LevelData, LevelDatabase};
pub use script::{
    Action, Instruction, Program, ProgramRules, ProgramStore, ScriptCommand, ScriptEditor,
    ScriptError, ScriptErrorKind,
};
pub use snapshot::{SNAPSHOT_DIR, WorldSnapshot};
pub use tuning::{SIM_TUNING_FILE, SimTuning, load_sim_tuning};
pub use world::{Robot, RunStatus, World};
