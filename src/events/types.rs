//! Event type definitions for the logging system

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::helpers::Facing;
use crate::script::{Action, ScriptCommand};
use crate::tuning::SimTuning;

/// Why the robot died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Touched a hazard
    Hazard,
    /// Fell below the bottom of the map
    Void,
}

impl DeathCause {
    pub fn code(self) -> char {
        match self {
            DeathCause::Hazard => 'H',
            DeathCause::Void => 'V',
        }
    }

    pub fn from_code(c: &str) -> Option<Self> {
        match c {
            "H" => Some(DeathCause::Hazard),
            "V" => Some(DeathCause::Void),
            _ => None,
        }
    }
}

/// All events a run can produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    // === Session Events ===
    /// Session started (generated once per launch)
    SessionStart {
        session_id: String, // UUID v4
        timestamp: String,  // ISO 8601
    },
    /// Tuning snapshot (logged after session start)
    Config(SimTuning),

    // === Run Events ===
    /// Run started on a level
    RunStart {
        level: u32,
        level_name: String,
        program: String,
    },
    /// Run ended
    RunEnd {
        status: String,
        ticks: u64,
        deaths: u32,
    },

    // === Program Events ===
    /// A program passed validation and replaced the running one
    ProgramLoaded { program: String },
    /// A submitted program failed validation; the running one is kept
    ProgramRejected { error: String },

    // === Cycle Events ===
    /// Action performed; `pos`/`facing` are the result before gravity
    Step {
        action: Action,
        pos: IVec2,
        facing: Facing,
    },
    /// Action could not be performed; the tick is spent in place
    Blocked { action: Action, pos: IVec2 },
    /// Gravity moved the robot down
    Fell { from: IVec2, to: IVec2 },
    /// A conditional group was skipped (op index of its guard)
    GroupSkipped { pc: usize },
    /// No group in the cycle could run this tick
    Stalled,
    /// The cycle wrapped back to its first instruction
    CycleRestart { cycle: u64 },

    // === Progress Events ===
    /// Robot arrived on a checkpoint
    CheckpointReached {
        index: usize,
        pos: IVec2,
        first: bool,
    },
    /// A checkpoint unlocked a command
    CommandUnlocked {
        command: ScriptCommand,
        command_count: usize,
    },
    /// Robot died
    Death { pos: IVec2, cause: DeathCause },
    /// Robot placed back at the last checkpoint
    Respawn { pos: IVec2, facing: Facing },
    /// Goal reached, or every checkpoint activated on a goal-less level
    LevelComplete { ticks: u64, deaths: u32 },
}

impl GameEvent {
    /// Get the event type code for compact serialization
    pub fn type_code(&self) -> &'static str {
        match self {
            GameEvent::SessionStart { .. } => "SE",
            GameEvent::Config(_) => "CF",
            GameEvent::RunStart { .. } => "RS",
            GameEvent::RunEnd { .. } => "RE",
            GameEvent::ProgramLoaded { .. } => "PL",
            GameEvent::ProgramRejected { .. } => "PX",
            GameEvent::Step { .. } => "ST",
            GameEvent::Blocked { .. } => "BL",
            GameEvent::Fell { .. } => "FL",
            GameEvent::GroupSkipped { .. } => "GS",
            GameEvent::Stalled => "SL",
            GameEvent::CycleRestart { .. } => "CR",
            GameEvent::CheckpointReached { .. } => "CP",
            GameEvent::CommandUnlocked { .. } => "UN",
            GameEvent::Death { .. } => "DE",
            GameEvent::Respawn { .. } => "RP",
            GameEvent::LevelComplete { .. } => "LC",
        }
    }
}
