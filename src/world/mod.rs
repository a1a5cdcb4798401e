//! World state for one robot on one level
//!
//! The world owns everything a tick touches: the level, the robot, the
//! hazards, the checkpoint progress and the running program. `tick()` lives
//! in `step.rs`.

mod actions;
mod hazards;
mod step;

pub use actions::{Fall, apply_gravity, can_perform, resolve_action};
pub use hazards::{Hazard, touches};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::GameEvent;
use crate::executor::CycleExecutor;
use crate::helpers::Facing;
use crate::levels::LevelData;
use crate::script::{Program, ProgramRules, ProgramStore, ScriptError};
use crate::tuning::SimTuning;

/// Outcome of a run so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Complete,
    TimedOut,
}

impl RunStatus {
    pub fn name(self) -> &'static str {
        match self {
            RunStatus::Running => "Running",
            RunStatus::Complete => "Complete",
            RunStatus::TimedOut => "TimedOut",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Some(RunStatus::Running),
            "complete" => Some(RunStatus::Complete),
            "timedout" | "timed_out" => Some(RunStatus::TimedOut),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Position and facing of the robot (also used for respawn points)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    pub pos: IVec2,
    pub facing: Facing,
}

pub struct World {
    level: LevelData,
    level_number: u32,
    tuning: SimTuning,
    rules: ProgramRules,
    store: ProgramStore,
    executor: Option<CycleExecutor>,
    /// Programs submitted one by one as checkpoints are first activated
    stages: Vec<String>,
    next_stage: usize,
    robot: Robot,
    respawn: Robot,
    activated: Vec<bool>,
    hazards: Vec<Hazard>,
    status: RunStatus,
    tick: u64,
    deaths: u32,
}

impl World {
    pub fn new(level: LevelData, level_number: u32, tuning: SimTuning) -> Self {
        let start = Robot {
            pos: level.start,
            facing: Facing::Right,
        };
        Self {
            rules: level.starting_rules(),
            hazards: level.hazards.iter().map(Hazard::from_def).collect(),
            activated: vec![false; level.checkpoints.len()],
            level,
            level_number,
            tuning,
            store: ProgramStore::new(),
            executor: None,
            stages: Vec::new(),
            next_stage: 0,
            robot: start,
            respawn: start,
            status: RunStatus::Running,
            tick: 0,
            deaths: 0,
        }
    }

    /// New world with a program already loaded
    pub fn with_program(
        level: LevelData,
        level_number: u32,
        tuning: SimTuning,
        program: &str,
    ) -> Result<Self, ScriptError> {
        let mut world = Self::new(level, level_number, tuning);
        world.submit_program(program)?;
        Ok(world)
    }

    /// Validate `text` against the current rules. On success the cycle
    /// restarts from its first instruction at the robot's current position;
    /// on failure the running program is kept.
    pub fn submit_program(&mut self, text: &str) -> Result<(), ScriptError> {
        let program = self.store.submit(text, &self.rules)?;
        info!("Program loaded: {}", program);
        self.executor = Some(CycleExecutor::new(program));
        Ok(())
    }

    /// Programs to load after the 1st, 2nd, ... checkpoint activation
    pub fn set_stages(&mut self, stages: impl IntoIterator<Item = String>) {
        self.stages = stages.into_iter().collect();
        self.next_stage = 0;
    }

    /// Back to the level start with the starting rules. The current program
    /// is kept only if it is still valid under those rules.
    pub fn reset(&mut self) {
        let source = self.store.source().to_string();
        let level = self.level.clone();
        let stages = std::mem::take(&mut self.stages);
        *self = Self::new(level, self.level_number, self.tuning.clone());
        self.stages = stages;
        if !source.is_empty() && self.submit_program(&source).is_err() {
            warn!("Program {:?} is not valid at level start; cleared", source);
        }
    }

    /// Event describing a submission result, for drivers that log it
    pub fn submission_event(&self, result: &Result<(), ScriptError>) -> GameEvent {
        match result {
            Ok(()) => GameEvent::ProgramLoaded {
                program: self.program().map(Program::to_string).unwrap_or_default(),
            },
            Err(e) => GameEvent::ProgramRejected { error: e.to_string() },
        }
    }

    pub fn level(&self) -> &LevelData {
        &self.level
    }

    pub fn level_number(&self) -> u32 {
        self.level_number
    }

    pub fn tuning(&self) -> &SimTuning {
        &self.tuning
    }

    pub fn rules(&self) -> &ProgramRules {
        &self.rules
    }

    pub fn store(&self) -> &ProgramStore {
        &self.store
    }

    pub fn program(&self) -> Option<&Program> {
        self.store.program()
    }

    pub fn executor(&self) -> Option<&CycleExecutor> {
        self.executor.as_ref()
    }

    pub fn robot(&self) -> Robot {
        self.robot
    }

    pub fn respawn_point(&self) -> Robot {
        self.respawn
    }

    pub fn hazard_positions(&self) -> Vec<IVec2> {
        self.hazards.iter().map(Hazard::pos).collect()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub fn cycles_completed(&self) -> u64 {
        self.executor.as_ref().map_or(0, CycleExecutor::cycles_completed)
    }

    pub fn checkpoints_activated(&self) -> usize {
        self.activated.iter().filter(|a| **a).count()
    }

    pub fn is_activated(&self, index: usize) -> bool {
        self.activated.get(index).copied().unwrap_or(false)
    }

    /// Current level picture with the robot and hazards drawn in
    pub fn map_string(&self) -> String {
        self.level
            .to_map_string(Some((self.robot.pos, self.robot.facing)), &self.hazard_positions())
    }
}
