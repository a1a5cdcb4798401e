//! The step function: advances the world by one tick.
//!
//! Processing order:
//!   1. Dispatch (executor picks the next action; guards cost no tick)
//!   2. Action resolution (Blocked if impossible)
//!   3. Gravity
//!   4. Hazard movement
//!   5. Hazard contact / void death, respawn
//!   6. Checkpoint arrival
//!   7. Completion check
//!   8. Tick limit

use bevy::prelude::*;

use super::actions::{apply_gravity, can_perform, resolve_action};
use super::hazards::touches;
use super::{Robot, RunStatus, World};
use crate::events::{DeathCause, GameEvent};
use crate::executor::Dispatch;
use crate::helpers::{Facing, fmt_pos};

impl World {
    /// Run one tick. Does nothing (and returns no events) when the run is
    /// over or no valid program has been loaded.
    pub fn tick(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.status != RunStatus::Running {
            return events;
        }
        let Some(executor) = self.executor.as_mut() else {
            return events;
        };
        self.tick += 1;
        let start = self.robot;

        // 1. Dispatch
        let level = &self.level;
        let trace = executor.next_action(|action| can_perform(level, start.pos, start.facing, action));
        if trace.wrapped {
            events.push(GameEvent::CycleRestart {
                cycle: executor.cycles_completed(),
            });
        }
        for pc in &trace.skipped_groups {
            events.push(GameEvent::GroupSkipped { pc: *pc });
        }

        // 2. Action
        match trace.dispatch {
            Dispatch::Run { action, .. } => {
                match resolve_action(&self.level, start.pos, start.facing, action) {
                    Some((pos, facing)) => {
                        self.robot = Robot { pos, facing };
                        events.push(GameEvent::Step { action, pos, facing });
                    }
                    None => events.push(GameEvent::Blocked {
                        action,
                        pos: start.pos,
                    }),
                }
            }
            Dispatch::Stalled => events.push(GameEvent::Stalled),
        }

        // 3. Gravity
        let fall = apply_gravity(&self.level, self.robot.pos, self.tuning.max_fall);
        if !fall.path.is_empty() {
            events.push(GameEvent::Fell {
                from: self.robot.pos,
                to: fall.to,
            });
            self.robot.pos = fall.to;
        }

        // 4. Hazards
        let hazard_from = self.hazard_positions();
        for hazard in &mut self.hazards {
            hazard.advance();
        }

        // 5. Contact
        let hit = self
            .hazards
            .iter()
            .zip(&hazard_from)
            .any(|(hazard, from)| touches(hazard, *from, start.pos, self.robot.pos, &fall.path));
        if hit || fall.into_void {
            let cause = if hit { DeathCause::Hazard } else { DeathCause::Void };
            self.die(cause, &mut events);
            self.check_tick_limit();
            return events;
        }

        // 6. Checkpoints
        if self.robot.pos != start.pos
            && let Some(index) = self.level.checkpoint_index_at(self.robot.pos)
        {
            self.arrive_at_checkpoint(index, &mut events);
        }

        // 7. Completion
        let complete = match self.level.goal {
            Some(goal) => self.robot.pos == goal,
            None => !self.activated.is_empty() && self.activated.iter().all(|a| *a),
        };
        if complete {
            self.status = RunStatus::Complete;
            info!(
                "Level '{}' complete in {} ticks ({} deaths)",
                self.level.name, self.tick, self.deaths
            );
            events.push(GameEvent::LevelComplete {
                ticks: self.tick,
                deaths: self.deaths,
            });
            return events;
        }

        // 8. Tick limit
        self.check_tick_limit();
        events
    }

    fn die(&mut self, cause: DeathCause, events: &mut Vec<GameEvent>) {
        self.deaths += 1;
        debug!("Robot died at {} ({:?})", fmt_pos(self.robot.pos), cause);
        events.push(GameEvent::Death {
            pos: self.robot.pos,
            cause,
        });

        self.robot = self.respawn;
        for hazard in &mut self.hazards {
            hazard.reset();
        }
        if let Some(executor) = &mut self.executor {
            executor.restart();
        }
        events.push(GameEvent::Respawn {
            pos: self.robot.pos,
            facing: self.robot.facing,
        });
    }

    fn arrive_at_checkpoint(&mut self, index: usize, events: &mut Vec<GameEvent>) {
        let pos = self.robot.pos;
        self.robot.facing = Facing::Right;

        // The most recently reached checkpoint is the respawn point
        self.respawn = Robot {
            pos,
            facing: Facing::Right,
        };

        let first = !self.activated[index];
        events.push(GameEvent::CheckpointReached { index, pos, first });
        if !first {
            return;
        }
        self.activated[index] = true;

        let def = self.level.checkpoints[index].clone();
        if def.command_count > 0 {
            self.rules.raise_command_count(def.command_count);
        }
        if let Some(command) = def.unlock
            && self.rules.unlock(command)
        {
            events.push(GameEvent::CommandUnlocked {
                command: command.unlock_key(),
                command_count: self.rules.command_count,
            });
        }
        info!(
            "Checkpoint {} at {} activated (unlocked: {}, budget: {})",
            index,
            fmt_pos(pos),
            self.rules.unlocked_symbols(),
            self.rules.command_count
        );

        self.load_next_stage(events);
    }

    fn load_next_stage(&mut self, events: &mut Vec<GameEvent>) {
        let Some(text) = self.stages.get(self.next_stage).cloned() else {
            return;
        };
        self.next_stage += 1;

        let result = self.submit_program(&text);
        if let Err(e) = &result {
            warn!("Staged program {:?} rejected: {}", text, e);
        }
        events.push(self.submission_event(&result));
    }

    fn check_tick_limit(&mut self) {
        // 0 disables the limit
        if self.tuning.max_ticks > 0 && self.tick >= self.tuning.max_ticks && self.is_running() {
            self.status = RunStatus::TimedOut;
            info!("Level '{}' timed out after {} ticks", self.level.name, self.tick);
        }
    }
}
