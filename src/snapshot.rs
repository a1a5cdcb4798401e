//! Snapshot system - captures world state as JSON
//!
//! Used by the interactive `status`/`save` commands and by batch runs that
//! keep the final state of each world.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::helpers::{Facing, fmt_pos};
use crate::world::{RunStatus, World};

/// Directory where snapshots are saved
pub const SNAPSHOT_DIR: &str = "snapshots";

/// Serializable snapshot of one world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// What triggered this snapshot
    pub trigger: String,
    pub level: u32,
    pub level_name: String,
    pub tick: u64,
    pub status: RunStatus,
    /// Robot position as `x,y`
    pub position: String,
    pub facing: Facing,
    pub respawn: String,
    pub deaths: u32,
    pub cycles: u64,
    /// Activation flag per checkpoint, in level order
    pub checkpoints: Vec<bool>,
    pub hazards: Vec<String>,
    pub program: Option<String>,
    pub pc: Option<usize>,
    pub unlocked: String,
    pub command_count: usize,
}

impl WorldSnapshot {
    pub fn capture(world: &World, trigger: &str) -> Self {
        let robot = world.robot();
        Self {
            trigger: trigger.to_string(),
            level: world.level_number(),
            level_name: world.level().name.clone(),
            tick: world.tick_count(),
            status: world.status(),
            position: fmt_pos(robot.pos),
            facing: robot.facing,
            respawn: fmt_pos(world.respawn_point().pos),
            deaths: world.deaths(),
            cycles: world.cycles_completed(),
            checkpoints: (0..world.level().checkpoints.len())
                .map(|i| world.is_activated(i))
                .collect(),
            hazards: world.hazard_positions().into_iter().map(fmt_pos).collect(),
            program: world.program().map(|p| p.to_string()),
            pc: world.executor().map(|e| e.pc()),
            unlocked: world.rules().unlocked_symbols(),
            command_count: world.rules().command_count,
        }
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize snapshot: {}", e))
    }

    /// Write to `dir/<timestamp>_<trigger>.json` and return the path
    pub fn save(&self, dir: &Path) -> Result<PathBuf, String> {
        fs::create_dir_all(dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let path = dir.join(format!("{}_{}.json", timestamp, self.trigger));
        fs::write(&path, self.to_json()?)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelDatabase;
    use crate::tuning::SimTuning;

    #[test]
    fn test_capture_after_ticks() {
        let db = LevelDatabase::default_levels();
        let mut world =
            World::with_program(db.levels[0].clone(), 1, SimTuning::default(), "W").unwrap();
        for _ in 0..6 {
            world.tick();
        }
        let snapshot = WorldSnapshot::capture(&world, "test");
        assert_eq!(snapshot.position, "7,1");
        assert_eq!(snapshot.respawn, "7,1");
        assert_eq!(snapshot.checkpoints, vec![true]);
        assert_eq!(snapshot.unlocked, "WJ");
        assert_eq!(snapshot.command_count, 2);
        assert_eq!(snapshot.program.as_deref(), Some("W"));
    }

    #[test]
    fn test_json_roundtrip() {
        let db = LevelDatabase::default_levels();
        let world = World::new(db.levels[1].clone(), 2, SimTuning::default());
        let snapshot = WorldSnapshot::capture(&world, "start");
        let json = snapshot.to_json().unwrap();
        let parsed: WorldSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
        assert_eq!(parsed.program, None);
    }
}
