//! Metrics collection for simulated runs

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::GameEvent;
use crate::world::{RunStatus, World};

/// Per-run counters accumulated from events
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimMetrics {
    pub steps: u32,
    pub blocked: u32,
    pub stalled: u32,
    pub falls: u32,
    pub groups_skipped: u32,
    pub hazard_deaths: u32,
    pub void_deaths: u32,
    pub unlocks: u32,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Step { .. } => self.steps += 1,
            GameEvent::Blocked { .. } => self.blocked += 1,
            GameEvent::Stalled => self.stalled += 1,
            GameEvent::Fell { .. } => self.falls += 1,
            GameEvent::GroupSkipped { .. } => self.groups_skipped += 1,
            GameEvent::Death { cause, .. } => match cause {
                crate::events::DeathCause::Hazard => self.hazard_deaths += 1,
                crate::events::DeathCause::Void => self.void_deaths += 1,
            },
            GameEvent::CommandUnlocked { .. } => self.unlocks += 1,
            _ => {}
        }
    }

    pub fn record_all<'a>(&mut self, events: impl IntoIterator<Item = &'a GameEvent>) {
        for event in events {
            self.record(event);
        }
    }
}

/// Result of a single run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Level played (1-based)
    pub level: u32,
    pub level_name: String,
    pub program: String,
    pub status: RunStatus,
    pub ticks: u64,
    pub deaths: u32,
    pub checkpoints: usize,
    pub checkpoints_total: usize,
    pub cycles: u64,
    /// Seed of the search that produced the program, if any
    pub seed: Option<u64>,
    pub metrics: SimMetrics,
}

impl RunResult {
    pub fn from_world(world: &World, metrics: SimMetrics) -> Self {
        Self {
            level: world.level_number(),
            level_name: world.level().name.clone(),
            program: world.program().map(|p| p.to_string()).unwrap_or_default(),
            status: world.status(),
            ticks: world.tick_count(),
            deaths: world.deaths(),
            checkpoints: world.checkpoints_activated(),
            checkpoints_total: world.level().checkpoints.len(),
            cycles: world.cycles_completed(),
            seed: None,
            metrics,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "{:<16} {:<18} {:<9} ticks={:<5} deaths={:<3} checkpoints={}/{}",
            self.level_name,
            self.program,
            self.status,
            self.ticks,
            self.deaths,
            self.checkpoints,
            self.checkpoints_total
        )
    }
}

/// Aggregate over a batch of runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub runs: usize,
    pub complete: usize,
    pub timed_out: usize,
    pub total_deaths: u32,
    /// Mean ticks over completed runs
    pub avg_complete_ticks: f32,
}

impl BatchSummary {
    pub fn from_results(results: &[RunResult]) -> Self {
        let complete: Vec<&RunResult> = results.iter().filter(|r| r.is_complete()).collect();
        let avg_complete_ticks = if complete.is_empty() {
            0.0
        } else {
            complete.iter().map(|r| r.ticks as f32).sum::<f32>() / complete.len() as f32
        };
        Self {
            runs: results.len(),
            complete: complete.len(),
            timed_out: results
                .iter()
                .filter(|r| r.status == RunStatus::TimedOut)
                .count(),
            total_deaths: results.iter().map(|r| r.deaths).sum(),
            avg_complete_ticks,
        }
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} runs: {} complete, {} timed out, {} deaths (avg {:.1} ticks to complete)",
            self.runs, self.complete, self.timed_out, self.total_deaths, self.avg_complete_ticks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DeathCause;
    use crate::helpers::Facing;
    use crate::script::Action;

    #[test]
    fn test_record_counts_events() {
        let mut metrics = SimMetrics::new();
        metrics.record_all(&[
            GameEvent::Step {
                action: Action::Walk,
                pos: IVec2::new(1, 1),
                facing: Facing::Right,
            },
            GameEvent::Stalled,
            GameEvent::Death {
                pos: IVec2::new(2, -1),
                cause: DeathCause::Void,
            },
            GameEvent::CycleRestart { cycle: 1 },
        ]);
        assert_eq!(metrics.steps, 1);
        assert_eq!(metrics.stalled, 1);
        assert_eq!(metrics.void_deaths, 1);
        assert_eq!(metrics.hazard_deaths, 0);
    }

    #[test]
    fn test_batch_summary() {
        let base = RunResult {
            level: 1,
            level_name: "A".to_string(),
            program: "W".to_string(),
            status: RunStatus::Complete,
            ticks: 10,
            deaths: 1,
            checkpoints: 1,
            checkpoints_total: 1,
            cycles: 9,
            seed: None,
            metrics: SimMetrics::default(),
        };
        let results = vec![
            base.clone(),
            RunResult { ticks: 20, ..base.clone() },
            RunResult {
                status: RunStatus::TimedOut,
                deaths: 0,
                ..base
            },
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.runs, 3);
        assert_eq!(summary.complete, 2);
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.total_deaths, 2);
        assert!((summary.avg_complete_ticks - 15.0).abs() < 0.01);
    }
}
