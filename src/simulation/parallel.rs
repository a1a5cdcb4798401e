//! Parallel simulation execution
//!
//! Uses Rayon to run independent worlds concurrently. Each world runs in
//! its own headless app with minimal threading to avoid hitting OS thread
//! limits.

use bevy::log::warn;
use rayon::prelude::*;

use crate::levels::LevelData;
use crate::tuning::SimTuning;

use super::config::SimConfig;
use super::metrics::RunResult;
use super::runner::run_level;

/// Initialize the global Rayon pool with the given thread count.
/// Call this once at startup; 0 keeps Rayon's default (auto-detect).
pub fn init_parallel(threads: usize) {
    if threads == 0 {
        return;
    }
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        warn!("Failed to initialize Rayon thread pool: {}", e);
    }
}

/// Run the configured program on each level in parallel
///
/// Returns results in the same order as `levels`.
pub fn run_sweep_parallel(
    config: &SimConfig,
    levels: &[(u32, &LevelData)],
    tuning: &SimTuning,
) -> Vec<Result<RunResult, String>> {
    levels
        .par_iter()
        .map(|(number, level)| run_level(config, level, *number, tuning))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelDatabase;

    #[test]
    fn test_sweep_keeps_level_order() {
        let db = LevelDatabase::default_levels();
        let config = SimConfig {
            program: "W".to_string(),
            quiet: true,
            ..SimConfig::default()
        };
        let tuning = SimTuning {
            max_ticks: 40,
            ..SimTuning::default()
        };
        let levels: Vec<(u32, &LevelData)> = db
            .levels
            .iter()
            .enumerate()
            .map(|(i, l)| (i as u32 + 1, l))
            .collect();

        let results = run_sweep_parallel(&config, &levels, &tuning);
        assert_eq!(results.len(), 3);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.level, 1);
        assert!(first.is_complete());
        assert_eq!(results[1].as_ref().unwrap().level_name, "Gap");
        assert!(!results[1].as_ref().unwrap().is_complete());
    }
}
