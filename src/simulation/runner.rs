//! Simulation runner - runs programs on levels without a terminal loop

use bevy::prelude::*;
use rand::Rng;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::constants::MAX_TICKS;
use crate::events::{EventBuffer, GameEvent, parse_evlog};
use crate::levels::{LevelData, LevelDatabase};
use crate::tuning::{SimTuning, load_sim_tuning};
use crate::world::World;

use super::app_builder::HeadlessAppBuilder;
use super::config::{SimConfig, SimMode};
use super::db::SimDatabase;
use super::metrics::{BatchSummary, RunResult, SimMetrics};
use super::parallel::{init_parallel, run_sweep_parallel};
use super::plugin::{CycleSimPlugin, SimControl, SimEventLog, SimWorld};
use super::search::{SearchConfig, search_programs};

/// Build the world for a run, rendering script errors against their source
pub fn build_world(
    level: &LevelData,
    level_number: u32,
    tuning: &SimTuning,
    program: &str,
    stages: &[String],
) -> Result<World, String> {
    let mut world = World::with_program(level.clone(), level_number, tuning.clone(), program)
        .map_err(|e| format!("Invalid program for {}:\n{}", level.name, e.render(program)))?;
    world.set_stages(stages.iter().cloned());
    Ok(world)
}

/// Run a single program on one level inside a headless app and return the result
pub fn run_level(
    config: &SimConfig,
    level: &LevelData,
    level_number: u32,
    tuning: &SimTuning,
) -> Result<RunResult, String> {
    let tuning = bounded_tuning(tuning);
    let world = build_world(level, level_number, &tuning, &config.program, &config.stages)?;

    let mut app = HeadlessAppBuilder::new()
        .with_tuning(tuning.clone())
        .with_minimal_threads()
        .build();
    app.add_plugins(CycleSimPlugin);

    // Event logging buffer
    let mut event_log = SimEventLog {
        buffer: EventBuffer::new(),
        enabled: config.log_events,
    };
    if event_log.enabled {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
        event_log.buffer.start_session(&timestamp);
        event_log.buffer.log(0, GameEvent::Config(tuning.clone()));
        event_log.buffer.log(0, GameEvent::RunStart {
            level: level_number,
            level_name: level.name.clone(),
            program: world.program().map(|p| p.to_string()).unwrap_or_default(),
        });
    }
    app.insert_resource(event_log);
    app.insert_resource(SimControl::manual());
    app.insert_resource(SimWorld(world));

    // Run until the world stops
    loop {
        app.update();

        let control = app.world().resource::<SimControl>();
        if control.should_exit {
            break;
        }
    }

    let metrics = app.world().resource::<SimMetrics>().clone();
    let result = RunResult::from_world(&app.world().resource::<SimWorld>().0, metrics);

    let event_log = app.world().resource::<SimEventLog>();
    if event_log.enabled {
        write_event_log(&event_log.buffer, Path::new(&config.log_dir));
    }

    Ok(result)
}

/// Tick a world to the end without an app (used by search, which runs
/// thousands of short worlds)
pub fn run_world_direct(mut world: World) -> RunResult {
    let mut metrics = SimMetrics::new();
    while world.is_running() {
        if world.tuning().max_ticks == 0 && world.tick_count() >= MAX_TICKS {
            break;
        }
        metrics.record_all(&world.tick());
    }
    RunResult::from_world(&world, metrics)
}

/// Unlimited runs never end on levels the program cannot finish
pub fn bounded_tuning(tuning: &SimTuning) -> SimTuning {
    let mut tuning = tuning.clone();
    if tuning.max_ticks == 0 {
        warn!("max_ticks = 0 is unbounded; batch runs use {}", MAX_TICKS);
        tuning.max_ticks = MAX_TICKS;
    }
    tuning
}

/// Write the event buffer to a .evlog file
fn write_event_log(buffer: &EventBuffer, log_dir: &Path) -> Option<PathBuf> {
    let session_id = buffer.session_id();
    if session_id.is_empty() {
        return None;
    }

    if let Err(e) = fs::create_dir_all(log_dir) {
        warn!("Failed to create log directory: {}", e);
        return None;
    }

    let path = log_dir.join(format!("{}.evlog", session_id));
    let result = File::create(&path).and_then(|mut file| {
        file.write_all(buffer.serialize().as_bytes())?;
        file.write_all(b"\n")
    });
    match result {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("Failed to write event log {}: {}", path.display(), e);
            None
        }
    }
}

/// Main simulation entry point
pub fn run_simulation(config: SimConfig) -> Result<(), String> {
    match &config.mode {
        SimMode::CheckLevels => return check_levels(&config.levels_file),
        SimMode::Summarize { path } => return summarize_evlog(Path::new(path)),
        _ => {}
    }

    let level_db = LevelDatabase::load_from_file(&config.levels_file);
    let mut tuning = load_sim_tuning();
    if let Some(max_ticks) = config.max_ticks {
        tuning.max_ticks = max_ticks;
    }

    init_parallel(config.parallel);

    let db = match &config.db_path {
        Some(path) => Some(open_results_db(path, &config)?),
        None => None,
    };

    match &config.mode {
        SimMode::Single => {
            let (index, level) = resolve_level(&level_db, &config.level)?;
            if !config.quiet {
                println!("Running {:?} on {}", config.program, level.name);
            }
            let result = run_level(&config, level, index as u32 + 1, &tuning)?;
            if !config.quiet {
                println!("{}", result.summary());
            }
            if let Some((db, session)) = &db {
                db.insert_run(session, &result)
                    .map_err(|e| format!("Failed to store run: {}", e))?;
            }
            output_json(&result, &config)?;
        }

        SimMode::LevelSweep => {
            let targets: Vec<(u32, &LevelData)> = if config.levels.is_empty() {
                level_db
                    .levels
                    .iter()
                    .enumerate()
                    .map(|(i, l)| (i as u32 + 1, l))
                    .collect()
            } else {
                config
                    .levels
                    .iter()
                    .map(|key| resolve_level(&level_db, key).map(|(i, l)| (i as u32 + 1, l)))
                    .collect::<Result<_, _>>()?
            };
            if !config.quiet {
                println!("Running {:?} on {} levels", config.program, targets.len());
            }

            let mut results = Vec::new();
            for (outcome, (number, level)) in run_sweep_parallel(&config, &targets, &tuning)
                .into_iter()
                .zip(&targets)
            {
                match outcome {
                    Ok(result) => {
                        if !config.quiet {
                            println!("{}", result.summary());
                        }
                        results.push(result);
                    }
                    Err(e) => println!("{:<16} skipped (level {}): {}", level.name, number, e),
                }
            }

            println!("{}", BatchSummary::from_results(&results));
            if let Some((db, session)) = &db {
                for result in &results {
                    db.insert_run(session, result)
                        .map_err(|e| format!("Failed to store run: {}", e))?;
                }
            }
            output_json(&results, &config)?;
        }

        SimMode::Search { attempts } => {
            let (index, level) = resolve_level(&level_db, &config.level)?;
            let seed = config.seed.unwrap_or_else(|| rand::thread_rng().r#gen());
            if !config.quiet {
                println!(
                    "Searching {} random programs on {} (seed: {})",
                    attempts, level.name, seed
                );
            }

            let search = SearchConfig {
                attempts: *attempts,
                max_len: config.search_max_len,
                seed,
                unrestricted: config.search_unrestricted,
            };
            let outcome = search_programs(level, index as u32 + 1, &tuning, &search);
            println!(
                "Tried {} programs ({} distinct), {} complete",
                outcome.tried, outcome.distinct, outcome.complete
            );
            match &outcome.best {
                Some(best) => println!("Best: {}", best.summary()),
                None => println!("No program completed {}", level.name),
            }

            if let Some((db, session)) = &db
                && let Some(best) = &outcome.best
            {
                db.insert_run(session, best)
                    .map_err(|e| format!("Failed to store run: {}", e))?;
            }
            output_json(&outcome, &config)?;
        }

        // Handled before loading anything
        SimMode::CheckLevels | SimMode::Summarize { .. } => {}
    }

    if let Some((db, _)) = &db
        && !config.quiet
    {
        print_stored_stats(db, &config, &level_db);
    }

    Ok(())
}

/// Per-level totals across every session stored in the database
fn print_stored_stats(db: &SimDatabase, config: &SimConfig, level_db: &LevelDatabase) {
    let names: Vec<&str> = match config.mode {
        SimMode::LevelSweep if config.levels.is_empty() => level_db.names(),
        SimMode::LevelSweep => config
            .levels
            .iter()
            .filter_map(|key| level_db.resolve(key).map(|l| l.name.as_str()))
            .collect(),
        _ => level_db.resolve(&config.level).map(|l| l.name.as_str()).into_iter().collect(),
    };

    println!("\nStored results:");
    for name in names {
        match db.level_stats(name) {
            Ok(stats) if stats.runs > 0 => {
                let best = match db.best_program(name) {
                    Ok(Some((program, ticks))) => format!("{:?} in {} ticks", program, ticks),
                    Ok(None) => "-".to_string(),
                    Err(e) => format!("query failed: {}", e),
                };
                println!(
                    "  {:<16} {:>4} runs  {:>5.1}% complete  avg deaths {:.1}  best {}",
                    name,
                    stats.runs,
                    stats.completion_rate() * 100.0,
                    stats.avg_deaths,
                    best
                );
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to read stats for {}: {}", name, e),
        }
    }
}

/// Print what a recorded run did
fn summarize_evlog(path: &Path) -> Result<(), String> {
    let parsed = parse_evlog(path)?;
    let meta = &parsed.metadata;
    println!("Session {}", meta.session_id);
    println!("Level {}: {}  program {:?}", meta.level, meta.level_name, meta.program);
    let status = if meta.status.is_empty() { "unfinished" } else { meta.status.as_str() };
    println!(
        "{} after {} ticks, {} deaths, {} checkpoints",
        status,
        meta.ticks,
        meta.deaths,
        parsed.checkpoints_reached()
    );
    println!("{} events ({} lines skipped)", parsed.events.len(), parsed.skipped_lines);
    Ok(())
}

/// Look a level up by number or name, with the available names on failure
pub fn resolve_level<'a>(db: &'a LevelDatabase, key: &str) -> Result<(usize, &'a LevelData), String> {
    db.resolve_index(key)
        .and_then(|i| db.get(i).map(|l| (i, l)))
        .ok_or_else(|| format!("Unknown level '{}'. Levels: {}", key, db.names().join(", ")))
}

fn check_levels(path: &str) -> Result<(), String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
    let db = LevelDatabase::parse_strict(&content)?;
    for (i, level) in db.levels.iter().enumerate() {
        println!(
            "{:>2}. {:<16} {}x{} checkpoints={} hazards={} goal={}",
            i + 1,
            level.name,
            level.width,
            level.height,
            level.checkpoints.len(),
            level.hazards.len(),
            if level.goal.is_some() { "yes" } else { "no" }
        );
    }
    println!("{} levels OK", db.len());
    Ok(())
}

fn open_results_db(path: &str, config: &SimConfig) -> Result<(SimDatabase, String), String> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    let db = SimDatabase::open(Path::new(path))
        .map_err(|e| format!("Failed to open database {}: {}", path, e))?;
    let config_json = serde_json::to_string(config).ok();
    let session = db
        .create_session("simulate", config_json.as_deref())
        .map_err(|e| format!("Failed to create session: {}", e))?;
    Ok((db, session))
}

fn output_json<T: serde::Serialize>(value: &T, config: &SimConfig) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize results: {}", e))?;

    if let Some(output_file) = &config.output_file {
        fs::write(output_file, &json).map_err(|e| format!("Failed to write {}: {}", output_file, e))?;
        println!("Results written to {}", output_file);
    } else if !config.quiet {
        println!("{}", json);
    }
    Ok(())
}
