//! Test execution engine

use bevy::prelude::*;

use crate::constants::LEVELS_FILE;
use crate::events::{EventBuffer, GameEvent};
use crate::levels::LevelDatabase;
use crate::simulation::{
    CycleSimPlugin, HeadlessAppBuilder, SimControl, SimEventLog, SimWorld, resolve_level,
};
use crate::snapshot::WorldSnapshot;
use crate::tuning::SimTuning;
use crate::world::World;

use super::assertions::{AssertionError, CapturedEvent, check_absent, check_sequence, check_state};
use super::parser::TestDefinition;

/// Result of running a test
#[derive(Debug)]
pub enum TestResult {
    Pass { ticks: u64 },
    Fail { error: AssertionError },
    Error { message: String },
}

impl TestResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestResult::Pass { .. })
    }
}

/// Run a single test and return the result
pub fn run_test(test: &TestDefinition) -> TestResult {
    let run = match play(test) {
        Ok(run) => run,
        Err(result) => return result,
    };
    if let Err(error) = check_sequence(&test.expect.sequence, &run.captured) {
        return TestResult::Fail { error };
    }
    if let Err(error) = check_absent(&test.expect.absent, &run.captured) {
        return TestResult::Fail { error };
    }
    TestResult::Pass { ticks: run.ticks }
}

/// What a scenario produced once it stopped
struct Playthrough {
    captured: Vec<CapturedEvent>,
    ticks: u64,
}

/// Drive the scenario's world to the end, checking state along the way
fn play(test: &TestDefinition) -> Result<Playthrough, TestResult> {
    let levels_file = test.setup.levels_file.as_deref().unwrap_or(LEVELS_FILE);
    let level_db = LevelDatabase::load_from_file(levels_file);
    let (index, level) =
        resolve_level(&level_db, &test.setup.level).map_err(|message| TestResult::Error { message })?;

    let mut tuning = SimTuning::default();
    if let Some(max_ticks) = test.setup.max_ticks {
        tuning.max_ticks = max_ticks;
    }
    // Bound on app updates: a world without a program never ticks
    let tick_limit = if tuning.max_ticks == 0 {
        crate::constants::MAX_TICKS
    } else {
        tuning.max_ticks
    };
    let frame_limit = tick_limit + test.input.iter().map(|i| i.tick).max().unwrap_or(0) + 1;

    let mut world = World::new(level.clone(), index as u32 + 1, tuning.clone());
    world.set_stages(test.setup.stages.iter().cloned());

    let mut log = EventBuffer::new();
    if let Some(program) = &test.setup.program {
        let result = world.submit_program(program);
        log.log(0, world.submission_event(&result));
        if let Err(e) = result {
            return Err(TestResult::Error {
                message: format!("Setup program rejected:\n{}", e.render(program)),
            });
        }
    }

    let mut app = HeadlessAppBuilder::new()
        .with_tuning(tuning)
        .with_minimal_threads()
        .build();
    app.add_plugins(CycleSimPlugin);
    app.insert_resource(SimWorld(world));
    app.insert_resource(SimControl::manual());
    app.insert_resource(SimEventLog {
        buffer: log,
        enabled: true,
    });

    let mut states: Vec<_> = test.expect.state.iter().collect();
    states.sort_by_key(|s| s.after_tick);
    let mut next_state = 0;
    // Each input is submitted once, even if the world does not tick after it
    let mut inputs: Vec<_> = test.input.iter().collect();
    inputs.sort_by_key(|i| i.tick);
    let mut next_input = 0;
    let mut frames = 0;

    loop {
        let tick = app.world().resource::<SimWorld>().0.tick_count();

        // State checks due at this tick
        while next_state < states.len() && states[next_state].after_tick <= tick {
            let snapshot = WorldSnapshot::capture(&app.world().resource::<SimWorld>().0, "test");
            check_state(states[next_state], &snapshot).map_err(|error| TestResult::Fail { error })?;
            next_state += 1;
        }

        if app.world().resource::<SimControl>().should_exit || frames >= frame_limit {
            break;
        }

        // Submissions due at this tick
        while next_input < inputs.len() && inputs[next_input].tick <= tick {
            submit_input(&mut app, tick, &inputs[next_input].program);
            next_input += 1;
        }

        app.update();
        frames += 1;
    }

    // Assertions past the end of the run see the final state
    let snapshot = WorldSnapshot::capture(&app.world().resource::<SimWorld>().0, "test");
    for state in &states[next_state..] {
        check_state(state, &snapshot).map_err(|error| TestResult::Fail { error })?;
    }

    let captured = app
        .world()
        .resource::<SimEventLog>()
        .buffer
        .events()
        .iter()
        .map(|(tick, event)| CapturedEvent::from_game_event(*tick, event))
        .collect();

    Ok(Playthrough {
        captured,
        ticks: snapshot.tick,
    })
}

/// Submit a program mid-run, recording the outcome like any other event
fn submit_input(app: &mut App, tick: u64, program: &str) {
    let event: GameEvent = {
        let mut sim = app.world_mut().resource_mut::<SimWorld>();
        let result = sim.0.submit_program(program);
        sim.0.submission_event(&result)
    };
    app.world_mut()
        .resource_mut::<SimEventLog>()
        .buffer
        .log(tick, event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SCENARIOS_DIR, discover_tests, parse_test_file};
    use std::path::Path;

    fn run_toml(text: &str) -> TestResult {
        let def: TestDefinition = toml::from_str(text).unwrap();
        run_test(&def)
    }

    #[test]
    fn test_inline_pass() {
        let result = run_toml(
            r#"
name = "walk"
[setup]
level = "First Steps"
program = "W"
levels_file = "does/not/exist.txt"

[[expect.sequence]]
event = "CP"
data = "0|7,1|1"
tick_min = 6
tick_max = 6

[[expect.sequence]]
event = "LC"
data = "9|0"

[[expect.state]]
after_tick = 3
checks = ["pos = 4,1", "facing = R"]
"#,
        );
        assert!(result.is_pass(), "{:?}", result);
    }

    #[test]
    fn test_inline_failure_reports() {
        let result = run_toml(
            r#"
name = "wrong"
[setup]
level = "1"
program = "W"
levels_file = "does/not/exist.txt"

[[expect.state]]
after_tick = 2
checks = ["pos = 9,9"]
"#,
        );
        assert!(matches!(result, TestResult::Fail { .. }));
    }

    #[test]
    fn test_no_program_does_not_hang() {
        let result = run_toml(
            r#"
name = "idle"
[setup]
level = "1"
max_ticks = 5
levels_file = "does/not/exist.txt"

[[expect.state]]
after_tick = 100
checks = ["tick = 0", "status = Running"]
"#,
        );
        assert!(result.is_pass(), "{:?}", result);
    }

    #[test]
    fn test_input_is_submitted_once_without_ticks() {
        let def: TestDefinition = toml::from_str(
            r#"
name = "rejected"
[setup]
level = "1"
max_ticks = 5
levels_file = "does/not/exist.txt"

[[input]]
tick = 0
program = "W Q"
"#,
        )
        .unwrap();
        let Ok(run) = play(&def) else {
            panic!("scenario did not run");
        };
        let rejected = run.captured.iter().filter(|e| e.code == "PX").count();
        assert_eq!(rejected, 1);
        assert_eq!(run.ticks, 0);
    }

    #[test]
    fn test_unknown_level_is_error() {
        let result = run_toml("name = \"x\"\n[setup]\nlevel = \"Moon\"\nlevels_file = \"nope.txt\"\n");
        assert!(matches!(result, TestResult::Error { .. }));
    }

    #[test]
    fn test_all_scenarios_pass() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join(SCENARIOS_DIR);
        let tests = discover_tests(&dir, None);
        assert!(!tests.is_empty(), "no scenarios found in {}", dir.display());

        let failures: Vec<String> = tests
            .iter()
            .filter_map(|path| {
                let result = match parse_test_file(path) {
                    Ok(def) => run_test(&def),
                    Err(message) => TestResult::Error { message },
                };
                (!result.is_pass()).then(|| format!("{}: {:?}", path.display(), result))
            })
            .collect();
        assert!(failures.is_empty(), "{}", failures.join("\n"));
    }
}
