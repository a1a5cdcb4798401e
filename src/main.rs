//! Built to Scale - interactive terminal driver
//!
//! Runs a level one tick per frame while reading commands and programs from
//! stdin. Any line that is not a command is submitted as a program.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use built_to_scale::constants::{LEVELS_FILE, RUNS_DB_FILE};
use built_to_scale::events::{
    EventBus, EventLogConfig, EventLogger, GameEvent, SqliteEventLogger, flush_events_to_sqlite,
};
use built_to_scale::levels::LevelDatabase;
use built_to_scale::script::ScriptEditor;
use built_to_scale::simulation::plugin::{advance_world, check_run_end, drain_bus};
use built_to_scale::simulation::{
    CycleSimPlugin, HeadlessAppBuilder, SimControl, SimWorld, resolve_level, step_paused,
};
use built_to_scale::snapshot::{SNAPSHOT_DIR, WorldSnapshot};
use built_to_scale::tuning::{SimTuning, load_sim_tuning};
use built_to_scale::world::World;
use std::io::BufRead;
use std::path::Path;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, channel};

const HELP: &str = r#"Commands:
  <program>          submit a program, e.g. ( D ) W W J
  level <N|name>     switch level          levels   list levels
  show               draw the map          status   run state
  pause / go         stop or resume        step     one tick while paused
  reset              back to level start   save     write a snapshot
  watch              toggle map each tick  quit     exit
Editor:
  type <keys>        insert at cursor      back / del   remove around cursor
  left / right / home / end                clear        empty the editor
  edit               load current program  submit       submit editor text"#;

/// Lines read from stdin by a background thread
#[derive(Resource)]
struct ConsoleInput(Mutex<Receiver<String>>);

/// Interactive session state
#[derive(Resource, Default)]
struct Session {
    editor: ScriptEditor,
    watch: bool,
}

fn spawn_console() -> ConsoleInput {
    let (tx, rx) = channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                return;
            }
        }
        // EOF ends the session
        let _ = tx.send("quit".to_string());
    });
    ConsoleInput(Mutex::new(rx))
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let arg_value = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    };
    let level_key = arg_value("--level").unwrap_or_else(|| "1".to_string());
    let program = arg_value("--program");
    let db_path = arg_value("--db").unwrap_or_else(|| RUNS_DB_FILE.to_string());
    let no_log = args.iter().any(|a| a == "--no-log");

    let level_db = LevelDatabase::load_from_file(LEVELS_FILE);
    let tuning = load_sim_tuning();

    let mut world = match resolve_level(&level_db, &level_key) {
        Ok((index, level)) => World::new(level.clone(), index as u32 + 1, tuning.clone()),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut logger = EventLogger::new(EventLogConfig {
        enabled: !no_log,
        ..default()
    });
    logger.start_session(&chrono::Local::now().to_rfc3339());
    logger.log_config(&tuning);

    let sqlite = if no_log {
        SqliteEventLogger::disabled()
    } else {
        open_sqlite(&db_path)
    };

    if let Some(program) = program {
        let event = submit(&mut world, &program);
        logger.log(0, &event);
        if world.program().is_some() {
            begin_run(&world, &mut logger, &sqlite);
        }
    }

    let mut app = HeadlessAppBuilder::new()
        .with_level_db(level_db)
        .with_tuning(tuning)
        .build();
    app.add_plugins(LogPlugin::default())
        .add_plugins(CycleSimPlugin)
        .insert_resource(SimWorld(world))
        .insert_resource(SimControl::manual())
        .insert_resource(logger)
        .insert_resource(sqlite)
        .insert_resource(spawn_console())
        .init_resource::<Session>()
        .add_systems(Startup, print_intro)
        .add_systems(
            Update,
            (
                read_console.before(advance_world),
                report_events
                    .after(check_run_end)
                    .before(flush_events_to_sqlite),
                close_stored_run
                    .after(flush_events_to_sqlite)
                    .before(drain_bus),
            ),
        );

    app.run();
}

fn open_sqlite(path: &str) -> SqliteEventLogger {
    if let Some(parent) = Path::new(path).parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!("Failed to create {}: {}", parent.display(), e);
    }
    match SqliteEventLogger::new(Path::new(path), "interactive") {
        Ok(logger) => logger,
        Err(e) => {
            warn!("SQLite logging disabled: {}", e);
            SqliteEventLogger::disabled()
        }
    }
}

fn print_intro(sim: Res<SimWorld>) {
    println!("Built to Scale - type 'help' for commands");
    print_level(&sim.0);
}

fn print_level(world: &World) {
    let rules = world.rules();
    println!(
        "Level {}: {}  (commands: {}, budget: {})",
        world.level_number(),
        world.level().name,
        rules.unlocked_symbols(),
        rules.command_count
    );
    println!("{}", world.map_string());
}

/// Submit program text to the world, printing any error under the source
fn submit(world: &mut World, text: &str) -> GameEvent {
    let result = world.submit_program(text);
    match &result {
        Ok(()) => {
            if !world.is_running() {
                println!("Run has ended; 'reset' to start again");
            }
        }
        Err(e) => println!("{}", e.render(text)),
    }
    world.submission_event(&result)
}

#[allow(clippy::too_many_arguments)]
fn read_console(
    console: Res<ConsoleInput>,
    mut sim: ResMut<SimWorld>,
    mut control: ResMut<SimControl>,
    mut session: ResMut<Session>,
    mut bus: ResMut<EventBus>,
    mut logger: ResMut<EventLogger>,
    sqlite: Res<SqliteEventLogger>,
    level_db: Res<LevelDatabase>,
    tuning: Res<SimTuning>,
    mut exit: MessageWriter<AppExit>,
) {
    let lines: Vec<String> = match console.0.lock() {
        Ok(rx) => rx.try_iter().collect(),
        Err(_) => return,
    };

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let command = command.to_ascii_lowercase();
        let rest = rest.trim();
        let world = &mut sim.0;

        match command.as_str() {
            "help" | "?" => println!("{}", HELP),
            "quit" | "exit" => {
                end_open_run(world, &sqlite);
                logger.end_session();
                exit.write(AppExit::Success);
                return;
            }
            "levels" => {
                for (i, name) in level_db.names().iter().enumerate() {
                    println!("{:>2}. {}", i + 1, name);
                }
            }
            "level" => match resolve_level(&level_db, rest) {
                Ok((index, level)) => {
                    end_open_run(world, &sqlite);
                    *world = World::new(level.clone(), index as u32 + 1, (*tuning).clone());
                    control.should_exit = false;
                    session.editor.clear();
                    print_level(world);
                }
                Err(e) => println!("{}", e),
            },
            "show" => println!("{}", world.map_string()),
            "status" => match WorldSnapshot::capture(world, "status").to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => println!("{}", e),
            },
            "pause" => control.paused = true,
            "go" | "resume" => control.paused = false,
            "step" => {
                if !step_paused(world, &control, &mut bus) {
                    println!("step only works while paused (use 'pause' first)");
                }
            }
            "reset" => {
                end_open_run(world, &sqlite);
                world.reset();
                control.should_exit = false;
                begin_run(world, &mut logger, &sqlite);
                print_level(world);
            }
            "save" => {
                match WorldSnapshot::capture(world, "manual").save(Path::new(SNAPSHOT_DIR)) {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(e) => println!("{}", e),
                }
            }
            "watch" => {
                session.watch = !session.watch;
                println!("watch {}", if session.watch { "on" } else { "off" });
            }
            "type" => {
                let rules = world.rules().clone();
                for c in rest.chars().filter(|c| !c.is_whitespace()) {
                    if !session.editor.type_char(c, &rules) {
                        println!("'{}' is not available", c);
                    }
                }
                println!("{}", session.editor.display());
            }
            "back" | "del" | "left" | "right" | "home" | "end" | "clear" => {
                let editor = &mut session.editor;
                match command.as_str() {
                    "back" => {
                        editor.backspace();
                    }
                    "del" => {
                        editor.delete();
                    }
                    "left" => editor.move_left(),
                    "right" => editor.move_right(),
                    "home" => editor.move_home(),
                    "end" => editor.move_end(),
                    _ => editor.clear(),
                }
                println!("{}", editor.display());
            }
            "edit" => {
                session.editor = ScriptEditor::from_text(world.store().source());
                println!("{}", session.editor.display());
            }
            "submit" => {
                let text = session.editor.text();
                let event = submit(world, &text);
                accept_submission(world, event, &mut bus, &mut logger, &sqlite);
            }
            _ => {
                let event = submit(world, line);
                accept_submission(world, event, &mut bus, &mut logger, &sqlite);
            }
        }
    }
}

/// Publish a submission result and open a stored run for the first accepted program
fn accept_submission(
    world: &World,
    event: GameEvent,
    bus: &mut EventBus,
    logger: &mut EventLogger,
    sqlite: &SqliteEventLogger,
) {
    let accepted = matches!(event, GameEvent::ProgramLoaded { .. });
    bus.publish(world.tick_count(), [event]);
    if accepted && world.is_running() && sqlite.current_run_id().is_none() {
        begin_run(world, logger, sqlite);
    }
}

fn begin_run(world: &World, logger: &mut EventLogger, sqlite: &SqliteEventLogger) {
    let Some(program) = world.program().map(|p| p.to_string()) else {
        return;
    };
    logger.log(world.tick_count(), &GameEvent::RunStart {
        level: world.level_number(),
        level_name: world.level().name.clone(),
        program: program.clone(),
    });
    sqlite.start_run(world.level_number(), &world.level().name, &program);
}

fn end_open_run(world: &World, sqlite: &SqliteEventLogger) {
    if sqlite.current_run_id().is_some() {
        sqlite.end_run(
            "Abandoned",
            world.tick_count(),
            world.deaths(),
            world.checkpoints_activated(),
            world.cycles_completed(),
        );
    }
}

/// Print notable events and write all of them to the evlog
fn report_events(
    bus: Res<EventBus>,
    sim: Res<SimWorld>,
    session: Res<Session>,
    mut logger: ResMut<EventLogger>,
) {
    if bus.pending().is_empty() {
        return;
    }
    for event in bus.pending() {
        logger.log(event.tick, &event.event);
        if let Some(text) = describe(&event.event) {
            println!("[{:>5}] {}", event.tick, text);
        }
    }
    if session.watch {
        println!("{}", sim.0.map_string());
    }
}

/// Close the stored run once its `RunEnd` has been flushed
fn close_stored_run(bus: Res<EventBus>, sim: Res<SimWorld>, sqlite: Res<SqliteEventLogger>) {
    if sqlite.current_run_id().is_none() {
        return;
    }
    let ended = bus
        .flushed()
        .iter()
        .find_map(|e| match &e.event {
            GameEvent::RunEnd { status, ticks, deaths } => Some((status, *ticks, *deaths)),
            _ => None,
        });
    if let Some((status, ticks, deaths)) = ended {
        let world = &sim.0;
        sqlite.end_run(
            status,
            ticks,
            deaths,
            world.checkpoints_activated(),
            world.cycles_completed(),
        );
    }
}

/// Human-readable line for events worth printing
fn describe(event: &GameEvent) -> Option<String> {
    let text = match event {
        GameEvent::ProgramLoaded { program } => format!("program loaded: {}", program),
        GameEvent::CheckpointReached { index, first: true, .. } => {
            format!("checkpoint {} activated", index)
        }
        GameEvent::CommandUnlocked {
            command,
            command_count,
        } => format!("unlocked {} (budget {})", command.unlock_name(), command_count),
        GameEvent::Death { pos, cause } => {
            format!("died at {},{} ({:?})", pos.x, pos.y, cause)
        }
        GameEvent::Stalled => "stalled: no group in the cycle can run".to_string(),
        GameEvent::LevelComplete { ticks, deaths } => {
            format!("level complete in {} ticks with {} deaths", ticks, deaths)
        }
        GameEvent::RunEnd { status, .. } if status != "Complete" => format!("run ended: {}", status),
        _ => return None,
    };
    Some(text)
}
