//! Bevy plugin that advances a world one tick per frame
//!
//! The world itself is plain data; these systems move its events onto the
//! bus, count them, buffer them for the evlog and stop the app when the run
//! ends.

use bevy::prelude::*;

use crate::events::{EventBuffer, EventBus, GameEvent, flush_events_to_sqlite};
use crate::world::World;

use super::metrics::SimMetrics;

/// The world being simulated
#[derive(Resource)]
pub struct SimWorld(pub World);

/// Resource to control simulation
#[derive(Resource, Default)]
pub struct SimControl {
    /// Set once the run has ended and `RunEnd` was emitted
    pub should_exit: bool,
    /// Send `AppExit` when the run ends (for `App::run` drivers)
    pub exit_app: bool,
    /// Stop ticking without ending the run
    pub paused: bool,
}

impl SimControl {
    /// Control for loops that call `app.update()` and poll `should_exit`
    pub fn manual() -> Self {
        Self::default()
    }

    /// Control for apps driven by the schedule runner
    pub fn exit_on_end() -> Self {
        Self {
            exit_app: true,
            ..Self::default()
        }
    }
}

/// In-memory event log for one simulated run
#[derive(Resource, Default)]
pub struct SimEventLog {
    pub buffer: EventBuffer,
    pub enabled: bool,
}

/// Systems that drive a `SimWorld`, in order
pub struct CycleSimPlugin;

impl Plugin for CycleSimPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimMetrics>()
            .init_resource::<SimEventLog>()
            .init_resource::<SimControl>()
            .init_resource::<EventBus>()
            .add_systems(
                Update,
                (
                    advance_world,
                    check_run_end,
                    record_events,
                    flush_events_to_sqlite,
                    drain_bus,
                )
                    .chain(),
            );
    }
}

/// Run one world tick and publish its events
pub fn advance_world(
    mut sim: ResMut<SimWorld>,
    mut bus: ResMut<EventBus>,
    control: Res<SimControl>,
) {
    if control.should_exit || control.paused || !sim.0.is_running() {
        return;
    }
    let events = sim.0.tick();
    bus.publish(sim.0.tick_count(), events);
}

/// Single step for a paused world. Returns false when not paused, since
/// `advance_world` already ticks a running world every frame.
pub fn step_paused(world: &mut World, control: &SimControl, bus: &mut EventBus) -> bool {
    if !control.paused {
        return false;
    }
    let events = world.tick();
    bus.publish(world.tick_count(), events);
    true
}

/// Emit `RunEnd` once the world stops running
pub fn check_run_end(
    sim: Res<SimWorld>,
    mut control: ResMut<SimControl>,
    mut bus: ResMut<EventBus>,
    mut exit: MessageWriter<AppExit>,
) {
    let world = &sim.0;
    if control.should_exit || world.is_running() {
        return;
    }

    info!(
        "Run ended on {}: {} after {} ticks, {} deaths",
        world.level().name,
        world.status(),
        world.tick_count(),
        world.deaths()
    );
    bus.publish(world.tick_count(), [GameEvent::RunEnd {
        status: world.status().name().to_string(),
        ticks: world.tick_count(),
        deaths: world.deaths(),
    }]);
    control.should_exit = true;
    if control.exit_app {
        exit.write(AppExit::Success);
    }
}

/// Count pending events and copy them into the evlog buffer
pub fn record_events(
    bus: Res<EventBus>,
    mut metrics: ResMut<SimMetrics>,
    mut log: ResMut<SimEventLog>,
) {
    if bus.pending().is_empty() {
        return;
    }
    metrics.record_all(bus.pending().iter().map(|e| &e.event));
    if log.enabled {
        log.buffer
            .import_events(bus.pending().iter().map(|e| (e.tick, e.event.clone())).collect());
    }
}

/// Drop whatever no logger consumed this frame
pub fn drain_bus(mut bus: ResMut<EventBus>) {
    bus.end_frame();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelDatabase;
    use crate::simulation::HeadlessAppBuilder;
    use crate::tuning::SimTuning;
    use crate::world::RunStatus;

    fn app_for(program: &str) -> App {
        let db = LevelDatabase::default_levels();
        let world =
            World::with_program(db.levels[0].clone(), 1, SimTuning::default(), program).unwrap();
        let mut app = HeadlessAppBuilder::new().build();
        app.add_plugins(CycleSimPlugin);
        app.insert_resource(SimWorld(world));
        app.insert_resource(SimEventLog {
            buffer: EventBuffer::new(),
            enabled: true,
        });
        app
    }

    #[test]
    fn test_app_runs_level_to_completion() {
        let mut app = app_for("W");
        for _ in 0..100 {
            app.update();
            if app.world().resource::<SimControl>().should_exit {
                break;
            }
        }
        let world = &app.world().resource::<SimWorld>().0;
        assert_eq!(world.status(), RunStatus::Complete);
        assert_eq!(world.tick_count(), 9);

        let metrics = app.world().resource::<SimMetrics>();
        assert_eq!(metrics.steps, 9);
        assert_eq!(metrics.unlocks, 1);

        let log = app.world().resource::<SimEventLog>();
        let last = log.buffer.events().last().unwrap();
        assert!(matches!(last.1, GameEvent::RunEnd { ticks: 9, .. }));
        assert!(app.world().resource::<EventBus>().pending().is_empty());
    }

    #[test]
    fn test_paused_world_does_not_tick() {
        let mut app = app_for("W");
        app.world_mut().resource_mut::<SimControl>().paused = true;
        app.update();
        app.update();
        assert_eq!(app.world().resource::<SimWorld>().0.tick_count(), 0);
    }

    #[test]
    fn test_step_requires_pause() {
        let db = LevelDatabase::default_levels();
        let mut world =
            World::with_program(db.levels[0].clone(), 1, SimTuning::default(), "W").unwrap();
        let mut bus = EventBus::new();
        let mut control = SimControl::manual();

        assert!(!step_paused(&mut world, &control, &mut bus));
        assert_eq!(world.tick_count(), 0);
        assert!(bus.pending().is_empty());

        control.paused = true;
        assert!(step_paused(&mut world, &control, &mut bus));
        assert_eq!(world.tick_count(), 1);
        assert!(bus.pending().iter().all(|e| e.tick == 1));
        assert!(!bus.pending().is_empty());
    }
}
