//! Headless App Builder
//!
//! Provides a reusable builder for creating headless Bevy apps that drive a
//! world tick by tick. Used by the simulation runner, scenario tests and
//! the interactive binary.

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use std::time::Duration;

use crate::events::EventBus;
use crate::levels::LevelDatabase;
use crate::tuning::SimTuning;

/// Builder for creating headless Bevy apps
pub struct HeadlessAppBuilder {
    level_db: Option<LevelDatabase>,
    tuning: SimTuning,
    minimal_threads: bool,
    event_bus: bool,
}

impl HeadlessAppBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            level_db: None,
            tuning: SimTuning::default(),
            minimal_threads: false,
            event_bus: true,
        }
    }

    /// Set the level database
    pub fn with_level_db(mut self, level_db: LevelDatabase) -> Self {
        self.level_db = Some(level_db);
        self
    }

    /// Set the tuning (also sets the runner's frame period)
    pub fn with_tuning(mut self, tuning: SimTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Enable minimal thread mode (task pools = 1)
    ///
    /// Use this when running many apps in parallel to avoid hitting OS thread limits.
    pub fn with_minimal_threads(mut self) -> Self {
        self.minimal_threads = true;
        self
    }

    /// Insert a disabled event bus (events are dropped)
    pub fn without_events(mut self) -> Self {
        self.event_bus = false;
        self
    }

    /// Build the app with minimal plugins and common resources
    ///
    /// The returned app has:
    /// - MinimalPlugins with ScheduleRunnerPlugin at one frame per tick
    /// - SimTuning and EventBus resources
    /// - LevelDatabase if provided
    ///
    /// Callers add the world plugin and any extra resources.
    pub fn build(self) -> App {
        let mut app = App::new();

        let period = Duration::from_secs_f32(self.tuning.tick_seconds.max(0.001));
        if self.minimal_threads {
            app.add_plugins(
                MinimalPlugins
                    .set(ScheduleRunnerPlugin::run_loop(period))
                    .set(TaskPoolPlugin {
                        task_pool_options: TaskPoolOptions::with_num_threads(1),
                    }),
            );
        } else {
            app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(period)));
        }

        app.insert_resource(self.tuning);
        app.insert_resource(if self.event_bus {
            EventBus::new()
        } else {
            EventBus::muted()
        });

        if let Some(level_db) = self.level_db {
            app.insert_resource(level_db);
        }

        app
    }
}

impl Default for HeadlessAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creates_app() {
        let app = HeadlessAppBuilder::new()
            .with_level_db(LevelDatabase::default_levels())
            .build();
        assert!(app.world().contains_resource::<SimTuning>());
        assert!(app.world().contains_resource::<LevelDatabase>());
        assert!(app.world().resource::<EventBus>().is_enabled());
    }

    #[test]
    fn test_minimal_threads_without_events() {
        let app = HeadlessAppBuilder::new()
            .with_minimal_threads()
            .without_events()
            .build();
        assert!(!app.world().resource::<EventBus>().is_enabled());
        assert!(!app.world().contains_resource::<LevelDatabase>());
    }
}
