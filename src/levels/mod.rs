//! Levels module - text level database and tile queries

mod database;
mod grid;

pub use database::*;

use bevy::prelude::*;

use crate::constants::LEVELS_FILE;

/// Load the level database from the default file into the app
pub fn load_levels(mut commands: Commands) {
    commands.insert_resource(LevelDatabase::load_from_file(LEVELS_FILE));
}
