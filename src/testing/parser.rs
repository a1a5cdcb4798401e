//! TOML test file parsing

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Complete test definition from TOML file
#[derive(Debug, Deserialize)]
pub struct TestDefinition {
    pub name: String,
    pub description: Option<String>,
    pub setup: TestSetup,
    /// Programs submitted while the run is in progress
    #[serde(default)]
    pub input: Vec<TickInput>,
    #[serde(default)]
    pub expect: TestExpectations,
}

/// Test setup configuration
#[derive(Debug, Deserialize)]
pub struct TestSetup {
    /// Level number (1-based) or name
    pub level: String,
    /// Program loaded before the first tick (omit to start with none)
    pub program: Option<String>,
    /// Programs loaded after each first checkpoint activation
    #[serde(default)]
    pub stages: Vec<String>,
    /// Tick limit for this test (defaults to the tuning value)
    pub max_ticks: Option<u64>,
    /// Level file to load instead of the default
    pub levels_file: Option<String>,
}

/// Program submission once `tick` ticks have run
#[derive(Debug, Clone, Deserialize)]
pub struct TickInput {
    pub tick: u64,
    pub program: String,
}

/// Expected test outcomes
#[derive(Debug, Default, Deserialize)]
pub struct TestExpectations {
    #[serde(default)]
    pub sequence: Vec<ExpectedEvent>,
    /// Multiple state assertions at different ticks (uses [[expect.state]] TOML syntax)
    #[serde(default)]
    pub state: Vec<StateAssertion>,
    /// Events that must never be emitted (by code, e.g. "DE")
    #[serde(default)]
    pub absent: Vec<String>,
}

/// Expected event in sequence
#[derive(Debug, Deserialize)]
pub struct ExpectedEvent {
    /// Event code, e.g. "CP"
    pub event: String,
    /// Exact serialized fields after the code, e.g. "0|3,1|1"
    pub data: Option<String>,
    pub tick_min: Option<u64>,
    pub tick_max: Option<u64>,
}

/// State assertion after simulation
#[derive(Debug, Clone, Deserialize)]
pub struct StateAssertion {
    pub after_tick: u64,
    #[serde(default)]
    pub checks: Vec<String>,
}

/// Parse a test file from path
pub fn parse_test_file(path: &Path) -> Result<TestDefinition, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}
