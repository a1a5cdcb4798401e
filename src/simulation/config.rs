//! Simulation configuration

use serde::{Deserialize, Serialize};

/// Simulation mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum SimMode {
    /// Run one program on one level
    #[default]
    Single,
    /// Run the same program on every level (or `levels`)
    LevelSweep,
    /// Try random programs within the level's rules
    Search { attempts: u32 },
    /// Parse the level file strictly and report problems
    CheckLevels,
    /// Summarize a recorded `.evlog`
    Summarize { path: String },
}

/// Configuration for a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub mode: SimMode,
    /// Level number (1-based) or name
    pub level: String,
    /// Program text to run
    pub program: String,
    /// Programs loaded after each checkpoint activation
    pub stages: Vec<String>,
    /// Levels for sweeps (empty = all)
    pub levels: Vec<String>,
    /// Overrides the tuning tick limit
    pub max_ticks: Option<u64>,
    /// Longest program tried by search, in actions (capped by the level budget)
    pub search_max_len: usize,
    /// Search also uses commands that are unlocked later in the level
    pub search_unrestricted: bool,
    /// RNG seed for reproducibility (None = random)
    pub seed: Option<u64>,
    /// Output file path (None = stdout)
    pub output_file: Option<String>,
    /// Suppress progress output
    pub quiet: bool,
    /// Number of parallel threads (0 = rayon default)
    pub parallel: usize,
    /// Path to SQLite database for storing results
    pub db_path: Option<String>,
    /// Write an evlog per run
    pub log_events: bool,
    pub log_dir: String,
    /// Path of the level file
    pub levels_file: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mode: SimMode::Single,
            level: "1".to_string(),
            program: "W".to_string(),
            stages: Vec::new(),
            levels: Vec::new(),
            max_ticks: None,
            search_max_len: 6,
            search_unrestricted: false,
            seed: None,
            output_file: None,
            quiet: false,
            parallel: 0,
            db_path: None,
            log_events: false,
            log_dir: crate::constants::LOG_DIR.to_string(),
            levels_file: crate::constants::LEVELS_FILE.to_string(),
        }
    }
}

/// Template simulation settings (checked into git)
pub const SIM_SETTINGS_TEMPLATE: &str = "config/simulation_settings.template.json";
/// Local simulation settings (gitignored, user's custom settings)
pub const SIM_SETTINGS_FILE: &str = "config/simulation_settings.json";

impl SimConfig {
    /// Load configuration from a JSON settings file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse {}: {}", path, e))
    }

    /// Load configuration from default config files
    /// Priority: local settings > template settings > built-in defaults
    pub fn from_config_files() -> Self {
        if let Ok(config) = Self::from_file(SIM_SETTINGS_FILE) {
            return config;
        }
        if let Ok(config) = Self::from_file(SIM_SETTINGS_TEMPLATE) {
            return config;
        }
        Self::default()
    }

    /// Parse configuration from command line arguments
    pub fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_arg_list(&args[1..])
    }

    /// Apply `--flag value` overrides on top of the config files
    pub fn from_arg_list(args: &[String]) -> Self {
        let mut config = Self::from_config_files();

        // Explicit settings file replaces the base before other overrides
        if let Some(i) = args.iter().position(|a| a == "--settings")
            && let Some(path) = args.get(i + 1)
        {
            match Self::from_file(path) {
                Ok(loaded) => config = loaded,
                Err(e) => eprintln!("Warning: {}", e),
            }
        }

        config.apply_args(args);
        config
    }

    fn apply_args(&mut self, args: &[String]) {
        let mut i = 0;
        while i < args.len() {
            let value = args.get(i + 1).filter(|v| !v.starts_with("--"));
            match args[i].as_str() {
                "--settings" => i += 1,
                "--level" => {
                    if let Some(v) = value {
                        self.level = v.clone();
                        i += 1;
                    }
                }
                "--levels" => {
                    if let Some(v) = value {
                        self.levels = split_list(v, ',');
                        i += 1;
                    }
                }
                "--program" => {
                    if let Some(v) = value {
                        self.program = v.clone();
                        i += 1;
                    }
                }
                "--stages" => {
                    if let Some(v) = value {
                        self.stages = split_list(v, ';');
                        i += 1;
                    }
                }
                "--max-ticks" => {
                    if let Some(v) = value {
                        self.max_ticks = v.parse().ok();
                        i += 1;
                    }
                }
                "--sweep" => self.mode = SimMode::LevelSweep,
                "--search" => {
                    let attempts = match value.and_then(|v| v.parse().ok()) {
                        Some(n) => {
                            i += 1;
                            n
                        }
                        None => 1000,
                    };
                    self.mode = SimMode::Search { attempts };
                }
                "--search-len" => {
                    if let Some(v) = value {
                        self.search_max_len = v.parse().unwrap_or(self.search_max_len);
                        i += 1;
                    }
                }
                "--unrestricted" => self.search_unrestricted = true,
                "--check-levels" => self.mode = SimMode::CheckLevels,
                "--evlog" => {
                    if let Some(v) = value {
                        self.mode = SimMode::Summarize { path: v.clone() };
                        i += 1;
                    }
                }
                "--seed" => {
                    if let Some(v) = value {
                        self.seed = v.parse().ok();
                        i += 1;
                    }
                }
                "--output" => {
                    if let Some(v) = value {
                        self.output_file = Some(v.clone());
                        i += 1;
                    }
                }
                "--quiet" | "-q" => self.quiet = true,
                "--parallel" => {
                    if let Some(v) = value {
                        self.parallel = v.parse().unwrap_or(0);
                        i += 1;
                    }
                }
                "--db" => {
                    if let Some(v) = value {
                        self.db_path = Some(v.clone());
                        i += 1;
                    }
                }
                "--log-events" => self.log_events = true,
                "--levels-file" => {
                    if let Some(v) = value {
                        self.levels_file = v.clone();
                        i += 1;
                    }
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                other => eprintln!("Warning: ignoring unknown argument {}", other),
            }
            i += 1;
        }
    }
}

fn split_list(s: &str, sep: char) -> Vec<String> {
    s.split(sep)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn print_help() {
    println!(
        r#"Cycle Simulation Tool - headless runs of instruction cycles

USAGE:
    cargo run --bin simulate -- [OPTIONS]

OPTIONS:
    --settings <FILE>     Load settings from JSON file (CLI args override file settings)
    --level <N|NAME>      Level number or name (default: 1)
    --program <TEXT>      Program to run, e.g. "( D ) W W J"
    --stages <LIST>       Programs loaded after each checkpoint, separated by ';'
    --levels <LIST>       Comma-separated levels for --sweep
    --max-ticks <N>       Tick limit per run (default from config/tuning.json)
    --sweep               Run the program on every level
    --search [N]          Try N random programs on the level (default: 1000)
    --search-len <N>      Longest random program in actions (default: 6)
    --unrestricted        Search with every command unlocked
    --check-levels        Validate the level file and exit
    --evlog <FILE>        Summarize a recorded event log and exit
    --seed <N>            RNG seed for reproducibility
    --output <FILE>       Output JSON to file (default: stdout)
    --quiet, -q           Suppress progress output
    --parallel <N>        Run with N threads
    --db <FILE>           Store results in SQLite database
    --log-events          Write an .evlog per run
    --levels-file <FILE>  Level file (default: config/levels.txt)
    --help, -h            Show this help

EXAMPLES:
    cargo run --bin simulate -- --level 2 --program "J W"
    cargo run --bin simulate -- --sweep --program "( C ) W" --db db/runs.db
    cargo run --bin simulate -- --level Ledges --search 5000 --seed 7 --parallel 8
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_apply_args() {
        let mut config = SimConfig::default();
        config.apply_args(&args(&[
            "--level", "Gap", "--program", "J W", "--stages", "W; J W", "--seed", "42", "-q",
        ]));
        assert_eq!(config.level, "Gap");
        assert_eq!(config.program, "J W");
        assert_eq!(config.stages, vec!["W".to_string(), "J W".to_string()]);
        assert_eq!(config.seed, Some(42));
        assert!(config.quiet);
        assert_eq!(config.mode, SimMode::Single);
    }

    #[test]
    fn test_search_with_and_without_count() {
        let mut config = SimConfig::default();
        config.apply_args(&args(&["--search", "50", "--quiet"]));
        assert_eq!(config.mode, SimMode::Search { attempts: 50 });
        assert!(config.quiet);

        config.apply_args(&args(&["--search", "--sweep"]));
        assert_eq!(config.mode, SimMode::LevelSweep);

        config.apply_args(&args(&["--search"]));
        assert_eq!(config.mode, SimMode::Search { attempts: 1000 });

        config.apply_args(&args(&["--evlog", "logs/a.evlog"]));
        assert_eq!(config.mode, SimMode::Summarize {
            path: "logs/a.evlog".to_string()
        });
    }

    #[test]
    fn test_partial_settings_json() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "program": "W J", "levels": ["1", "3"], "parallel": 4 }"#)
                .unwrap();
        assert_eq!(config.program, "W J");
        assert_eq!(config.levels.len(), 2);
        assert_eq!(config.parallel, 4);
        assert_eq!(config.level, "1");
    }
}
