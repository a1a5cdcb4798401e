//! Scenario testing system for deterministic program testing
//!
//! Runs TOML scenarios (level, program, mid-run submissions, expected event
//! sequence and state checks) against a headless world.

pub mod assertions;
pub mod parser;
pub mod runner;

use std::fs;
use std::path::{Path, PathBuf};

pub use assertions::{AssertionError, CapturedEvent, check_absent, check_sequence, check_state};
pub use parser::{
    ExpectedEvent, StateAssertion, TestDefinition, TestExpectations, TestSetup, TickInput,
    parse_test_file,
};
pub use runner::{TestResult, run_test};

/// Default path for test scenarios
pub const SCENARIOS_DIR: &str = "tests/scenarios";

/// Tally of scenario outcomes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioSummary {
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

impl ScenarioSummary {
    pub fn record(&mut self, result: &TestResult) {
        match result {
            TestResult::Pass { .. } => self.passed += 1,
            TestResult::Fail { .. } => self.failed += 1,
            TestResult::Error { .. } => self.errors += 1,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

impl std::fmt::Display for ScenarioSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} errors",
            self.passed, self.failed, self.errors
        )
    }
}

/// One report line per scenario; `detail` adds expected and actual values
pub fn report_line(name: &str, result: &TestResult, detail: bool) -> String {
    match result {
        TestResult::Pass { ticks } => format!("  ok    {} ({} ticks)", name, ticks),
        TestResult::Fail { error } if detail => format!("  FAIL  {}: {}", name, error),
        TestResult::Fail { error } => format!("  FAIL  {}: {}", name, error.message),
        TestResult::Error { message } => format!("  ERROR {}: {}", name, message),
    }
}

/// Run every scenario under `base` matching `filter`, printing results
/// grouped by directory
pub fn run_scenarios(base: &Path, filter: Option<&str>, detail: bool) -> ScenarioSummary {
    let mut summary = ScenarioSummary::default();
    let mut group = None;

    for path in discover_tests(base, filter) {
        let rel = path.strip_prefix(base).unwrap_or(&path).to_path_buf();
        let dir = rel.parent().map(|p| p.display().to_string()).unwrap_or_default();
        if group.as_ref() != Some(&dir) {
            if !dir.is_empty() {
                println!("{}/", dir);
            }
            group = Some(dir);
        }

        let result = match parse_test_file(&path) {
            Ok(def) => run_test(&def),
            Err(message) => TestResult::Error { message },
        };
        summary.record(&result);

        let name = rel.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        println!("{}", report_line(&name, &result, detail));
    }
    summary
}

/// Find `.toml` scenarios under `base`, sorted, keeping paths containing `filter`
pub fn discover_tests(base: &Path, filter: Option<&str>) -> Vec<PathBuf> {
    let mut tests = Vec::new();
    discover_tests_recursive(base, base, filter, &mut tests);
    tests.sort();
    tests
}

fn discover_tests_recursive(
    base: &Path,
    current: &Path,
    filter: Option<&str>,
    tests: &mut Vec<PathBuf>,
) {
    let entries = match fs::read_dir(current) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_dir() {
            discover_tests_recursive(base, &path, filter, tests);
        } else if path.extension().is_some_and(|e| e == "toml") {
            if let Some(f) = filter {
                let rel = path.strip_prefix(base).unwrap_or(&path).to_string_lossy();
                if !rel.contains(f) {
                    continue;
                }
            }
            tests.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> TestResult {
        TestResult::Fail {
            error: AssertionError {
                message: "pos mismatch".to_string(),
                expected: "4,1".to_string(),
                actual: "3,1".to_string(),
            },
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ScenarioSummary::default();
        summary.record(&TestResult::Pass { ticks: 9 });
        assert!(summary.all_passed());

        summary.record(&failure());
        summary.record(&TestResult::Error {
            message: "bad toml".to_string(),
        });
        assert!(!summary.all_passed());
        assert_eq!(summary.to_string(), "1 passed, 1 failed, 1 errors");
    }

    #[test]
    fn test_report_line_detail() {
        assert_eq!(
            report_line("walk", &TestResult::Pass { ticks: 9 }, false),
            "  ok    walk (9 ticks)"
        );
        assert_eq!(report_line("gap", &failure(), false), "  FAIL  gap: pos mismatch");
        assert!(report_line("gap", &failure(), true).contains("Expected: 4,1"));
    }

    #[test]
    fn test_run_scenarios_filter_without_matches() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join(SCENARIOS_DIR);
        let summary = run_scenarios(&dir, Some("no_such_scenario"), false);
        assert_eq!(summary, ScenarioSummary::default());
    }
}
