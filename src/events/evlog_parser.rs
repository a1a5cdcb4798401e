//! Event log reader
//!
//! Turns `.evlog` files back into events plus a run summary.

use std::fs;
use std::path::Path;

use super::format::parse_event;
use super::types::GameEvent;

/// Parsed event with its tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickedEvent {
    pub tick: u64,
    pub event: GameEvent,
}

/// Run metadata extracted from SessionStart, RunStart and RunEnd events
#[derive(Debug, Clone, Default)]
pub struct RunMetadata {
    pub session_id: String,
    /// Level number (1-based)
    pub level: u32,
    pub level_name: String,
    pub program: String,
    /// From RunEnd; empty if the run never ended
    pub status: String,
    pub ticks: u64,
    pub deaths: u32,
}

/// A fully parsed evlog
#[derive(Debug, Clone, Default)]
pub struct ParsedEvlog {
    pub metadata: RunMetadata,
    pub events: Vec<TickedEvent>,
    /// Lines that could not be parsed
    pub skipped_lines: usize,
}

impl ParsedEvlog {
    pub fn checkpoints_reached(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.event, GameEvent::CheckpointReached { first: true, .. }))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e.event, GameEvent::LevelComplete { .. }))
    }
}

/// Parse an evlog file from disk
pub fn parse_evlog(path: &Path) -> Result<ParsedEvlog, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    Ok(parse_evlog_content(&content))
}

/// Parse evlog text
pub fn parse_evlog_content(content: &str) -> ParsedEvlog {
    let mut parsed = ParsedEvlog::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((tick, event)) = parse_event(line) else {
            parsed.skipped_lines += 1;
            continue;
        };

        match &event {
            GameEvent::SessionStart { session_id, .. } => {
                parsed.metadata.session_id = session_id.clone();
            }
            GameEvent::RunStart {
                level,
                level_name,
                program,
            } => {
                parsed.metadata.level = *level;
                parsed.metadata.level_name = level_name.clone();
                parsed.metadata.program = program.clone();
            }
            GameEvent::RunEnd {
                status,
                ticks,
                deaths,
            } => {
                parsed.metadata.status = status.clone();
                parsed.metadata.ticks = *ticks;
                parsed.metadata.deaths = *deaths;
            }
            _ => {}
        }

        parsed.events.push(TickedEvent { tick, event });
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
T:00000|SE|abc-123|2026-01-01T00:00:00Z
T:00000|RS|1|First Steps|W
T:00001|ST|W|2,1|R
not an event
T:00006|CP|0|7,1|1
T:00006|UN|Jump|2
T:00009|LC|9|0
T:00009|RE|Complete|9|0
";

    #[test]
    fn test_metadata() {
        let parsed = parse_evlog_content(LOG);
        assert_eq!(parsed.metadata.session_id, "abc-123");
        assert_eq!(parsed.metadata.level_name, "First Steps");
        assert_eq!(parsed.metadata.program, "W");
        assert_eq!(parsed.metadata.status, "Complete");
        assert_eq!(parsed.metadata.ticks, 9);
    }

    #[test]
    fn test_events_and_summary() {
        let parsed = parse_evlog_content(LOG);
        assert_eq!(parsed.events.len(), 7);
        assert_eq!(parsed.skipped_lines, 1);
        assert_eq!(parsed.checkpoints_reached(), 1);
        assert!(parsed.is_complete());
    }

    #[test]
    fn test_missing_file() {
        assert!(parse_evlog(Path::new("logs/missing.evlog")).is_err());
    }
}
