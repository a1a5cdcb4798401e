//! Event logger for run analytics
//!
//! Writes `.evlog` files (one serialized event per line) for interactive and
//! simulated runs.

use bevy::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use uuid::Uuid;

use super::format::serialize_event;
use super::types::GameEvent;
use crate::constants::LOG_DIR;
use crate::tuning::SimTuning;

/// Configuration for event logging
#[derive(Resource, Clone)]
pub struct EventLogConfig {
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Whether logging is enabled
    pub enabled: bool,
    /// Also log `GroupSkipped` events (noisy on guard-heavy programs)
    pub log_skips: bool,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(LOG_DIR),
            enabled: true,
            log_skips: false,
        }
    }
}

/// Active event logger with file handle
#[derive(Resource)]
pub struct EventLogger {
    writer: Option<BufWriter<File>>,
    session_id: String,
    config: EventLogConfig,
}

impl EventLogger {
    /// Create a new event logger (but don't open file yet)
    pub fn new(config: EventLogConfig) -> Self {
        Self {
            writer: None,
            session_id: String::new(),
            config,
        }
    }

    /// Start a new log session
    /// Generates a new UUID for this session and logs SessionStart event
    pub fn start_session(&mut self, timestamp: &str) {
        if !self.config.enabled {
            return;
        }

        self.session_id = Uuid::new_v4().to_string();

        if let Err(e) = std::fs::create_dir_all(&self.config.log_dir) {
            warn!("Failed to create log directory: {}", e);
            return;
        }

        // Timestamps contain ':' which some filesystems reject
        let stamp: String = timestamp
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let filename = format!("{}_{}.evlog", stamp, &self.session_id[..8]);
        let path = self.config.log_dir.join(filename);

        match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
            Ok(file) => {
                self.writer = Some(BufWriter::new(file));
                info!("Event logging started: {} (session: {})", path.display(), &self.session_id[..8]);

                self.log(0, &GameEvent::SessionStart {
                    session_id: self.session_id.clone(),
                    timestamp: timestamp.to_string(),
                });
            }
            Err(e) => {
                warn!("Failed to open event log: {}", e);
            }
        }
    }

    /// Log the tuning in effect (call after start_session)
    pub fn log_config(&mut self, tuning: &SimTuning) {
        self.log(0, &GameEvent::Config(tuning.clone()));
    }

    /// Get the current session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// End the current log session
    pub fn end_session(&mut self) {
        if let Some(mut writer) = self.writer.take()
            && let Err(e) = writer.flush()
        {
            warn!("Failed to flush event log: {}", e);
        }
    }

    /// Log an event
    pub fn log(&mut self, tick: u64, event: &GameEvent) {
        if !self.config.log_skips && matches!(event, GameEvent::GroupSkipped { .. }) {
            return;
        }
        let Some(writer) = &mut self.writer else {
            return;
        };

        let line = serialize_event(tick, event);
        if let Err(e) = writeln!(writer, "{}", line) {
            warn!("Failed to write event: {}", e);
        }
    }

    /// Check if logging is active
    pub fn is_active(&self) -> bool {
        self.writer.is_some()
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new(EventLogConfig::default())
    }
}

/// Simple in-memory event buffer for simulation (no file I/O)
#[derive(Default)]
pub struct EventBuffer {
    events: Vec<(u64, GameEvent)>,
    session_id: String,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session with a fresh UUID
    pub fn start_session(&mut self, timestamp: &str) {
        self.clear();
        self.session_id = Uuid::new_v4().to_string();
        self.log(0, GameEvent::SessionStart {
            session_id: self.session_id.clone(),
            timestamp: timestamp.to_string(),
        });
    }

    /// Get the current session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.session_id.clear();
    }

    pub fn log(&mut self, tick: u64, event: GameEvent) {
        self.events.push((tick, event));
    }

    pub fn events(&self) -> &[(u64, GameEvent)] {
        &self.events
    }

    /// Import events from an external source (like EventBus)
    pub fn import_events(&mut self, events: Vec<(u64, GameEvent)>) {
        self.events.extend(events);
    }

    /// Serialize all events to a log string
    pub fn serialize(&self) -> String {
        self.events
            .iter()
            .map(|(tick, e)| serialize_event(*tick, e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_session_and_serialize() {
        let mut buffer = EventBuffer::new();
        buffer.start_session("2026-01-01T00:00:00Z");
        assert_eq!(buffer.session_id().len(), 36);
        buffer.import_events(vec![(4, GameEvent::Stalled)]);

        let text = buffer.serialize();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("T:00000|SE|"));
        assert_eq!(lines[1], "T:00004|SL|");
    }

    #[test]
    fn test_disabled_logger_stays_inactive() {
        let mut logger = EventLogger::new(EventLogConfig {
            enabled: false,
            ..Default::default()
        });
        logger.start_session("now");
        logger.log(1, &GameEvent::Stalled);
        assert!(!logger.is_active());
    }
}
