//! SQLite Event Logger - run and event storage
//!
//! Events flow from the bus into SQLite so runs can be analysed with SQL
//! instead of parsing evlog files.

use bevy::prelude::*;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;

use super::format::serialize_event;
use super::types::GameEvent;

/// Resource for logging events to SQLite
///
/// The database connection is wrapped in a Mutex so the resource is `Sync`.
#[derive(Resource)]
pub struct SqliteEventLogger {
    /// `None` when logging is disabled
    conn: Option<Mutex<Connection>>,
    session_id: String,
    current_run_id: Mutex<Option<i64>>,
}

impl SqliteEventLogger {
    /// Open (or create) the database and register a new session
    pub fn new(db_path: &Path, session_type: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(db_path)?;

        // Enable WAL mode for concurrent reads during writes
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Self::with_connection(conn, session_type)
    }

    /// Logger backed by an in-memory database
    pub fn in_memory(session_type: &str) -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open_in_memory()?, session_type)
    }

    fn with_connection(conn: Connection, session_type: &str) -> Result<Self, rusqlite::Error> {
        init_schema(&conn)?;
        let session_id = create_session(&conn, session_type, None)?;
        Ok(Self {
            conn: Some(Mutex::new(conn)),
            session_id,
            current_run_id: Mutex::new(None),
        })
    }

    /// Create a disabled logger (no-op)
    pub fn disabled() -> Self {
        Self {
            conn: None,
            session_id: String::new(),
            current_run_id: Mutex::new(None),
        }
    }

    /// Start a new run and return its ID
    pub fn start_run(&self, level: u32, level_name: &str, program: &str) -> Option<i64> {
        let conn = self.conn.as_ref()?.lock().ok()?;

        // Outcome columns are filled in by end_run
        let result = conn.execute(
            r#"INSERT INTO runs
               (session_id, level, level_name, program, status, ticks, deaths, checkpoints, cycles)
               VALUES (?1, ?2, ?3, ?4, 'Running', 0, 0, 0, 0)"#,
            params![self.session_id, level, level_name, program],
        );

        match result {
            Ok(_) => {
                let run_id = conn.last_insert_rowid();
                *self.current_run_id.lock().ok()? = Some(run_id);
                info!("Started run {} (level: {}, program: {})", run_id, level_name, program);
                Some(run_id)
            }
            Err(e) => {
                warn!("Failed to start run: {}", e);
                None
            }
        }
    }

    /// Log a single event
    pub fn log_event(&self, tick: u64, event: &GameEvent) {
        self.log_events(std::slice::from_ref(&(tick, event.clone())));
    }

    /// Log multiple events in one transaction
    pub fn log_events(&self, events: &[(u64, GameEvent)]) {
        if events.is_empty() {
            return;
        }
        let Some(run_id) = self.current_run_id() else {
            return;
        };
        let Some(Ok(mut conn)) = self.conn.as_ref().map(|c| c.lock()) else {
            return;
        };

        let tx = match conn.transaction() {
            Ok(tx) => tx,
            Err(e) => {
                warn!("Failed to begin event transaction: {}", e);
                return;
            }
        };

        for (tick, event) in events {
            let data = serialize_event(*tick, event);
            if let Err(e) = tx.execute(
                "INSERT INTO events (run_id, tick, event_type, data) VALUES (?1, ?2, ?3, ?4)",
                params![run_id, *tick as i64, event.type_code(), data],
            ) {
                // Dropping the transaction rolls it back
                warn!("Failed to log event: {}", e);
                return;
            }
        }

        if let Err(e) = tx.commit() {
            warn!("Failed to commit events: {}", e);
        }
    }

    /// End the current run and record its outcome
    pub fn end_run(&self, status: &str, ticks: u64, deaths: u32, checkpoints: usize, cycles: u64) {
        let Some(run_id) = self.current_run_id() else {
            return;
        };
        let Some(Ok(conn)) = self.conn.as_ref().map(|c| c.lock()) else {
            return;
        };

        let result = conn.execute(
            "UPDATE runs SET status = ?1, ticks = ?2, deaths = ?3, checkpoints = ?4, cycles = ?5 WHERE id = ?6",
            params![status, ticks as i64, deaths, checkpoints as i64, cycles as i64, run_id],
        );

        if let Err(e) = result {
            warn!("Failed to end run: {}", e);
        } else {
            info!("Ended run {} ({} after {} ticks, {} deaths)", run_id, status, ticks, deaths);
        }

        if let Ok(mut guard) = self.current_run_id.lock() {
            *guard = None;
        }
    }

    /// Get the current run ID (if a run is in progress)
    pub fn current_run_id(&self) -> Option<i64> {
        self.current_run_id.lock().ok().and_then(|g| *g)
    }

    /// Get the session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    /// Get event count for the current run
    pub fn event_count(&self) -> Option<u64> {
        let run_id = self.current_run_id()?;
        let conn = self.conn.as_ref()?.lock().ok()?;
        conn.query_row(
            "SELECT COUNT(*) FROM events WHERE run_id = ?1",
            params![run_id],
            |row| row.get::<_, i64>(0),
        )
        .ok()
        .map(|n| n as u64)
    }
}

/// Initialize the shared database schema (also used by the batch database)
pub fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            session_type TEXT NOT NULL,
            config_json TEXT
        );

        CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY,
            session_id TEXT REFERENCES sessions(id),
            level INTEGER NOT NULL,
            level_name TEXT NOT NULL,
            program TEXT NOT NULL,
            status TEXT NOT NULL,
            ticks INTEGER NOT NULL,
            deaths INTEGER NOT NULL,
            checkpoints INTEGER NOT NULL,
            cycles INTEGER NOT NULL,
            seed INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_runs_session ON runs(session_id);
        CREATE INDEX IF NOT EXISTS idx_runs_level ON runs(level);
        CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY,
            run_id INTEGER REFERENCES runs(id),
            tick INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_events_run ON events(run_id);
        CREATE INDEX IF NOT EXISTS idx_events_type ON events(event_type);
        CREATE INDEX IF NOT EXISTS idx_events_tick ON events(run_id, tick);
        "#,
    )?;
    Ok(())
}

/// Create a new session and return its ID
pub fn create_session(
    conn: &Connection,
    session_type: &str,
    config_json: Option<&str>,
) -> Result<String, rusqlite::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO sessions (id, created_at, session_type, config_json) VALUES (?1, ?2, ?3, ?4)",
        params![id, created_at, session_type, config_json],
    )?;

    Ok(id)
}

/// System to flush EventBus events to SQLite
pub fn flush_events_to_sqlite(
    mut event_bus: ResMut<super::bus::EventBus>,
    logger: Option<Res<SqliteEventLogger>>,
) {
    let Some(logger) = logger else {
        return;
    };

    // Take even when disabled to prevent buildup
    let events = event_bus.take_for_flush();
    if logger.is_enabled() && !events.is_empty() {
        logger.log_events(&events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Facing;
    use crate::script::Action;

    fn create_test_logger() -> SqliteEventLogger {
        SqliteEventLogger::in_memory("test").unwrap()
    }

    #[test]
    fn test_start_and_end_run() {
        let logger = create_test_logger();

        let run_id = logger.start_run(1, "Test Level", "W J");
        assert!(run_id.is_some());
        assert!(logger.current_run_id().is_some());

        logger.end_run("Complete", 12, 1, 2, 4);
        assert!(logger.current_run_id().is_none());
    }

    #[test]
    fn test_log_events() {
        let logger = create_test_logger();
        logger.start_run(1, "Test Level", "W");

        logger.log_event(1, &GameEvent::Step {
            action: Action::Walk,
            pos: IVec2::new(2, 1),
            facing: Facing::Right,
        });
        logger.log_events(&[
            (2, GameEvent::Stalled),
            (3, GameEvent::CycleRestart { cycle: 1 }),
        ]);

        assert_eq!(logger.event_count(), Some(3));
    }

    #[test]
    fn test_events_without_run_are_dropped() {
        let logger = create_test_logger();
        logger.log_event(1, &GameEvent::Stalled);
        assert_eq!(logger.event_count(), None);
    }

    #[test]
    fn test_disabled_logger() {
        let logger = SqliteEventLogger::disabled();
        assert!(!logger.is_enabled());
        assert!(logger.start_run(1, "Test", "W").is_none());

        // Should not panic
        logger.log_event(0, &GameEvent::Stalled);
        logger.end_run("Complete", 0, 0, 0, 0);
    }
}
