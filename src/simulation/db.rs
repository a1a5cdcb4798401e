//! SQLite database for simulation results
//!
//! Provides persistent storage and querying of run results. Shares its
//! schema with the event logger, so runs from the interactive binary and
//! from batch simulations land in the same tables.

use rusqlite::{Connection, Result, params};
use std::path::Path;

use crate::events::{create_session, init_schema};

use super::metrics::RunResult;

/// Database wrapper for simulation results
pub struct SimDatabase {
    conn: Connection,
}

impl SimDatabase {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent reads during writes
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        // Set busy timeout for parallel access
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Create a new session and return its ID
    pub fn create_session(&self, session_type: &str, config_json: Option<&str>) -> Result<String> {
        create_session(&self.conn, session_type, config_json)
    }

    /// Insert a run result and return the run ID
    pub fn insert_run(&self, session_id: &str, result: &RunResult) -> Result<i64> {
        self.conn.execute(
            r#"INSERT INTO runs
               (session_id, level, level_name, program, status, ticks, deaths,
                checkpoints, cycles, seed)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                session_id,
                result.level,
                result.level_name,
                result.program,
                result.status.name(),
                result.ticks as i64,
                result.deaths,
                result.checkpoints as i64,
                result.cycles as i64,
                result.seed.map(|s| s as i64),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Aggregate stats for one level across all stored runs
    pub fn level_stats(&self, level_name: &str) -> Result<LevelStats> {
        self.conn.query_row(
            r#"SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'Complete' THEN 1 ELSE 0 END), 0),
                COALESCE(AVG(CASE WHEN status = 'Complete' THEN ticks END), 0.0),
                COALESCE(AVG(deaths), 0.0)
               FROM runs WHERE level_name = ?1"#,
            params![level_name],
            |row| {
                Ok(LevelStats {
                    level_name: level_name.to_string(),
                    runs: row.get(0)?,
                    complete: row.get(1)?,
                    avg_complete_ticks: row.get(2)?,
                    avg_deaths: row.get(3)?,
                })
            },
        )
    }

    /// Fastest completing program stored for a level
    pub fn best_program(&self, level_name: &str) -> Result<Option<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT program, ticks FROM runs
               WHERE level_name = ?1 AND status = 'Complete'
               ORDER BY ticks ASC, deaths ASC, LENGTH(program) ASC
               LIMIT 1"#,
        )?;
        let mut rows = stmt.query_map(params![level_name], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.next().transpose()
    }

    /// Get run count
    pub fn run_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))
    }

    /// Get session count
    pub fn session_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
    }
}

/// Aggregate stats for a level
#[derive(Debug, Clone)]
pub struct LevelStats {
    pub level_name: String,
    pub runs: i64,
    pub complete: i64,
    pub avg_complete_ticks: f64,
    pub avg_deaths: f64,
}

impl LevelStats {
    pub fn completion_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.complete as f64 / self.runs as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::metrics::SimMetrics;
    use crate::world::RunStatus;

    fn sample_result() -> RunResult {
        RunResult {
            level: 2,
            level_name: "Gap".to_string(),
            program: "J W".to_string(),
            status: RunStatus::Complete,
            ticks: 6,
            deaths: 0,
            checkpoints: 1,
            checkpoints_total: 1,
            cycles: 2,
            seed: Some(12345),
            metrics: SimMetrics::default(),
        }
    }

    #[test]
    fn test_create_database() {
        let db = SimDatabase::open_in_memory().unwrap();
        assert_eq!(db.run_count().unwrap(), 0);
        assert_eq!(db.session_count().unwrap(), 0);
    }

    #[test]
    fn test_insert_run() {
        let db = SimDatabase::open_in_memory().unwrap();
        let session_id = db.create_session("test", None).unwrap();

        let run_id = db.insert_run(&session_id, &sample_result()).unwrap();

        assert!(run_id > 0);
        assert_eq!(db.run_count().unwrap(), 1);
        assert_eq!(db.session_count().unwrap(), 1);
    }

    #[test]
    fn test_level_stats_and_best_program() {
        let db = SimDatabase::open_in_memory().unwrap();
        let session_id = db.create_session("test", None).unwrap();

        db.insert_run(&session_id, &sample_result()).unwrap();
        db.insert_run(&session_id, &RunResult {
            program: "W J W".to_string(),
            ticks: 9,
            ..sample_result()
        })
        .unwrap();
        db.insert_run(&session_id, &RunResult {
            program: "W".to_string(),
            status: RunStatus::TimedOut,
            ticks: 500,
            deaths: 90,
            ..sample_result()
        })
        .unwrap();

        let stats = db.level_stats("Gap").unwrap();
        assert_eq!(stats.runs, 3);
        assert_eq!(stats.complete, 2);
        assert!((stats.avg_complete_ticks - 7.5).abs() < 1e-9);
        assert!((stats.completion_rate() - 2.0 / 3.0).abs() < 1e-9);

        let best = db.best_program("Gap").unwrap();
        assert_eq!(best, Some(("J W".to_string(), 6)));
        assert_eq!(db.best_program("Ledges").unwrap(), None);
    }
}
