//! Run event logging
//!
//! Provides a compact text format for every event a run produces. Used by
//! the interactive binary, batch simulation and scenario tests.
//!
//! The EventBus decouples the world step from its observers; events can be
//! written to `.evlog` files and to SQLite.

mod bus;
pub mod evlog_parser;
mod format;
mod logger;
mod sqlite_logger;
mod types;

pub use bus::{BusEvent, EventBus};
pub use evlog_parser::{ParsedEvlog, RunMetadata, TickedEvent, parse_evlog, parse_evlog_content};
pub use format::{parse_event, serialize_event};
pub use logger::{EventBuffer, EventLogConfig, EventLogger};
pub use sqlite_logger::{SqliteEventLogger, create_session, flush_events_to_sqlite, init_schema};
pub use types::{DeathCause, GameEvent};
