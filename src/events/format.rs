//! Compact text format for event serialization
//!
//! Format: `T:NNNNN|CODE|data...`
//! - T:NNNNN = tick number (5 digits, wraps at 99999)
//! - CODE = event type code
//! - data = pipe-separated values specific to event type
//!
//! Examples:
//! ```text
//! T:00000|RS|1|First Steps|W
//! T:00001|ST|W|2,1|R
//! T:00004|BL|C|5,1
//! T:00006|FL|6,3|6,1
//! T:00007|CP|0|7,1|1
//! T:00007|UN|Jump|2
//! T:00012|DE|4,0|H
//! T:00012|RP|7,1|R
//! T:00020|LC|20|1
//! ```

use super::types::{DeathCause, GameEvent};
use crate::constants::TIMESTAMP_WRAP;
use crate::helpers::{Facing, fmt_pos, parse_pos};
use crate::script::{Action, ScriptCommand};
use crate::tuning::SimTuning;

/// Serialize a GameEvent to compact text format
pub fn serialize_event(tick: u64, event: &GameEvent) -> String {
    let ts = format!("T:{:05}", tick % TIMESTAMP_WRAP);
    let code = event.type_code();

    let data = match event {
        GameEvent::SessionStart {
            session_id,
            timestamp,
        } => {
            format!("{}|{}", session_id, timestamp)
        }
        GameEvent::Config(tuning) => {
            // Serialize config as compact JSON for easy parsing
            serde_json::to_string(tuning).unwrap_or_else(|_| "{}".to_string())
        }
        GameEvent::RunStart {
            level,
            level_name,
            program,
        } => {
            format!("{}|{}|{}", level, level_name, program)
        }
        GameEvent::RunEnd {
            status,
            ticks,
            deaths,
        } => {
            format!("{}|{}|{}", status, ticks, deaths)
        }
        GameEvent::ProgramLoaded { program } => program.clone(),
        GameEvent::ProgramRejected { error } => error.clone(),
        GameEvent::Step {
            action,
            pos,
            facing,
        } => {
            format!("{}|{}|{}", action, fmt_pos(*pos), facing)
        }
        GameEvent::Blocked { action, pos } => format!("{}|{}", action, fmt_pos(*pos)),
        GameEvent::Fell { from, to } => format!("{}|{}", fmt_pos(*from), fmt_pos(*to)),
        GameEvent::GroupSkipped { pc } => pc.to_string(),
        GameEvent::Stalled => String::new(),
        GameEvent::CycleRestart { cycle } => cycle.to_string(),
        GameEvent::CheckpointReached { index, pos, first } => {
            format!("{}|{}|{}", index, fmt_pos(*pos), if *first { 1 } else { 0 })
        }
        GameEvent::CommandUnlocked {
            command,
            command_count,
        } => {
            format!("{}|{}", command.unlock_name(), command_count)
        }
        GameEvent::Death { pos, cause } => format!("{}|{}", fmt_pos(*pos), cause.code()),
        GameEvent::Respawn { pos, facing } => format!("{}|{}", fmt_pos(*pos), facing),
        GameEvent::LevelComplete { ticks, deaths } => format!("{}|{}", ticks, deaths),
    };

    format!("{}|{}|{}", ts, code, data)
}

/// Parse a line back into tick and event (for replay and scenario checks)
pub fn parse_event(line: &str) -> Option<(u64, GameEvent)> {
    let parts: Vec<&str> = line.trim_end().split('|').collect();
    if parts.len() < 2 {
        return None;
    }

    // Parse timestamp
    let ts_str = parts[0].strip_prefix("T:")?;
    let tick: u64 = ts_str.parse().ok()?;

    let code = parts[1];
    let data = &parts[2..];

    let event = match code {
        "SE" if data.len() >= 2 => GameEvent::SessionStart {
            session_id: data[0].to_string(),
            timestamp: data[1].to_string(),
        },
        "CF" if !data.is_empty() => {
            // Config is serialized as JSON, rejoin with | in case JSON contains |
            let json_str = data.join("|");
            let tuning: SimTuning = serde_json::from_str(&json_str).ok()?;
            GameEvent::Config(tuning)
        }
        "RS" if data.len() >= 3 => GameEvent::RunStart {
            level: data[0].parse().ok()?,
            level_name: data[1].to_string(),
            program: data[2..].join("|"),
        },
        "RE" if data.len() >= 3 => GameEvent::RunEnd {
            status: data[0].to_string(),
            ticks: data[1].parse().ok()?,
            deaths: data[2].parse().ok()?,
        },
        "PL" if !data.is_empty() => GameEvent::ProgramLoaded {
            program: data.join("|"),
        },
        // Error text may itself contain '|' (e.g. an unknown token)
        "PX" if !data.is_empty() => GameEvent::ProgramRejected {
            error: data.join("|"),
        },
        "ST" if data.len() >= 3 => GameEvent::Step {
            action: parse_action(data[0])?,
            pos: parse_pos(data[1])?,
            facing: Facing::parse(data[2])?,
        },
        "BL" if data.len() >= 2 => GameEvent::Blocked {
            action: parse_action(data[0])?,
            pos: parse_pos(data[1])?,
        },
        "FL" if data.len() >= 2 => GameEvent::Fell {
            from: parse_pos(data[0])?,
            to: parse_pos(data[1])?,
        },
        "GS" if !data.is_empty() => GameEvent::GroupSkipped {
            pc: data[0].parse().ok()?,
        },
        "SL" => GameEvent::Stalled,
        "CR" if !data.is_empty() => GameEvent::CycleRestart {
            cycle: data[0].parse().ok()?,
        },
        "CP" if data.len() >= 3 => GameEvent::CheckpointReached {
            index: data[0].parse().ok()?,
            pos: parse_pos(data[1])?,
            first: data[2] == "1",
        },
        "UN" if data.len() >= 2 => GameEvent::CommandUnlocked {
            command: ScriptCommand::from_unlock_name(data[0])?,
            command_count: data[1].parse().ok()?,
        },
        "DE" if data.len() >= 2 => GameEvent::Death {
            pos: parse_pos(data[0])?,
            cause: DeathCause::from_code(data[1])?,
        },
        "RP" if data.len() >= 2 => GameEvent::Respawn {
            pos: parse_pos(data[0])?,
            facing: Facing::parse(data[1])?,
        },
        "LC" if data.len() >= 2 => GameEvent::LevelComplete {
            ticks: data[0].parse().ok()?,
            deaths: data[1].parse().ok()?,
        },
        _ => return None,
    };

    Some((tick, event))
}

fn parse_action(s: &str) -> Option<Action> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Action::from_letter(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::prelude::IVec2;

    #[test]
    fn test_roundtrip_step() {
        let event = GameEvent::Step {
            action: Action::Jump,
            pos: IVec2::new(4, 2),
            facing: Facing::Left,
        };
        let line = serialize_event(12, &event);
        assert_eq!(line, "T:00012|ST|J|4,2|L");
        let (tick, parsed) = parse_event(&line).unwrap();
        assert_eq!(tick, 12);
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_roundtrip_death_and_respawn() {
        let death = GameEvent::Death {
            pos: IVec2::new(5, -1),
            cause: DeathCause::Void,
        };
        let line = serialize_event(7, &death);
        assert_eq!(line, "T:00007|DE|5,-1|V");
        assert_eq!(parse_event(&line).unwrap().1, death);

        let respawn = GameEvent::Respawn {
            pos: IVec2::new(3, 1),
            facing: Facing::Right,
        };
        assert_eq!(parse_event(&serialize_event(7, &respawn)).unwrap().1, respawn);
    }

    #[test]
    fn test_stalled_has_no_data() {
        let line = serialize_event(3, &GameEvent::Stalled);
        assert_eq!(line, "T:00003|SL|");
        assert_eq!(parse_event(&line).unwrap().1, GameEvent::Stalled);
    }

    #[test]
    fn test_rejected_error_keeps_pipes() {
        let event = GameEvent::ProgramRejected {
            error: "Invalid program at column 2: unknown command '|'".to_string(),
        };
        let line = serialize_event(0, &event);
        assert_eq!(parse_event(&line).unwrap().1, event);
    }

    #[test]
    fn test_unlock_uses_names() {
        let event = GameEvent::CommandUnlocked {
            command: ScriptCommand::OpenBracket,
            command_count: 4,
        };
        let line = serialize_event(100_001, &event);
        assert_eq!(line, "T:00001|UN|Brackets|4");
        assert_eq!(parse_event(&line).unwrap().1, event);
    }

    #[test]
    fn test_config_json() {
        let event = GameEvent::Config(SimTuning::default());
        let (_, parsed) = parse_event(&serialize_event(0, &event)).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_unknown_code() {
        assert!(parse_event("T:00001|ZZ|1").is_none());
        assert!(parse_event("garbage").is_none());
    }
}
