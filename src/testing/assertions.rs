//! Assertion checking for test expectations

use super::parser::{ExpectedEvent, StateAssertion};
use crate::events::{GameEvent, serialize_event};
use crate::snapshot::WorldSnapshot;

/// Error when an assertion fails
#[derive(Debug)]
pub struct AssertionError {
    pub message: String,
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for AssertionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n    Expected: {}\n    Actual: {}", self.message, self.expected, self.actual)
    }
}

/// Captured event with tick and serialized fields
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub tick: u64,
    pub code: String,
    /// Everything after the code, e.g. "W|2,1|R"
    pub data: String,
}

impl CapturedEvent {
    pub fn from_game_event(tick: u64, event: &GameEvent) -> Self {
        let line = serialize_event(tick, event);
        // T:NNNNN|CODE|data
        let mut parts = line.splitn(3, '|').skip(1);
        Self {
            tick,
            code: parts.next().unwrap_or_default().to_string(),
            data: parts.next().unwrap_or_default().to_string(),
        }
    }

    fn describe(&self) -> String {
        format!("{}@{} {}", self.code, self.tick, self.data)
    }
}

/// Check if captured events match expected sequence (in order, gaps allowed)
pub fn check_sequence(expected: &[ExpectedEvent], captured: &[CapturedEvent]) -> Result<(), AssertionError> {
    let mut captured_idx = 0;

    for (i, exp) in expected.iter().enumerate() {
        // Find matching event starting from current position
        let found = captured[captured_idx..].iter().enumerate().find(|(_, cap)| {
            cap.code == exp.event && exp.data.as_ref().is_none_or(|d| cap.data == *d)
        });

        match found {
            Some((offset, cap)) => {
                if let Some(min) = exp.tick_min
                    && cap.tick < min
                {
                    return Err(AssertionError {
                        message: format!("Event #{} '{}' occurred too early", i + 1, exp.event),
                        expected: format!("tick >= {}", min),
                        actual: format!("tick {}", cap.tick),
                    });
                }
                if let Some(max) = exp.tick_max
                    && cap.tick > max
                {
                    return Err(AssertionError {
                        message: format!("Event #{} '{}' occurred too late", i + 1, exp.event),
                        expected: format!("tick <= {}", max),
                        actual: format!("tick {}", cap.tick),
                    });
                }
                captured_idx += offset + 1;
            }
            None => {
                let data_str = exp.data.as_ref().map(|d| format!(" ({})", d)).unwrap_or_default();
                return Err(AssertionError {
                    message: format!("Event #{} '{}'{} not found", i + 1, exp.event, data_str),
                    expected: format!("'{}' event in sequence", exp.event),
                    actual: format!(
                        "events after position {}: {:?}",
                        captured_idx,
                        captured[captured_idx..]
                            .iter()
                            .take(12)
                            .map(CapturedEvent::describe)
                            .collect::<Vec<_>>()
                    ),
                });
            }
        }
    }

    Ok(())
}

/// Fail if any event with one of `codes` was captured
pub fn check_absent(codes: &[String], captured: &[CapturedEvent]) -> Result<(), AssertionError> {
    for code in codes {
        if let Some(cap) = captured.iter().find(|c| c.code == *code) {
            return Err(AssertionError {
                message: format!("Unexpected '{}' event", code),
                expected: format!("no '{}' events", code),
                actual: cap.describe(),
            });
        }
    }
    Ok(())
}

/// Parse a check string into (path, operator, value)
fn parse_check(check: &str) -> Option<(&str, &str, &str)> {
    // Try operators in order of specificity (>= before >, etc.)
    for op in &[">=", "<=", "!=", "=", ">", "<"] {
        if let Some(idx) = check.find(op) {
            let path = check[..idx].trim();
            let value = check[idx + op.len()..].trim();
            return Some((path, op, value));
        }
    }
    None
}

/// Check state assertions against a snapshot of the world
pub fn check_state(assertion: &StateAssertion, state: &WorldSnapshot) -> Result<(), AssertionError> {
    for check in &assertion.checks {
        let (path, operator, expected_value) = parse_check(check).ok_or_else(|| AssertionError {
            message: format!("Invalid check syntax: {}", check),
            expected: "format: 'field = value' or 'field > value'".to_string(),
            actual: check.clone(),
        })?;

        match path {
            "tick" => check_number(check, state.tick, operator, expected_value)?,
            "deaths" => check_number(check, state.deaths as u64, operator, expected_value)?,
            "cycles" => check_number(check, state.cycles, operator, expected_value)?,
            "command_count" => check_number(check, state.command_count as u64, operator, expected_value)?,
            "checkpoints" => {
                let count = state.checkpoints.iter().filter(|a| **a).count() as u64;
                check_number(check, count, operator, expected_value)?
            }
            "pc" => {
                let pc = state.pc.ok_or_else(|| AssertionError {
                    message: format!("Check failed: {}", check),
                    expected: "a loaded program".to_string(),
                    actual: "no program".to_string(),
                })?;
                check_number(check, pc as u64, operator, expected_value)?
            }
            "pos" => check_text(check, &state.position, operator, expected_value)?,
            "respawn" => check_text(check, &state.respawn, operator, expected_value)?,
            "facing" => check_text(check, &state.facing.to_string(), operator, expected_value)?,
            "status" => check_text(check, state.status.name(), operator, expected_value)?,
            "unlocked" => check_text(check, &state.unlocked, operator, expected_value)?,
            "program" => {
                let program = state.program.clone().unwrap_or_default();
                check_text(check, &program, operator, expected_value)?
            }
            "hazards" => check_text(check, &state.hazards.join(" "), operator, expected_value)?,
            other => {
                return Err(AssertionError {
                    message: format!("Unknown field '{}'", other),
                    expected: "tick, deaths, cycles, command_count, checkpoints, pc, pos, respawn, facing, status, unlocked, program or hazards".to_string(),
                    actual: check.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Check integer comparison with operator
fn check_number(check: &str, actual: u64, operator: &str, expected_str: &str) -> Result<(), AssertionError> {
    let value: u64 = expected_str.parse().map_err(|_| AssertionError {
        message: format!("Invalid value in '{}'", check),
        expected: "integer".to_string(),
        actual: expected_str.to_string(),
    })?;

    let pass = match operator {
        ">=" => actual >= value,
        "<=" => actual <= value,
        ">" => actual > value,
        "<" => actual < value,
        "!=" => actual != value,
        _ => actual == value,
    };

    if !pass {
        return Err(AssertionError {
            message: format!("Check failed: {}", check),
            expected: format!("{} {}", operator, value),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Text fields support only `=` and `!=`
fn check_text(check: &str, actual: &str, operator: &str, expected_str: &str) -> Result<(), AssertionError> {
    let expected = expected_str.trim_matches('"');
    let pass = match operator {
        "=" => actual == expected,
        "!=" => actual != expected,
        _ => {
            return Err(AssertionError {
                message: format!("Operator '{}' not supported in '{}'", operator, check),
                expected: "= or !=".to_string(),
                actual: operator.to_string(),
            });
        }
    };

    if !pass {
        return Err(AssertionError {
            message: format!("Check failed: {}", check),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Facing;
    use crate::script::Action;
    use bevy::prelude::IVec2;

    fn expected(event: &str, data: Option<&str>) -> ExpectedEvent {
        ExpectedEvent {
            event: event.to_string(),
            data: data.map(str::to_string),
            tick_min: None,
            tick_max: None,
        }
    }

    fn captured() -> Vec<CapturedEvent> {
        vec![
            CapturedEvent::from_game_event(1, &GameEvent::Step {
                action: Action::Walk,
                pos: IVec2::new(2, 1),
                facing: Facing::Right,
            }),
            CapturedEvent::from_game_event(2, &GameEvent::CycleRestart { cycle: 1 }),
            CapturedEvent::from_game_event(2, &GameEvent::Stalled),
        ]
    }

    #[test]
    fn test_captured_event_fields() {
        let events = captured();
        assert_eq!(events[0].code, "ST");
        assert_eq!(events[0].data, "W|2,1|R");
        assert_eq!(events[2].code, "SL");
        assert_eq!(events[2].data, "");
    }

    #[test]
    fn test_sequence_in_order() {
        let events = captured();
        assert!(check_sequence(&[expected("ST", Some("W|2,1|R")), expected("SL", None)], &events).is_ok());
        assert!(check_sequence(&[expected("SL", None), expected("ST", None)], &events).is_err());
        assert!(check_sequence(&[expected("ST", Some("W|3,1|R"))], &events).is_err());
    }

    #[test]
    fn test_tick_bounds() {
        let events = captured();
        let mut late = expected("CR", None);
        late.tick_max = Some(1);
        let err = check_sequence(&[late], &events).unwrap_err();
        assert!(err.message.contains("too late"));
    }

    #[test]
    fn test_absent() {
        let events = captured();
        assert!(check_absent(&["DE".to_string()], &events).is_ok());
        assert!(check_absent(&["SL".to_string()], &events).is_err());
    }

    #[test]
    fn test_parse_check_operators() {
        assert_eq!(parse_check("deaths >= 2"), Some(("deaths", ">=", "2")));
        assert_eq!(parse_check("pos = 3,1"), Some(("pos", "=", "3,1")));
        assert_eq!(parse_check("status != Running"), Some(("status", "!=", "Running")));
        assert_eq!(parse_check("nothing"), None);
    }
}
