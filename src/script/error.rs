//! Validation errors for cycle programs

use super::command::ScriptCommand;

/// What went wrong while validating a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptErrorKind {
    /// A character that is not a known instruction letter or bracket
    UnknownToken(char),
    /// An opening bracket that is never closed
    UnmatchedOpen,
    /// A closing bracket with no group open
    UnexpectedClose,
    /// `(` closed by `]` or `[` closed by `)`
    MismatchedBracket { open: char, close: char },
    /// `()` has no first action to guard on
    EmptyGroup,
    /// No actions at all
    EmptyProgram,
    /// The level has not unlocked this command yet
    LockedCommand(ScriptCommand),
    /// More action letters than the level allows
    TooManyCommands { used: usize, allowed: usize },
}

/// A program that failed validation. `position` is a character index into
/// the submitted text when the error can be pinned to one spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub position: Option<usize>,
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind, position: Option<usize>) -> Self {
        Self { kind, position }
    }

    pub fn at(kind: ScriptErrorKind, position: usize) -> Self {
        Self::new(kind, Some(position))
    }

    /// Short message without position
    pub fn message(&self) -> String {
        match &self.kind {
            ScriptErrorKind::UnknownToken(c) => format!("unknown instruction '{}'", c),
            ScriptErrorKind::UnmatchedOpen => "bracket is never closed".to_string(),
            ScriptErrorKind::UnexpectedClose => "closing bracket without an opening one".to_string(),
            ScriptErrorKind::MismatchedBracket { open, close } => {
                format!("'{}' cannot close '{}'", close, open)
            }
            ScriptErrorKind::EmptyGroup => "empty bracket group".to_string(),
            ScriptErrorKind::EmptyProgram => "program has no instructions".to_string(),
            ScriptErrorKind::LockedCommand(cmd) => {
                format!("{} is not unlocked yet", cmd.unlock_name())
            }
            ScriptErrorKind::TooManyCommands { used, allowed } => {
                format!("{} instructions used, only {} allowed", used, allowed)
            }
        }
    }

    /// Error box text: the program, a caret under the offending column, and the message
    pub fn render(&self, source: &str) -> String {
        match self.position {
            Some(pos) => {
                let line: String = source.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
                format!("{}\n{}^\n{}", line, " ".repeat(pos), self)
            }
            None => format!("{}\n{}", source, self),
        }
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(pos) => write!(f, "Invalid program at column {}: {}", pos + 1, self.message()),
            None => write!(f, "Invalid program: {}", self.message()),
        }
    }
}

impl std::error::Error for ScriptError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_position() {
        let err = ScriptError::at(ScriptErrorKind::UnknownToken('F'), 2);
        assert_eq!(err.to_string(), "Invalid program at column 3: unknown instruction 'F'");
    }

    #[test]
    fn test_render_caret() {
        let err = ScriptError::at(ScriptErrorKind::UnexpectedClose, 4);
        let rendered = err.render("W W ) J");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "W W ) J");
        assert_eq!(lines[1], "    ^");
        assert!(lines[2].contains("closing bracket"));
    }

    #[test]
    fn test_render_without_position() {
        let err = ScriptError::new(
            ScriptErrorKind::TooManyCommands { used: 3, allowed: 2 },
            None,
        );
        assert_eq!(
            err.render("WWW"),
            "WWW\nInvalid program: 3 instructions used, only 2 allowed"
        );
    }
}
