//! Instruction vocabulary: letters, bracket tokens and movement actions

use serde::{Deserialize, Serialize};

/// A movement primitive the robot performs in one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Walk,
    Climb,
    Drop,
    Idle,
    Jump,
    Turn,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Walk,
        Action::Climb,
        Action::Drop,
        Action::Idle,
        Action::Jump,
        Action::Turn,
    ];

    /// Letter used in program text
    pub fn letter(self) -> char {
        match self {
            Action::Walk => 'W',
            Action::Climb => 'C',
            Action::Drop => 'D',
            Action::Idle => 'I',
            Action::Jump => 'J',
            Action::Turn => 'T',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'W' => Some(Action::Walk),
            'C' => Some(Action::Climb),
            'D' => Some(Action::Drop),
            'I' => Some(Action::Idle),
            'J' => Some(Action::Jump),
            'T' => Some(Action::Turn),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Walk => "Walk",
            Action::Climb => "Climb",
            Action::Drop => "Drop",
            Action::Idle => "Idle",
            Action::Jump => "Jump",
            Action::Turn => "Turn",
        }
    }

    /// Idle and Turn can always be performed
    pub fn always_possible(self) -> bool {
        matches!(self, Action::Idle | Action::Turn)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Everything the player can enter into a cycle, including bracket tokens.
///
/// `OpenBracket` doubles as the unlock for conditional groups: a level that
/// has not unlocked it rejects programs containing brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScriptCommand {
    Walk,
    Climb,
    Drop,
    Idle,
    Jump,
    Turn,
    OpenBracket,
    CloseBracket,
}

impl ScriptCommand {
    /// The movement action this command performs, if any
    pub fn action(self) -> Option<Action> {
        match self {
            ScriptCommand::Walk => Some(Action::Walk),
            ScriptCommand::Climb => Some(Action::Climb),
            ScriptCommand::Drop => Some(Action::Drop),
            ScriptCommand::Idle => Some(Action::Idle),
            ScriptCommand::Jump => Some(Action::Jump),
            ScriptCommand::Turn => Some(Action::Turn),
            ScriptCommand::OpenBracket | ScriptCommand::CloseBracket => None,
        }
    }

    pub fn is_bracket(self) -> bool {
        self.action().is_none()
    }

    /// The unlock that gates this command (both brackets share one)
    pub fn unlock_key(self) -> ScriptCommand {
        match self {
            ScriptCommand::CloseBracket => ScriptCommand::OpenBracket,
            other => other,
        }
    }

    /// Parse a single program character. Whitespace is handled by the tokenizer.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '(' | '[' => Some(ScriptCommand::OpenBracket),
            ')' | ']' => Some(ScriptCommand::CloseBracket),
            other => Action::from_letter(other).map(ScriptCommand::from),
        }
    }

    /// Character used when rendering the command
    pub fn symbol(self) -> char {
        match self {
            ScriptCommand::OpenBracket => '(',
            ScriptCommand::CloseBracket => ')',
            other => other.action().map(Action::letter).unwrap_or('?'),
        }
    }

    /// Parse an unlock name as written in level files ("Walk", "Brackets", or a letter)
    pub fn from_unlock_name(name: &str) -> Option<Self> {
        let name = name.trim();
        match name.to_ascii_lowercase().as_str() {
            "walk" => Some(ScriptCommand::Walk),
            "climb" => Some(ScriptCommand::Climb),
            "drop" => Some(ScriptCommand::Drop),
            "idle" => Some(ScriptCommand::Idle),
            "jump" => Some(ScriptCommand::Jump),
            "turn" => Some(ScriptCommand::Turn),
            "brackets" | "(" | "()" => Some(ScriptCommand::OpenBracket),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Action::from_letter(c).map(ScriptCommand::from),
                    _ => None,
                }
            }
        }
    }

    /// Name used in level files and event logs
    pub fn unlock_name(self) -> &'static str {
        match self {
            ScriptCommand::OpenBracket | ScriptCommand::CloseBracket => "Brackets",
            other => other.action().map(Action::name).unwrap_or("?"),
        }
    }
}

impl From<Action> for ScriptCommand {
    fn from(action: Action) -> Self {
        match action {
            Action::Walk => ScriptCommand::Walk,
            Action::Climb => ScriptCommand::Climb,
            Action::Drop => ScriptCommand::Drop,
            Action::Idle => ScriptCommand::Idle,
            Action::Jump => ScriptCommand::Jump,
            Action::Turn => ScriptCommand::Turn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_are_case_insensitive() {
        assert_eq!(ScriptCommand::from_char('w'), Some(ScriptCommand::Walk));
        assert_eq!(ScriptCommand::from_char('J'), Some(ScriptCommand::Jump));
        assert_eq!(ScriptCommand::from_char('F'), None);
        assert_eq!(ScriptCommand::from_char('R'), None);
    }

    #[test]
    fn test_both_bracket_styles() {
        assert_eq!(ScriptCommand::from_char('['), Some(ScriptCommand::OpenBracket));
        assert_eq!(ScriptCommand::from_char(')'), Some(ScriptCommand::CloseBracket));
        assert_eq!(ScriptCommand::CloseBracket.unlock_key(), ScriptCommand::OpenBracket);
    }

    #[test]
    fn test_unlock_names() {
        assert_eq!(ScriptCommand::from_unlock_name("Brackets"), Some(ScriptCommand::OpenBracket));
        assert_eq!(ScriptCommand::from_unlock_name("jump"), Some(ScriptCommand::Jump));
        assert_eq!(ScriptCommand::from_unlock_name("C"), Some(ScriptCommand::Climb));
        assert_eq!(ScriptCommand::from_unlock_name("Fly"), None);
        for action in Action::ALL {
            let cmd = ScriptCommand::from(action);
            assert_eq!(ScriptCommand::from_unlock_name(cmd.unlock_name()), Some(cmd));
        }
    }

    #[test]
    fn test_only_idle_and_turn_always_possible() {
        let always: Vec<_> = Action::ALL.into_iter().filter(|a| a.always_possible()).collect();
        assert_eq!(always, vec![Action::Idle, Action::Turn]);
    }
}
