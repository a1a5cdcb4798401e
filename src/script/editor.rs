//! Cursor-based cycle editor
//!
//! Mirrors the in-game editor: commands are typed one key at a time at the
//! cursor, then the whole cycle is submitted to the program store.

use super::command::ScriptCommand;
use super::error::ScriptError;
use super::program::{Program, ProgramRules, ProgramStore};

/// Editing state for one cycle
#[derive(Debug, Default, Clone)]
pub struct ScriptEditor {
    entered: Vec<ScriptCommand>,
    cursor: usize,
}

impl ScriptEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing program text. Characters that are not commands are dropped.
    pub fn from_text(text: &str) -> Self {
        let entered: Vec<ScriptCommand> = text.chars().filter_map(ScriptCommand::from_char).collect();
        let cursor = entered.len();
        Self { entered, cursor }
    }

    /// Insert at the cursor. Locked commands are refused.
    pub fn insert(&mut self, command: ScriptCommand, rules: &ProgramRules) -> bool {
        if !rules.is_unlocked(command) {
            return false;
        }
        self.entered.insert(self.cursor, command);
        self.cursor += 1;
        true
    }

    /// Insert the command bound to a key character, if any
    pub fn type_char(&mut self, c: char, rules: &ProgramRules) -> bool {
        match ScriptCommand::from_char(c) {
            Some(command) => self.insert(command, rules),
            None => false,
        }
    }

    /// Remove the command before the cursor
    pub fn backspace(&mut self) -> Option<ScriptCommand> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.entered.remove(self.cursor))
    }

    /// Remove the command under the cursor
    pub fn delete(&mut self) -> Option<ScriptCommand> {
        if self.cursor >= self.entered.len() {
            return None;
        }
        Some(self.entered.remove(self.cursor))
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.entered.len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.entered.len();
    }

    pub fn clear(&mut self) {
        self.entered.clear();
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entered(&self) -> &[ScriptCommand] {
        &self.entered
    }

    /// Program text, one symbol per command separated by spaces
    pub fn text(&self) -> String {
        let symbols: Vec<String> = self.entered.iter().map(|c| c.symbol().to_string()).collect();
        symbols.join(" ")
    }

    /// Text with a `|` marking the cursor
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = self.entered.iter().map(|c| c.symbol().to_string()).collect();
        parts.insert(self.cursor, "|".to_string());
        parts.join(" ")
    }

    /// Validate and store the current text
    pub fn submit<'a>(
        &self,
        store: &'a mut ProgramStore,
        rules: &ProgramRules,
    ) -> Result<&'a Program, ScriptError> {
        store.submit(&self.text(), rules)
    }
}
