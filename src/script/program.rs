//! Cycle programs: parsing, level rule checks and the program store
//!
//! Program text is a sequence of instruction letters and bracket groups,
//! e.g. `( D ) W W J`. Whitespace is ignored, letters are case-insensitive,
//! and `[ ]` may be used instead of `( )`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::command::{Action, ScriptCommand};
use super::error::{ScriptError, ScriptErrorKind};
use crate::constants::STARTING_COMMAND_COUNT;

/// One node of a program tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Act(Action),
    /// Conditional group: runs when its first action can be performed
    Group(Vec<Instruction>),
}

impl Instruction {
    /// First leaf action, descending into nested groups
    pub fn first_action(&self) -> Option<Action> {
        match self {
            Instruction::Act(action) => Some(*action),
            Instruction::Group(body) => body.first().and_then(Instruction::first_action),
        }
    }
}

/// A validated cycle program
#[derive(Debug, Clone)]
pub struct Program {
    instructions: Vec<Instruction>,
    /// Every command in source order with its character index
    tokens: Vec<(ScriptCommand, usize)>,
}

// Two programs are equal when they run the same, however they were typed
impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.instructions == other.instructions
    }
}

impl Eq for Program {}

impl Program {
    /// Parse program text. Fails on unknown letters, unbalanced or
    /// mismatched brackets, empty groups and empty programs.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut tokens = Vec::new();
        // (opening char, position, body so far)
        let mut stack: Vec<(char, usize, Vec<Instruction>)> = Vec::new();
        let mut root: Vec<Instruction> = Vec::new();

        for (pos, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let Some(command) = ScriptCommand::from_char(c) else {
                return Err(ScriptError::at(ScriptErrorKind::UnknownToken(c), pos));
            };
            tokens.push((command, pos));

            match command {
                ScriptCommand::OpenBracket => stack.push((c, pos, Vec::new())),
                ScriptCommand::CloseBracket => {
                    let Some((open, open_pos, body)) = stack.pop() else {
                        return Err(ScriptError::at(ScriptErrorKind::UnexpectedClose, pos));
                    };
                    if closing_for(open) != c {
                        return Err(ScriptError::at(
                            ScriptErrorKind::MismatchedBracket { open, close: c },
                            pos,
                        ));
                    }
                    if body.is_empty() {
                        return Err(ScriptError::at(ScriptErrorKind::EmptyGroup, open_pos));
                    }
                    let parent = match stack.last_mut() {
                        Some((_, _, parent)) => parent,
                        None => &mut root,
                    };
                    parent.push(Instruction::Group(body));
                }
                other => {
                    // Non-bracket commands always map to an action
                    if let Some(action) = other.action() {
                        let parent = match stack.last_mut() {
                            Some((_, _, parent)) => parent,
                            None => &mut root,
                        };
                        parent.push(Instruction::Act(action));
                    }
                }
            }
        }

        if let Some((_, open_pos, _)) = stack.first() {
            return Err(ScriptError::at(ScriptErrorKind::UnmatchedOpen, *open_pos));
        }
        if root.is_empty() {
            return Err(ScriptError::new(ScriptErrorKind::EmptyProgram, None));
        }

        Ok(Self {
            instructions: root,
            tokens,
        })
    }

    /// Check the program against what the current level allows
    pub fn check_rules(&self, rules: &ProgramRules) -> Result<(), ScriptError> {
        for &(command, pos) in &self.tokens {
            let key = command.unlock_key();
            if !rules.is_unlocked(key) {
                return Err(ScriptError::at(ScriptErrorKind::LockedCommand(key), pos));
            }
        }
        let used = self.action_count();
        if used > rules.command_count {
            return Err(ScriptError::new(
                ScriptErrorKind::TooManyCommands {
                    used,
                    allowed: rules.command_count,
                },
                None,
            ));
        }
        Ok(())
    }

    /// Parse and check in one step
    pub fn parse_with_rules(text: &str, rules: &ProgramRules) -> Result<Self, ScriptError> {
        let program = Self::parse(text)?;
        program.check_rules(rules)?;
        Ok(program)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Commands in source order (brackets included)
    pub fn commands(&self) -> impl Iterator<Item = ScriptCommand> + '_ {
        self.tokens.iter().map(|(command, _)| *command)
    }

    /// Number of action letters; brackets don't count against the budget
    pub fn action_count(&self) -> usize {
        self.commands().filter(|c| !c.is_bracket()).count()
    }

    pub fn uses_brackets(&self) -> bool {
        self.commands().any(ScriptCommand::is_bracket)
    }
}

fn closing_for(open: char) -> char {
    if open == '[' { ']' } else { ')' }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn write_seq(
            f: &mut std::fmt::Formatter<'_>,
            seq: &[Instruction],
            first: &mut bool,
        ) -> std::fmt::Result {
            for instruction in seq {
                if !*first {
                    write!(f, " ")?;
                }
                *first = false;
                match instruction {
                    Instruction::Act(action) => write!(f, "{}", action)?,
                    Instruction::Group(body) => {
                        write!(f, "(")?;
                        write_seq(f, body, first)?;
                        write!(f, " )")?;
                    }
                }
            }
            Ok(())
        }
        let mut first = true;
        write_seq(f, &self.instructions, &mut first)
    }
}

/// What a level currently permits in a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRules {
    pub unlocked: BTreeSet<ScriptCommand>,
    pub command_count: usize,
}

impl Default for ProgramRules {
    fn default() -> Self {
        Self {
            unlocked: BTreeSet::from([ScriptCommand::Walk]),
            command_count: STARTING_COMMAND_COUNT,
        }
    }
}

impl ProgramRules {
    /// Everything unlocked, no budget (sandbox / tooling)
    pub fn unrestricted() -> Self {
        let mut unlocked: BTreeSet<ScriptCommand> =
            Action::ALL.into_iter().map(ScriptCommand::from).collect();
        unlocked.insert(ScriptCommand::OpenBracket);
        Self {
            unlocked,
            command_count: usize::MAX,
        }
    }

    pub fn is_unlocked(&self, command: ScriptCommand) -> bool {
        self.unlocked.contains(&command.unlock_key())
    }

    /// Add an unlock; returns true if it was new
    pub fn unlock(&mut self, command: ScriptCommand) -> bool {
        self.unlocked.insert(command.unlock_key())
    }

    /// Raise the budget (never lowers it)
    pub fn raise_command_count(&mut self, count: usize) -> bool {
        if count > self.command_count {
            self.command_count = count;
            true
        } else {
            false
        }
    }

    /// Unlocked letters as a compact string, e.g. "WJ()"
    pub fn unlocked_symbols(&self) -> String {
        let mut out = String::new();
        for command in &self.unlocked {
            out.push(command.symbol());
            if *command == ScriptCommand::OpenBracket {
                out.push(')');
            }
        }
        out
    }
}

/// Holds the last accepted program and the last validation error.
///
/// A rejected submission never replaces the accepted program, so the
/// executor only ever sees fully validated input.
#[derive(Debug, Default, Clone)]
pub struct ProgramStore {
    program: Option<Program>,
    source: String,
    last_error: Option<ScriptError>,
    last_rejected: Option<String>,
}

impl ProgramStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, text: &str, rules: &ProgramRules) -> Result<&Program, ScriptError> {
        match Program::parse_with_rules(text, rules) {
            Ok(program) => {
                debug!("Accepted program: {}", program);
                self.source = text.to_string();
                self.last_error = None;
                self.last_rejected = None;
                let accepted = self.program.insert(program);
                Ok(&*accepted)
            }
            Err(e) => {
                debug!("Rejected program {:?}: {}", text, e);
                self.last_error = Some(e.clone());
                self.last_rejected = Some(text.to_string());
                Err(e)
            }
        }
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// Text of the accepted program as the player typed it
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn last_error(&self) -> Option<&ScriptError> {
        self.last_error.as_ref()
    }

    /// Rendered error box for the last rejected submission
    pub fn error_display(&self) -> Option<String> {
        let error = self.last_error.as_ref()?;
        Some(error.render(self.last_rejected.as_deref().unwrap_or("")))
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
        self.last_rejected = None;
    }
}
