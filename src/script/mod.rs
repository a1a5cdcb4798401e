//! Cycle program store - instruction vocabulary, parsing and validation
//!
//! A program is validated completely (syntax, then level rules) before the
//! executor ever sees it.

mod command;
mod editor;
mod error;
mod program;

pub use command::{Action, ScriptCommand};
pub use editor::ScriptEditor;
pub use error::{ScriptError, ScriptErrorKind};
pub use program::{Instruction, Program, ProgramRules, ProgramStore};
