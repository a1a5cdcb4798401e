//! Flattened cycle representation
//!
//! Program trees are compiled into a flat op list so the executor only needs
//! a program counter. A group becomes a `Guard` followed by its body; a
//! failing guard jumps past the body.

use crate::script::{Action, Instruction, Program};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Perform an action, consuming the tick
    Act(Action),
    /// Enter the following body if `check` can be performed, else jump to `end`
    Guard { check: Action, end: usize },
}

/// A program compiled for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCycle {
    ops: Vec<Op>,
}

impl CompiledCycle {
    pub fn compile(program: &Program) -> Self {
        let mut ops = Vec::new();
        emit(program.instructions(), &mut ops);
        Self { ops }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

fn emit(seq: &[Instruction], ops: &mut Vec<Op>) {
    for instruction in seq {
        match instruction {
            Instruction::Act(action) => ops.push(Op::Act(*action)),
            Instruction::Group(body) => {
                // Parser guarantees non-empty groups, so a first action exists
                let Some(check) = instruction.first_action() else {
                    continue;
                };
                let guard_at = ops.len();
                ops.push(Op::Guard { check, end: 0 });
                emit(body, ops);
                let end = ops.len();
                ops[guard_at] = Op::Guard { check, end };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(text: &str) -> Vec<Op> {
        CompiledCycle::compile(&Program::parse(text).unwrap()).ops().to_vec()
    }

    #[test]
    fn test_flat_program() {
        assert_eq!(
            compile("W W J"),
            vec![Op::Act(Action::Walk), Op::Act(Action::Walk), Op::Act(Action::Jump)]
        );
    }

    #[test]
    fn test_group_jumps_past_body() {
        assert_eq!(
            compile("( D ) W"),
            vec![
                Op::Guard { check: Action::Drop, end: 2 },
                Op::Act(Action::Drop),
                Op::Act(Action::Walk),
            ]
        );
    }

    #[test]
    fn test_nested_groups() {
        assert_eq!(
            compile("( ( W ) J ) T"),
            vec![
                Op::Guard { check: Action::Walk, end: 4 },
                Op::Guard { check: Action::Walk, end: 3 },
                Op::Act(Action::Walk),
                Op::Act(Action::Jump),
                Op::Act(Action::Turn),
            ]
        );
    }
}
