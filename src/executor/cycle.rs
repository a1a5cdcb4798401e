//! Program counter and dispatch for a repeating cycle

use crate::script::{Action, Program};

use super::ops::{CompiledCycle, Op};

/// What the executor decided for this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Perform `action`, found at op index `pc`
    Run { action: Action, pc: usize },
    /// A full pass found nothing runnable (every group guard failed)
    Stalled,
}

/// Everything that happened while choosing the next action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTrace {
    pub dispatch: Dispatch,
    /// Op indices of groups skipped on the way
    pub skipped_groups: Vec<usize>,
    /// The cycle wrapped back to its first op
    pub wrapped: bool,
}

/// Replays a compiled cycle forever
#[derive(Debug, Clone)]
pub struct CycleExecutor {
    cycle: CompiledCycle,
    pc: usize,
    cycles_completed: u64,
}

impl CycleExecutor {
    pub fn new(program: &Program) -> Self {
        Self {
            cycle: CompiledCycle::compile(program),
            pc: 0,
            cycles_completed: 0,
        }
    }

    /// Choose the next action. Guards are evaluated with `can_perform` and
    /// cost no tick; the search stops after one full pass over the cycle.
    pub fn next_action(&mut self, mut can_perform: impl FnMut(Action) -> bool) -> DispatchTrace {
        let ops = self.cycle.ops();
        let len = ops.len();
        let mut skipped_groups = Vec::new();
        let mut wrapped = false;
        let mut advanced = 0;

        loop {
            if advanced >= len {
                return DispatchTrace {
                    dispatch: Dispatch::Stalled,
                    skipped_groups,
                    wrapped,
                };
            }
            if self.pc >= len {
                self.pc = 0;
                self.cycles_completed += 1;
                wrapped = true;
            }
            match ops[self.pc] {
                Op::Act(action) => {
                    let pc = self.pc;
                    self.pc += 1;
                    return DispatchTrace {
                        dispatch: Dispatch::Run { action, pc },
                        skipped_groups,
                        wrapped,
                    };
                }
                Op::Guard { check, end } => {
                    if can_perform(check) {
                        self.pc += 1;
                        advanced += 1;
                    } else {
                        skipped_groups.push(self.pc);
                        advanced += end - self.pc;
                        self.pc = end;
                    }
                }
            }
        }
    }

    /// Back to the first op (used on respawn and program reload)
    pub fn restart(&mut self) {
        self.pc = 0;
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Number of times the cycle wrapped back to the start
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    pub fn cycle(&self) -> &CompiledCycle {
        &self.cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(text: &str) -> CycleExecutor {
        CycleExecutor::new(&Program::parse(text).unwrap())
    }

    fn run(trace: &DispatchTrace) -> Option<Action> {
        match trace.dispatch {
            Dispatch::Run { action, .. } => Some(action),
            Dispatch::Stalled => None,
        }
    }

    #[test]
    fn test_loops_back_to_first_token() {
        let mut exec = executor("W J T");
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(run(&exec.next_action(|_| true)).unwrap());
        }
        let expected = [Action::Walk, Action::Jump, Action::Turn];
        assert_eq!(seen, expected.iter().cycle().take(7).copied().collect::<Vec<_>>());
        assert_eq!(exec.cycles_completed(), 2);
    }

    #[test]
    fn test_wrap_reported_on_tick_that_restarts() {
        let mut exec = executor("W I");
        assert!(!exec.next_action(|_| true).wrapped);
        assert!(!exec.next_action(|_| true).wrapped);
        assert!(exec.next_action(|_| true).wrapped);
    }

    #[test]
    fn test_group_skipped_as_unit() {
        let mut exec = executor("( D W ) J");
        let trace = exec.next_action(|a| a != Action::Drop);
        assert_eq!(run(&trace), Some(Action::Jump));
        assert_eq!(trace.skipped_groups, vec![0]);
    }

    #[test]
    fn test_group_entered_when_first_action_possible() {
        let mut exec = executor("( D W ) J");
        assert_eq!(run(&exec.next_action(|_| true)), Some(Action::Drop));
        // Body continues even if the guard would now fail
        assert_eq!(run(&exec.next_action(|_| false)), Some(Action::Walk));
        assert_eq!(run(&exec.next_action(|_| false)), Some(Action::Jump));
    }

    #[test]
    fn test_all_groups_failing_stalls() {
        let mut exec = executor("( W ) ( C )");
        let trace = exec.next_action(|_| false);
        assert_eq!(trace.dispatch, Dispatch::Stalled);
        assert_eq!(trace.skipped_groups, vec![0, 2]);
        // Recovers once a guard passes
        let trace = exec.next_action(|a| a == Action::Climb);
        assert_eq!(run(&trace), Some(Action::Climb));
    }

    #[test]
    fn test_restart_resets_pc() {
        let mut exec = executor("W J");
        exec.next_action(|_| true);
        assert_eq!(exec.pc(), 1);
        exec.restart();
        assert_eq!(run(&exec.next_action(|_| true)), Some(Action::Walk));
    }
}
