//! Cycle executor - replays a validated program one action per tick
//!
//! The executor only decides *which* action comes next; the world resolves
//! what that action does to the robot.

mod cycle;
mod ops;

pub use cycle::{CycleExecutor, Dispatch, DispatchTrace};
pub use ops::{CompiledCycle, Op};
