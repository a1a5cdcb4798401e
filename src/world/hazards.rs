//! Hazards: static spikes and two-tile patrollers

use bevy::prelude::*;

use crate::levels::HazardDef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hazard {
    spawn: IVec2,
    dir: IVec2,
    /// At `spawn + dir` instead of `spawn`
    shifted: bool,
}

impl Hazard {
    pub fn from_def(def: &HazardDef) -> Self {
        Self {
            spawn: def.pos,
            dir: def.dir,
            shifted: false,
        }
    }

    pub fn pos(&self) -> IVec2 {
        if self.shifted { self.spawn + self.dir } else { self.spawn }
    }

    pub fn is_moving(&self) -> bool {
        self.dir != IVec2::ZERO
    }

    /// One tick of movement
    pub fn advance(&mut self) {
        if self.is_moving() {
            self.shifted = !self.shifted;
        }
    }

    pub fn reset(&mut self) {
        self.shifted = false;
    }
}

/// Did the robot touch a hazard this tick?
///
/// `robot_from`/`robot_to` are the robot's tiles before the action and after
/// gravity, `fall_path` the tiles entered while falling, `hazard_from` the
/// hazard's tile before it advanced.
pub fn touches(
    hazard: &Hazard,
    hazard_from: IVec2,
    robot_from: IVec2,
    robot_to: IVec2,
    fall_path: &[IVec2],
) -> bool {
    let hazard_to = hazard.pos();
    if robot_to == hazard_to || fall_path.contains(&hazard_to) {
        return true;
    }
    // Swapped tiles: they passed through each other
    robot_from != robot_to && robot_from == hazard_to && robot_to == hazard_from
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patroller() -> Hazard {
        Hazard::from_def(&HazardDef {
            pos: IVec2::new(4, 1),
            dir: IVec2::new(1, 0),
        })
    }

    #[test]
    fn test_moving_hazard_alternates() {
        let mut hazard = patroller();
        hazard.advance();
        assert_eq!(hazard.pos(), IVec2::new(5, 1));
        hazard.advance();
        assert_eq!(hazard.pos(), IVec2::new(4, 1));
        hazard.advance();
        hazard.reset();
        assert_eq!(hazard.pos(), IVec2::new(4, 1));
    }

    #[test]
    fn test_static_hazard_stays() {
        let mut hazard = Hazard::from_def(&HazardDef {
            pos: IVec2::new(2, 0),
            dir: IVec2::ZERO,
        });
        hazard.advance();
        assert_eq!(hazard.pos(), IVec2::new(2, 0));
    }

    #[test]
    fn test_contact_rules() {
        let mut hazard = patroller();
        let from = hazard.pos();
        hazard.advance(); // now (5,1)

        // Same tile
        assert!(touches(&hazard, from, IVec2::new(6, 1), IVec2::new(5, 1), &[]));
        // Passed while falling
        assert!(touches(&hazard, from, IVec2::new(5, 3), IVec2::new(5, 0), &[
            IVec2::new(5, 2),
            IVec2::new(5, 1),
            IVec2::new(5, 0),
        ]));
        // Swapped: robot walked 5 -> 4 while hazard went 4 -> 5
        assert!(touches(&hazard, from, IVec2::new(5, 1), IVec2::new(4, 1), &[]));
        // Robot stayed on the hazard's old tile
        assert!(!touches(&hazard, from, IVec2::new(4, 1), IVec2::new(4, 1), &[]));
        assert!(!touches(&hazard, from, IVec2::new(2, 1), IVec2::new(3, 1), &[]));
    }
}
