//! Movement rules for the six actions, plus gravity
//!
//! Terrain only: hazards never block movement, they kill on contact.

use bevy::prelude::*;

use crate::constants::{DOWN, UP};
use crate::helpers::Facing;
use crate::levels::LevelData;
use crate::script::Action;

/// Where an action would leave the robot, or `None` if it cannot be performed
pub fn resolve_action(level: &LevelData, pos: IVec2, facing: Facing, action: Action) -> Option<(IVec2, Facing)> {
    let ahead = facing.offset();
    let grounded = level.is_solid(pos + DOWN);

    match action {
        Action::Walk => {
            let target = pos + ahead;
            (grounded && level.is_free(target)).then_some((target, facing))
        }
        Action::Climb => {
            let target = pos + UP + ahead;
            (level.is_solid(pos + ahead) && level.is_free(pos + UP) && level.is_free(target))
                .then_some((target, facing))
        }
        Action::Jump => {
            let target = pos + UP + ahead * 2;
            (grounded
                && level.is_free(pos + UP)
                && level.is_free(pos + UP + ahead)
                && level.is_free(target))
            .then_some((target, facing))
        }
        Action::Drop => {
            let target = pos + ahead;
            (level.is_free(target) && level.is_free(target + DOWN)).then_some((target, facing))
        }
        Action::Idle => Some((pos, facing)),
        Action::Turn => Some((pos, facing.turned())),
    }
}

/// Guard probe used by the executor
pub fn can_perform(level: &LevelData, pos: IVec2, facing: Facing, action: Action) -> bool {
    action.always_possible() || resolve_action(level, pos, facing, action).is_some()
}

/// Result of applying gravity for one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fall {
    /// Final position (the first void tile if the robot fell out of the map)
    pub to: IVec2,
    /// Every tile entered on the way down, including `to`
    pub path: Vec<IVec2>,
    pub into_void: bool,
}

/// Fall until supported, out of the map, or `max_fall` tiles
pub fn apply_gravity(level: &LevelData, pos: IVec2, max_fall: i32) -> Fall {
    let mut current = pos;
    let mut path = Vec::new();

    for _ in 0..max_fall {
        let below = current + DOWN;
        if level.is_solid(below) {
            break;
        }
        current = below;
        path.push(current);
        if level.is_void(current) {
            return Fall {
                to: current,
                path,
                into_void: true,
            };
        }
    }

    Fall {
        to: current,
        path,
        into_void: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelDatabase;

    // y=3  #......#
    // y=2  #...#..#
    // y=1  #.#.#..#
    // y=0  ###.####
    fn level() -> LevelData {
        LevelDatabase::parse_strict("level: Moves\nmap:\n#......#\n#...#..#\n#S#.#..#\n###.####\nend\n")
            .unwrap()
            .levels
            .remove(0)
    }

    fn at(x: i32, y: i32) -> IVec2 {
        IVec2::new(x, y)
    }

    #[test]
    fn test_walk_needs_ground_and_free_tile() {
        let level = level();
        // Wall ahead at (2,1)
        assert_eq!(resolve_action(&level, at(1, 1), Facing::Right, Action::Walk), None);
        assert_eq!(resolve_action(&level, at(5, 1), Facing::Left, Action::Walk), None);
        // Walking off a ledge is allowed
        assert_eq!(
            resolve_action(&level, at(2, 2), Facing::Right, Action::Walk),
            Some((at(3, 2), Facing::Right))
        );
        // No ground in mid-air
        assert_eq!(resolve_action(&level, at(3, 2), Facing::Left, Action::Walk), None);
    }

    #[test]
    fn test_climb() {
        let level = level();
        assert_eq!(
            resolve_action(&level, at(1, 1), Facing::Right, Action::Climb),
            Some((at(2, 2), Facing::Right))
        );
        // Nothing solid ahead
        assert_eq!(resolve_action(&level, at(5, 1), Facing::Right, Action::Climb), None);
        // Blocked above-ahead by (4,2)
        assert_eq!(resolve_action(&level, at(3, 1), Facing::Right, Action::Climb), None);
    }

    #[test]
    fn test_jump() {
        let level = level();
        // From (2,2): needs (2,3), (3,3), (4,3) free
        assert_eq!(
            resolve_action(&level, at(2, 2), Facing::Right, Action::Jump),
            Some((at(4, 3), Facing::Right))
        );
        // (1,1) has (1,2) free, (2,2) free, (3,2) free
        assert_eq!(
            resolve_action(&level, at(1, 1), Facing::Right, Action::Jump),
            Some((at(3, 2), Facing::Right))
        );
        // Left edge of the map is solid
        assert_eq!(resolve_action(&level, at(1, 1), Facing::Left, Action::Jump), None);
    }

    #[test]
    fn test_drop_needs_a_ledge() {
        let level = level();
        // (3,2) and (3,1) free ahead of (2,2)
        assert_eq!(
            resolve_action(&level, at(2, 2), Facing::Right, Action::Drop),
            Some((at(3, 2), Facing::Right))
        );
        // Flat ground: (6,0) is a wall
        assert_eq!(resolve_action(&level, at(5, 1), Facing::Right, Action::Drop), None);
    }

    #[test]
    fn test_idle_and_turn_always_possible() {
        let level = level();
        assert!(can_perform(&level, at(3, 1), Facing::Right, Action::Idle));
        assert_eq!(
            resolve_action(&level, at(3, 1), Facing::Right, Action::Turn),
            Some((at(3, 1), Facing::Left))
        );
    }

    #[test]
    fn test_gravity_lands_on_support() {
        let level = level();
        let fall = apply_gravity(&level, at(5, 3), 64);
        assert_eq!(fall.to, at(5, 1));
        assert_eq!(fall.path, vec![at(5, 2), at(5, 1)]);
        assert!(!fall.into_void);

        let still = apply_gravity(&level, at(1, 1), 64);
        assert!(still.path.is_empty());
    }

    #[test]
    fn test_gravity_into_void() {
        let level = level();
        let fall = apply_gravity(&level, at(3, 2), 64);
        assert!(fall.into_void);
        assert_eq!(fall.to, at(3, -1));
        assert_eq!(fall.path, vec![at(3, 1), at(3, 0), at(3, -1)]);
    }

    #[test]
    fn test_gravity_respects_cap() {
        let level = level();
        let fall = apply_gravity(&level, at(3, 2), 1);
        assert_eq!(fall.to, at(3, 1));
        assert!(!fall.into_void);
    }
}
