//! Tile queries on a loaded level

use bevy::prelude::*;

use super::database::{CheckpointDef, LevelData};
use crate::helpers::Facing;

impl LevelData {
    /// Walls, plus everything left, right or above the map.
    /// Below the map is void, never solid.
    pub fn is_solid(&self, pos: IVec2) -> bool {
        if pos.y < 0 {
            return false;
        }
        if pos.x < 0 || pos.x >= self.width || pos.y >= self.height {
            return true;
        }
        self.walls.contains(&pos)
    }

    pub fn is_free(&self, pos: IVec2) -> bool {
        !self.is_solid(pos)
    }

    /// Falling into a void tile kills the robot
    pub fn is_void(&self, pos: IVec2) -> bool {
        pos.y < 0
    }

    pub fn checkpoint_index_at(&self, pos: IVec2) -> Option<usize> {
        self.checkpoints.iter().position(|c| c.pos == pos)
    }

    pub fn checkpoint_at(&self, pos: IVec2) -> Option<&CheckpointDef> {
        self.checkpoints.iter().find(|c| c.pos == pos)
    }

    pub fn is_goal(&self, pos: IVec2) -> bool {
        self.goal == Some(pos)
    }

    /// Text picture of the level, top row first. The robot is drawn as
    /// `>` or `<`, hazards as `*`.
    pub fn to_map_string(&self, robot: Option<(IVec2, Facing)>, hazards: &[IVec2]) -> String {
        let mut out = String::new();
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let pos = IVec2::new(x, y);
                let glyph = match robot {
                    Some((at, facing)) if at == pos => match facing {
                        Facing::Left => '<',
                        Facing::Right => '>',
                    },
                    _ if hazards.contains(&pos) => '*',
                    _ if self.walls.contains(&pos) => '#',
                    _ if self.is_goal(pos) => 'G',
                    _ if self.checkpoint_index_at(pos).is_some() => 'C',
                    _ if pos == self.start => 'S',
                    _ => '.',
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelDatabase;

    fn level() -> LevelData {
        LevelDatabase::parse_strict("level: T\nmap:\n#...#\n#S.C#\n##.##\nend\n")
            .unwrap()
            .levels
            .remove(0)
    }

    #[test]
    fn test_bounds_are_solid_except_below() {
        let level = level();
        assert!(level.is_solid(IVec2::new(-1, 1)));
        assert!(level.is_solid(IVec2::new(5, 1)));
        assert!(level.is_solid(IVec2::new(2, 3)));
        assert!(!level.is_solid(IVec2::new(2, -1)));
        assert!(level.is_void(IVec2::new(2, -1)));
    }

    #[test]
    fn test_tiles() {
        let level = level();
        assert!(level.is_solid(IVec2::new(0, 0)));
        assert!(level.is_free(IVec2::new(2, 0)));
        assert_eq!(level.checkpoint_index_at(IVec2::new(3, 1)), Some(0));
        assert!(level.goal.is_none());
    }

    #[test]
    fn test_map_string() {
        let level = level();
        let text = level.to_map_string(Some((IVec2::new(1, 1), Facing::Right)), &[IVec2::new(2, 2)]);
        assert_eq!(text, "#.*.#\n#>.C#\n##.##\n");
    }
}
