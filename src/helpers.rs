//! Grid utilities shared by the level, world and event modules

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{LEFT, RIGHT};

/// Direction the robot faces. Only horizontal facings exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// Unit step in this direction
    pub fn offset(self) -> IVec2 {
        match self {
            Facing::Left => LEFT,
            Facing::Right => RIGHT,
        }
    }

    /// The opposite facing
    pub fn turned(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Single-letter code used in logs and scenario checks
    pub fn code(self) -> char {
        match self {
            Facing::Left => 'L',
            Facing::Right => 'R',
        }
    }

    /// Parse "L"/"R"/"left"/"right" (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Some(Facing::Left),
            "r" | "right" => Some(Facing::Right),
            _ => None,
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Format a grid position as `x,y`
pub fn fmt_pos(pos: IVec2) -> String {
    format!("{},{}", pos.x, pos.y)
}

/// Parse a grid position from `x,y`
pub fn parse_pos(s: &str) -> Option<IVec2> {
    let (x, y) = s.trim().split_once(',')?;
    Some(IVec2::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turned_flips() {
        assert_eq!(Facing::Left.turned(), Facing::Right);
        assert_eq!(Facing::Right.turned().turned(), Facing::Right);
    }

    #[test]
    fn test_pos_text() {
        assert_eq!(fmt_pos(IVec2::new(3, -1)), "3,-1");
        assert_eq!(parse_pos(" 3, -1 "), Some(IVec2::new(3, -1)));
        assert_eq!(parse_pos("3"), None);
    }

    #[test]
    fn test_facing_parse() {
        assert_eq!(Facing::parse("Right"), Some(Facing::Right));
        assert_eq!(Facing::parse("l"), Some(Facing::Left));
        assert_eq!(Facing::parse("up"), None);
    }
}
