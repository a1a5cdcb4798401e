//! Level database - parsing and storage
//!
//! Format (one or more levels per file):
//! ```text
//! level: First Steps
//! command_count: 2
//! unlocked: W
//! map:
//! #........#
//! #S..C..G.#
//! ##########
//! end
//! checkpoint: 4 1 J 3
//! hazard: 6 1 0 1
//! ```
//! Map glyphs: `#` wall, `.` empty, `S` start, `C` checkpoint, `G` goal,
//! `^` static hazard, `H` hazard (moving if a `hazard:` line gives it a
//! direction). The bottom map row is y = 0.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;

use crate::constants::STARTING_COMMAND_COUNT;
use crate::script::{ProgramRules, ScriptCommand};

/// Checkpoint definition in level data
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointDef {
    pub pos: IVec2,
    /// Command unlocked on first activation
    pub unlock: Option<ScriptCommand>,
    /// Command budget granted on first activation (0 = unchanged)
    pub command_count: usize,
}

/// Hazard definition. Hazards with a non-zero `dir` alternate between
/// `pos` and `pos + dir` every tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardDef {
    pub pos: IVec2,
    pub dir: IVec2,
}

/// Single level definition
#[derive(Clone, Debug)]
pub struct LevelData {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub walls: HashSet<IVec2>,
    pub start: IVec2,
    pub goal: Option<IVec2>,
    pub checkpoints: Vec<CheckpointDef>,
    pub hazards: Vec<HazardDef>,
    /// Budget before any checkpoint is reached
    pub command_count: usize,
    /// Commands available before any checkpoint is reached
    pub unlocked: BTreeSet<ScriptCommand>,
}

impl LevelData {
    /// Rules in effect at the start of the level
    pub fn starting_rules(&self) -> ProgramRules {
        ProgramRules {
            unlocked: self.unlocked.clone(),
            command_count: self.command_count,
        }
    }
}

/// Accumulates one `level:` block while parsing
struct LevelBuilder {
    name: String,
    command_count: usize,
    unlocked: BTreeSet<ScriptCommand>,
    rows: Vec<String>,
    checkpoint_lines: Vec<CheckpointDef>,
    hazard_lines: Vec<HazardDef>,
}

impl LevelBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            command_count: STARTING_COMMAND_COUNT,                 // default
            unlocked: BTreeSet::from([ScriptCommand::Walk]), // default
            rows: Vec::new(),
            checkpoint_lines: Vec::new(),
            hazard_lines: Vec::new(),
        }
    }

    fn finish(self) -> Result<LevelData, String> {
        if self.rows.is_empty() {
            return Err(format!("Level '{}' has no map", self.name));
        }

        let height = self.rows.len() as i32;
        let width = self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let mut walls = HashSet::new();
        let mut start = None;
        let mut goal = None;
        let mut checkpoints: Vec<CheckpointDef> = Vec::new();
        let mut hazards: Vec<HazardDef> = Vec::new();

        for (row_idx, row) in self.rows.iter().enumerate() {
            let y = height - 1 - row_idx as i32;
            for (x, c) in row.chars().enumerate() {
                let pos = IVec2::new(x as i32, y);
                match c {
                    '#' => {
                        walls.insert(pos);
                    }
                    'S' => {
                        if start.replace(pos).is_some() {
                            return Err(format!("Level '{}' has more than one start", self.name));
                        }
                    }
                    'C' => checkpoints.push(CheckpointDef {
                        pos,
                        unlock: None,
                        command_count: 0,
                    }),
                    'G' => {
                        if goal.replace(pos).is_some() {
                            return Err(format!("Level '{}' has more than one goal", self.name));
                        }
                    }
                    '^' | 'H' => hazards.push(HazardDef {
                        pos,
                        dir: IVec2::ZERO,
                    }),
                    '.' | ' ' => {}
                    other => {
                        warn!("Level '{}': unknown map glyph '{}' treated as empty", self.name, other);
                    }
                }
            }
        }

        let Some(start) = start else {
            return Err(format!("Level '{}' has no start (S)", self.name));
        };

        for def in self.checkpoint_lines {
            if walls.contains(&def.pos) {
                return Err(format!(
                    "Level '{}': checkpoint at {},{} is inside a wall",
                    self.name, def.pos.x, def.pos.y
                ));
            }
            match checkpoints.iter_mut().find(|c| c.pos == def.pos) {
                Some(existing) => *existing = def,
                None => checkpoints.push(def),
            }
        }

        for def in self.hazard_lines {
            match hazards.iter_mut().find(|h| h.pos == def.pos) {
                Some(existing) => existing.dir = def.dir,
                None => hazards.push(def),
            }
        }

        Ok(LevelData {
            name: self.name,
            width,
            height,
            walls,
            start,
            goal,
            checkpoints,
            hazards,
            command_count: self.command_count,
            unlocked: self.unlocked,
        })
    }
}

/// Database of all loaded levels
#[derive(Resource, Default)]
pub struct LevelDatabase {
    pub levels: Vec<LevelData>,
}

/// Built-in levels used when the level file is missing or empty
pub const DEFAULT_LEVELS: &str = r#"
level: First Steps
command_count: 1
unlocked: W
map:
#..........#
#S.....C..G#
############
end
checkpoint: 7 1 J 2

level: Gap
command_count: 2
unlocked: W J
map:
#..........#
#S.C...G...#
#####.######
end
checkpoint: 3 1 T 3

level: Ledges
command_count: 3
unlocked: W C T Brackets
map:
#..........#
#.......G..#
#.....####.#
#S..###....#
############
end
"#;

impl LevelDatabase {
    /// Load levels from file, returns the built-in levels on error
    pub fn load_from_file(path: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                warn!("Failed to load levels from {}: {}, using defaults", path, e);
                Self::default_levels()
            }
        }
    }

    /// Parse level data from string, skipping invalid levels
    pub fn parse(content: &str) -> Self {
        let mut levels = Vec::new();
        for result in parse_blocks(content) {
            match result {
                Ok(level) => levels.push(level),
                Err(e) => warn!("Skipping level: {}", e),
            }
        }

        if levels.is_empty() {
            warn!("No levels parsed, using defaults");
            return Self::default_levels();
        }

        info!("Loaded {} levels", levels.len());
        Self { levels }
    }

    /// Parse level data, failing on the first invalid level
    pub fn parse_strict(content: &str) -> Result<Self, String> {
        let levels = parse_blocks(content).into_iter().collect::<Result<Vec<_>, _>>()?;
        if levels.is_empty() {
            return Err("No levels defined".to_string());
        }
        Ok(Self { levels })
    }

    /// Built-in fallback levels
    pub fn default_levels() -> Self {
        let levels = parse_blocks(DEFAULT_LEVELS)
            .into_iter()
            .filter_map(Result::ok)
            .collect();
        Self { levels }
    }

    /// Get level by index
    pub fn get(&self, index: usize) -> Option<&LevelData> {
        self.levels.get(index)
    }

    /// Find a level by name, ignoring case and treating `_` as a space
    pub fn get_by_name(&self, name: &str) -> Option<&LevelData> {
        let wanted = normalize_name(name);
        self.levels.iter().find(|l| normalize_name(&l.name) == wanted)
    }

    /// Resolve a level by 1-based number or by name
    pub fn resolve(&self, key: &str) -> Option<&LevelData> {
        self.resolve_index(key).and_then(|i| self.get(i))
    }

    /// Index of the level `resolve` would return
    pub fn resolve_index(&self, key: &str) -> Option<usize> {
        match key.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.levels.len() => Some(n - 1),
            Ok(_) => None,
            Err(_) => {
                let wanted = normalize_name(key);
                self.levels.iter().position(|l| normalize_name(&l.name) == wanted)
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.levels.iter().map(|l| l.name.as_str()).collect()
    }

    /// Get number of levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if database is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', " ")
}

/// Split content into level blocks and build each one
fn parse_blocks(content: &str) -> Vec<Result<LevelData, String>> {
    let mut results = Vec::new();
    let mut current: Option<LevelBuilder> = None;
    let mut in_map = false;

    for raw in content.lines() {
        // Map rows are taken verbatim ('#' is a wall there, not a comment).
        // Leading spaces are empty tiles, so only the line end is trimmed.
        if in_map {
            let row = raw.trim_end();
            if row.trim_start() == "end" {
                in_map = false;
            } else if !row.is_empty()
                && let Some(level) = &mut current
            {
                level.rows.push(row.to_string());
            }
            continue;
        }

        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix("level:") {
            if let Some(level) = current.take() {
                results.push(level.finish());
            }
            current = Some(LevelBuilder::new(name));
            continue;
        }

        let Some(level) = &mut current else {
            warn!("Ignoring line outside of a level block: {}", line);
            continue;
        };

        if line == "map:" {
            in_map = true;
        } else if let Some(count_str) = line.strip_prefix("command_count:") {
            match count_str.trim().parse::<usize>() {
                Ok(count) => level.command_count = count,
                Err(_) => warn!("Level '{}': bad command_count '{}'", level.name, count_str.trim()),
            }
        } else if let Some(list) = line.strip_prefix("unlocked:") {
            level.unlocked.clear();
            for name in list.split(|c: char| c == ',' || c.is_whitespace()) {
                if name.is_empty() {
                    continue;
                }
                match ScriptCommand::from_unlock_name(name) {
                    Some(command) => {
                        level.unlocked.insert(command.unlock_key());
                    }
                    None => warn!("Level '{}': unknown unlock '{}'", level.name, name),
                }
            }
        } else if let Some(params) = line.strip_prefix("checkpoint:") {
            let parts: Vec<&str> = params.split_whitespace().collect();
            if parts.len() >= 2
                && let (Ok(x), Ok(y)) = (parts[0].parse::<i32>(), parts[1].parse::<i32>())
            {
                let unlock = parts
                    .get(2)
                    .filter(|s| **s != "-")
                    .and_then(|s| ScriptCommand::from_unlock_name(s));
                let command_count = parts.get(3).and_then(|s| s.parse().ok()).unwrap_or(0);
                level.checkpoint_lines.push(CheckpointDef {
                    pos: IVec2::new(x, y),
                    unlock,
                    command_count,
                });
            } else {
                warn!("Level '{}': bad checkpoint line '{}'", level.name, line);
            }
        } else if let Some(params) = line.strip_prefix("hazard:") {
            let nums: Vec<i32> = params
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
            if nums.len() >= 2 {
                let dir = if nums.len() >= 4 {
                    IVec2::new(nums[2], nums[3])
                } else {
                    IVec2::ZERO
                };
                level.hazard_lines.push(HazardDef {
                    pos: IVec2::new(nums[0], nums[1]),
                    dir,
                });
            } else {
                warn!("Level '{}': bad hazard line '{}'", level.name, line);
            }
        } else {
            warn!("Level '{}': unrecognized line '{}'", level.name, line);
        }
    }

    // Don't forget the last level
    if let Some(level) = current {
        results.push(level.finish());
    }

    results
}

/// Drop a trailing `# comment` (only used outside map blocks)
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# A comment line
level: Sample Level
command_count: 3    # trailing comment
unlocked: W, J Brackets
map:
#.....#
#S.CG^#
#H#####
end
checkpoint: 3 1 Climb 4
checkpoint: 5 2 - 5
hazard: 1 0 1 0
"#;

    #[test]
    fn test_parse_sample() {
        let db = LevelDatabase::parse_strict(SAMPLE).unwrap();
        assert_eq!(db.len(), 1);
        let level = &db.levels[0];
        assert_eq!(level.name, "Sample Level");
        assert_eq!((level.width, level.height), (7, 3));
        assert_eq!(level.start, IVec2::new(1, 1));
        assert_eq!(level.goal, Some(IVec2::new(4, 1)));
        assert!(level.walls.contains(&IVec2::new(0, 2)));
        assert!(level.walls.contains(&IVec2::new(2, 0)));
        assert_eq!(level.command_count, 3);
        assert_eq!(
            level.unlocked,
            BTreeSet::from([ScriptCommand::Walk, ScriptCommand::Jump, ScriptCommand::OpenBracket])
        );
    }

    #[test]
    fn test_checkpoint_lines_merge_with_map() {
        let db = LevelDatabase::parse_strict(SAMPLE).unwrap();
        let level = &db.levels[0];
        assert_eq!(level.checkpoints.len(), 2);
        assert_eq!(
            level.checkpoints[0],
            CheckpointDef {
                pos: IVec2::new(3, 1),
                unlock: Some(ScriptCommand::Climb),
                command_count: 4,
            }
        );
        // Declared only by line
        assert_eq!(level.checkpoints[1].pos, IVec2::new(5, 2));
        assert_eq!(level.checkpoints[1].unlock, None);
    }

    #[test]
    fn test_hazard_lines_set_direction() {
        let db = LevelDatabase::parse_strict(SAMPLE).unwrap();
        let level = &db.levels[0];
        assert_eq!(level.hazards.len(), 2);
        assert!(level.hazards.contains(&HazardDef {
            pos: IVec2::new(5, 1),
            dir: IVec2::ZERO
        }));
        assert!(level.hazards.contains(&HazardDef {
            pos: IVec2::new(1, 0),
            dir: IVec2::new(1, 0)
        }));
    }

    #[test]
    fn test_leading_spaces_keep_columns() {
        let db = LevelDatabase::parse_strict("level: Indent\nmap:\n  ...#\n #S.G#\n#####\n  end\n").unwrap();
        let level = &db.levels[0];
        assert_eq!(level.width, 6);
        assert_eq!(level.start, IVec2::new(2, 1));
        assert_eq!(level.goal, Some(IVec2::new(4, 1)));
        assert!(level.walls.contains(&IVec2::new(1, 1)));
        assert!(!level.walls.contains(&IVec2::new(0, 1)));
    }

    #[test]
    fn test_missing_start_is_error() {
        let err = LevelDatabase::parse_strict("level: Nope\nmap:\n#.G#\nend\n");
        assert!(err.is_err());
        // Lenient parse falls back to defaults
        let db = LevelDatabase::parse("level: Nope\nmap:\n#.G#\nend\n");
        assert_eq!(db.len(), LevelDatabase::default_levels().len());
    }

    #[test]
    fn test_default_levels_parse() {
        let db = LevelDatabase::parse_strict(DEFAULT_LEVELS).unwrap();
        assert_eq!(db.names(), vec!["First Steps", "Gap", "Ledges"]);
        assert_eq!(
            db.get(0).unwrap().checkpoints[0].unlock,
            Some(ScriptCommand::Jump)
        );
    }

    #[test]
    fn test_resolve_by_number_and_name() {
        let db = LevelDatabase::default_levels();
        assert_eq!(db.resolve("2").map(|l| l.name.as_str()), Some("Gap"));
        assert_eq!(db.resolve("first_steps").map(|l| l.name.as_str()), Some("First Steps"));
        assert!(db.resolve("0").is_none());
        assert!(db.resolve("Nowhere").is_none());
        assert_eq!(db.resolve_index("ledges"), Some(2));
        assert_eq!(db.resolve_index("4"), None);
    }

    #[test]
    fn test_starting_rules() {
        let db = LevelDatabase::default_levels();
        let rules = db.get(1).unwrap().starting_rules();
        assert_eq!(rules.command_count, 2);
        assert!(rules.is_unlocked(ScriptCommand::Jump));
        assert!(!rules.is_unlocked(ScriptCommand::OpenBracket));
    }
}
