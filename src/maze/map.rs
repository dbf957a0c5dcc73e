//! Map description parser
//!
//! A map file is a grid of fixed-width character rows, optionally followed
//! by a portal section:
//!
//! ```text
//! #####
//! #  $#
//! # M^#
//! #####
//! Portals Links:
//! hall|1,1,1|3,2,2
//! FIN
//! ```
//!
//! Parsing is pure data extraction, nothing here touches the physics world.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LinkLineError, MapError};

/// Marker line that switches the reader into link mode
pub const PORTAL_SECTION_START: &str = "Portals Links:";
/// Marker line that switches the reader back to grid mode
pub const PORTAL_SECTION_END: &str = "FIN";

const LINK_GROUP_DELIMITER: char = '|';
const LINK_FIELD_DELIMITER: char = ',';

/// What occupies a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Wall,
    Trap,
    Treasure,
    MonsterSpawn,
    Empty,
}

impl CellKind {
    pub const WALL_SYMBOL: char = '#';
    pub const TRAP_SYMBOL: char = '^';
    pub const TREASURE_SYMBOL: char = '$';
    pub const MONSTER_SYMBOL: char = 'M';
    pub const EMPTY_SYMBOL: char = ' ';

    /// Classify a grid symbol. Unknown symbols are blank.
    pub fn from_symbol(symbol: char) -> Self {
        match symbol {
            Self::WALL_SYMBOL => CellKind::Wall,
            Self::TRAP_SYMBOL => CellKind::Trap,
            Self::TREASURE_SYMBOL => CellKind::Treasure,
            Self::MONSTER_SYMBOL => CellKind::MonsterSpawn,
            _ => CellKind::Empty,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            CellKind::Wall => Self::WALL_SYMBOL,
            CellKind::Trap => Self::TRAP_SYMBOL,
            CellKind::Treasure => Self::TREASURE_SYMBOL,
            CellKind::MonsterSpawn => Self::MONSTER_SYMBOL,
            CellKind::Empty => Self::EMPTY_SYMBOL,
        }
    }

    /// Whether the player can stand on this cell
    pub fn is_walkable(&self) -> bool {
        !matches!(self, CellKind::Wall)
    }
}

/// A classified grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCell {
    pub row: u32,
    pub column: u32,
    pub kind: CellKind,
}

/// One side of a portal link, in grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalEndpoint {
    /// Level the endpoint lives in
    pub level: u32,
    /// Grid column
    pub x: u32,
    /// Grid row
    pub y: u32,
}

/// A pair of endpoints that act as each other's exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalLinkRecord {
    /// Link label, shared by both endpoints
    pub label: String,
    pub endpoints: [PortalEndpoint; 2],
}

/// A link line that was not understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the map text
    pub line: usize,
    pub error: LinkLineError,
}

/// Everything extracted from one map file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMap {
    /// Every grid position, in reading order, blanks included
    pub cells: Vec<MapCell>,
    pub links: Vec<PortalLinkRecord>,
    pub skipped: Vec<SkippedLine>,
}

impl ParsedMap {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.links.is_empty()
    }

    /// Cells that will receive a body (or a pending spawn)
    pub fn occupied(&self) -> impl Iterator<Item = &MapCell> {
        self.cells.iter().filter(|c| c.kind != CellKind::Empty)
    }

    pub fn count(&self, kind: CellKind) -> usize {
        self.cells.iter().filter(|c| c.kind == kind).count()
    }

    pub fn cell(&self, row: u32, column: u32) -> Option<CellKind> {
        self.cells
            .iter()
            .find(|c| c.row == row && c.column == column)
            .map(|c| c.kind)
    }

    /// Re-emit the grid section as text (portal section omitted)
    pub fn render_grid(&self) -> String {
        let mut rows: Vec<String> = Vec::new();
        for cell in &self.cells {
            let row = cell.row as usize;
            while rows.len() <= row {
                rows.push(String::new());
            }
            let line = &mut rows[row];
            while line.chars().count() < cell.column as usize {
                line.push(CellKind::EMPTY_SYMBOL);
            }
            line.push(cell.kind.symbol());
        }
        rows.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadMode {
    Grid,
    Links,
}

/// Parse the text of a map file
pub fn parse_map(source: &str) -> ParsedMap {
    let mut parsed = ParsedMap::default();
    let mut mode = ReadMode::Grid;
    let mut row: u32 = 0;

    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim_end_matches('\r');

        if line == PORTAL_SECTION_START {
            mode = ReadMode::Links;
            continue;
        }
        if line == PORTAL_SECTION_END {
            mode = ReadMode::Grid;
            continue;
        }

        match mode {
            ReadMode::Grid => {
                for (column, symbol) in line.chars().enumerate() {
                    parsed.cells.push(MapCell {
                        row,
                        column: column as u32,
                        kind: CellKind::from_symbol(symbol),
                    });
                }
                row += 1;
            }
            ReadMode::Links => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_link_line(line) {
                    Ok(record) => parsed.links.push(record),
                    Err(error) => {
                        log::warn!("Skipping portal link on line {}: {error}", index + 1);
                        parsed.skipped.push(SkippedLine {
                            line: index + 1,
                            error,
                        });
                    }
                }
            }
        }
    }

    parsed
}

/// Parse `label|x1,y1,level1|x2,y2,level2`
pub fn parse_link_line(line: &str) -> Result<PortalLinkRecord, LinkLineError> {
    let groups: Vec<&str> = line.split(LINK_GROUP_DELIMITER).collect();
    let [label, first, second] = groups.as_slice() else {
        return Err(LinkLineError::GroupCount {
            found: groups.len(),
        });
    };

    Ok(PortalLinkRecord {
        label: label.trim().to_string(),
        endpoints: [parse_endpoint(first)?, parse_endpoint(second)?],
    })
}

fn parse_endpoint(group: &str) -> Result<PortalEndpoint, LinkLineError> {
    let fields: Vec<&str> = group.split(LINK_FIELD_DELIMITER).map(str::trim).collect();
    let [x, y, level] = fields.as_slice() else {
        return Err(LinkLineError::MissingFields {
            endpoint: group.to_string(),
        });
    };

    let level = parse_field(level)?;
    if level < 1 {
        return Err(LinkLineError::InvalidLevel { level });
    }

    Ok(PortalEndpoint {
        level: to_u32(level)?,
        x: to_u32(parse_field(x)?)?,
        y: to_u32(parse_field(y)?)?,
    })
}

fn parse_field(field: &str) -> Result<i64, LinkLineError> {
    field.parse().map_err(|_| LinkLineError::InvalidNumber {
        field: field.to_string(),
    })
}

fn to_u32(value: i64) -> Result<u32, LinkLineError> {
    u32::try_from(value).map_err(|_| LinkLineError::InvalidNumber {
        field: value.to_string(),
    })
}

/// Where the text of each level's map comes from
pub trait MapSource {
    fn read_level(&self, level: u32) -> Result<String, MapError>;
}

/// Map files on disk, named `<prefix><level>` inside one directory
#[derive(Debug, Clone)]
pub struct MapDirectory {
    dir: PathBuf,
    prefix: String,
}

impl MapDirectory {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path_for(&self, level: u32) -> PathBuf {
        self.dir.join(format!("{}{}", self.prefix, level))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MapSource for MapDirectory {
    fn read_level(&self, level: u32) -> Result<String, MapError> {
        let path = self.path_for(level);
        std::fs::read_to_string(&path).map_err(|source| MapError::Io { path, source })
    }
}

/// Maps held in memory, keyed by level number
#[derive(Debug, Clone, Default)]
pub struct MemoryMaps {
    levels: HashMap<u32, String>,
}

impl MemoryMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: u32, text: impl Into<String>) -> Self {
        self.insert(level, text);
        self
    }

    pub fn insert(&mut self, level: u32, text: impl Into<String>) {
        self.levels.insert(level, text.into());
    }
}

impl MapSource for MemoryMaps {
    fn read_level(&self, level: u32) -> Result<String, MapError> {
        self.levels
            .get(&level)
            .cloned()
            .ok_or(MapError::Missing { level })
    }
}

/// Resolves and parses level maps
pub struct MapLoader {
    source: Box<dyn MapSource>,
}

impl MapLoader {
    pub fn new(source: impl MapSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Read and parse a level, surfacing I/O failures
    pub fn try_load(&self, level: u32) -> Result<ParsedMap, MapError> {
        let text = self.source.read_level(level)?;
        let parsed = parse_map(&text);
        log::debug!(
            "Parsed level {}: {} cells, {} links, {} skipped lines",
            level,
            parsed.cells.len(),
            parsed.links.len(),
            parsed.skipped.len()
        );
        Ok(parsed)
    }

    /// Read and parse a level; failures are logged and yield an empty map
    pub fn load(&self, level: u32) -> ParsedMap {
        match self.try_load(level) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::error!("{e}");
                ParsedMap::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grid_cells_are_classified() {
        let parsed = parse_map("#^$\nM ?");
        let kinds: Vec<CellKind> = parsed.cells.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CellKind::Wall,
                CellKind::Trap,
                CellKind::Treasure,
                CellKind::MonsterSpawn,
                CellKind::Empty,
                CellKind::Empty, // unknown symbol
            ]
        );
        assert_eq!(parsed.cells[3].row, 1);
        assert_eq!(parsed.cells[3].column, 0);
    }

    #[test]
    fn test_bordered_three_by_three() {
        let parsed = parse_map("###\n# #\n###");
        assert_eq!(parsed.count(CellKind::Wall), 8);
        assert_eq!(parsed.count(CellKind::Trap), 0);
        assert_eq!(parsed.cell(1, 1), Some(CellKind::Empty));
        let walkable: Vec<_> = parsed
            .cells
            .iter()
            .filter(|c| c.kind.is_walkable())
            .map(|c| (c.row, c.column))
            .collect();
        assert_eq!(walkable, vec![(1, 1)]);
    }

    #[test]
    fn test_portal_section_only() {
        let parsed = parse_map("Portals Links:\nlabel|0,0,1|2,2,1\nFIN");
        assert!(parsed.cells.is_empty());
        assert_eq!(parsed.links.len(), 1);
        let link = &parsed.links[0];
        assert_eq!(link.label, "label");
        assert_eq!(link.endpoints[0], PortalEndpoint { level: 1, x: 0, y: 0 });
        assert_eq!(link.endpoints[1], PortalEndpoint { level: 1, x: 2, y: 2 });
    }

    #[test]
    fn test_grid_resumes_after_fin() {
        let parsed = parse_map("##\nPortals Links:\na|0,0,1|1,0,1\nFIN\n$#");
        assert_eq!(parsed.links.len(), 1);
        // Marker lines do not consume grid rows
        assert_eq!(parsed.cell(1, 0), Some(CellKind::Treasure));
        assert_eq!(parsed.cells.len(), 4);
    }

    #[test]
    fn test_malformed_links_are_skipped() {
        let text = "Portals Links:\nbad|1,2|3,4,1\nok|1,1,1|2,2,1\nnolinks\nx|a,1,1|1,1,1\nz|1,1,0|1,1,1\nFIN";
        let parsed = parse_map(text);
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].label, "ok");

        let errors: Vec<_> = parsed.skipped.iter().map(|s| (s.line, s.error.clone())).collect();
        assert_eq!(
            errors,
            vec![
                (2, LinkLineError::MissingFields { endpoint: "1,2".to_string() }),
                (4, LinkLineError::GroupCount { found: 1 }),
                (5, LinkLineError::InvalidNumber { field: "a".to_string() }),
                (6, LinkLineError::InvalidLevel { level: 0 }),
            ]
        );
    }

    #[test]
    fn test_crlf_markers() {
        let parsed = parse_map("#\r\nPortals Links:\r\na|0,0,1|1,1,2\r\nFIN\r\n");
        assert_eq!(parsed.cells.len(), 1);
        assert_eq!(parsed.links.len(), 1);
    }

    #[test]
    fn test_memory_source_missing_level() {
        let loader = MapLoader::new(MemoryMaps::new().with_level(1, "#"));
        assert_eq!(loader.load(1).cells.len(), 1);
        assert!(matches!(loader.try_load(2), Err(MapError::Missing { level: 2 })));
        assert!(loader.load(2).is_empty());
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Maze3"), "#$#\n").unwrap();
        let loader = MapLoader::new(MapDirectory::new(dir.path(), "Maze"));

        let parsed = loader.try_load(3).unwrap();
        assert_eq!(parsed.count(CellKind::Treasure), 1);

        assert!(matches!(loader.try_load(4), Err(MapError::Io { .. })));
        assert!(loader.load(4).is_empty());
    }

    fn grid_strategy() -> impl Strategy<Value = Vec<String>> {
        let symbol = prop::sample::select(vec!['#', '^', '$', 'M', ' ', '.', 'x']);
        prop::collection::vec(prop::collection::vec(symbol, 1..12), 1..10)
            .prop_map(|rows| rows.into_iter().map(|r| r.into_iter().collect()).collect())
    }

    proptest! {
        #[test]
        fn prop_grid_round_trip_preserves_walkability(rows in grid_strategy()) {
            let text = rows.join("\n");
            let parsed = parse_map(&text);
            let rendered = parse_map(&parsed.render_grid());

            prop_assert_eq!(parsed.cells.len(), rendered.cells.len());
            for (a, b) in parsed.cells.iter().zip(rendered.cells.iter()) {
                prop_assert_eq!((a.row, a.column), (b.row, b.column));
                prop_assert_eq!(a.kind.is_walkable(), b.kind.is_walkable());
                prop_assert_eq!(a.kind, b.kind);
            }
        }
    }
}
