//! Maze loading
//!
//! - `map`: Text map parser and map sources
//! - `builder`: Populates the physics world from a parsed map
//! - `level`: Entity records for the loaded level

pub mod builder;
pub mod level;
pub mod map;

pub use builder::WorldBuilder;
pub use level::{Level, Monster, MonsterMode, PendingSpawn, Trap, Treasure, Wall};
pub use map::{
    CellKind, MapCell, MapDirectory, MapLoader, MapSource, MemoryMaps, ParsedMap,
    PortalEndpoint, PortalLinkRecord, SkippedLine, parse_link_line, parse_map,
};
