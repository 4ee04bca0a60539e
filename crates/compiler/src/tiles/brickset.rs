// Internal Dependencies ------------------------------------------------------
use super::{Brick, FlipStyle, Flippable, LargeTile, Tile};


// Brick Registry --------------------------------------------------------------

/// The canonical per-pack dictionary of unique bricks plus the unique raw
/// 8x8 tiles they are built from.
///
/// Both registries are insertion-ordered dense vectors; indices are handles
/// and stay stable for the lifetime of a compile pass, which keeps compiled
/// tile-map values reproducible across rebuilds. Lookups are linear scans on
/// purpose, the registries stay in the low thousands of entries.
#[derive(Debug, Default)]
pub struct LevelBrickset {
    bricks: Vec<Brick>,
    raw_tiles: Vec<Tile>
}

impl LevelBrickset {

    pub fn new() -> Self {
        Self {
            bricks: Vec::new(),
            raw_tiles: Vec::new()
        }
    }

    pub fn bricks(&self) -> &[Brick] {
        &self.bricks
    }

    pub fn raw_tiles(&self) -> &[Tile] {
        &self.raw_tiles
    }

    pub fn len(&self) -> usize {
        self.bricks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty()
    }

    /// Flip-tolerant membership test.
    pub fn contains(&self, brick: &Brick) -> bool {
        self.index_of(brick).is_some()
    }

    /// Position of the matching canonical entry, used as the persisted
    /// tile-map value.
    pub fn index_of(&self, brick: &Brick) -> Option<usize> {
        self.bricks.iter().position(|b| b.matches(brick, FlipStyle::Both))
    }

    /// Appends the brick unless a flip-equal entry for the same wrap
    /// character already exists, and registers every non-air constituent tile
    /// that is not yet present in the raw tile registry.
    pub fn add_new_brick(&mut self, brick: Brick) {
        if self.contains(&brick) {
            return;
        }
        for tile in brick.tile.tiles() {
            if !tile.is_air() && self.raw_index_of(tile).is_none() {
                self.raw_tiles.push(tile.clone());
            }
        }
        self.bricks.push(brick);
    }

    /// Finds the brick matching the given geometry and wrap character,
    /// returning its index and the flip code that turns the stored canonical
    /// geometry into the probed instance.
    pub fn lookup(&self, tile: &LargeTile, wrap: char) -> Option<(usize, FlipStyle)> {
        self.bricks.iter().enumerate().find_map(|(index, b)| {
            if b.wrap != wrap {
                None
            } else {
                b.tile.flip_offset_of(tile).ok().map(|flip| (index, flip))
            }
        })
    }

    /// Same as `lookup` for the raw tile registry.
    pub fn raw_index_of(&self, tile: &Tile) -> Option<(usize, FlipStyle)> {
        self.raw_tiles.iter().enumerate().find_map(|(index, t)| {
            t.flip_offset_of(tile).ok().map(|flip| (index, flip))
        })
    }

}
