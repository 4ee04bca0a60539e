// STD Dependencies -----------------------------------------------------------
use std::collections::HashMap;


// Internal Dependencies ------------------------------------------------------
use crate::autotile::{self, LayerGrid, WrapRule};
use crate::error::CompileError;
use crate::lz10;
use crate::tiles::brickset::LevelBrickset;
use crate::tiles::sheet::TileSheet;
use crate::tiles::{Brick, FlipStyle, LargeTile};


// Level Model -----------------------------------------------------------------
pub const MAX_LAYERS: usize = 3;

/// Largest brick index that still fits the 10 index bits of a tile-map cell.
const MAX_BRICK_INDEX: usize = 0x3FE;

#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: u8,
    pub x: u8,
    pub y: u8,
    pub data: Vec<u8>
}

/// A parsed level: wrap-character layers plus metadata pairs and entities,
/// ready to be resolved and serialized.
#[derive(Debug)]
pub struct CompiledLevel {
    width: usize,
    height: usize,
    layers: usize,
    grid: Vec<Vec<char>>,
    pub metadata: Vec<(u8, u8)>,
    pub entities: Vec<Entity>
}

impl CompiledLevel {

    pub fn new(width: usize, height: usize, layers: usize) -> Result<Self, CompileError> {
        if width == 0 || height == 0 || width > i16::MAX as usize || height > i16::MAX as usize {
            return Err(CompileError::data(format!(
                "Invalid level dimensions {}x{}", width, height
            )));
        }
        Ok(Self {
            width,
            height,
            // layer count is always clamped into the supported range
            layers: layers.clamp(1, MAX_LAYERS),
            grid: vec![vec![' '; width * height]; layers.clamp(1, MAX_LAYERS)],
            metadata: Vec::new(),
            entities: Vec::new()
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    pub fn cell(&self, layer: usize, x: usize, y: usize) -> char {
        self.grid[layer][y * self.width + x]
    }

    pub fn set_cell(&mut self, layer: usize, x: usize, y: usize, c: char) {
        self.grid[layer][y * self.width + x] = c;
    }


    // Text Format Parsing ----------------------------------------------------

    /// Parses the authored `.txt` level format: a `width - height - layers`
    /// header, `layer` sections with one row of wrap characters per line,
    /// `entities` and `meta` sections terminated by `end`.
    pub fn from_text(source: &str, entity_index: &HashMap<String, u8>) -> Result<Self, CompileError> {
        let mut lines = source.lines();

        let header = next_meaningful(&mut lines).ok_or_else(|| {
            CompileError::data("Level file is empty")
        })?;
        let fields = split_trimmed(header, '-');
        if fields.len() != 3 {
            return Err(CompileError::data(format!(
                "Expected \"width - height - layers\" header, found \"{}\"", header
            )));
        }
        let width = parse_number(fields[0], "level width")?;
        let height = parse_number(fields[1], "level height")?;
        let layers = parse_number(fields[2], "level layer count")?;
        let mut level = Self::new(width, height, layers)?;

        while let Some(line) = next_meaningful(&mut lines) {
            let fields = split_trimmed(line, '-');
            match fields.first().copied().unwrap_or("") {
                "layer" => {
                    let layer = if fields.len() > 1 {
                        parse_number(fields[1], "layer index")?

                    } else {
                        0
                    };
                    // rows of out-of-range layers are still consumed
                    for y in 0..level.height {
                        let row = next_row(&mut lines).ok_or_else(|| {
                            CompileError::data(format!("Layer {} ends after {} row(s)", layer, y))
                        })?;
                        if layer >= level.layers {
                            continue;
                        }
                        let mut chars = row.chars();
                        for x in 0..level.width {
                            let c = chars.next().ok_or_else(|| {
                                CompileError::data(format!(
                                    "Row {} of layer {} is shorter than the level width", y, layer
                                ))
                            })?;
                            level.set_cell(layer, x, y, c);
                        }
                    }
                },
                "entities" => {
                    loop {
                        let line = next_meaningful(&mut lines).ok_or_else(|| {
                            CompileError::data("Entity section is missing its \"end\" terminator")
                        })?;
                        if line.trim() == "end" {
                            break;
                        }
                        level.entities.push(parse_entity(line, entity_index)?);
                    }
                },
                "meta" | "metadata" => {
                    loop {
                        let line = next_meaningful(&mut lines).ok_or_else(|| {
                            CompileError::data("Metadata section is missing its \"end\" terminator")
                        })?;
                        if line.trim() == "end" {
                            break;
                        }
                        let pair = split_trimmed(line, ';');
                        if pair.len() != 2 {
                            return Err(CompileError::data(format!(
                                "Expected \"key; value\" metadata pair, found \"{}\"", line
                            )));
                        }
                        let key = parse_byte(pair[0], "metadata key")?;
                        if level.metadata.iter().any(|(k, _)| *k == key) {
                            return Err(CompileError::data(format!(
                                "Duplicate metadata key {}", key
                            )));
                        }
                        level.metadata.push((key, parse_byte(pair[1], "metadata value")?));
                    }
                },
                // unknown section markers are skipped
                _ => {}
            }
        }
        Ok(level)
    }


    // Binary Serialization ---------------------------------------------------

    /// Serializes the level into the runtime byte stream and pads the result
    /// with 0xFF up to a multiple of 4 bytes.
    pub fn binary_data(
        &self,
        wrapping: &[(char, WrapRule)],
        sheets: &HashMap<String, TileSheet>,
        brickset: &mut LevelBrickset,
        brick_size: usize,
        seed: u32

    ) -> Result<Vec<u8>, CompileError> {
        let mut bytes = Vec::new();
        self.header(&mut bytes);

        // Re-align the fixed-width reader after the header: an odd pair count
        // needs a wide marker, an even one a single byte.
        if self.metadata.len() & 1 == 1 {
            bytes.extend_from_slice(&[0x03, 0xFF, 0xFF]);

        } else {
            bytes.push(0x01);
        }

        for layer in 0..self.layers {
            let compressed = self.visual_layer(layer, wrapping, sheets, brickset, brick_size, seed)?;
            let last = layer == self.layers - 1;

            // The runtime loader expects a full extra pad word whenever
            // (len + 3) is already a multiple of 4; the formula is part of
            // the persisted format and must not be "fixed".
            let pad = if last {
                0

            } else {
                4 - ((compressed.len() + 3) & 0x3)
            };

            let prefixed = compressed.len() + pad;
            if prefixed > usize::from(u16::MAX) {
                return Err(CompileError::data(format!(
                    "Layer {} compresses to {} byte(s), exceeding the u16 length prefix", layer, compressed.len()
                )));
            }
            bytes.push((prefixed & 0xFF) as u8);
            bytes.push((prefixed >> 8) as u8);
            bytes.extend_from_slice(&compressed);

            if !last {
                bytes.extend(std::iter::repeat(0xFF).take(pad));
                bytes.push(0x01);
            }
        }

        for entity in &self.entities {
            bytes.push(entity.kind);
            bytes.push(entity.x);
            bytes.push(entity.y);
            bytes.extend_from_slice(&entity.data);
            bytes.push(0xFF);
        }
        bytes.push(0xFF);

        while bytes.len() & 0x3 != 0 {
            bytes.push(0xFF);
        }
        Ok(bytes)
    }

    fn header(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&(self.width as i16).to_le_bytes());
        bytes.extend_from_slice(&(self.height as i16).to_le_bytes());
        for (key, value) in &self.metadata {
            bytes.push(*key);
            bytes.push(*value);
        }
        bytes.push(0xFF);
    }

    /// Resolves one layer into packed 16-bit cell values and LZ-compresses
    /// them. Cell layout: bits 0-9 brick index + 1 (0 = empty), bits 10-11
    /// flip code, bits 12-15 palette.
    fn visual_layer(
        &self,
        layer: usize,
        wrapping: &[(char, WrapRule)],
        sheets: &HashMap<String, TileSheet>,
        brickset: &mut LevelBrickset,
        brick_size: usize,
        seed: u32

    ) -> Result<Vec<u8>, CompileError> {

        // Symbol ids for neighbor sampling: wrap-char index + 1, 0 = empty.
        let mut cells = vec![0; self.width * self.height];
        for (i, c) in self.grid[layer].iter().enumerate() {
            if *c != ' ' {
                cells[i] = symbol_id(wrapping, *c).ok_or_else(|| {
                    CompileError::data(format!(
                        "Wrap character '{}' is not part of the pack's rule table", c
                    ))
                })?;
            }
        }
        let grid = LayerGrid::new(&cells, self.width, self.height);

        // Connect sets, converted once per layer into symbol ids.
        let connect_ids: Vec<Vec<u32>> = wrapping.iter().map(|(_, rule)| {
            rule.connects.iter().filter_map(|c| symbol_id(wrapping, *c)).collect()
        }).collect();

        let mut packed = Vec::with_capacity(self.width * self.height * 2);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.cell(layer, x, y);
                let value = if c == ' ' {
                    0

                } else {
                    let index = wrapping.iter().position(|(w, _)| *w == c).unwrap_or(0);
                    let rule = &wrapping[index].1;
                    let tile = self.resolve_tile(
                        rule, &grid, &connect_ids[index], x, y, sheets, brick_size, seed
                    )?;
                    match tile {
                        Some(tile) => Self::cell_value(&tile, c, rule, brickset)?,
                        None => 0
                    }
                };
                packed.push((value & 0xFF) as u8);
                packed.push((value >> 8) as u8);
            }
        }

        lz10::compress(&packed)
    }

    /// Picks the tileset block for one cell, or the all-air block when the
    /// rule's tileset is missing. `None` leaves the cell empty.
    #[allow(clippy::too_many_arguments)]
    fn resolve_tile(
        &self,
        rule: &WrapRule,
        grid: &LayerGrid,
        connect_ids: &[u32],
        x: usize,
        y: usize,
        sheets: &HashMap<String, TileSheet>,
        brick_size: usize,
        seed: u32

    ) -> Result<Option<LargeTile>, CompileError> {
        let sheet = rule.tileset.as_ref().and_then(|name| sheets.get(name));
        if let Some(sheet) = sheet {
            let value = autotile::neighbor_value(
                grid, x as i32, y as i32, connect_ids, &rule.neighborhood
            );
            match autotile::resolve(rule, value, x as u32, y as u32, seed) {
                Some((cx, cy)) => {
                    if cx < 0 || cy < 0 {
                        return Err(CompileError::data(format!(
                            "Tile coordinate {}x{} lies outside the tileset", cx, cy
                        )));
                    }
                    sheet.large_tile(cx as usize, cy as usize).map(Some)
                },
                None => Ok(None)
            }

        } else {
            Ok(Some(LargeTile::air(brick_size)))
        }
    }

    /// Finds or creates the brick for the resolved block and packs the cell
    /// value.
    fn cell_value(tile: &LargeTile, wrap: char, rule: &WrapRule, brickset: &mut LevelBrickset) -> Result<u16, CompileError> {
        let (index, flip) = match brickset.lookup(tile, wrap) {
            Some(found) => found,
            None => {
                brickset.add_new_brick(Brick {
                    tile: tile.clone(),
                    wrap,
                    collision_type: rule.collision_type,
                    collision_shape: rule.collision_shape,
                    palette: rule.palette
                });
                (brickset.len() - 1, FlipStyle::None)
            }
        };
        if index > MAX_BRICK_INDEX {
            return Err(CompileError::data(format!(
                "Brick registry grew past {} entries, tile-map indices no longer fit", MAX_BRICK_INDEX + 1
            )));
        }
        Ok((index as u16 + 1) | flip.code() << 10 | u16::from(rule.palette & 0xF) << 12)
    }

}

fn symbol_id(wrapping: &[(char, WrapRule)], c: char) -> Option<u32> {
    wrapping.iter().position(|(w, _)| *w == c).map(|i| i as u32 + 1)
}

/// Per-level PRNG seed, derived from the level's identifier with FNV-1a so
/// rebuilds are reproducible across processes.
pub fn level_seed(identifier: &str) -> u32 {
    let mut hash = 0x811C_9DC5u32;
    for byte in identifier.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

fn next_meaningful<'a, I: Iterator<Item = &'a str>>(lines: &mut I) -> Option<&'a str> {
    lines.find(|line| !line.trim().is_empty())
}

// Rows made entirely of spaces are valid level rows, only truly empty lines
// are skipped here.
fn next_row<'a, I: Iterator<Item = &'a str>>(lines: &mut I) -> Option<&'a str> {
    lines.find(|line| !line.is_empty())
}

fn split_trimmed(line: &str, separator: char) -> Vec<&str> {
    line.split(separator).map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn parse_number(text: &str, what: &str) -> Result<usize, CompileError> {
    text.parse::<usize>().map_err(|_| {
        CompileError::data(format!("Invalid {} \"{}\"", what, text))
    })
}

fn parse_byte(text: &str, what: &str) -> Result<u8, CompileError> {
    text.parse::<u8>().map_err(|_| {
        CompileError::data(format!("Invalid {} \"{}\"", what, text))
    })
}

fn parse_entity(line: &str, entity_index: &HashMap<String, u8>) -> Result<Entity, CompileError> {
    let fields = split_trimmed(line, ';');
    if fields.len() < 3 {
        return Err(CompileError::data(format!(
            "Expected \"type; x; y; ...\" entity line, found \"{}\"", line
        )));
    }
    let kind = match fields[0].parse::<u8>() {
        Ok(kind) => kind,
        Err(_) => *entity_index.get(fields[0]).ok_or_else(|| {
            CompileError::data(format!("Unknown entity type \"{}\"", fields[0]))
        })?
    };
    let x = parse_byte(fields[1], "entity x position")?;
    let y = parse_byte(fields[2], "entity y position")?;
    let data = fields[3..].iter()
        .map(|f| parse_byte(f, "entity data value"))
        .collect::<Result<Vec<u8>, CompileError>>()?;
    Ok(Entity {
        kind,
        x,
        y,
        data
    })
}
