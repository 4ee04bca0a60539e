// Internal Dependencies ------------------------------------------------------
use crate::error::CompileError;


// Wrap Rules ------------------------------------------------------------------

/// Per wrap-character autotiling configuration.
///
/// `connects` lists the wrap characters treated as topologically equal when
/// sampling neighbors; `neighborhood` is the ordered list of relative offsets
/// the neighbor bitmask is built from. `mappings` are tried in declared order
/// and the first whose masks accept the bitmask decides the tile; `offsets`
/// are cumulative nudges applied afterwards.
#[derive(Debug, Clone)]
pub struct WrapRule {
    pub tileset: Option<String>,
    pub palette: u8,
    pub collision_type: u8,
    pub collision_shape: u8,
    pub connects: Vec<char>,
    pub neighborhood: Vec<(i32, i32)>,
    pub mappings: Vec<TileMapping>,
    pub offsets: Vec<OffsetRule>
}

#[derive(Debug, Clone)]
pub struct TileMapping {
    pub enable: u32,
    pub disable: u32,
    pub tiles: Vec<(u32, u32)>
}

#[derive(Debug, Clone)]
pub struct OffsetRule {
    pub enable: u32,
    pub disable: u32,
    pub nudges: Vec<(i32, i32)>
}

/// Derives the enable/disable mask pair from a `{'0','1','*'}` pattern
/// string: enable is the pattern with wildcards lowered parsed as binary,
/// disable the complement of the pattern with wildcards raised.
pub fn parse_mask(pattern: &str) -> Result<(u32, u32), CompileError> {
    if pattern.is_empty() || pattern.len() > 32 || !pattern.chars().all(|c| matches!(c, '0' | '1' | '*')) {
        return Err(CompileError::config(format!(
            "Malformed wrap rule bit pattern \"{}\"", pattern
        )));
    }
    let enable = u32::from_str_radix(&pattern.replace('*', "0"), 2).map_err(|_| {
        CompileError::config(format!("Malformed wrap rule bit pattern \"{}\"", pattern))
    })?;
    let disable = !u32::from_str_radix(&pattern.replace('*', "1"), 2).map_err(|_| {
        CompileError::config(format!("Malformed wrap rule bit pattern \"{}\"", pattern))
    })?;
    Ok((enable, disable))
}


// Neighbor Sampling -----------------------------------------------------------

/// One layer of authored level data as symbol ids (wrap-char index + 1,
/// 0 = empty), addressed with edge-clamped coordinates.
#[derive(Debug)]
pub struct LayerGrid<'a> {
    cells: &'a [u32],
    width: usize,
    height: usize
}

impl<'a> LayerGrid<'a> {

    pub fn new(cells: &'a [u32], width: usize, height: usize) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            cells,
            width,
            height
        }
    }

    /// Samples the nearest in-bounds cell; offsets never read out of bounds.
    pub fn clamped(&self, x: i32, y: i32) -> u32 {
        let cx = x.clamp(0, self.width as i32 - 1) as usize;
        let cy = y.clamp(0, self.height as i32 - 1) as usize;
        self.cells[cy * self.width + cx]
    }

}

/// Builds the neighbor bitmask for one cell: offsets are visited in rule
/// order and accumulate most-significant-bit first, so bit 0 of the result
/// corresponds to the last offset in the list.
pub fn neighbor_value(grid: &LayerGrid, x: i32, y: i32, connect_ids: &[u32], neighborhood: &[(i32, i32)]) -> u32 {
    let mut value = 0;
    for (dx, dy) in neighborhood {
        value <<= 1;
        if connect_ids.contains(&grid.clamped(x + dx, y + dy)) {
            value |= 1;
        }
    }
    value
}


// Tile Selection ---------------------------------------------------------------

const HASH_MULTIPLIER: u64 = 57047;
const HASH_MODULUS: u64 = 0x7FFF_FFFF;

/// Position-derived hash used to pick between candidate tiles: two rounds of
/// multiply-mod-(2^31 - 1) over the per-level seed, mixing in x then y. The
/// same level compiled with the same seed always makes the same choice.
pub fn point_hash(seed: u32, x: u32, y: u32) -> u32 {
    let mut h = u64::from(seed);
    h = (h + u64::from(x)) * HASH_MULTIPLIER % HASH_MODULUS;
    h = (h + u64::from(y)) * HASH_MULTIPLIER % HASH_MODULUS;
    h as u32
}

/// Resolves the tileset coordinate for one cell from its neighbor bitmask.
/// Returns `None` when no mapping entry accepts the bitmask, which leaves the
/// cell empty.
pub fn resolve(rule: &WrapRule, value: u32, x: u32, y: u32, seed: u32) -> Option<(i32, i32)> {
    let mapping = rule.mappings.iter().find(|m| {
        m.enable & value == m.enable && m.disable & value == 0
    })?;
    if mapping.tiles.is_empty() {
        return None;
    }

    let choice = mapping.tiles[point_hash(seed, x, y) as usize % mapping.tiles.len()];
    let (mut cx, mut cy) = (choice.0 as i32, choice.1 as i32);

    // Offset entries are cumulative, every matching entry contributes.
    for offset in &rule.offsets {
        if offset.enable & value == offset.enable && offset.disable & value == 0 {
            for (dx, dy) in &offset.nudges {
                cx += dx;
                cy += dy;
            }
        }
    }
    Some((cx, cy))
}


// Tests ----------------------------------------------------------------------
#[cfg(test)]
mod test {
    use super::{parse_mask, neighbor_value, point_hash, resolve, LayerGrid, OffsetRule, TileMapping, WrapRule};

    fn rule(mappings: Vec<TileMapping>, offsets: Vec<OffsetRule>) -> WrapRule {
        WrapRule {
            tileset: Some("terrain".to_string()),
            palette: 0,
            collision_type: 1,
            collision_shape: 0,
            connects: vec!['M'],
            neighborhood: vec![(0, -1), (-1, 0), (1, 0), (0, 1)],
            mappings,
            offsets
        }
    }

    fn mapping(pattern: &str, tiles: Vec<(u32, u32)>) -> TileMapping {
        let (enable, disable) = parse_mask(pattern).unwrap();
        TileMapping {
            enable,
            disable,
            tiles
        }
    }

    #[test]
    fn test_mask_derivation() {
        let (enable, disable) = parse_mask("****").unwrap();
        assert_eq!(enable, 0);
        assert_eq!(disable, !0b1111);

        let (enable, disable) = parse_mask("10*1").unwrap();
        assert_eq!(enable, 0b1001);
        assert_eq!(disable, !0b1011);

        // wildcard positions neither require nor veto their bit
        for value in [0b1001, 0b1011] {
            assert_eq!(enable & value, enable);
            assert_eq!(disable & value, 0);
        }
        assert_ne!(enable & 0b0001, enable);
        assert_ne!(disable & 0b1101, 0);
    }

    #[test]
    fn test_malformed_masks() {
        assert!(parse_mask("").is_err());
        assert!(parse_mask("01x*").is_err());
        assert!(parse_mask(&"1".repeat(33)).is_err());
    }

    #[test]
    fn test_neighbor_value_msb_first() {
        // 3x1 grid: connected, empty, connected
        let cells = [1, 0, 1];
        let grid = LayerGrid::new(&cells, 3, 1);
        let value = neighbor_value(&grid, 1, 0, &[1], &[(-1, 0), (0, 0), (1, 0)]);

        // first offset lands in the highest bit, last offset in bit 0
        assert_eq!(value, 0b101);
    }

    #[test]
    fn test_neighbor_value_edge_clamping() {
        // 1x1 grid: offsets pointing outside sample the single cell
        let cells = [1];
        let grid = LayerGrid::new(&cells, 1, 1);
        assert_eq!(neighbor_value(&grid, 0, 0, &[1], &[(-1, -1), (1, 1)]), 0b11);
        assert_eq!(neighbor_value(&grid, 0, 0, &[2], &[(-1, -1), (1, 1)]), 0b00);
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let r = rule(vec![
            mapping("1111", vec![(0, 0)]),
            mapping("1***", vec![(1, 0)]),
            mapping("****", vec![(2, 0)])
        ], Vec::new());

        assert_eq!(resolve(&r, 0b1111, 0, 0, 1), Some((0, 0)));
        assert_eq!(resolve(&r, 0b1010, 0, 0, 1), Some((1, 0)));
        assert_eq!(resolve(&r, 0b0111, 0, 0, 1), Some((2, 0)));
    }

    #[test]
    fn test_no_match_leaves_cell_empty() {
        let r = rule(vec![mapping("1111", vec![(0, 0)])], Vec::new());
        assert_eq!(resolve(&r, 0b0111, 0, 0, 1), None);
    }

    #[test]
    fn test_candidate_choice_is_seed_stable() {
        let candidates: Vec<(u32, u32)> = (0..7).map(|i| (i, 0)).collect();
        let r = rule(vec![mapping("****", candidates)], Vec::new());

        let mut spread = std::collections::HashSet::new();
        for x in 0..16 {
            for y in 0..16 {
                let a = resolve(&r, 0, x, y, 99).unwrap();
                let b = resolve(&r, 0, x, y, 99).unwrap();
                assert_eq!(a, b);
                spread.insert(a);
            }
        }
        // the hash actually varies placements across positions
        assert!(spread.len() > 1);

        // and a different seed reshuffles them
        assert!((0..16).any(|x| {
            resolve(&r, 0, x, 0, 99) != resolve(&r, 0, x, 0, 100)
        }));
    }

    #[test]
    fn test_point_hash_stays_in_field() {
        for seed in [0, 1, 0x7FFF_FFFE] {
            for xy in [0, 5, 1000] {
                assert!(u64::from(point_hash(seed, xy, xy + 1)) < 0x7FFF_FFFF);
            }
        }
    }

    #[test]
    fn test_offsets_accumulate() {
        let r = rule(vec![mapping("****", vec![(4, 4)])], vec![
            OffsetRule {
                enable: 0b1000,
                disable: 0,
                nudges: vec![(1, 0), (1, 0)]
            },
            OffsetRule {
                enable: 0b0001,
                disable: 0,
                nudges: vec![(0, -1)]
            }
        ]);

        assert_eq!(resolve(&r, 0b0000, 0, 0, 1), Some((4, 4)));
        assert_eq!(resolve(&r, 0b1000, 0, 0, 1), Some((6, 4)));
        assert_eq!(resolve(&r, 0b1001, 0, 0, 1), Some((6, 3)));
    }
}
