// STD Dependencies -----------------------------------------------------------
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;


// External Dependencies ------------------------------------------------------
use colored::Colorize;
use file_io::{FileReader, FileWriter, Logger};


// Internal Dependencies ------------------------------------------------------
use crate::autotile::WrapRule;
use crate::error::CompileError;
use crate::level::{level_seed, CompiledLevel};
use crate::tiles::brickset::LevelBrickset;
use crate::tiles::sheet::TileSheet;
use crate::tiles::Brick;


// Compiler Pipeline Implementation -------------------------------------------

/// One visual pack: the wrap rule table in declared order, the entity name
/// index shared by its levels, and the levels it compiles.
#[derive(Debug)]
pub struct PackMetadata {
    pub name: String,
    pub wrapping: Vec<(char, WrapRule)>,
    pub entity_index: HashMap<String, u8>,
    pub levels: Vec<String>
}

/// Everything a pack compiles down to. The raw tile words, collision and
/// mapping arrays are consumed by the source emitter, the level streams by
/// the runtime loader.
#[derive(Debug)]
pub struct PackOutput {
    pub name: String,
    pub tileset: Vec<u32>,
    pub collision: Vec<u16>,
    pub mapping: Vec<u16>,
    pub levels: Vec<(String, Vec<u8>)>
}

pub struct Compiler {
    no_color: bool,
    brick_size: usize,
    output_directory: Option<PathBuf>
}

impl Compiler {

    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            no_color: false,
            brick_size: 1,
            output_directory: None
        }
    }

    pub fn set_no_color(&mut self) {
        self.no_color = true;
    }

    pub fn set_brick_size(&mut self, size: usize) {
        self.brick_size = size;
    }

    pub fn set_output_directory(&mut self, path: PathBuf) {
        self.output_directory = Some(path);
    }

    /// Compiles every pack in declared order. Level-scoped errors are logged
    /// and skip only that level; the pass still reports failure at the end.
    /// Internal errors abort immediately.
    pub fn compile<T: FileReader + FileWriter>(
        &mut self,
        logger: &mut Logger,
        io: &mut T,
        packs: &[PackMetadata]

    ) -> Result<Vec<PackOutput>, CompilationError> {
        colored::control::set_override(!self.no_color);
        if self.brick_size != 1 && self.brick_size != 2 {
            return Err(CompilationError::new("configuration", CompileError::config(
                format!("Unsupported brick size {}, expected 1 or 2", self.brick_size)
            )));
        }

        let baseline = logger.error_count();
        let mut outputs = Vec::new();
        for pack in packs {
            match self.compile_pack(logger, io, pack) {
                Ok(output) => outputs.push(output),
                Err(err) if err.is_internal() => {
                    return Err(CompilationError::new("brick deduplication", err));
                },
                Err(err) => logger.fail(format!("Pack \"{}\": {}", pack.name, err))
            }
        }

        let failures = logger.error_count() - baseline;
        if failures > 0 {
            Err(CompilationError::failed(failures))

        } else {
            Ok(outputs)
        }
    }

    fn compile_pack<T: FileReader + FileWriter>(
        &mut self,
        logger: &mut Logger,
        io: &mut T,
        pack: &PackMetadata

    ) -> Result<PackOutput, CompileError> {
        let start = Instant::now();
        logger.status("Compiling", format!("visual pack \"{}\" ...", pack.name));

        validate_pack(pack)?;
        let sheets = self.load_sheets(logger, io, pack)?;
        let mut brickset = self.populate_brickset(pack, &sheets)?;
        logger.status("Bricks", format!(
            "{} unique brick(s), {} raw tile(s) in {}ms.",
            brickset.len(),
            brickset.raw_tiles().len(),
            start.elapsed().as_millis()
        ));

        let mut levels = Vec::new();
        for name in &pack.levels {
            match self.compile_level(logger, io, pack, &sheets, &mut brickset, name) {
                Ok(bytes) => levels.push((name.clone(), bytes)),
                Err(err) if err.is_internal() => return Err(err),
                Err(err) => logger.fail(format!("Level \"{}\": {}", name, err))
            }
        }

        // Export arrays are assembled last; levels may have extended the
        // registries with bricks the rule table alone never produced.
        let output = PackOutput {
            name: pack.name.clone(),
            tileset: brickset.raw_tiles().iter().flat_map(|t| t.words().to_vec()).collect(),
            collision: collision_array(&brickset),
            mapping: mapping_array(&brickset),
            levels
        };
        self.write_pack_arrays(logger, io, &output)?;
        logger.status("Compiled", format!(
            "pack \"{}\" with {} level(s) in {}ms.", pack.name, output.levels.len(), start.elapsed().as_millis()
        ));
        Ok(output)
    }

    /// Reads the tile sheet of every wrap rule that names one. A missing
    /// sheet only logs a warning, the rule degrades to an all-air brick.
    fn load_sheets<T: FileReader>(
        &self,
        logger: &mut Logger,
        io: &T,
        pack: &PackMetadata

    ) -> Result<HashMap<String, TileSheet>, CompileError> {
        let mut sheets = HashMap::new();
        for (_, rule) in &pack.wrapping {
            let name = match &rule.tileset {
                Some(name) => name,
                None => continue
            };
            if sheets.contains_key(name) {
                continue;
            }
            let path = PathBuf::from(format!("art/tilesets/{}.tiles", name));
            if !io.file_exists(None, &path) {
                logger.warning(format!("Tileset \"{}\" does not exist.", name));
                continue;
            }
            let (_, bytes) = io.read_binary_file(None, &path).map_err(|err| {
                CompileError::config(err.to_string())
            })?;
            sheets.insert(name.clone(), parse_sheet(&bytes, self.brick_size)?);
        }
        Ok(sheets)
    }

    /// Seeds the brickset with one brick per tile coordinate a rule's
    /// mappings can place, in declared order, so brick indices only depend on
    /// authored data.
    fn populate_brickset(
        &self,
        pack: &PackMetadata,
        sheets: &HashMap<String, TileSheet>

    ) -> Result<LevelBrickset, CompileError> {
        let mut brickset = LevelBrickset::new();
        for (wrap, rule) in &pack.wrapping {
            let sheet = rule.tileset.as_ref().and_then(|name| sheets.get(name));
            if let Some(sheet) = sheet {
                let mut seen = Vec::new();
                for mapping in &rule.mappings {
                    for coord in &mapping.tiles {
                        if seen.contains(coord) {
                            continue;
                        }
                        seen.push(*coord);

                        let tile = sheet.large_tile(coord.0 as usize, coord.1 as usize)?;
                        if tile.is_air() && rule.collision_type == 0 {
                            continue;
                        }
                        brickset.add_new_brick(Brick {
                            tile,
                            wrap: *wrap,
                            collision_type: rule.collision_type,
                            collision_shape: rule.collision_shape,
                            palette: rule.palette
                        });
                    }
                }

            } else {
                brickset.add_new_brick(Brick {
                    collision_type: rule.collision_type,
                    collision_shape: rule.collision_shape,
                    palette: rule.palette,
                    ..Brick::air(self.brick_size, *wrap)
                });
            }
        }
        Ok(brickset)
    }

    fn compile_level<T: FileReader + FileWriter>(
        &mut self,
        logger: &mut Logger,
        io: &mut T,
        pack: &PackMetadata,
        sheets: &HashMap<String, TileSheet>,
        brickset: &mut LevelBrickset,
        name: &str

    ) -> Result<Vec<u8>, CompileError> {
        let path = PathBuf::from(format!("levels/{}.txt", name));
        if !io.file_exists(None, &path) {
            return Err(CompileError::data(format!(
                "The level file \"{}\" was unable to be found", path.display()
            )));
        }

        let (_, text) = io.read_file(None, &path).map_err(|err| {
            CompileError::data(err.to_string())
        })?;
        let level = CompiledLevel::from_text(&text, &pack.entity_index)?;
        let seed = level_seed(&format!("levels/{}.txt", name));
        let bytes = level.binary_data(&pack.wrapping, sheets, brickset, self.brick_size, seed)?;

        if let Some(directory) = &self.output_directory {
            let target = directory.join(&pack.name).join(format!("{}.lvl", name));
            io.write_binary_file(&target, bytes.clone()).map_err(|err| {
                CompileError::data(err.to_string())
            })?;
        }
        logger.info(format!("Level \"{}\" compiled ({} bytes).", name, bytes.len()));
        Ok(bytes)
    }

    fn write_pack_arrays<T: FileWriter>(
        &self,
        logger: &mut Logger,
        io: &mut T,
        output: &PackOutput

    ) -> Result<(), CompileError> {
        let directory = match &self.output_directory {
            Some(directory) => directory.join(&output.name),
            None => return Ok(())
        };
        let files = [
            ("tileset.bin", output.tileset.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>()),
            ("collision.bin", output.collision.iter().flat_map(|v| v.to_le_bytes()).collect()),
            ("mapping.bin", output.mapping.iter().flat_map(|v| v.to_le_bytes()).collect())
        ];
        for (name, bytes) in files {
            io.write_binary_file(&directory.join(name), bytes).map_err(|err| {
                CompileError::data(err.to_string())
            })?;
        }
        logger.status("Written", format!("pack arrays to \"{}\".", directory.display()));
        Ok(())
    }

}

/// Collision metadata per brick, terminated by 0xFFFF.
fn collision_array(brickset: &LevelBrickset) -> Vec<u16> {
    brickset.bricks().iter()
        .map(|b| u16::from(b.collision_type) << 8 | u16::from(b.collision_shape))
        .chain(std::iter::once(0xFFFF))
        .collect()
}

/// For every brick, how each constituent 8x8 tile maps into the raw tile
/// registry: raw index + 1 with the flip code in bits 10-11, 0 for air.
fn mapping_array(brickset: &LevelBrickset) -> Vec<u16> {
    let mut mapping = Vec::new();
    for brick in brickset.bricks() {
        for tile in brick.tile.tiles() {
            mapping.push(match brickset.raw_index_of(tile) {
                Some((index, flip)) => (index as u16 + 1) | flip.code() << 10,
                None => 0
            });
        }
    }
    mapping
}

fn validate_pack(pack: &PackMetadata) -> Result<(), CompileError> {
    for (i, (wrap, rule)) in pack.wrapping.iter().enumerate() {
        if pack.wrapping.iter().skip(i + 1).any(|(other, _)| other == wrap) {
            return Err(CompileError::config(format!(
                "Wrap character '{}' is declared twice", wrap
            )));
        }
        for connect in &rule.connects {
            if !pack.wrapping.iter().any(|(other, _)| other == connect) {
                return Err(CompileError::config(format!(
                    "Wrap character '{}' connects to unknown wrap character '{}'", wrap, connect
                )));
            }
        }
    }
    Ok(())
}

/// Raw indexed-pixel tileset container: u16 LE width, u16 LE height, one
/// palette index byte per pixel.
fn parse_sheet(bytes: &[u8], brick_size: usize) -> Result<TileSheet, CompileError> {
    if bytes.len() < 4 {
        return Err(CompileError::config("Tileset file is too short to hold its dimensions"));
    }
    let width = usize::from(u16::from_le_bytes([bytes[0], bytes[1]]));
    let height = usize::from(u16::from_le_bytes([bytes[2], bytes[3]]));
    if bytes.len() != 4 + width * height {
        return Err(CompileError::config(format!(
            "Tileset file holds {} byte(s) of pixel data, expected {}", bytes.len() - 4, width * height
        )));
    }
    TileSheet::from_indexed(&bytes[4..], width, height, brick_size)
}


// Compiler Error Abstraction -------------------------------------------------
#[derive(Debug)]
pub struct CompilationError {
    stage: String,
    source: Option<CompileError>,
    message: Option<String>
}

impl CompilationError {

    fn new(stage: &str, source: CompileError) -> Self {
        Self {
            stage: stage.to_string(),
            source: Some(source),
            message: None
        }
    }

    fn failed(count: usize) -> Self {
        Self {
            stage: "level compilation".to_string(),
            source: None,
            message: Some(format!("{} error(s) were logged", count))
        }
    }

}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(source) = self.source.as_ref() {
            write!(f, "       {} Compilation failed during {} phase!\n\n{}", "Error".bright_red(), self.stage, source)

        } else if let Some(message) = self.message.as_ref() {
            write!(f, "       {} Compilation failed during {} phase!\n\n{}", "Error".bright_red(), self.stage, message)

        } else {
            write!(f, "       {} Compilation failed during {} phase!", "Error".bright_red(), self.stage)
        }
    }
}


// Tests ----------------------------------------------------------------------
#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use regex::Regex;

    use file_io::Logger;
    use crate::autotile::{parse_mask, TileMapping, WrapRule};
    use crate::lz10;
    use crate::mocks::MockFileReader;
    use super::{Compiler, PackMetadata};

    fn wrap_rule(tileset: Option<&str>, patterns: Vec<(&str, Vec<(u32, u32)>)>) -> WrapRule {
        WrapRule {
            tileset: tileset.map(String::from),
            palette: 0,
            collision_type: 1,
            collision_shape: 0,
            connects: vec!['M'],
            neighborhood: vec![(0, -1), (-1, 0), (1, 0), (0, 1)],
            mappings: patterns.into_iter().map(|(pattern, tiles)| {
                let (enable, disable) = parse_mask(pattern).unwrap();
                TileMapping {
                    enable,
                    disable,
                    tiles
                }
            }).collect(),
            offsets: Vec::new()
        }
    }

    fn pack(levels: Vec<&str>) -> PackMetadata {
        PackMetadata {
            name: "main".to_string(),
            wrapping: vec![('M', wrap_rule(Some("terrain"), vec![("****", vec![(0, 0)])]))],
            entity_index: HashMap::new(),
            levels: levels.into_iter().map(String::from).collect()
        }
    }

    fn sheet_file(width: u16, height: u16, pixel: u8) -> Vec<u8> {
        let mut bytes = width.to_le_bytes().to_vec();
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend(vec![pixel; usize::from(width) * usize::from(height)]);
        bytes
    }

    fn reader(levels: Vec<(&str, &str)>) -> MockFileReader {
        let mut reader = MockFileReader::new();
        reader.add_binary_file("/art/tilesets/terrain.tiles", sheet_file(8, 8, 5));
        for (name, text) in levels {
            reader.add_file(&format!("/levels/{}.txt", name), text);
        }
        reader
    }

    fn scrub(logger: &Logger) -> String {
        let re = Regex::new(r"([0-9]+)ms").unwrap();
        re.replace_all(logger.to_string().as_str(), "XXms").to_string()
    }

    #[test]
    fn test_compile_example_pack() {
        let mut logger = Logger::new();
        let mut io = reader(vec![("one", "2 - 2 - 1\nlayer\nMM\nMM\n")]);
        let mut compiler = Compiler::new();
        compiler.set_no_color();

        let outputs = compiler.compile(&mut logger, &mut io, &[pack(vec!["one"])]).unwrap();
        assert_eq!(outputs.len(), 1);

        let output = &outputs[0];
        // one solid brick of color 5
        assert_eq!(output.tileset, vec![0x5555_5555; 8]);
        assert_eq!(output.collision, vec![0x0100, 0xFFFF]);
        assert_eq!(output.mapping, vec![1]);

        let (name, bytes) = &output.levels[0];
        assert_eq!(name, "one");
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(&bytes[0..6], &[2, 0, 2, 0, 0xFF, 0x01]);
        let prefixed = usize::from(bytes[6]) | usize::from(bytes[7]) << 8;
        assert_eq!(lz10::decompress(&bytes[8..8 + prefixed]).unwrap(), vec![1, 0, 1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_compile_status_output() {
        let mut logger = Logger::new();
        let mut io = reader(vec![("one", "2 - 2 - 1\nlayer\nMM\nMM\n")]);
        let mut compiler = Compiler::new();
        compiler.set_no_color();
        compiler.compile(&mut logger, &mut io, &[pack(vec!["one"])]).unwrap();

        assert_eq!(scrub(&logger), "   Compiling visual pack \"main\" ...\n      Bricks 1 unique brick(s), 1 raw tile(s) in XXms.\n        Info Level \"one\" compiled (20 bytes).\n    Compiled pack \"main\" with 1 level(s) in XXms.");
    }

    #[test]
    fn test_written_output_files() {
        let mut logger = Logger::new();
        logger.set_silent();
        let mut io = reader(vec![("one", "2 - 2 - 1\nlayer\nMM\nMM\n")]);
        let mut compiler = Compiler::new();
        compiler.set_no_color();
        compiler.set_output_directory(PathBuf::from("build"));
        compiler.compile(&mut logger, &mut io, &[pack(vec!["one"])]).unwrap();

        let level = io.get_binary_file("build/main/one.lvl").expect("Expected level output to be written");
        assert_eq!(level.len() % 4, 0);
        assert_eq!(
            io.get_binary_file("build/main/collision.bin").expect("Expected collision output to be written"),
            vec![0x00, 0x01, 0xFF, 0xFF]
        );
        assert!(io.get_binary_file("build/main/tileset.bin").is_some());
        assert!(io.get_binary_file("build/main/mapping.bin").is_some());
    }

    #[test]
    fn test_missing_tileset_warns_and_degrades() {
        let mut logger = Logger::new();
        let mut io = MockFileReader::new();
        io.add_file("/levels/one.txt", "1 - 1 - 1\nlayer\nM\n");
        let mut compiler = Compiler::new();
        compiler.set_no_color();

        let outputs = compiler.compile(&mut logger, &mut io, &[pack(vec!["one"])]).unwrap();
        assert!(logger.to_string().contains("Tileset \"terrain\" does not exist."));

        let output = &outputs[0];
        assert!(output.tileset.is_empty());
        assert_eq!(output.collision, vec![0x0100, 0xFFFF]);
        assert_eq!(output.mapping, vec![0]);

        let bytes = &output.levels[0].1;
        let prefixed = usize::from(bytes[6]) | usize::from(bytes[7]) << 8;
        assert_eq!(lz10::decompress(&bytes[8..8 + prefixed]).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_missing_level_skips_and_fails() {
        let mut logger = Logger::new();
        let mut io = reader(vec![("two", "1 - 1 - 1\nlayer\nM\n")]);
        let mut compiler = Compiler::new();
        compiler.set_no_color();

        let err = compiler.compile(&mut logger, &mut io, &[pack(vec!["one", "two"])]).err()
            .expect("Expected a CompilationError");
        assert!(err.to_string().contains("1 error(s) were logged"));
        // the second level still compiled
        assert!(logger.to_string().contains("Level \"two\" compiled"));
        assert!(logger.to_string().contains("was unable to be found"));
    }

    #[test]
    fn test_unknown_connect_character_fails_pack() {
        let mut logger = Logger::new();
        let mut io = reader(vec![("one", "1 - 1 - 1\nlayer\nM\n")]);
        let mut compiler = Compiler::new();
        compiler.set_no_color();

        let mut bad = pack(vec!["one"]);
        bad.wrapping[0].1.connects.push('Z');
        assert!(compiler.compile(&mut logger, &mut io, &[bad]).is_err());
        assert!(logger.to_string().contains("unknown wrap character 'Z'"));
    }

    #[test]
    fn test_invalid_brick_size() {
        let mut logger = Logger::new();
        let mut io = MockFileReader::new();
        let mut compiler = Compiler::new();
        compiler.set_no_color();
        compiler.set_brick_size(3);
        assert!(compiler.compile(&mut logger, &mut io, &[]).is_err());
    }

    #[test]
    fn test_levels_share_the_pack_brickset() {
        let mut logger = Logger::new();
        logger.set_silent();
        let mut io = reader(vec![
            ("one", "1 - 1 - 1\nlayer\nM\n"),
            ("two", "2 - 1 - 1\nlayer\nMM\n")
        ]);
        let mut compiler = Compiler::new();
        compiler.set_no_color();

        let outputs = compiler.compile(&mut logger, &mut io, &[pack(vec!["one", "two"])]).unwrap();
        // both levels resolve to the same single brick
        assert_eq!(outputs[0].collision.len(), 2);
        for (_, bytes) in &outputs[0].levels {
            let prefixed = usize::from(bytes[6]) | usize::from(bytes[7]) << 8;
            let cells = lz10::decompress(&bytes[8..8 + prefixed]).unwrap();
            assert!(cells.chunks(2).all(|c| c == [1, 0]));
        }
    }
}
