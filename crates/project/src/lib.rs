// STD Dependencies -----------------------------------------------------------
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process;


// External Dependencies ------------------------------------------------------
use serde::Deserialize;

use compiler::autotile::{parse_mask, OffsetRule, TileMapping, WrapRule};
use compiler::compiler::{Compiler, PackMetadata};
use file_io::{FileError, FileReader, Logger};


// Modules --------------------------------------------------------------------
mod reader;
pub use self::reader::ProjectReader;


// Raw TOML Schema -------------------------------------------------------------
pub const PROJECT_FILE: &str = "agbc.toml";

#[derive(Debug, Deserialize)]
struct RawProject {
    project: RawInfo,
    #[serde(default)]
    packs: BTreeMap<String, RawPack>
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    name: String,
    #[serde(rename = "brick-size", default = "default_brick_size")]
    brick_size: usize,
    #[serde(default = "default_output")]
    output: PathBuf
}

#[derive(Debug, Deserialize)]
struct RawPack {
    #[serde(default)]
    levels: Vec<String>,
    #[serde(default)]
    entities: BTreeMap<String, u8>,
    #[serde(default)]
    wrap: BTreeMap<String, RawWrap>
}

#[derive(Debug, Clone, Deserialize)]
struct RawWrap {
    tileset: Option<String>,
    #[serde(default)]
    palette: u8,
    #[serde(rename = "collision-type", default = "default_collision_type")]
    collision_type: u8,
    #[serde(rename = "collision-shape", default)]
    collision_shape: u8,
    #[serde(default)]
    connects: Vec<String>,
    #[serde(default)]
    neighborhood: Vec<(i32, i32)>,
    #[serde(default)]
    mapping: Vec<RawMapping>,
    #[serde(default)]
    offset: Vec<RawOffset>,
    #[serde(rename = "mapping-copy")]
    mapping_copy: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
struct RawMapping {
    pattern: String,
    #[serde(default)]
    tiles: Vec<(u32, u32)>
}

#[derive(Debug, Clone, Deserialize)]
struct RawOffset {
    pattern: String,
    #[serde(default)]
    nudges: Vec<(i32, i32)>
}

fn default_brick_size() -> usize {
    1
}

fn default_output() -> PathBuf {
    PathBuf::from("build")
}

fn default_collision_type() -> u8 {
    1
}


// Resolved Configuration -------------------------------------------------------

/// The project file, resolved into the compiler's plain rule structs. Pack
/// and wrap tables are ordered by name so compiled brick indices only depend
/// on the authored configuration.
#[derive(Debug)]
pub struct ProjectConfig {
    pub name: String,
    pub brick_size: usize,
    pub output: PathBuf,
    pub packs: Vec<PackMetadata>
}

impl ProjectConfig {

    pub fn load(logger: &mut Logger, reader: &ProjectReader) -> Self {
        match Self::try_load(reader) {
            Ok(config) => config,
            Err(err) => {
                logger.error(Logger::format_error(err.to_string()));
                process::exit(1);
            }
        }
    }

    pub fn try_load(reader: &ProjectReader) -> Result<Self, ProjectError> {
        let (_, text) = reader.read_file(None, Path::new(PROJECT_FILE)).map_err(ProjectError::Io)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ProjectError> {
        let raw: RawProject = toml::from_str(text).map_err(ProjectError::Toml)?;
        if raw.project.brick_size != 1 && raw.project.brick_size != 2 {
            return Err(ProjectError::Config(format!(
                "Unsupported brick size {}, expected 1 or 2", raw.project.brick_size
            )));
        }

        let mut packs = Vec::new();
        for (pack_name, raw_pack) in &raw.packs {
            let mut wrapping = Vec::new();
            for (key, raw_wrap) in &raw_pack.wrap {
                wrapping.push((
                    single_char(key, pack_name)?,
                    resolve_wrap(&raw, pack_name, raw_wrap)?
                ));
            }
            packs.push(PackMetadata {
                name: pack_name.clone(),
                wrapping,
                entity_index: raw_pack.entities.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                levels: raw_pack.levels.clone()
            });
        }

        Ok(Self {
            name: raw.project.name,
            brick_size: raw.project.brick_size,
            output: raw.project.output,
            packs
        })
    }

    /// Wires the reader and compiler together and runs the full pass.
    pub fn build(config: &ProjectConfig, logger: &mut Logger, io: &mut ProjectReader) -> Result<(), ()> {
        let mut compiler = Compiler::new();
        compiler.set_brick_size(config.brick_size);
        compiler.set_output_directory(io.base_dir().join(&config.output));
        match compiler.compile(logger, io, &config.packs) {
            Ok(_) => {
                logger.flush();
                Ok(())
            },
            Err(err) => {
                logger.error(err.to_string());
                Err(())
            }
        }
    }

}

/// A wrap rule may clone another rule's neighborhood and mapping table via
/// `mapping-copy = "pack/C"` before its masks are derived.
fn resolve_wrap(raw: &RawProject, pack_name: &str, raw_wrap: &RawWrap) -> Result<WrapRule, ProjectError> {
    let (neighborhood, raw_mappings) = if let Some(copy) = &raw_wrap.mapping_copy {
        let (source_pack, source_char) = copy.split_once('/').ok_or_else(|| {
            ProjectError::Config(format!(
                "Invalid mapping-copy reference \"{}\", expected \"pack/C\"", copy
            ))
        })?;
        let source = raw.packs.get(source_pack).and_then(|p| p.wrap.get(source_char)).ok_or_else(|| {
            ProjectError::Config(format!(
                "Mapping-copy reference \"{}\" does not name a wrap rule", copy
            ))
        })?;
        (source.neighborhood.clone(), source.mapping.clone())

    } else {
        (raw_wrap.neighborhood.clone(), raw_wrap.mapping.clone())
    };

    let mut mappings = Vec::new();
    for entry in &raw_mappings {
        let (enable, disable) = parse_mask(&entry.pattern).map_err(|err| {
            ProjectError::Config(err.to_string())
        })?;
        mappings.push(TileMapping {
            enable,
            disable,
            tiles: entry.tiles.clone()
        });
    }

    let mut offsets = Vec::new();
    for entry in &raw_wrap.offset {
        let (enable, disable) = parse_mask(&entry.pattern).map_err(|err| {
            ProjectError::Config(err.to_string())
        })?;
        offsets.push(OffsetRule {
            enable,
            disable,
            nudges: entry.nudges.clone()
        });
    }

    let connects = raw_wrap.connects.iter()
        .map(|c| single_char(c, pack_name))
        .collect::<Result<Vec<char>, ProjectError>>()?;

    // a tileset of "null" is an intentional placeholder and stays unset
    let tileset = raw_wrap.tileset.as_ref()
        .filter(|name| !name.eq_ignore_ascii_case("null"))
        .cloned();

    Ok(WrapRule {
        tileset,
        palette: raw_wrap.palette,
        collision_type: raw_wrap.collision_type,
        collision_shape: raw_wrap.collision_shape,
        connects,
        neighborhood,
        mappings,
        offsets
    })
}

fn single_char(text: &str, pack_name: &str) -> Result<char, ProjectError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ProjectError::Config(format!(
            "Wrap key \"{}\" in pack \"{}\" must be a single character", text, pack_name
        )))
    }
}


// Project Error Abstraction ----------------------------------------------------
#[derive(Debug)]
pub enum ProjectError {
    Io(FileError),
    Toml(toml::de::Error),
    Config(String)
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProjectError::Io(err) => write!(f, "{}", err),
            ProjectError::Toml(err) => write!(f, "Failed to parse project file: {}", err),
            ProjectError::Config(message) => write!(f, "{}", message)
        }
    }
}
