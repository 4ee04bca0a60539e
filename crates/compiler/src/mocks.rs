// STD Dependencies -----------------------------------------------------------
use std::collections::HashMap;
use std::io::{Error as IOError, ErrorKind};
use std::path::{Path, PathBuf};


// External Dependencies ------------------------------------------------------
use file_io::{FileError, FileReader, FileWriter};


// Mock File IO Implementation -------------------------------------------------
pub struct MockFileReader {
    base: PathBuf,
    files: HashMap<PathBuf, String>,
    binary_files: HashMap<PathBuf, Vec<u8>>
}

impl MockFileReader {

    pub fn new() -> Self {
        Self {
            base: PathBuf::from("/"),
            files: HashMap::new(),
            binary_files: HashMap::new()
        }
    }

    pub fn add_file<S: Into<String>>(&mut self, path: &str, content: S) {
        self.files.insert(PathBuf::from(path), content.into());
    }

    pub fn add_binary_file(&mut self, path: &str, bytes: Vec<u8>) {
        self.binary_files.insert(PathBuf::from(path), bytes);
    }

    pub fn get_file(&mut self, path: &str) -> Option<String> {
        self.files.get(&PathBuf::from(path)).cloned()
    }

    pub fn get_binary_file(&mut self, path: &str) -> Option<Vec<u8>> {
        self.binary_files.get(&PathBuf::from(path)).cloned()
    }

}

impl FileReader for MockFileReader {

    fn base_dir(&self) -> &Path {
        &self.base
    }

    fn read_file(&self, parent: Option<&PathBuf>, child: &Path) -> Result<(PathBuf, String), FileError> {
        let path = Self::resolve_path(&self.base, parent, child);
        self.files.get(&path).map(|contents| (path.clone(), contents.clone())).ok_or_else(|| {
            FileError {
                io: IOError::new(ErrorKind::NotFound, "No such file"),
                path
            }
        })
    }

    fn read_binary_file(&self, parent: Option<&PathBuf>, child: &Path) -> Result<(PathBuf, Vec<u8>), FileError> {
        let path = Self::resolve_path(&self.base, parent, child);
        self.binary_files.get(&path).map(|contents| (path.clone(), contents.clone())).ok_or_else(|| {
            FileError {
                io: IOError::new(ErrorKind::NotFound, "No such file"),
                path
            }
        })
    }

    fn file_exists(&self, parent: Option<&PathBuf>, child: &Path) -> bool {
        let path = Self::resolve_path(&self.base, parent, child);
        self.files.contains_key(&path) || self.binary_files.contains_key(&path)
    }

}

impl FileWriter for MockFileReader {

    fn write_file(&mut self, path: &Path, data: String) -> Result<(), FileError> {
        self.files.insert(path.to_path_buf(), data);
        Ok(())
    }

    fn write_binary_file(&mut self, path: &Path, data: Vec<u8>) -> Result<(), FileError> {
        self.binary_files.insert(path.to_path_buf(), data);
        Ok(())
    }

}
