// STD Dependencies -----------------------------------------------------------
use std::env;
use std::fs::{self, File};
use std::io::{Error as IOError, Read, Write};
use std::path::{Path, PathBuf};

// External Dependencies ------------------------------------------------------
use file_io::{FileError, FileReader, FileWriter};

// Concrete File IO Implementation --------------------------------------------
#[derive(Debug)]
pub struct ProjectReader {
    base: PathBuf
}

impl ProjectReader {
    pub fn from_relative(mut main: PathBuf) -> Self {
        let mut base = env::current_dir().unwrap();
        main.set_file_name("");
        base.push(main);
        Self {
            base
        }
    }

    pub fn from_absolute(base: PathBuf) -> Self {
        Self {
            base
        }
    }

    fn read_file_inner(&self, full_path: &PathBuf) -> Result<(PathBuf, String), IOError> {
        let mut file = File::open(full_path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok((full_path.clone(), contents))
    }

    fn read_binary_file_inner(&self, full_path: &PathBuf) -> Result<(PathBuf, Vec<u8>), IOError> {
        let mut file = File::open(full_path)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok((full_path.clone(), contents))
    }

    fn write_file_inner(&self, path: &Path, data: String) -> Result<(), IOError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(&data.into_bytes())?;
        Ok(())
    }

    fn write_binary_file_inner(&self, path: &Path, data: Vec<u8>) -> Result<(), IOError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(&data)?;
        Ok(())
    }
}

impl FileReader for ProjectReader {
    fn base_dir(&self) -> &Path {
        &self.base
    }

    fn read_file(
        &self,
        parent: Option<&PathBuf>,
        child: &Path,
    ) -> Result<(PathBuf, String), FileError> {
        let path = Self::resolve_path(&self.base, parent, child);
        self.read_file_inner(&path)
            .map_err(|io| FileError { io, path })
    }

    fn read_binary_file(
        &self,
        parent: Option<&PathBuf>,
        child: &Path,
    ) -> Result<(PathBuf, Vec<u8>), FileError> {
        let path = Self::resolve_path(&self.base, parent, child);
        self.read_binary_file_inner(&path)
            .map_err(|io| FileError { io, path })
    }

    fn file_exists(&self, parent: Option<&PathBuf>, child: &Path) -> bool {
        Self::resolve_path(&self.base, parent, child).is_file()
    }
}

impl FileWriter for ProjectReader {
    fn write_file(&mut self, path: &Path, data: String) -> Result<(), FileError> {
        self.write_file_inner(path, data).map_err(|io| FileError {
            io,
            path: path.to_path_buf(),
        })
    }

    fn write_binary_file(&mut self, path: &Path, data: Vec<u8>) -> Result<(), FileError> {
        self.write_binary_file_inner(path, data)
            .map_err(|io| FileError {
                io,
                path: path.to_path_buf(),
            })
    }
}
