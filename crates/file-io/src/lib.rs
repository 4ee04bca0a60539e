// STD Dependencies -----------------------------------------------------------
use std::fmt;
use std::path::{Path, PathBuf};
use std::io::Error as IOError;


// External Dependencies ------------------------------------------------------
use colored::Colorize;


// Generic Traits -------------------------------------------------------------
#[derive(Debug)]
pub struct FileError {
    pub io: IOError,
    pub path: PathBuf
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Failed to access file \"{}\": {}", self.path.display(), self.io)
    }
}

pub struct Logger {
    silent: bool,
    error_count: usize,
    output: Vec<String>
}

impl Logger {

    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            silent: false,
            error_count: 0,
            output: Vec::new()
        }
    }

    pub fn format_error<S: Into<String>>(s: S) -> String {
        format!("       {} {}", "Error".bright_red(), s.into())
    }

    pub fn set_silent(&mut self) {
        self.silent = true;
    }

    pub fn log<S: Into<String>>(&mut self, s: S) {
        if !self.silent {
            self.output.push(s.into());
        }
    }

    pub fn warning<S: Into<String>>(&mut self, s: S) {
        if !self.silent {
            self.output.push(format!("     {} {}", "Warning".bright_yellow(), s.into()));
        }
    }

    pub fn info<S: Into<String>>(&mut self, s: S) {
        if !self.silent {
            self.output.push(format!("        {} {}", "Info".bright_blue(), s.into()));
        }
    }

    pub fn status<S: Into<String>, U: Into<String>>(&mut self, s: S, m: U) {
        if !self.silent {
            self.output.push(format!("{: >12} {}", s.into().bright_green(), m.into()));
        }
    }

    // Failures are counted even when running silent so a compile pass can
    // still report overall failure.
    pub fn fail<S: Into<String>>(&mut self, s: S) {
        self.error_count += 1;
        if !self.silent {
            self.output.push(Self::format_error(s));
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn newline(&mut self) {
        self.output.push("".to_string());
    }

    pub fn clearline(&mut self) {
        self.output.pop();
    }

    pub fn flush(&mut self) {
        if !self.output.is_empty() {
            println!("{}", self);
        }
        self.output.clear();
    }

    pub fn error<S: Into<String>>(&self, s: S) {
        if !self.output.is_empty() {
            println!("{}", self);
        }
        eprintln!("{}", s.into());
    }
}

impl fmt::Display for Logger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.output.join("\n"))
    }
}

pub trait FileReader {

    fn read_file(&self, parent: Option<&PathBuf>, child: &Path) -> Result<(PathBuf, String), FileError>;

    fn read_binary_file(&self, parent: Option<&PathBuf>, child: &Path) -> Result<(PathBuf, Vec<u8>), FileError>;

    fn file_exists(&self, parent: Option<&PathBuf>, child: &Path) -> bool;

    fn base_dir(&self) -> &Path;

    fn resolve_path(base: &PathBuf, parent: Option<&PathBuf>, child: &Path) -> PathBuf {
        let mut full_path = base.clone();
        if child.is_absolute() {
            full_path.push(child.strip_prefix("/").unwrap());

        } else {
            if let Some(parent) = parent {
                let mut p = parent.clone();
                p.set_file_name("");
                full_path.push(p.strip_prefix(base).unwrap());
            }
            full_path.push(child);
        }
        full_path
    }

}

pub trait FileWriter {
    fn write_file(&mut self, path: &Path, data: String) -> Result<(), FileError>;
    fn write_binary_file(&mut self, path: &Path, data: Vec<u8>) -> Result<(), FileError>;
}
