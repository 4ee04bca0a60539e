// STD Dependencies -----------------------------------------------------------
use std::fmt;


// Internal Dependencies ------------------------------------------------------
use crate::tiles::FlipMismatch;


// Compile Error Abstraction ---------------------------------------------------

/// How far an error reaches.
///
/// `Configuration` and `Data` errors are fatal for the enclosing level only;
/// the pipeline logs them, skips the level and continues. `Internal` errors
/// indicate corrupted registries and abort the whole compile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Data,
    Internal
}

#[derive(Debug)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String
}

impl CompileError {

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self {
            kind: ErrorKind::Configuration,
            message: message.into()
        }
    }

    pub fn data<S: Into<String>>(message: S) -> Self {
        Self {
            kind: ErrorKind::Data,
            message: message.into()
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into()
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind == ErrorKind::Internal
    }

}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<FlipMismatch> for CompileError {
    fn from(err: FlipMismatch) -> Self {
        CompileError::internal(format!("Registry corrupted: {}", err))
    }
}
