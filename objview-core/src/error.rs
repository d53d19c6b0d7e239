/// Error types for geometry loading and configuration
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for loading operations
pub type ObjResult<T> = Result<T, ObjError>;

/// Fatal errors while loading a geometry file
#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read geometry stream: {0}")]
    Read(#[from] io::Error),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Structural errors found while building a geometry buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// A face referenced position 0 or a position not yet declared
    #[error("face on line {line} references position {index}, but {available} positions were declared before it")]
    IndexOutOfRange {
        line: usize,
        index: u32,
        available: usize,
    },
}

/// Recoverable problems with a single input line. The line is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("unknown record keyword `{0}`")]
    UnknownKeyword(String),

    #[error("`{keyword}` expects {expected} values, found {found}")]
    Arity {
        keyword: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("invalid face vertex `{0}`")]
    InvalidIndex(String),
}

/// Errors while loading a viewer configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
