//! Error types for frame loading and trap masking.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while cataloging, loading or masking frames.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Acquisition index {index} is not covered by any exposure bucket")]
    InvalidIndex { index: u64 },

    #[error("Cannot parse {what} from filename '{name}'")]
    FilenameFormat { name: String, what: &'static str },

    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No files in '{path}' match '{pattern}' at {exposure_ms} ms")]
    EmptyListing {
        path: PathBuf,
        pattern: String,
        exposure_ms: f64,
    },

    #[error("Trap position file not found: '{path}'")]
    TrapFileNotFound { path: PathBuf },

    #[error("Failed to read trap position file '{path}': {source}")]
    TrapFileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed trap position file '{path}': {reason}")]
    TrapFileFormat { path: PathBuf, reason: String },

    #[error("Failed to decode image '{path}': {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("No frames were loaded")]
    EmptyStack,

    #[error("Unknown trap id {id}")]
    UnknownTrapId { id: i64 },

    #[error("Trap radius must be positive and finite, got {radius}")]
    InvalidRadius { radius: f64 },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Failed to load config '{path}': {reason}")]
    ConfigFile { path: PathBuf, reason: String },
}
