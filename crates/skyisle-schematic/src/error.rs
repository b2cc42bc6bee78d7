//! Template decoding and registry errors.

use std::path::PathBuf;

use quartz_nbt::io::NbtIoError;
use skyisle_common::TemplateId;
use thiserror::Error;

/// A template could not be decoded. Isolated to that one template.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Tag stream is malformed or its gzip layer is corrupt
    #[error("Malformed tag data: {0}")]
    Nbt(#[from] NbtIoError),
    /// Root compound has the wrong name
    #[error("Root tag is '{0}', expected 'Schematic'")]
    WrongRoot(String),
    /// Required tag is absent
    #[error("Schematic is missing a '{0}' tag")]
    MissingTag(&'static str),
    /// Tag present with the wrong type
    #[error("'{tag}' is a {found} tag, expected {expected}")]
    WrongTagType {
        /// Tag name
        tag: &'static str,
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        found: &'static str,
    },
    /// Width, length or height is not positive
    #[error("Invalid dimensions {width}x{length}x{height}")]
    InvalidDimensions {
        /// Declared width
        width: i16,
        /// Declared length
        length: i16,
        /// Declared height
        height: i16,
    },
    /// Block or data array does not match the declared volume
    #[error("'{tag}' holds {actual} entries, expected {expected}")]
    LengthMismatch {
        /// Tag name
        tag: &'static str,
        /// Declared volume
        expected: usize,
        /// Actual array length
        actual: usize,
    },
}

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Template registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Template configuration file could not be parsed
    #[error("Invalid template configuration {path}: {source}")]
    Config {
        /// Configuration path
        path: PathBuf,
        /// Parse error
        #[source]
        source: toml::de::Error,
    },
    /// A template file failed to decode
    #[error("Failed to decode template {file}: {source}")]
    Decode {
        /// Template file name
        file: String,
        /// Decode error
        #[source]
        source: DecodeError,
    },
    /// No template is registered under this id
    #[error("Unknown template {0}")]
    UnknownTemplate(TemplateId),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
