use std::path::PathBuf;

use solo_build::BuildError;
use thiserror::Error;

/// Failure while rendering a descriptor document.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to serialize descriptor: {0}")]
    Xml(String),

    #[error("failed to write descriptor {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SynthError {
    /// The file's declared name does not match where it lives.
    #[error("{path} declares `{actual}` but its location implies `{expected}`")]
    InconsistentPath {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("cannot derive a unit name for {origin}")]
    UnnamedUnit { origin: String },

    #[error("unsupported source file {path}: only `.java` files and `pom.xml` are accepted")]
    UnsupportedSource { path: PathBuf },

    #[error("no main class found for {origin}")]
    NoEntryPoint { origin: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("invalid booter pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl SynthError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SynthError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SynthError>;
