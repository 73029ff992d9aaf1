use std::io;
use std::num;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FolError>;

#[derive(Error, Debug)]
pub enum FolError {
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("bincode error: {0}")]
    BincodeError(#[from] bincode::Error),
    #[error("int conversion error: {0}")]
    TryFromIntError(#[from] num::TryFromIntError),
    #[error("unsupported archive: {0}")]
    FormatError(String),
    #[error("missing {what} '{}'", .path.display())]
    PrerequisiteMissing { what: &'static str, path: PathBuf },
    #[error("failed to find file entry")]
    EntryNotFound,
    #[error("no files to pack")]
    EmptyOutput,
    #[error("failed to read content: {0}")]
    InvalidContent(String),
    #[error("failed to read manifest: {0}")]
    ManifestError(String),
    #[error("failed to serialize data: {0}")]
    SerializationError(String),
}

impl FolError {
    pub fn format_error(msg: impl Into<String>) -> Self {
        Self::FormatError(msg.into())
    }

    pub fn prerequisite_missing(what: &'static str, path: impl AsRef<Path>) -> Self {
        Self::PrerequisiteMissing {
            what,
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn invalid_content(msg: impl Into<String>) -> Self {
        Self::InvalidContent(msg.into())
    }

    pub fn manifest_error(msg: impl Into<String>) -> Self {
        Self::ManifestError(msg.into())
    }

    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}
