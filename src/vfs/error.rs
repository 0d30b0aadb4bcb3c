//! Error types for VFS decoding and extraction.

use std::path::PathBuf;

use thiserror::Error;

/// The archive bytes deviate from the expected layout.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The source cannot even hold a header.
    #[error("archive size ({size} bytes) is too small (minimum {minimum})")]
    TooSmall { size: u64, minimum: u64 },

    #[error("invalid magic bytes: got {found:?}, expected {expected:?}")]
    BadMagic { found: [u8; 4], expected: [u8; 4] },

    #[error("unsupported VFS format version: got {found:?}, expected {expected:?}")]
    UnsupportedVersion { found: [u8; 4], expected: [u8; 4] },

    #[error("invalid name length (0)")]
    ZeroLengthName,

    /// End of source reached while decoding a header or entry field.
    #[error("truncated {field} at offset {offset}")]
    Truncated { field: &'static str, offset: u64 },

    #[error("data offset {offset} ({offset:#X}) exceeds archive size {archive_size}")]
    OffsetOutOfRange { offset: u32, archive_size: u64 },

    #[error(
        "data range offset {offset} + size {size} ({end}) exceeds archive size {archive_size}"
    )]
    RangeExceedsArchive {
        offset: u32,
        size: u32,
        end: u64,
        archive_size: u64,
    },

    /// The name would resolve outside the output root.
    #[error("unsafe entry name '{0}'")]
    UnsafeName(String),
}

/// Filesystem or source I/O failures.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to open VFS file '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to get VFS file info for '{path}': {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to query archive position: {source}")]
    Position { source: std::io::Error },

    #[error("failed to seek to offset {offset}: {source}")]
    Seek { offset: u64, source: std::io::Error },

    #[error("failed to read archive at offset {offset}: {source}")]
    Read { offset: u64, source: std::io::Error },

    #[error("failed to create output directory '{path}': {source}")]
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create output file '{path}': {source}")]
    CreateFileFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write data to '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Fewer payload bytes were readable than the entry declares.
    #[error(
        "unexpected end of file reading data at offset {offset} ({offset:#X}): expected {expected} bytes, read {read} (archive size {archive_size}) - archive might be corrupt"
    )]
    UnexpectedEof {
        offset: u64,
        expected: u32,
        read: u64,
        archive_size: u64,
    },
}

/// Top-level error for VFS operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error("internal error: {0}")]
    Internal(String),

    /// Any of the above, annotated with the entry it happened on.
    #[error("{}", describe_entry(*index, name.as_deref(), *offset))]
    Entry {
        /// 1-based entry index.
        index: u32,
        name: Option<String>,
        offset: u64,
        #[source]
        source: Box<Error>,
    },
}

fn describe_entry(index: u32, name: Option<&str>, offset: u64) -> String {
    match name {
        Some(name) => format!("entry {index} ('{name}', offset {offset})"),
        None => format!("entry {index} (offset {offset})"),
    }
}

impl Error {
    /// Wrap this error with the entry it occurred on.
    pub fn in_entry(self, index: u32, name: Option<&str>, offset: u64) -> Self {
        Error::Entry {
            index,
            name: name.map(str::to_owned),
            offset,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through entry context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Entry { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn as_format(&self) -> Option<&FormatError> {
        match self.root() {
            Error::Format(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_io(&self) -> Option<&IoError> {
        match self.root() {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }

    /// The 1-based entry index, if the error carries entry context.
    pub fn entry_index(&self) -> Option<u32> {
        match self {
            Error::Entry { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Result type for VFS operations.
pub type Result<T> = std::result::Result<T, Error>;
