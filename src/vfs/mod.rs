//! VFS archive parsing and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: format constants, the header and the decoded entry
//! - [`parser`]: [`VfsReader`], the sequential decoder over a seekable source
//! - [`extractor`]: [`VfsExtractor`], which walks the directory and writes files
//! - [`error`]: the typed error taxonomy
//!
//! ## VFS Format Overview
//!
//! All integers are little-endian.
//!
//! ```text
//! offset 0:  4 bytes  magic = "LP1C"
//! offset 4:  4 bytes  version = 00 00 00 00
//! offset 8:  4 bytes  file count (u32)
//! offset 12: entries[file count], each:
//!   1 byte   name length (> 0)
//!   N bytes  name ('\' separates path components)
//!   4 bytes  file size (u32)
//!   4 bytes  file offset (u32, absolute)
//!   8 bytes  reserved
//! ```
//!
//! Payloads may sit anywhere in the archive, in any order relative to the
//! directory, so extraction seeks away for each payload and returns to the
//! directory afterwards.

pub mod error;
mod extractor;
mod parser;
mod structures;

pub use error::{Error, FormatError, IoError, Result};
pub use extractor::{ExtractSummary, VfsExtractor};
pub use parser::{SuffixSkip, VfsReader, validate_range};
pub use structures::*;
