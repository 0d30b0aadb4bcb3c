//! # vfsunpack
//!
//! An unpacker for the `LP1C` VFS containers used to package game assets.
//!
//! The archive is decoded in a single forward pass: the header is validated,
//! then each directory entry is decoded, range checked against the archive
//! size, and its payload copied out to a file beneath the output root.
//!
//! ## Features
//!
//! - Header validation (magic and version)
//! - Bounds validation of every payload range before it is read
//! - `\` separated entry names mapped onto the platform separator
//! - Rejection of entry names that would escape the output root
//! - Listing entries without extracting them
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use vfsunpack::{LocalArchive, VfsExtractor, VfsReader};
//!
//! fn main() -> anyhow::Result<()> {
//!     let (file, size) = LocalArchive::open(Path::new("Sounds.vfs"))?.into_parts();
//!     let mut extractor = VfsExtractor::new(VfsReader::new(file, size), "Sounds");
//!
//!     let summary = extractor.run()?;
//!     println!("{} files, {} bytes", summary.files, summary.bytes);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod io;
pub mod vfs;

pub use cli::Cli;
pub use io::{LocalArchive, SeekDetour};
pub use vfs::{Error, ExtractSummary, Result, VfsEntry, VfsExtractor, VfsHeader, VfsReader};
