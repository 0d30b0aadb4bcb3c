use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::error::{Error, FormatError, IoError, Result};
use super::parser::{SuffixSkip, VfsReader};
use super::structures::{HEADER_SIZE, VfsEntry, VfsHeader};

/// Totals for a finished extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: u32,
    pub bytes: u64,
}

/// VFS archive extractor
///
/// Drives a [`VfsReader`] entry by entry in archive order and writes each
/// payload beneath the output root.
pub struct VfsExtractor<R> {
    reader: VfsReader<R>,
    output_root: PathBuf,
}

impl<R: Read + Seek> VfsExtractor<R> {
    pub fn new(reader: VfsReader<R>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            output_root: output_root.into(),
        }
    }

    /// Extract every entry in archive order.
    ///
    /// Reads the header, creates the output root, then for each entry
    /// decodes it, checks its range, copies its payload to a file beneath
    /// the output root and moves on to the next entry.
    ///
    /// An empty archive succeeds without creating the output root.
    ///
    /// # Returns
    ///
    /// The number of files written and their total size.
    ///
    /// # Errors
    ///
    /// The first decode, validation or I/O failure aborts the run. Errors
    /// raised while handling an entry carry its 1-based index, its name when
    /// decoded, and the byte offset involved (see [`Error::entry_index`]).
    pub fn run(&mut self) -> Result<ExtractSummary> {
        let header = self.reader.read_header()?;
        info!("Archive contains {} files.", header.file_count);
        if header.is_empty() {
            info!("No files to extract.");
            return Ok(ExtractSummary::default());
        }

        info!("Creating output directory: {}", self.output_root.display());
        fs::create_dir_all(&self.output_root).map_err(|source| IoError::CreateDirFailed {
            path: self.output_root.clone(),
            source,
        })?;

        let root = self.output_root.clone();
        let mut summary = ExtractSummary::default();
        self.walk(&header, |reader, index, entry| {
            let written = extract_entry(reader, entry, &root)?;
            info!(
                "Extracted ({}/{}): {} ({} bytes)",
                index, header.file_count, entry.name, written
            );
            summary.files += 1;
            summary.bytes += written;
            Ok(())
        })?;

        info!(
            files = summary.files,
            bytes = summary.bytes,
            "Unpacking finished successfully."
        );
        Ok(summary)
    }

    /// Decode and validate every entry without touching payloads.
    ///
    /// `visit` receives the 1-based index and the entry.
    pub fn list(&mut self, mut visit: impl FnMut(u32, &VfsEntry)) -> Result<VfsHeader> {
        let header = self.reader.read_header()?;
        if !header.is_empty() {
            self.walk(&header, |_, index, entry| {
                visit(index, entry);
                Ok(())
            })?;
        }
        Ok(header)
    }

    /// Sequential scan over the directory.
    ///
    /// `on_entry` runs after the entry has been decoded and range checked,
    /// with the cursor parked just past the offset field; whatever it does
    /// with the reader, it must leave the cursor there.
    fn walk(
        &mut self,
        header: &VfsHeader,
        mut on_entry: impl FnMut(&mut VfsReader<R>, u32, &VfsEntry) -> Result<()>,
    ) -> Result<()> {
        self.reader.seek_to(HEADER_SIZE)?;
        debug!(
            "Reading file entries starting at offset {} ({:#X})",
            HEADER_SIZE, HEADER_SIZE
        );

        for index in 1..=header.file_count {
            let entry_start = self.reader.position()?;
            let entry = self
                .reader
                .read_entry()
                .map_err(|err| err.in_entry(index, None, entry_start))?;

            let data_offset = u64::from(entry.file_offset);
            let context = |err: Error| err.in_entry(index, Some(&entry.name), data_offset);

            self.reader.validate_range(&entry).map_err(context)?;
            on_entry(&mut self.reader, index, &entry).map_err(context)?;

            let suffix_start = self.reader.position()?;
            let skip = self
                .reader
                .skip_fixed_suffix()
                .map_err(|err| err.in_entry(index, Some(&entry.name), suffix_start))?;

            // Only the last entry may run into the end of the source.
            if skip == SuffixSkip::EndOfSource && index < header.file_count {
                let err = Error::from(FormatError::Truncated {
                    field: "entry table",
                    offset: suffix_start,
                });
                return Err(err.in_entry(index, Some(&entry.name), suffix_start));
            }
        }
        Ok(())
    }
}

/// Read `entry`'s payload and write it beneath `root`.
///
/// Returns the number of bytes written.
fn extract_entry<R: Read + Seek>(
    reader: &mut VfsReader<R>,
    entry: &VfsEntry,
    root: &Path,
) -> Result<u64> {
    let output_path = entry.output_path(root)?;
    let data = reader.read_payload(entry)?;

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|source| IoError::CreateDirFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    write_output(&output_path, &data)?;
    Ok(data.len() as u64)
}

/// Destination file for one payload.
trait OutputFile: Write {
    /// Flush everything to disk before the handle is dropped.
    fn finish(&mut self) -> std::io::Result<()>;
}

impl OutputFile for File {
    fn finish(&mut self) -> std::io::Result<()> {
        self.sync_all()
    }
}

/// Create or truncate `path` and write `data` to it.
fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    let file = File::create(path).map_err(|source| IoError::CreateFileFailed {
        path: path.to_path_buf(),
        source,
    })?;
    write_and_close(file, path, data)
}

/// Write `data` to `file`, which was opened at `path`.
///
/// A failed write removes the partial file. A failed final flush is only
/// reported, since the data has already been handed to the OS.
fn write_and_close<F: OutputFile>(mut file: F, path: &Path, data: &[u8]) -> Result<()> {
    if let Err(source) = file.write_all(data) {
        drop(file);
        if let Err(err) = fs::remove_file(path) {
            warn!(
                "Failed to remove partial output file '{}': {}",
                path.display(),
                err
            );
        }
        return Err(IoError::WriteFailed {
            path: path.to_path_buf(),
            source,
        }
        .into());
    }

    if let Err(err) = file.finish() {
        warn!("Failed to close output file '{}': {}", path.display(), err);
    }
    debug!(path = %path.display(), bytes = data.len(), "Wrote output file");
    Ok(())
}
