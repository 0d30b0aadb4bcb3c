//! Sequential decoder for VFS headers and directory entries.
//!
//! ## Parsing Strategy
//!
//! The directory is a run of variable-length records that starts right after
//! the 12-byte header. Each record is decoded in place at the current cursor:
//!
//! 1. `read_header` validates magic and version and reads the file count
//! 2. `read_entry` decodes the name, size and offset of one record
//! 3. the caller may detour to the payload and come back
//! 4. `skip_fixed_suffix` steps over the reserved bytes to the next record
//!
//! Entries are never collected into a listing; each is handed to the caller
//! as soon as it is decoded.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom};

use tracing::debug;

use super::error::{Error, FormatError, IoError, Result};
use super::structures::*;
use crate::io::SeekDetour;

/// Outcome of stepping over an entry's reserved bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixSkip {
    /// More bytes follow; the cursor sits on the next name-length byte.
    Continue,
    /// The cursor reached (or passed) the end of the source.
    EndOfSource,
}

/// Decoder over a seekable VFS source.
///
/// Owns the source and its cursor for the whole pass; payload reads share the
/// same handle through [`VfsReader::read_payload`].
pub struct VfsReader<R> {
    /// The underlying data source
    inner: R,
    /// Total size of the archive in bytes, captured when opened
    size: u64,
}

impl<R: Read + Seek> VfsReader<R> {
    /// Create a reader over a seekable source.
    ///
    /// # Arguments
    ///
    /// * `inner` - The archive bytes, positioned anywhere
    /// * `size` - Total length of the archive, captured once when it was
    ///   opened; every payload range is checked against it
    pub fn new(inner: R, size: u64) -> Self {
        Self { inner, size }
    }

    /// Current cursor offset from the start of the archive.
    pub fn position(&mut self) -> Result<u64> {
        self.inner
            .stream_position()
            .map_err(|source| IoError::Position { source }.into())
    }

    /// Move the cursor to an absolute `offset`.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|source| IoError::Seek { offset, source })?;
        Ok(())
    }

    /// Read and verify the header at the start of the source.
    ///
    /// Seeks to offset 0 first, so the prior cursor position does not
    /// matter. On success the cursor is left 12 bytes from the start.
    ///
    /// # Returns
    ///
    /// The decoded [`VfsHeader`]. A file count of zero is valid.
    ///
    /// # Errors
    ///
    /// - [`FormatError::BadMagic`] if the first 4 bytes are not `LP1C`
    /// - [`FormatError::UnsupportedVersion`] if the version bytes are not zero
    /// - [`FormatError::Truncated`] if the source ends inside the header
    pub fn read_header(&mut self) -> Result<VfsHeader> {
        self.seek_to(0)?;

        let mut magic = [0u8; 4];
        self.read_field(0, "magic bytes", |r| r.read_exact(&mut magic))?;
        if magic != VFS_MAGIC {
            return Err(FormatError::BadMagic {
                found: magic,
                expected: VFS_MAGIC,
            }
            .into());
        }

        let mut version = [0u8; 4];
        self.read_field(4, "version bytes", |r| r.read_exact(&mut version))?;
        if version != SUPPORTED_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                expected: SUPPORTED_VERSION,
            }
            .into());
        }

        let file_count = self.read_field(8, "file count", |r| r.read_u32::<LittleEndian>())?;

        debug!(?version, file_count, "Read VFS header");
        Ok(VfsHeader {
            magic,
            version,
            file_count,
        })
    }

    /// Decode one directory entry at the current cursor.
    ///
    /// Reads the name length, the name, the file size and the file offset,
    /// and stops right after the offset field. The reserved bytes are left
    /// for [`VfsReader::skip_fixed_suffix`], since the caller may detour to
    /// the payload first.
    ///
    /// # Returns
    ///
    /// The decoded [`VfsEntry`], not yet range checked.
    ///
    /// # Errors
    ///
    /// - [`FormatError::ZeroLengthName`] if the name length byte is zero
    /// - [`FormatError::Truncated`] with the offset of the field that could
    ///   not be read in full
    pub fn read_entry(&mut self) -> Result<VfsEntry> {
        let start = self.position()?;

        let name_length = self.read_field(start, "name length", |r| r.read_u8())?;
        if name_length == 0 {
            return Err(FormatError::ZeroLengthName.into());
        }

        let mut raw_name = vec![0u8; usize::from(name_length)];
        self.read_field(start + 1, "name", |r| r.read_exact(&mut raw_name))?;

        let size_at = start + 1 + u64::from(name_length);
        let file_size = self.read_field(size_at, "file size", |r| r.read_u32::<LittleEndian>())?;
        let file_offset = self.read_field(size_at + FILE_SIZE_FIELD_SIZE, "file offset", |r| {
            r.read_u32::<LittleEndian>()
        })?;

        Ok(VfsEntry::new(raw_name, file_size, file_offset))
    }

    /// Check that an entry's payload lies inside the archive.
    ///
    /// # Errors
    ///
    /// - [`FormatError::OffsetOutOfRange`] if the offset is past the end
    /// - [`FormatError::RangeExceedsArchive`] if offset + size is past the end
    pub fn validate_range(&self, entry: &VfsEntry) -> Result<()> {
        validate_range(entry, self.size)
    }

    /// Step over the reserved bytes that close an entry.
    ///
    /// Must be called with the cursor right after the offset field.
    ///
    /// # Returns
    ///
    /// [`SuffixSkip::EndOfSource`] when the cursor lands at or past the end
    /// of the source. That is not an error here; only the caller knows
    /// whether another entry was expected.
    pub fn skip_fixed_suffix(&mut self) -> Result<SuffixSkip> {
        let skip = reserved_suffix_len()?;
        let from = self.position()?;
        let to = from + skip;
        self.seek_to(to)?;

        if to >= self.size {
            debug!(offset = to, "Reached end of file after entry metadata");
            Ok(SuffixSkip::EndOfSource)
        } else {
            Ok(SuffixSkip::Continue)
        }
    }

    /// Read an entry's payload, restoring the metadata cursor afterwards.
    ///
    /// The cursor returns to where it was before the call whether or not
    /// the read succeeds.
    ///
    /// # Arguments
    ///
    /// * `entry` - A range-checked entry from [`VfsReader::read_entry`]
    ///
    /// # Returns
    ///
    /// Exactly `entry.file_size` bytes from `entry.file_offset`.
    ///
    /// # Errors
    ///
    /// [`IoError::UnexpectedEof`] if fewer bytes are readable than declared,
    /// which points at a corrupt archive.
    pub fn read_payload(&mut self, entry: &VfsEntry) -> Result<Vec<u8>> {
        let offset = u64::from(entry.file_offset);
        let expected = entry.file_size;
        let archive_size = self.size;

        self.inner.detour(offset, |inner| {
            let mut data = Vec::with_capacity(expected as usize);
            let read = inner
                .by_ref()
                .take(u64::from(expected))
                .read_to_end(&mut data)
                .map_err(|source| IoError::Read { offset, source })? as u64;

            if read < u64::from(expected) {
                return Err(IoError::UnexpectedEof {
                    offset,
                    expected,
                    read,
                    archive_size,
                }
                .into());
            }
            Ok(data)
        })
    }

    fn read_field<T>(
        &mut self,
        offset: u64,
        field: &'static str,
        read: impl FnOnce(&mut R) -> io::Result<T>,
    ) -> Result<T> {
        read(&mut self.inner).map_err(|source| {
            if source.kind() == io::ErrorKind::UnexpectedEof {
                Error::from(FormatError::Truncated { field, offset })
            } else {
                Error::from(IoError::Read { offset, source })
            }
        })
    }
}

/// Check `entry`'s payload range against an archive of `archive_size` bytes.
pub fn validate_range(entry: &VfsEntry, archive_size: u64) -> Result<()> {
    if u64::from(entry.file_offset) > archive_size {
        return Err(FormatError::OffsetOutOfRange {
            offset: entry.file_offset,
            archive_size,
        }
        .into());
    }
    let end = entry.data_end();
    if end > archive_size {
        return Err(FormatError::RangeExceedsArchive {
            offset: entry.file_offset,
            size: entry.file_size,
            end,
            archive_size,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(count: u32) -> Vec<u8> {
        let mut buf = b"LP1C\0\0\0\0".to_vec();
        buf.extend_from_slice(&count.to_le_bytes());
        buf
    }

    fn entry_bytes(name: &str, size: u32, offset: u32) -> Vec<u8> {
        let mut buf = vec![name.len() as u8];
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(&size.to_le_bytes());
        buf.extend_from_slice(&offset.to_le_bytes());
        buf.extend_from_slice(&[0xAA; 8]);
        buf
    }

    fn reader(bytes: Vec<u8>) -> VfsReader<Cursor<Vec<u8>>> {
        let size = bytes.len() as u64;
        VfsReader::new(Cursor::new(bytes), size)
    }

    #[test]
    fn test_read_header() {
        let mut r = reader(header(7));
        let h = r.read_header().unwrap();
        assert_eq!(h.file_count, 7);
        assert_eq!(h.magic, VFS_MAGIC);
        assert_eq!(r.position().unwrap(), HEADER_SIZE);
    }

    #[test]
    fn test_read_header_bad_magic() {
        let mut bytes = header(1);
        bytes[..4].copy_from_slice(b"PK\x03\x04");
        let err = reader(bytes).read_header().unwrap_err();
        assert!(matches!(err.as_format(), Some(FormatError::BadMagic { .. })));
    }

    #[test]
    fn test_read_header_bad_version() {
        let mut bytes = header(1);
        bytes[4] = 1;
        let err = reader(bytes).read_header().unwrap_err();
        assert!(matches!(
            err.as_format(),
            Some(FormatError::UnsupportedVersion { found: [1, 0, 0, 0], .. })
        ));
    }

    #[test]
    fn test_read_header_truncated() {
        let mut r = VfsReader::new(Cursor::new(b"LP1C\0\0\0\0\x01".to_vec()), 12);
        let err = r.read_header().unwrap_err();
        assert!(matches!(
            err.as_format(),
            Some(FormatError::Truncated { field: "file count", offset: 8 })
        ));
    }

    #[test]
    fn test_read_entry_and_skip() {
        let mut bytes = header(2);
        bytes.extend(entry_bytes("dir\\a.bin", 3, 100));
        bytes.extend(entry_bytes("b", 0, 12));
        let mut r = reader(bytes);
        r.read_header().unwrap();

        let first = r.read_entry().unwrap();
        assert_eq!(first.raw_name, b"dir\\a.bin");
        assert_eq!(first.file_size, 3);
        assert_eq!(first.file_offset, 100);
        assert_eq!(
            std::path::PathBuf::from(&first.name),
            ["dir", "a.bin"].iter().collect::<std::path::PathBuf>()
        );
        assert_eq!(r.skip_fixed_suffix().unwrap(), SuffixSkip::Continue);

        let second = r.read_entry().unwrap();
        assert_eq!(second.name, "b");
        assert_eq!(r.skip_fixed_suffix().unwrap(), SuffixSkip::EndOfSource);
    }

    #[test]
    fn test_read_entry_zero_length_name() {
        let mut bytes = header(1);
        bytes.push(0);
        let mut r = reader(bytes);
        r.read_header().unwrap();
        let err = r.read_entry().unwrap_err();
        assert!(matches!(err.as_format(), Some(FormatError::ZeroLengthName)));
    }

    #[test]
    fn test_read_entry_truncated_name() {
        let mut bytes = header(1);
        bytes.extend_from_slice(&[10, b'a', b'b']);
        let mut r = reader(bytes);
        r.read_header().unwrap();
        let err = r.read_entry().unwrap_err();
        assert!(matches!(
            err.as_format(),
            Some(FormatError::Truncated { field: "name", offset: 13 })
        ));
    }

    #[test]
    fn test_read_entry_truncated_offset() {
        let mut bytes = header(1);
        bytes.extend_from_slice(&[1, b'a']);
        bytes.extend_from_slice(&5u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0]);
        let mut r = reader(bytes);
        r.read_header().unwrap();
        let err = r.read_entry().unwrap_err();
        assert!(matches!(
            err.as_format(),
            Some(FormatError::Truncated { field: "file offset", offset: 18 })
        ));
    }

    #[test]
    fn test_validate_range() {
        let e = |size, offset| VfsEntry::new(b"x".to_vec(), size, offset);

        assert!(validate_range(&e(10, 90), 100).is_ok());
        assert!(validate_range(&e(0, 100), 100).is_ok());

        let err = validate_range(&e(0, 101), 100).unwrap_err();
        assert!(matches!(err.as_format(), Some(FormatError::OffsetOutOfRange { .. })));

        let err = validate_range(&e(11, 90), 100).unwrap_err();
        assert!(matches!(
            err.as_format(),
            Some(FormatError::RangeExceedsArchive { end: 101, .. })
        ));

        let err = validate_range(&e(u32::MAX, u32::MAX), u64::from(u32::MAX)).unwrap_err();
        assert!(matches!(err.as_format(), Some(FormatError::RangeExceedsArchive { .. })));
    }

    #[test]
    fn test_read_payload_restores_cursor() {
        let mut bytes = header(1);
        bytes.extend(entry_bytes("a", 4, 0));
        let mut r = reader(bytes);
        r.read_header().unwrap();
        let entry = r.read_entry().unwrap();
        let resume = r.position().unwrap();

        let data = r.read_payload(&entry).unwrap();
        assert_eq!(data, b"LP1C");
        assert_eq!(r.position().unwrap(), resume);
    }

    #[test]
    fn test_read_payload_short() {
        let bytes = header(0);
        // Declared size is one byte larger than what the source holds.
        let mut r = VfsReader::new(Cursor::new(bytes), 13);
        let entry = VfsEntry::new(b"a".to_vec(), 5, 8);
        r.validate_range(&entry).unwrap();

        let err = r.read_payload(&entry).unwrap_err();
        assert!(matches!(
            err.as_io(),
            Some(IoError::UnexpectedEof { expected: 5, read: 4, .. })
        ));
        assert_eq!(r.position().unwrap(), 0);
    }

    /// Source whose cursor cannot be queried.
    struct NoTell;

    impl Read for NoTell {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Seek for NoTell {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            match pos {
                SeekFrom::Current(_) => Err(io::Error::other("tell unsupported")),
                SeekFrom::Start(offset) => Ok(offset),
                SeekFrom::End(_) => Ok(0),
            }
        }
    }

    #[test]
    fn test_position_failure_has_no_offset() {
        let mut r = VfsReader::new(NoTell, 100);
        let err = r.read_entry().unwrap_err();
        assert!(matches!(err.as_io(), Some(IoError::Position { .. })));
        assert_eq!(err.to_string(), "failed to query archive position: tell unsupported");
    }
}
