use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use super::error::{FormatError, Result};

/// Magic bytes identifying a VFS archive.
pub const VFS_MAGIC: [u8; 4] = *b"LP1C";

/// The only format version this unpacker understands.
pub const SUPPORTED_VERSION: [u8; 4] = [0, 0, 0, 0];

/// Magic (4) + version (4) + file count (4).
pub const HEADER_SIZE: u64 = 12;

/// Size (4) + offset (4) + reserved (8), following each entry name.
pub const ENTRY_FIXED_SUFFIX_SIZE: u64 = 16;

pub const FILE_SIZE_FIELD_SIZE: u64 = 4;
pub const FILE_OFFSET_FIELD_SIZE: u64 = 4;

/// Separator used inside archive entry names.
pub const ARCHIVE_SEPARATOR: char = '\\';

/// VFS archive header - 12 bytes at offset 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsHeader {
    pub magic: [u8; 4],
    pub version: [u8; 4],
    pub file_count: u32,
}

impl VfsHeader {
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }
}

/// Decoded directory entry.
///
/// The 8 reserved bytes that close every entry are not kept; the reader only
/// knows how to skip them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    /// Name bytes exactly as stored, `\` separators included.
    pub raw_name: Vec<u8>,
    /// Display form of the name: lossy UTF-8 with `\` translated to the
    /// platform separator. Not used to build output paths.
    pub name: String,
    pub file_size: u32,
    /// Absolute offset of the payload from the start of the archive.
    pub file_offset: u32,
}

impl VfsEntry {
    pub fn new(raw_name: Vec<u8>, file_size: u32, file_offset: u32) -> Self {
        Self {
            name: display_name(&raw_name),
            raw_name,
            file_size,
            file_offset,
        }
    }

    /// End of the payload, widened so it cannot overflow.
    pub fn data_end(&self) -> u64 {
        u64::from(self.file_offset) + u64::from(self.file_size)
    }

    /// Path of this entry relative to the output root, built from the raw
    /// name bytes.
    pub fn relative_path(&self) -> PathBuf {
        raw_name_to_path(&self.raw_name)
    }

    /// Destination of this entry beneath `root`.
    ///
    /// Names that would land outside `root` are rejected.
    pub fn output_path(&self, root: &Path) -> Result<PathBuf> {
        let relative = self.relative_path();
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !safe || relative.as_os_str().is_empty() {
            return Err(FormatError::UnsafeName(self.name.clone()).into());
        }
        Ok(root.join(relative))
    }
}

/// Decode raw name bytes for display and translate archive separators.
pub fn display_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace(ARCHIVE_SEPARATOR, &MAIN_SEPARATOR.to_string())
}

/// Split a raw name on `\` and join the components as a platform path.
///
/// On Unix the bytes are kept verbatim, so names in any 8-bit encoding map
/// to distinct paths.
#[cfg(unix)]
fn raw_name_to_path(raw: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    raw.split(|&b| b == ARCHIVE_SEPARATOR as u8)
        .map(OsStr::from_bytes)
        .collect()
}

// TODO: decode with the archive's code page (CP1251) instead of lossy UTF-8
// so non-UTF-8 names stay distinct on Windows.
#[cfg(not(unix))]
fn raw_name_to_path(raw: &[u8]) -> PathBuf {
    raw.split(|&b| b == ARCHIVE_SEPARATOR as u8)
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect()
}

/// Number of reserved bytes left after the size and offset fields.
pub fn reserved_suffix_len() -> Result<u64> {
    ENTRY_FIXED_SUFFIX_SIZE
        .checked_sub(FILE_SIZE_FIELD_SIZE + FILE_OFFSET_FIELD_SIZE)
        .ok_or_else(|| {
            super::error::Error::Internal(format!(
                "negative number of bytes to skip after entry fields (suffix size {ENTRY_FIXED_SUFFIX_SIZE})"
            ))
        })
}
