use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::vfs::{FormatError, HEADER_SIZE, IoError, Result};

/// Local VFS file opened for reading, with its size captured once.
pub struct LocalArchive {
    file: File,
    size: u64,
}

impl LocalArchive {
    /// Open `path` and check that it can hold at least a header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| IoError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let size = file
            .metadata()
            .map_err(|source| IoError::Stat {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if size < HEADER_SIZE {
            return Err(FormatError::TooSmall {
                size,
                minimum: HEADER_SIZE,
            }
            .into());
        }

        debug!(path = %path.display(), size, "Opened VFS archive");
        Ok(Self { file, size })
    }

    /// Split into the file handle and its total size.
    pub fn into_parts(self) -> (File, u64) {
        (self.file, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_too_small() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"LP1C\0\0").unwrap();

        let err = LocalArchive::open(file.path()).err().unwrap();
        assert!(matches!(
            err.as_format(),
            Some(FormatError::TooSmall { size: 6, minimum: 12 })
        ));
    }

    #[test]
    fn test_open_captures_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"LP1C\0\0\0\0\0\0\0\0").unwrap();

        let (_, size) = LocalArchive::open(file.path()).unwrap().into_parts();
        assert_eq!(size, 12);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalArchive::open(&dir.path().join("missing.vfs")).err().unwrap();
        assert!(matches!(err.as_io(), Some(IoError::Open { .. })));
    }
}
