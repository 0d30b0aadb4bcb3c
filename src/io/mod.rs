mod local;

pub use local::LocalArchive;

use std::io::{Seek, SeekFrom};

use tracing::warn;

use crate::vfs::{Error, IoError, Result};

/// Scoped cursor repositioning for seekable sources.
pub trait SeekDetour: Seek {
    /// Seek to `offset`, run `op`, then return to the position held before
    /// the call.
    ///
    /// The return seek happens whether or not `op` succeeds. When both fail,
    /// the error from `op` wins.
    fn detour<T>(&mut self, offset: u64, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let resume = self
            .stream_position()
            .map_err(|source| IoError::Position { source })?;
        self.seek(SeekFrom::Start(offset))
            .map_err(|source| IoError::Seek { offset, source })?;

        let outcome = op(self);

        match self.seek(SeekFrom::Start(resume)) {
            Ok(_) => outcome,
            Err(source) => {
                let restore = Error::from(IoError::Seek {
                    offset: resume,
                    source,
                });
                match outcome {
                    Ok(_) => Err(restore),
                    Err(err) => {
                        warn!("Failed to return to resume position {}: {}", resume, restore);
                        Err(err)
                    }
                }
            }
        }
    }
}

impl<S: Seek + ?Sized> SeekDetour for S {}
