//! Disk-backed scratch storage for spilled key bytes.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Append-only spill area backed by an anonymous temporary file.
///
/// The file is created lazily on the first spill and is unique to this
/// instance, so concurrent low-memory sorts never interfere. The operating
/// system reclaims it when the handle is dropped, on success and on every
/// error path alike.
#[derive(Debug, Default)]
pub(crate) struct KeyScratch {
    file: Option<File>,
    len: u64,
}

impl KeyScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return their offset within the scratch area.
    pub fn spill(&mut self, bytes: &[u8]) -> io::Result<u64> {
        let file = match &mut self.file {
            Some(file) => file,
            vacant => {
                tracing::debug!("creating scratch file for spilled keys");
                vacant.insert(tempfile::tempfile()?)
            }
        };
        file.seek(SeekFrom::Start(self.len))?;
        file.write_all(bytes)?;
        let offset = self.len;
        self.len += bytes.len() as u64;
        Ok(offset)
    }

    /// Read back exactly `buf.len()` bytes starting at `offset`.
    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "scratch storage is empty")
        })?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spill_and_read_back() {
        let mut scratch = KeyScratch::new();
        let a = scratch.spill(b"alpha").unwrap();
        let b = scratch.spill(b"bravo").unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 5);

        let mut buf = [0u8; 5];
        scratch.read_exact_at(b, &mut buf).unwrap();
        assert_eq!(&buf, b"bravo");
        scratch.read_exact_at(a, &mut buf).unwrap();
        assert_eq!(&buf, b"alpha");
    }

    #[test]
    fn read_before_any_spill_fails() {
        let mut scratch = KeyScratch::new();
        let mut buf = [0u8; 1];
        assert!(scratch.read_exact_at(0, &mut buf).is_err());
    }
}
