//! Random-access byte sources and the positioned buffered reader the
//! low-memory strategy scans with.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A seekable byte source: either a borrowed in-memory slice or an open file.
#[derive(Debug)]
pub(crate) enum RandomAccessSource<'a> {
    /// Fully resident input.
    Bytes { data: &'a [u8], pos: usize },
    /// File-backed input, read on demand.
    File { file: File },
}

impl RandomAccessSource<'_> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<RandomAccessSource<'static>> {
        Ok(RandomAccessSource::File {
            file: File::open(path)?,
        })
    }

    pub fn from_bytes(data: &[u8]) -> RandomAccessSource<'_> {
        RandomAccessSource::Bytes { data, pos: 0 }
    }

    pub fn seek(&mut self, pos: u64) -> io::Result<()> {
        match self {
            RandomAccessSource::Bytes { data, pos: cursor } => {
                // Seeking past the end is allowed; reads there return 0.
                *cursor = pos.min(data.len() as u64) as usize;
                Ok(())
            }
            RandomAccessSource::File { file } => {
                file.seek(SeekFrom::Start(pos))?;
                Ok(())
            }
        }
    }

    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            RandomAccessSource::Bytes { data, pos } => {
                let n = buf.len().min(data.len() - *pos);
                buf[..n].copy_from_slice(&data[*pos..*pos + n]);
                *pos += n;
                Ok(n)
            }
            RandomAccessSource::File { file } => file.read(buf),
        }
    }
}

/// Buffered reader over a [`RandomAccessSource`] that tracks its absolute
/// position and can jump to arbitrary offsets, reusing the current buffer
/// when the target already lies within it.
///
/// The buffer size trades off between the two access patterns of a sort:
/// sequential scanning of unsortable content and jumping between the entries
/// of a sorted object.
#[derive(Debug)]
pub(crate) struct PosBufReader<'r, 'a> {
    source: &'r mut RandomAccessSource<'a>,
    buf: Vec<u8>,
    /// Absolute offset of `buf[0]`.
    buf_start: u64,
    /// Valid bytes in `buf`.
    len: usize,
    /// Cursor within `buf`.
    pos: usize,
}

impl<'r, 'a> PosBufReader<'r, 'a> {
    pub fn new(source: &'r mut RandomAccessSource<'a>, capacity: usize) -> Self {
        Self {
            source,
            buf: vec![0; capacity.max(1)],
            buf_start: 0,
            len: 0,
            pos: 0,
        }
    }

    /// Absolute offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.buf_start + self.pos as u64
    }

    /// Jump to an absolute offset.
    pub fn set_position(&mut self, pos: u64) {
        if pos >= self.buf_start && pos < self.buf_start + self.len as u64 {
            self.pos = (pos - self.buf_start) as usize;
        } else {
            self.buf_start = pos;
            self.pos = 0;
            self.len = 0;
        }
    }

    /// Read one byte, or `None` at the end of the source.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pos >= self.len && !self.fill()? {
            return Ok(None);
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }

    fn fill(&mut self) -> io::Result<bool> {
        self.buf_start += self.len as u64;
        self.pos = 0;
        self.len = 0;
        self.source.seek(self.buf_start)?;
        while self.len < self.buf.len() {
            let n = self.source.read(&mut self.buf[self.len..])?;
            if n == 0 {
                break;
            }
            self.len += n;
        }
        Ok(self.len > 0)
    }
}
