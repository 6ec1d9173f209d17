//! Memory-bounded sorting strategy with disk spill.

use std::cmp::Ordering;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::sort::path::JsonPath;
use crate::sort::scratch::KeyScratch;
use crate::sort::source::{PosBufReader, RandomAccessSource};
use crate::sort::{DuplicatePolicy, Sorter};

/// Default size of the buffer used for caching fragments of the source.
/// Smaller buffers slow down scanning of unsortable content like arrays;
/// larger ones slow down objects, where sorting jumps between the unsorted
/// entries' positions.
const DEFAULT_BUFFER_SIZE: usize = 10 * 1024;

/// Chunk size for streaming comparison of spilled key bytes.
const COMPARE_CHUNK: usize = 1024;

/// Sorts JSON object keys while keeping peak memory independent of document
/// size.
///
/// The source (a byte slice or a file) is scanned through a small positioned
/// buffer. For each object only the key bytes and the byte spans of the
/// values are collected; values are re-read from the source when the sorted
/// object is written. Key bytes held resident count against the key-storage
/// allowance; once an object's keys exceed it, further keys spill to a
/// per-instance scratch file and are compared by streaming chunks bounded to
/// UTF-8 character boundaries.
#[derive(Debug)]
pub struct LowMemorySorter<'a> {
    source: RandomAccessSource<'a>,
    buffer_size: usize,
    max_key_memory: Option<u64>,
    duplicates: DuplicatePolicy,
}

impl LowMemorySorter<'static> {
    /// Sorter over a file-backed source. The file is read on demand, never
    /// loaded wholesale.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            source: RandomAccessSource::open(path)?,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_key_memory: None,
            duplicates: DuplicatePolicy::default(),
        })
    }
}

impl<'a> LowMemorySorter<'a> {
    /// Sorter over a borrowed byte slice.
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self {
            source: RandomAccessSource::from_bytes(data),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_key_memory: None,
            duplicates: DuplicatePolicy::default(),
        }
    }

    /// Set the source-cache buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Bound the key bytes held resident while sorting one object; the
    /// excess spills to scratch storage. Unbounded by default.
    pub fn with_max_key_memory(mut self, bytes: u64) -> Self {
        self.max_key_memory = Some(bytes);
        self
    }

    /// Set how duplicate keys within one object are handled.
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// The key-storage allowance, if bounded.
    pub fn max_key_memory(&self) -> Option<u64> {
        self.max_key_memory
    }
}

impl Sorter for LowMemorySorter<'_> {
    fn sort_into(&mut self, out: &mut dyn Write) -> Result<()> {
        let mut run = SortRun {
            reader: PosBufReader::new(&mut self.source, self.buffer_size),
            scratch: KeyScratch::new(),
            max_key_memory: self.max_key_memory,
            duplicates: self.duplicates,
            path: JsonPath::new(),
        };
        let mut writer = BufWriter::with_capacity(64 * 1024, out);
        run.write_span(0, None, 0, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Key bytes of one object entry, resident or spilled.
enum StoredKey {
    Resident(Vec<u8>),
    Spilled { offset: u64, len: u64 },
}

impl StoredKey {
    fn len(&self) -> u64 {
        match self {
            StoredKey::Resident(bytes) => bytes.len() as u64,
            StoredKey::Spilled { len, .. } => *len,
        }
    }
}

/// One entry of an object under sort. `key_start..stop` spans the key, the
/// colon, and the value as written in the source; the delimiter after the
/// value is excluded.
struct KeyEntry {
    key: StoredKey,
    key_start: u64,
    stop: u64,
}

/// State owned by a single `sort_into` invocation.
struct SortRun<'r, 'a> {
    reader: PosBufReader<'r, 'a>,
    scratch: KeyScratch,
    max_key_memory: Option<u64>,
    duplicates: DuplicatePolicy,
    path: JsonPath,
}

impl SortRun<'_, '_> {
    /// Copy the span `start..stop` (the whole source when `stop` is `None`)
    /// to `out`, rewriting every object encountered with sorted keys.
    ///
    /// `resident` is the number of key bytes already held by enclosing
    /// objects whose entries are currently being written.
    fn write_span<W: Write>(
        &mut self,
        start: u64,
        stop: Option<u64>,
        resident: u64,
        out: &mut W,
    ) -> Result<()> {
        self.reader.set_position(start);
        loop {
            if let Some(stop) = stop {
                if self.reader.position() >= stop {
                    break;
                }
            }
            let Some(b) = self.reader.read_byte()? else {
                break;
            };
            match b {
                b'{' => {
                    self.path.push_object();
                    let mut used = resident;
                    let mut entries = self.scan_object(true, &mut used)?;
                    let after = self.reader.position();
                    self.sort_entries(&mut entries)?;
                    let entries = self.apply_duplicate_policy(entries)?;
                    out.write_all(b"{")?;
                    for (i, entry) in entries.iter().enumerate() {
                        let key = self.key_string(&entry.key)?;
                        self.path.set_key(key);
                        if i > 0 {
                            out.write_all(b",")?;
                        }
                        self.write_span(entry.key_start, Some(entry.stop), used, out)?;
                    }
                    out.write_all(b"}")?;
                    self.path.pop();
                    self.reader.set_position(after);
                }
                b'"' => {
                    out.write_all(&[b])?;
                    self.copy_string(out)?;
                }
                b'[' => {
                    self.path.push_index();
                    out.write_all(&[b])?;
                }
                b']' => {
                    self.path.pop();
                    out.write_all(&[b])?;
                }
                b',' => {
                    if self.path.is_empty() {
                        return Err(Error::CommaAtTopLevel);
                    }
                    if !self.path.bump_index() {
                        return Err(Error::CommaOutsideArray);
                    }
                    out.write_all(&[b])?;
                }
                _ => out.write_all(&[b])?,
            }
        }
        Ok(())
    }

    /// Scan an object body (the `{` has been consumed), leaving the reader
    /// just after the closing brace. With `collect`, gathers the entries'
    /// key bytes and spans, charging `resident` for keys kept in memory;
    /// without it, only skips the object.
    fn scan_object(&mut self, collect: bool, resident: &mut u64) -> Result<Vec<KeyEntry>> {
        let mut entries = Vec::new();
        let mut before_field = true;
        let mut current: Option<(StoredKey, u64)> = None;
        let mut value_start: Option<u64> = None;
        loop {
            let Some(b) = self.reader.read_byte()? else {
                return Err(Error::UnclosedObject);
            };
            match b {
                b'}' => {
                    if let Some((key, key_start)) = current.take() {
                        if collect {
                            if value_start.is_none() {
                                return Err(Error::ValueWithoutKey);
                            }
                            entries.push(KeyEntry {
                                key,
                                key_start,
                                stop: self.reader.position() - 1,
                            });
                        }
                    }
                    break;
                }
                b'"' => {
                    if before_field {
                        let key_start = self.reader.position() - 1;
                        current = self.capture_key(collect, resident)?.map(|k| (k, key_start));
                    } else {
                        self.skip_string()?;
                    }
                }
                b':' => {
                    if !before_field {
                        return Err(Error::MisplacedColon);
                    }
                    if collect {
                        if current.is_none() {
                            return Err(Error::ColonBeforeKey);
                        }
                        value_start = Some(self.reader.position());
                    }
                    before_field = false;
                }
                b'{' => {
                    if before_field {
                        return Err(Error::ObjectBeforeKey);
                    }
                    self.scan_object(false, resident)?;
                }
                b',' => {
                    if collect {
                        let Some((key, key_start)) = current.take() else {
                            return Err(Error::CommaWithoutEntry);
                        };
                        if value_start.take().is_none() {
                            return Err(Error::ValueWithoutKey);
                        }
                        entries.push(KeyEntry {
                            key,
                            key_start,
                            stop: self.reader.position() - 1,
                        });
                    }
                    before_field = true;
                }
                b'[' => {
                    if before_field {
                        return Err(Error::ArrayBeforeKey);
                    }
                    self.skip_array()?;
                }
                _ => {}
            }
        }
        Ok(entries)
    }

    /// Read a key string body (the opening quote has been consumed). With
    /// `collect`, returns the raw bytes between the quotes, kept resident
    /// while the allowance permits and spilled to scratch otherwise.
    fn capture_key(&mut self, collect: bool, resident: &mut u64) -> Result<Option<StoredKey>> {
        if !collect {
            self.skip_string()?;
            return Ok(None);
        }
        let mut bytes = Vec::new();
        loop {
            let Some(b) = self.reader.read_byte()? else {
                return Err(Error::UnclosedString);
            };
            if b == b'"' {
                break;
            }
            bytes.push(b);
            if b == b'\\' {
                let Some(escaped) = self.reader.read_byte()? else {
                    return Err(Error::UnclosedString);
                };
                bytes.push(escaped);
            }
        }
        let len = bytes.len() as u64;
        match self.max_key_memory {
            Some(allowance) if *resident + len > allowance => {
                tracing::trace!(len, allowance, "spilling key to scratch storage");
                let offset = self.scratch.spill(&bytes)?;
                Ok(Some(StoredKey::Spilled { offset, len }))
            }
            _ => {
                *resident += len;
                Ok(Some(StoredKey::Resident(bytes)))
            }
        }
    }

    /// Skip a string body whose opening quote has been consumed.
    fn skip_string(&mut self) -> Result<()> {
        loop {
            let Some(b) = self.reader.read_byte()? else {
                return Err(Error::UnclosedString);
            };
            match b {
                b'"' => return Ok(()),
                b'\\' => {
                    if self.reader.read_byte()?.is_none() {
                        return Err(Error::UnclosedString);
                    }
                }
                _ => {}
            }
        }
    }

    /// Skip an array body whose opening bracket has been consumed.
    fn skip_array(&mut self) -> Result<()> {
        loop {
            let Some(b) = self.reader.read_byte()? else {
                return Err(Error::UnclosedArray);
            };
            match b {
                b']' => return Ok(()),
                b'"' => self.skip_string()?,
                b'{' => {
                    self.scan_object(false, &mut 0)?;
                }
                b'[' => self.skip_array()?,
                _ => {}
            }
        }
    }

    /// Copy a string body to `out` verbatim, opening quote already written.
    fn copy_string<W: Write>(&mut self, out: &mut W) -> Result<()> {
        loop {
            let Some(b) = self.reader.read_byte()? else {
                return Err(Error::UnclosedString);
            };
            out.write_all(&[b])?;
            match b {
                b'"' => return Ok(()),
                b'\\' => {
                    let Some(escaped) = self.reader.read_byte()? else {
                        return Err(Error::UnclosedString);
                    };
                    out.write_all(&[escaped])?;
                }
                _ => {}
            }
        }
    }

    /// Stable sort by raw key bytes. A recursive merge keeps the comparator
    /// fallible: comparing spilled keys reads scratch storage.
    fn sort_entries(&mut self, entries: &mut Vec<KeyEntry>) -> Result<()> {
        if entries.len() < 2 {
            return Ok(());
        }
        let right = entries.split_off(entries.len() / 2);
        let left = std::mem::take(entries);
        let mut left = {
            let mut left = left;
            self.sort_entries(&mut left)?;
            left.into_iter().peekable()
        };
        let mut right = {
            let mut right = right;
            self.sort_entries(&mut right)?;
            right.into_iter().peekable()
        };
        loop {
            match (left.peek(), right.peek()) {
                (Some(a), Some(b)) => {
                    // take left on ties to keep the sort stable
                    if self.compare_keys(&a.key, &b.key)? == Ordering::Greater {
                        entries.extend(right.next());
                    } else {
                        entries.extend(left.next());
                    }
                }
                (Some(_), None) => {
                    entries.extend(left);
                    return Ok(());
                }
                (None, _) => {
                    entries.extend(right);
                    return Ok(());
                }
            }
        }
    }

    /// Unsigned-byte lexicographic comparison of two stored keys.
    fn compare_keys(&mut self, a: &StoredKey, b: &StoredKey) -> Result<Ordering> {
        if let (StoredKey::Resident(x), StoredKey::Resident(y)) = (a, b) {
            return Ok(x.as_slice().cmp(y.as_slice()));
        }
        let mut buf_a = [0u8; COMPARE_CHUNK];
        let mut buf_b = [0u8; COMPARE_CHUNK];
        let (mut read_a, mut read_b) = (0u64, 0u64);
        let (mut ia, mut la) = (0usize, 0usize);
        let (mut ib, mut lb) = (0usize, 0usize);
        loop {
            if ia == la && read_a < a.len() {
                la = self.fill_chunk(a, read_a, &mut buf_a)?;
                read_a += la as u64;
                ia = 0;
            }
            if ib == lb && read_b < b.len() {
                lb = self.fill_chunk(b, read_b, &mut buf_b)?;
                read_b += lb as u64;
                ib = 0;
            }
            match (ia == la, ib == lb) {
                (true, true) => return Ok(Ordering::Equal),
                (true, false) => return Ok(Ordering::Less),
                (false, true) => return Ok(Ordering::Greater),
                (false, false) => {}
            }
            let n = (la - ia).min(lb - ib);
            match buf_a[ia..ia + n].cmp(&buf_b[ib..ib + n]) {
                Ordering::Equal => {
                    ia += n;
                    ib += n;
                }
                other => return Ok(other),
            }
        }
    }

    /// Fill `buf` with key bytes starting at `offset`. Chunks that are not
    /// the key's final bytes are clamped back to a UTF-8 character boundary
    /// so no multi-byte character is split across a chunk edge.
    fn fill_chunk(&mut self, key: &StoredKey, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let len = key.len();
        let want = (buf.len() as u64).min(len - offset) as usize;
        match key {
            StoredKey::Resident(bytes) => {
                let start = offset as usize;
                buf[..want].copy_from_slice(&bytes[start..start + want]);
            }
            StoredKey::Spilled { offset: base, .. } => {
                self.scratch.read_exact_at(base + offset, &mut buf[..want])?;
            }
        }
        if offset + want as u64 == len {
            return Ok(want);
        }
        let bounds = crate::utf8::get_char_bounds(&buf[..want], want as isize - 1)?;
        if bounds.last() >= want {
            // trailing character is cut off; end the chunk before it
            return Ok(bounds.start());
        }
        Ok(want)
    }

    /// Drop or reject runs of equal keys after sorting, per the configured
    /// policy.
    fn apply_duplicate_policy(&mut self, entries: Vec<KeyEntry>) -> Result<Vec<KeyEntry>> {
        match self.duplicates {
            DuplicatePolicy::Preserve => Ok(entries),
            DuplicatePolicy::Skip => {
                let mut kept: Vec<KeyEntry> = Vec::with_capacity(entries.len());
                for entry in entries {
                    let duplicate = match kept.last() {
                        Some(last) => {
                            last.key.len() == entry.key.len()
                                && self.compare_keys(&last.key, &entry.key)? == Ordering::Equal
                        }
                        None => false,
                    };
                    if !duplicate {
                        kept.push(entry);
                    }
                }
                Ok(kept)
            }
            DuplicatePolicy::Error => {
                for pair in entries.windows(2) {
                    if pair[0].key.len() == pair[1].key.len()
                        && self.compare_keys(&pair[0].key, &pair[1].key)? == Ordering::Equal
                    {
                        let key = self.key_string(&pair[0].key)?;
                        self.path.pop();
                        return Err(Error::DuplicateKey {
                            key,
                            path: self.path.render(),
                        });
                    }
                }
                Ok(entries)
            }
        }
    }

    /// The key as text for paths and error messages, read back from scratch
    /// when spilled.
    fn key_string(&mut self, key: &StoredKey) -> Result<String> {
        match key {
            StoredKey::Resident(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            StoredKey::Spilled { offset, len } => {
                let mut bytes = vec![0; *len as usize];
                self.scratch.read_exact_at(*offset, &mut bytes)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}
