//! Fully in-memory sorting strategy.

use std::borrow::Cow;
use std::io::{self, BufWriter, Write};

use crate::error::{Error, Result};
use crate::sort::is_json_whitespace;
use crate::sort::path::JsonPath;
use crate::sort::{DuplicatePolicy, Sorter};

/// Sorts JSON object keys by building a span tree of the whole document in
/// memory.
///
/// Parsing records only byte offsets into the source: primitives become
/// spans, objects become lists of key-span/value pairs. Every object's
/// entries are stable-sorted by the raw bytes of their keys, then the tree is
/// rendered back in one pass, copying scalar tokens byte-for-byte from the
/// source. Whitespace between structural tokens is not preserved.
///
/// The transient tree typically costs several times the raw input size;
/// [`SorterFactory`](crate::sort::SorterFactory) selects this strategy only
/// when that overhead fits the memory ceiling.
#[derive(Debug)]
pub struct FastSorter<'a> {
    data: Cow<'a, [u8]>,
    duplicates: DuplicatePolicy,
}

/// A parsed value, stored as spans into the source bytes.
enum Element {
    /// A scalar token (string, number, literal): `data[start..start + len]`.
    Primitive { start: usize, len: usize },
    Array(Vec<Element>),
    Map(Vec<MapEntry>),
}

/// One object entry. `key_start..=key_stop` spans the key including both
/// quotes.
struct MapEntry {
    key_start: usize,
    key_stop: usize,
    value: Element,
}

impl<'a> FastSorter<'a> {
    /// Sorter over a borrowed byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            duplicates: DuplicatePolicy::default(),
        }
    }

    /// Sorter that owns its input bytes.
    pub fn from_vec(data: Vec<u8>) -> FastSorter<'static> {
        FastSorter {
            data: Cow::Owned(data),
            duplicates: DuplicatePolicy::default(),
        }
    }

    /// Set how duplicate keys within one object are handled.
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// The raw bytes of an entry's key, quotes excluded.
    fn key_bytes(&self, entry: &MapEntry) -> &[u8] {
        &self.data[entry.key_start + 1..entry.key_stop]
    }

    fn parse_element(&self, pos: &mut usize, path: &mut JsonPath) -> Result<Element> {
        let data = self.data.as_ref();
        let b = loop {
            let Some(&b) = data.get(*pos) else {
                return Err(Error::UnexpectedEof);
            };
            *pos += 1;
            if !is_json_whitespace(b) {
                break b;
            }
        };
        match b {
            b'{' => self.parse_object(pos, path),
            b'[' => self.parse_array(pos, path),
            b'"' => {
                let start = *pos - 1;
                skip_string(data, pos)?;
                Ok(Element::Primitive {
                    start,
                    len: *pos - start,
                })
            }
            _ => {
                // number or literal: runs to the next delimiter
                let start = *pos - 1;
                while let Some(&b) = data.get(*pos) {
                    if matches!(b, b'}' | b']' | b',') || is_json_whitespace(b) {
                        break;
                    }
                    *pos += 1;
                }
                Ok(Element::Primitive {
                    start,
                    len: *pos - start,
                })
            }
        }
    }

    /// Parse an object body (the `{` has been consumed), sort its entries,
    /// and apply the duplicate policy.
    fn parse_object(&self, pos: &mut usize, path: &mut JsonPath) -> Result<Element> {
        let data = self.data.as_ref();
        let mut entries: Vec<MapEntry> = Vec::new();
        let mut before_field = true;
        let mut key_span: Option<(usize, usize)> = None;
        let mut value: Option<Element> = None;
        path.push_object();
        loop {
            let Some(&b) = data.get(*pos) else {
                return Err(Error::UnclosedObject);
            };
            *pos += 1;
            match b {
                b'}' => {
                    if let Some((key_start, key_stop)) = key_span.take() {
                        let value = value.take().ok_or(Error::ValueWithoutKey)?;
                        entries.push(MapEntry {
                            key_start,
                            key_stop,
                            value,
                        });
                    }
                    break;
                }
                b'"' if before_field => {
                    let key_start = *pos - 1;
                    skip_string(data, pos)?;
                    key_span = Some((key_start, *pos - 1));
                }
                b':' => {
                    if !before_field {
                        return Err(Error::MisplacedColon);
                    }
                    let Some((key_start, key_stop)) = key_span else {
                        return Err(Error::ColonBeforeKey);
                    };
                    path.set_key(
                        String::from_utf8_lossy(&data[key_start + 1..key_stop]).into_owned(),
                    );
                    value = Some(self.parse_element(pos, path)?);
                    before_field = false;
                }
                b',' => {
                    let Some((key_start, key_stop)) = key_span.take() else {
                        return Err(Error::CommaWithoutEntry);
                    };
                    let value = value.take().ok_or(Error::ValueWithoutKey)?;
                    entries.push(MapEntry {
                        key_start,
                        key_stop,
                        value,
                    });
                    before_field = true;
                }
                _ if is_json_whitespace(b) => {}
                _ => return Err(Error::UnexpectedCharacter(b as char)),
            }
        }
        path.pop();

        // stable, so duplicate keys keep their original relative order
        entries.sort_by(|a, b| self.key_bytes(a).cmp(self.key_bytes(b)));
        match self.duplicates {
            DuplicatePolicy::Preserve => {}
            DuplicatePolicy::Skip => {
                let data = self.data.as_ref();
                entries.dedup_by(|current, kept| {
                    data[current.key_start + 1..current.key_stop]
                        == data[kept.key_start + 1..kept.key_stop]
                });
            }
            DuplicatePolicy::Error => {
                for pair in entries.windows(2) {
                    if self.key_bytes(&pair[0]) == self.key_bytes(&pair[1]) {
                        return Err(Error::DuplicateKey {
                            key: String::from_utf8_lossy(self.key_bytes(&pair[0])).into_owned(),
                            path: path.render(),
                        });
                    }
                }
            }
        }
        Ok(Element::Map(entries))
    }

    fn parse_array(&self, pos: &mut usize, path: &mut JsonPath) -> Result<Element> {
        let data = self.data.as_ref();
        let mut items = Vec::new();
        // empty array?
        loop {
            match data.get(*pos) {
                None => return Err(Error::UnclosedArray),
                Some(&b) if is_json_whitespace(b) => *pos += 1,
                Some(b']') => {
                    *pos += 1;
                    return Ok(Element::Array(items));
                }
                Some(_) => break,
            }
        }
        path.push_index();
        loop {
            items.push(self.parse_element(pos, path)?);
            let b = loop {
                let Some(&b) = data.get(*pos) else {
                    return Err(Error::UnclosedArray);
                };
                *pos += 1;
                if !is_json_whitespace(b) {
                    break b;
                }
            };
            match b {
                b']' => break,
                b',' => {
                    path.bump_index();
                }
                _ => return Err(Error::UnexpectedCharacter(b as char)),
            }
        }
        path.pop();
        Ok(Element::Array(items))
    }
}

impl Sorter for FastSorter<'_> {
    fn sort_into(&mut self, out: &mut dyn Write) -> Result<()> {
        let mut pos = 0;
        let mut path = JsonPath::new();
        let root = self.parse_element(&mut pos, &mut path)?;
        let mut writer = BufWriter::with_capacity(64 * 1024, out);
        root.write(&self.data, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl Element {
    fn write<W: Write>(&self, data: &[u8], out: &mut W) -> io::Result<()> {
        match self {
            Element::Primitive { start, len } => out.write_all(&data[*start..*start + *len]),
            Element::Array(items) => {
                out.write_all(b"[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.write_all(b",")?;
                    }
                    item.write(data, out)?;
                }
                out.write_all(b"]")
            }
            Element::Map(entries) => {
                out.write_all(b"{")?;
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        out.write_all(b",")?;
                    }
                    out.write_all(&data[entry.key_start..=entry.key_stop])?;
                    out.write_all(b":")?;
                    entry.value.write(data, out)?;
                }
                out.write_all(b"}")
            }
        }
    }
}

/// Advance `pos` past a string body whose opening quote has been consumed,
/// leaving `pos` just after the closing quote.
fn skip_string(data: &[u8], pos: &mut usize) -> Result<()> {
    loop {
        let Some(&b) = data.get(*pos) else {
            return Err(Error::UnclosedString);
        };
        *pos += 1;
        match b {
            b'"' => return Ok(()),
            b'\\' => {
                if data.get(*pos).is_none() {
                    return Err(Error::UnclosedString);
                }
                *pos += 1;
            }
            _ => {}
        }
    }
}
