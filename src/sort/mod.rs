//! JSON key sorting strategies and strategy selection.
//!
//! Canonicalizes JSON documents supplied as raw UTF-8 bytes by recursively
//! sorting every object's keys into ascending unsigned-byte lexicographic
//! order. Arrays keep their order; scalar tokens are copied byte-for-byte;
//! nothing is re-rendered. Keys are compared on their literal source bytes,
//! escape sequences included, so two spellings of the same decoded key are
//! distinct keys.
//!
//! Two strategies implement the [`Sorter`] contract:
//!
//! - [`FastSorter`] builds an in-memory span tree of the whole document and
//!   renders it back in one pass.
//! - [`LowMemorySorter`] bounds resident key storage, spilling excess key
//!   bytes to a per-instance scratch file and re-reading values from the
//!   source while writing.
//!
//! [`SorterFactory`] picks between them from a configured memory ceiling.

mod factory;
mod fast;
mod low_memory;
mod path;
mod scratch;
mod source;

pub use factory::{SelectedSorter, SorterFactory, SAFETY_FACTOR};
pub use fast::FastSorter;
pub use low_memory::LowMemorySorter;

use std::io::Write;

use crate::error::Result;

/// How duplicate keys within one object are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep every entry; equal keys retain their original relative order
    /// (the sort is stable).
    #[default]
    Preserve,
    /// Keep only the first entry of each run of equal keys.
    Skip,
    /// Fail with [`Error::DuplicateKey`](crate::Error::DuplicateKey).
    Error,
}

/// A sorting strategy over one JSON source.
///
/// The operation is deterministic and idempotent: sorting already-sorted
/// output reproduces it unchanged. The output sink is caller-owned; the
/// sorter flushes what it wrote but never closes the sink. No partial-output
/// guarantee is made once an error occurs mid-write.
pub trait Sorter {
    /// Parse the source and write its canonically key-sorted bytes to `out`.
    fn sort_into(&mut self, out: &mut dyn Write) -> Result<()>;

    /// Sort into a fresh byte vector.
    fn sorted_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.sort_into(&mut out)?;
        Ok(out)
    }
}

/// JSON insignificant whitespace.
pub(crate) fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}
