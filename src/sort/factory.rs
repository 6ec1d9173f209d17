//! Strategy selection based on a memory budget.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::sort::fast::FastSorter;
use crate::sort::low_memory::LowMemorySorter;
use crate::sort::{DuplicatePolicy, Sorter};

/// Multiplier applied to the source size when estimating the in-memory
/// strategy's peak usage. Covers the span tree built alongside the data.
pub const SAFETY_FACTOR: u64 = 10;

/// Picks a sorting strategy for a given source under a fixed memory budget.
///
/// Sources small enough that `size * SAFETY_FACTOR` fits the budget get the
/// in-memory strategy. Larger sources get the low-memory strategy with the
/// remaining budget as its key-storage allowance. Byte slices larger than
/// the whole budget are rejected; files of any size are accepted since the
/// low-memory strategy never loads them wholesale.
#[derive(Debug, Clone, Copy)]
pub struct SorterFactory {
    max_memory: u64,
}

impl SorterFactory {
    /// A factory with a memory budget of `max_memory` bytes.
    pub fn new(max_memory: u64) -> Result<Self> {
        if max_memory < 1 {
            return Err(Error::MaxMemoryTooLow);
        }
        Ok(Self { max_memory })
    }

    /// Select a sorter for an in-memory source.
    pub fn sorter_for_bytes<'a>(&self, data: &'a [u8]) -> Result<SelectedSorter<'a>> {
        let size = data.len() as u64;
        if size > self.max_memory {
            return Err(Error::SourceTooLarge {
                size,
                max_memory: self.max_memory,
            });
        }
        if size.saturating_mul(SAFETY_FACTOR) <= self.max_memory {
            tracing::debug!(size, "selected in-memory strategy");
            Ok(SelectedSorter::Fast(FastSorter::new(data)))
        } else {
            let allowance = self.max_memory - size;
            tracing::debug!(size, allowance, "selected low-memory strategy");
            Ok(SelectedSorter::LowMemory(
                LowMemorySorter::from_bytes(data).with_max_key_memory(allowance),
            ))
        }
    }

    /// Select a sorter for a file-backed source.
    pub fn sorter_for_file(&self, path: impl AsRef<Path>) -> Result<SelectedSorter<'static>> {
        let path = path.as_ref();
        let size = fs::metadata(path)?.len();
        if size.saturating_mul(SAFETY_FACTOR) <= self.max_memory {
            tracing::debug!(size, path = %path.display(), "selected in-memory strategy");
            Ok(SelectedSorter::Fast(FastSorter::from_vec(fs::read(path)?)))
        } else {
            tracing::debug!(size, path = %path.display(), "selected low-memory strategy");
            Ok(SelectedSorter::LowMemory(
                LowMemorySorter::from_file(path)?.with_max_key_memory(self.max_memory),
            ))
        }
    }
}

/// The sorter a [`SorterFactory`] chose.
#[derive(Debug)]
pub enum SelectedSorter<'a> {
    /// In-memory strategy.
    Fast(FastSorter<'a>),
    /// Memory-bounded strategy.
    LowMemory(LowMemorySorter<'a>),
}

impl SelectedSorter<'_> {
    /// Set how duplicate keys within one object are handled.
    pub fn with_duplicate_policy(self, policy: DuplicatePolicy) -> Self {
        match self {
            SelectedSorter::Fast(s) => SelectedSorter::Fast(s.with_duplicate_policy(policy)),
            SelectedSorter::LowMemory(s) => {
                SelectedSorter::LowMemory(s.with_duplicate_policy(policy))
            }
        }
    }

    /// Whether the in-memory strategy was chosen.
    pub fn is_fast(&self) -> bool {
        matches!(self, SelectedSorter::Fast(_))
    }

    /// The key-storage allowance of the low-memory strategy, if chosen.
    pub fn key_allowance(&self) -> Option<u64> {
        match self {
            SelectedSorter::Fast(_) => None,
            SelectedSorter::LowMemory(s) => s.max_key_memory(),
        }
    }
}

impl Sorter for SelectedSorter<'_> {
    fn sort_into(&mut self, out: &mut dyn Write) -> Result<()> {
        match self {
            SelectedSorter::Fast(s) => s.sort_into(out),
            SelectedSorter::LowMemory(s) => s.sort_into(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_must_be_positive() {
        assert_eq!(
            SorterFactory::new(0).unwrap_err().to_string(),
            "Max memory must be at least 1"
        );
        assert!(SorterFactory::new(1).is_ok());
    }

    #[test]
    fn small_sources_get_the_fast_strategy() {
        let factory = SorterFactory::new(30).unwrap();
        assert!(factory.sorter_for_bytes(b"[1]").unwrap().is_fast());
    }

    #[test]
    fn larger_sources_get_the_low_memory_strategy() {
        let factory = SorterFactory::new(30).unwrap();
        let sorter = factory.sorter_for_bytes(b"[12]").unwrap();
        assert!(!sorter.is_fast());
        assert_eq!(sorter.key_allowance(), Some(26));
    }

    #[test]
    fn oversized_byte_sources_are_rejected() {
        let factory = SorterFactory::new(19).unwrap();
        let err = factory.sorter_for_bytes(&[b' '; 20]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Byte array size 20 is greater than memory allowed: 19"
        );
    }
}
