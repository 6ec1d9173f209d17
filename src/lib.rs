//! sortjson - recursive byte-level sorting of JSON object keys.
//!
//! Sorts the keys of every object in a JSON document by the unsigned-byte
//! order of their raw UTF-8 source bytes, leaving everything else untouched:
//! numbers, strings, whitespace inside arrays and scalars, and escape
//! sequences are copied verbatim. Sorting a sorted document is a no-op.
//!
//! # Architecture
//!
//! - [`sort`] - the two sorting strategies and the factory that picks
//!   between them under a memory budget
//! - [`utf8`] - character boundary lookups used to chunk key comparisons
//! - [`error`] - error types with contractual message text
//!
//! # Choosing a strategy
//!
//! [`SorterFactory`] selects [`FastSorter`] when the source comfortably
//! fits the memory budget and [`LowMemorySorter`] otherwise. Both produce
//! identical output; the low-memory strategy trades speed for a peak
//! memory usage independent of document size.

// Library code must avoid unwrap/expect/panic.
// Tests are checked separately with `cargo test`.
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

pub mod error;
pub mod sort;
pub mod utf8;

// Re-export commonly used types
pub use error::{Error, Result};
pub use sort::{
    DuplicatePolicy, FastSorter, LowMemorySorter, SelectedSorter, Sorter, SorterFactory,
    SAFETY_FACTOR,
};
pub use utf8::{get_char_bounds, Utf8CharLocation};
