//! Error handling for the sortjson crate.
//!
//! Message text is part of the public contract for configuration, capacity,
//! and UTF-8 boundary errors: downstream consumers match on it. Malformed-JSON
//! variants carry the messages historically produced by the sorters and are
//! not otherwise specified.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the sorters, the factory, and the UTF-8 boundary utility.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The factory was configured with a memory budget below one byte.
    #[error("Max memory must be at least 1")]
    MaxMemoryTooLow,

    /// An in-memory source is larger than the configured memory budget.
    #[error("Byte array size {size} is greater than memory allowed: {max_memory}")]
    SourceTooLarge {
        /// Size of the rejected byte array.
        size: u64,
        /// The factory's memory budget.
        max_memory: u64,
    },

    /// A boundary lookup was requested outside the byte array.
    #[error("location is not within the bounds of b")]
    LocationOutOfBounds,

    /// The lead byte of the character lies before the start of the (truncated)
    /// byte array.
    #[error("The start position of the character at location {0} is prior to the start of the array")]
    CharStartOutOfBounds(usize),

    /// A [`Utf8CharLocation`](crate::utf8::Utf8CharLocation) was constructed
    /// with a length outside 1..=4.
    #[error("length must be between 1 and 4")]
    InvalidCharLength,

    /// A [`Utf8CharLocation`](crate::utf8::Utf8CharLocation) was constructed
    /// with a negative start.
    #[error("start must be >= 0")]
    NegativeCharStart,

    /// Two entries of one object share the same key bytes and the sorter was
    /// configured with [`DuplicatePolicy::Error`](crate::sort::DuplicatePolicy).
    #[error("Duplicated key '{key}' was found at {path}")]
    DuplicateKey {
        /// The duplicated key, as written in the source.
        key: String,
        /// JSON path of the object containing the duplicates.
        path: String,
    },

    /// The source ended while a JSON value was expected.
    #[error("Unexpected end of JSON data")]
    UnexpectedEof,

    /// An object was opened but its closing brace was never found.
    #[error("Mapping close bracket wasn't found")]
    UnclosedObject,

    /// An array was opened but its closing bracket was never found.
    #[error("Array close bracket wasn't found")]
    UnclosedArray,

    /// A string was opened but its closing quote was never found.
    #[error("String close quote wasn't found")]
    UnclosedString,

    /// A byte that cannot start or continue any JSON token at this position.
    #[error("Unexpected character: {0}")]
    UnexpectedCharacter(char),

    /// An object entry was terminated before its key was seen.
    #[error("Value without key in mapping")]
    ValueWithoutKey,

    /// A colon appeared inside an entry value.
    #[error("Unexpected colon sign in the middle of value text")]
    MisplacedColon,

    /// A colon appeared before any key text.
    #[error("Unexpected colon sign before key text")]
    ColonBeforeKey,

    /// A comma appeared in an object with no preceding key-value pair.
    #[error("Comma in mapping without key-value pair before")]
    CommaWithoutEntry,

    /// A comma appeared outside any array or object.
    #[error("Comma found on top level of json data")]
    CommaAtTopLevel,

    /// A comma appeared where only array elements may be separated.
    #[error("Comma between map elements in wrong code block")]
    CommaOutsideArray,

    /// An object was opened where a key was expected.
    #[error("Mapping opened before key text")]
    ObjectBeforeKey,

    /// An array was opened where a key was expected.
    #[error("Array opened before key text")]
    ArrayBeforeKey,

    /// A read or write on the source, sink, or scratch storage failed.
    /// Propagated verbatim, never retried.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
