//! UTF-8 character boundary utilities.
//!
//! The sorters truncate and compare raw key bytes in bounded chunks; a chunk
//! edge that splits a multi-byte character would corrupt the byte-wise
//! comparison. [`get_char_bounds`] locates the exact byte span of the
//! character covering a given offset so chunk edges can be clamped back to a
//! character boundary. The byte array is assumed to hold valid UTF-8.

use crate::error::{Error, Result};

/// The byte span of one UTF-8-encoded code point within a byte array.
///
/// The character's bytes may extend past the end of the array the location
/// was derived from (a truncated trailing character), in which case
/// [`last`](Utf8CharLocation::last) returns an out-of-bounds index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8CharLocation {
    start: usize,
    length: usize,
}

impl Utf8CharLocation {
    /// Create a location from the index of the character's first byte and its
    /// encoded length in bytes (1 to 4).
    pub fn new(start: isize, length: isize) -> Result<Self> {
        if start < 0 {
            return Err(Error::NegativeCharStart);
        }
        // 5 and 6 byte UTF-8 chars are no longer allowed
        if !(1..=4).contains(&length) {
            return Err(Error::InvalidCharLength);
        }
        Ok(Self {
            start: start as usize,
            length: length as usize,
        })
    }

    /// Index of the first byte of the character.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Length of the character in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Index of the last byte of the character. May be beyond the end of the
    /// array the location was derived from.
    pub fn last(&self) -> usize {
        self.start + self.length - 1
    }
}

/// Get the bounds of the UTF-8 character covering byte offset `location`
/// within `b`.
///
/// Scans backward over continuation bytes (at most three for well-formed
/// input) to the lead byte and derives the encoded length from its bit
/// pattern. Fails with [`Error::LocationOutOfBounds`] when `location` is
/// outside `b`, and with [`Error::CharStartOutOfBounds`] when `b` is a
/// truncated suffix of a larger stream and the character's lead byte was cut
/// off.
pub fn get_char_bounds(b: &[u8], location: isize) -> Result<Utf8CharLocation> {
    if location < 0 || location as usize >= b.len() {
        return Err(Error::LocationOutOfBounds);
    }
    let location = location as usize;

    if b[location] & 0x80 == 0 {
        // high bit clear, a 1 byte char
        return Utf8CharLocation::new(location as isize, 1);
    }
    let mut lead = location;
    while b[lead] & 0xC0 == 0x80 {
        // high bits are 10, a continuation byte
        if lead == 0 {
            return Err(Error::CharStartOutOfBounds(location));
        }
        lead -= 1;
    }

    if b[lead] & 0xE0 == 0xC0 {
        // high bits are 110, a 2 byte char
        return Utf8CharLocation::new(lead as isize, 2);
    }
    if b[lead] & 0xF0 == 0xE0 {
        // high bits are 1110, a 3 byte char
        return Utf8CharLocation::new(lead as isize, 3);
    }
    // no 5+ byte chars
    Utf8CharLocation::new(lead as isize, 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_location_accessors() {
        let loc = Utf8CharLocation::new(5, 3).unwrap();
        assert_eq!(loc.start(), 5);
        assert_eq!(loc.last(), 7);
        assert_eq!(loc.length(), 3);

        let loc = Utf8CharLocation::new(0, 4).unwrap();
        assert_eq!(loc.start(), 0);
        assert_eq!(loc.last(), 3);
        assert_eq!(loc.length(), 4);

        let loc = Utf8CharLocation::new(24, 1).unwrap();
        assert_eq!(loc.start(), 24);
        assert_eq!(loc.last(), 24);
        assert_eq!(loc.length(), 1);
    }

    #[test]
    fn char_location_validation() {
        let err = Utf8CharLocation::new(1, 5).unwrap_err();
        assert_eq!(err.to_string(), "length must be between 1 and 4");
        let err = Utf8CharLocation::new(1, 0).unwrap_err();
        assert_eq!(err.to_string(), "length must be between 1 and 4");
        let err = Utf8CharLocation::new(-1, 0).unwrap_err();
        assert_eq!(err.to_string(), "start must be >= 0");
    }

    /// 8 code points, 23 bytes total in UTF-8.
    fn sample() -> Vec<u8> {
        let mut s = String::new();
        for cp in [
            0x10310u32, 0x4A, 0x103B0, 0x120, 0x1D120, 0x0A90, 0x6A, 0x1D120,
        ] {
            s.push(char::from_u32(cp).unwrap());
        }
        let b = s.into_bytes();
        assert_eq!(b.len(), 23);
        b
    }

    #[test]
    fn char_bounds_in_mixed_width_data() {
        let b = sample();
        let cases = [
            (2, 0, 4),
            (4, 4, 1),
            (5, 5, 4),
            (10, 9, 2),
            (14, 11, 4),
            (16, 15, 3),
            (18, 18, 1),
            (20, 19, 4),
        ];
        for (location, start, length) in cases {
            let loc = get_char_bounds(&b, location).unwrap();
            assert_eq!(loc.start(), start, "start at location {location}");
            assert_eq!(loc.length(), length, "length at location {location}");
        }
    }

    #[test]
    fn char_bounds_in_truncated_data() {
        let b = &sample()[2..21];
        let loc = get_char_bounds(b, 18).unwrap();
        assert_eq!(loc.start(), 17);
        assert_eq!(loc.length(), 4);

        let err = get_char_bounds(b, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The start position of the character at location 1 is prior to the start of the array"
        );
        let err = get_char_bounds(b, -1).unwrap_err();
        assert_eq!(err.to_string(), "location is not within the bounds of b");
        let err = get_char_bounds(b, 19).unwrap_err();
        assert_eq!(err.to_string(), "location is not within the bounds of b");
    }
}
