//! JSON path tracking for error messages.

use std::fmt::Write as _;

/// One step of a JSON path.
#[derive(Debug, Clone)]
pub(crate) enum PathSegment {
    /// An object entry, named once the key has been read.
    Key(String),
    /// An element of an array.
    Index(usize),
    /// An object whose current key is not yet known.
    PendingObject,
}

/// Path from the document root to the position being processed, rendered in
/// error messages as `/`-separated segments with `/` inside keys escaped as
/// `\/`. The root renders as `/`.
#[derive(Debug, Default)]
pub(crate) struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an object; the segment is a placeholder until a key is seen.
    pub fn push_object(&mut self) {
        self.segments.push(PathSegment::PendingObject);
    }

    /// Enter an array at element 0.
    pub fn push_index(&mut self) {
        self.segments.push(PathSegment::Index(0));
    }

    /// Name the innermost segment after the key being processed.
    pub fn set_key(&mut self, key: String) {
        if let Some(last) = self.segments.last_mut() {
            *last = PathSegment::Key(key);
        }
    }

    /// Advance the innermost array index. Returns false when the innermost
    /// segment is not an array element.
    pub fn bump_index(&mut self) -> bool {
        match self.segments.last_mut() {
            Some(PathSegment::Index(i)) => {
                *i += 1;
                true
            }
            _ => false,
        }
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn render(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                PathSegment::Key(key) => out.push_str(&key.replace('/', "\\/")),
                PathSegment::Index(i) => {
                    let _ = write!(out, "{i}");
                }
                PathSegment::PendingObject => out.push('{'),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_renders_as_slash() {
        assert_eq!(JsonPath::new().render(), "/");
    }

    #[test]
    fn keys_and_indices() {
        let mut path = JsonPath::new();
        path.push_object();
        path.set_key("ro/ot".to_string());
        path.push_index();
        assert!(path.bump_index());
        assert!(path.bump_index());
        assert_eq!(path.render(), "/ro\\/ot/2");
    }

    #[test]
    fn pending_object_placeholder() {
        let mut path = JsonPath::new();
        path.push_object();
        assert_eq!(path.render(), "/{");
        path.pop();
        assert!(path.is_empty());
    }

    #[test]
    fn bump_outside_array_is_rejected() {
        let mut path = JsonPath::new();
        assert!(!path.bump_index());
        path.push_object();
        assert!(!path.bump_index());
    }
}
