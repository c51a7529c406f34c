//! Logical paths into a document.

use std::fmt;

/// One step of a [`JsonPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Ordered sequence of object keys and list indices identifying a node.
///
/// Displays as a JSON pointer, e.g. `/fields/3/label`. The root path is `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Returns a new path with `key` appended.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    /// Returns a new path with `index` appended.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key.replace('~', "~0").replace('/', "~1")),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_display() {
        assert_eq!(JsonPath::root().to_string(), "/");
        assert!(JsonPath::root().is_root());
    }

    #[test]
    fn test_pointer_display() {
        let path = JsonPath::root().key("fields").index(3).key("label");
        assert_eq!(path.to_string(), "/fields/3/label");
    }

    #[test]
    fn test_pointer_escapes() {
        let path = JsonPath::root().key("a/b").key("c~d");
        assert_eq!(path.to_string(), "/a~1b/c~0d");
    }

    #[test]
    fn test_key_does_not_mutate_parent() {
        let parent = JsonPath::root().key("fields");
        let child = parent.index(0);
        assert_eq!(parent.segments().len(), 1);
        assert_eq!(child.last(), Some(&Segment::Index(0)));
    }
}
