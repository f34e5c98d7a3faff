//! Field paths for navigating value trees and reporting errors
//!
//! A path renders the way a reader would write it by hand:
//! `address.postalCode`, `items[2].name`.

use crate::{Error, Result};
use std::fmt;

/// One step of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Map key or object field
    Key(String),

    /// Sequence position
    Index(usize),
}

/// Location of a node inside a value tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The empty path, pointing at the root node
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path such as `items[2].name`
    ///
    /// # Errors
    ///
    /// Returns an error for empty keys or malformed index brackets.
    pub fn parse(input: &str) -> Result<Self> {
        let mut path = Self::root();
        if input.is_empty() {
            return Ok(path);
        }

        for part in input.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if key.is_empty() && (path.is_root() || rest.is_empty()) {
                return Err(Error::invalid_path(input, "empty key"));
            }
            if !key.is_empty() {
                path.segments.push(Segment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| Error::invalid_path(input, "unclosed '['"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| Error::invalid_path(input, "index is not a number"))?;
                path.segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(Error::invalid_path(input, "unexpected text after ']'"));
                }
            }
        }

        Ok(path)
    }

    /// Extend the path with a key
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Key(key.into()));
        next
    }

    /// Extend the path with a sequence index
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Index(index));
        next
    }

    /// Path segments from root to leaf
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the path points at the root node
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
