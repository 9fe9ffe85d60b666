//! RFC 6901 JSON Pointers addressing values inside a [`Node`](crate::Node).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PointerError;

/// A single reference token of a pointer.
///
/// Tokens that look like array indices parse as [`Segment::Index`]; when such a
/// token is resolved against an object it is used as a key. Equality, ordering
/// and hashing all go through the textual token so `Key("0")` and `Index(0)`
/// are the same segment.
///
/// ```
/// # use jsm_core::Segment;
/// assert_eq!(Segment::key("0"), Segment::index(0));
/// assert_eq!(Segment::key("a/b").escaped(), "a~1b");
/// ```
#[derive(Clone, Debug)]
pub enum Segment {
    /// Object member name.
    Key(String),
    /// Array position.
    Index(usize),
}

impl Segment {
    /// Creates a key segment.
    #[must_use]
    pub fn key<S>(value: S) -> Self
    where
        S: Into<String>,
    {
        Self::Key(value.into())
    }

    /// Creates an index segment.
    #[must_use]
    pub fn index(value: usize) -> Self {
        Self::Index(value)
    }

    /// The unescaped token text.
    #[must_use]
    pub fn token(&self) -> String {
        match self {
            Self::Key(key) => key.clone(),
            Self::Index(index) => index.to_string(),
        }
    }

    /// Reads the segment as an array index, if it is one.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(key) => parse_index(key),
        }
    }

    /// The token escaped for inclusion in pointer text.
    #[must_use]
    pub fn escaped(&self) -> String {
        let token = self.token();
        if !token.contains('~') && !token.contains('/') {
            return token;
        }
        token.replace('~', "~0").replace('/', "~1")
    }

    fn parse_token(raw: &str) -> Result<Self, PointerError> {
        let mut chars = raw.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '~' && !matches!(chars.peek(), Some('0' | '1')) {
                return Err(PointerError::InvalidEscape(raw.to_string()));
            }
        }
        let token = raw.replace("~1", "/").replace("~0", "~");
        Ok(match parse_index(&token) {
            Some(index) => Self::Index(index),
            None => Self::Key(token),
        })
    }
}

fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_index(), other.as_index()) {
            (Some(a), Some(b)) => a == b,
            _ => self.token() == other.token(),
        }
    }
}

impl Eq for Segment {}

impl Hash for Segment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token().hash(state);
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_index(), other.as_index()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.token().cmp(&other.token()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.escaped())
    }
}

/// A JSON Pointer, e.g. `/user/settings/theme`.
///
/// ```
/// # use jsm_core::{Pointer, Segment};
/// let pointer: Pointer = "/items/0/name".parse()?;
/// assert_eq!(pointer.len(), 3);
/// assert_eq!(pointer.parent().unwrap().to_string(), "/items/0");
/// assert_eq!(Pointer::root().child(Segment::key("a")).to_string(), "/a");
/// # Ok::<(), jsm_core::PointerError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer(Vec<Segment>);

impl Pointer {
    /// The pointer addressing the whole document.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new pointer extended by one segment.
    #[must_use]
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Convenience for `child(Segment::key(..))`.
    #[must_use]
    pub fn key<S: Into<String>>(&self, key: S) -> Self {
        self.child(Segment::key(key))
    }

    /// Convenience for `child(Segment::index(..))`.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(Segment::index(index))
    }

    /// Returns the underlying segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether this is the root pointer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the final segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Returns the pointer without its final segment, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Whether `prefix` equals this pointer or is one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// The segments remaining after `prefix`, when `prefix` is an ancestor.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Self) -> Option<&[Segment]> {
        if self.starts_with(prefix) {
            Some(&self.0[prefix.0.len()..])
        } else {
            None
        }
    }

    /// Appends the given segments, returning the extended pointer.
    #[must_use]
    pub fn join(&self, rest: &[Segment]) -> Self {
        let mut segments = self.0.clone();
        segments.extend(rest.iter().cloned());
        Self(segments)
    }

    /// Pushes a new segment in-place.
    pub fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    /// Pops the last segment off the pointer.
    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }
}

impl From<Vec<Segment>> for Pointer {
    fn from(value: Vec<Segment>) -> Self {
        Self(value)
    }
}

impl From<&[Segment]> for Pointer {
    fn from(value: &[Segment]) -> Self {
        Self(value.to_vec())
    }
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(PointerError::MissingLeadingSlash(s.to_string()));
        };
        rest.split('/').map(Segment::parse_token).collect::<Result<Vec<_>, _>>().map(Self)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for Pointer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a Pointer {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
