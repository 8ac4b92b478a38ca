//! Field path representation for navigating the view tree.
//!
//! A field path is declared as a separator-delimited string (`"position.x"`,
//! `"samples.3"`). Parsing turns it into a sequence of segments, each either a
//! map key or, when the segment is purely numeric, a list index.

use crate::ViewConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single segment in a field path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Map key: `position` in `position.x`.
    Key(String),
    /// List index: `3` in `samples.3`.
    Index(usize),
}

impl Seg {
    /// Create a key segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg::Key(k.into())
    }

    /// Create an index segment.
    #[inline]
    pub fn index(i: usize) -> Self {
        Seg::Index(i)
    }

    /// Returns true if this is an index segment.
    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Seg::Index(_))
    }

    /// The segment as a map key. Index segments render as their decimal form.
    pub fn to_key(&self) -> String {
        match self {
            Seg::Key(k) => k.clone(),
            Seg::Index(i) => i.to_string(),
        }
    }

    fn parse(raw: &str, config: &ViewConfig) -> Self {
        if config.numeric_segments_as_indices
            && !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
        {
            // Digit runs past the list limit (or past usize) stay keys.
            if let Some(i) = raw.parse::<usize>().ok().filter(|i| *i <= config.max_list_index) {
                return Seg::Index(i);
            }
        }
        Seg::Key(raw.to_owned())
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, "{}", k),
            Seg::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// A parsed field path.
///
/// # Examples
///
/// ```
/// use flatview::{parse_field_path, Seg};
///
/// let path = parse_field_path("samples.2.value");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path[1], Seg::Index(2));
/// assert_eq!(path.to_string(), "samples.2.value");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Parse a field path using the separator and index rules of `config`.
    ///
    /// Empty segments (`"a..b"`, a trailing separator) are skipped.
    pub fn parse(raw: &str, config: &ViewConfig) -> Self {
        raw.split(config.separator)
            .filter(|s| !s.is_empty())
            .map(|s| Seg::parse(s, config))
            .collect()
    }

    /// Append a key segment and return self (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment and return self (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Push a segment onto the path (mutating).
    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the last segment.
    #[inline]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// Get the parent path (path without the last segment).
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The first `len` segments as a new path.
    #[inline]
    pub fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Every proper, non-empty prefix of this path, shortest first.
    ///
    /// `a.b.c` yields `a` and `a.b`.
    pub fn ancestors(&self) -> impl Iterator<Item = Path> + '_ {
        (1..self.0.len()).map(move |n| self.prefix(n))
    }

    /// Check if this path starts with another path.
    #[inline]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }

    /// Render with `separator` between segments.
    ///
    /// `Display` always uses `.`; use this to echo a path back in the
    /// separator it was declared with.
    pub fn display_with(&self, separator: char) -> String {
        let mut out = String::new();
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            out.push_str(&seg.to_key());
        }
        out
    }
}

/// Canonical `.`-separated form, independent of [`ViewConfig::separator`].
/// Error messages use this form.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Seg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Parse a `.`-separated field path with the default rules.
pub fn parse_field_path(raw: &str) -> Path {
    Path::parse(raw, &ViewConfig::default())
}

/// Construct a `Path` from a sequence of segments.
///
/// ```
/// use flatview::path;
///
/// let p = path!("samples", 0, "value");
/// assert_eq!(p.to_string(), "samples.0.value");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}
