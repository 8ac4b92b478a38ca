//! Structure declarations: ordered mappings from field path to range spec.
//!
//! The transform-free part of a structure has a JSON form, so a structure
//! can travel alongside the value stream:
//!
//! ```
//! use flatview::Structure;
//! use serde_json::json;
//!
//! let structure = Structure::from_value(&json!({"a": 0, "list": [3, 6]})).unwrap();
//! assert_eq!(structure.len(), 2);
//! assert_eq!(structure.to_value(), json!({"a": 0, "list": [3, 6]}));
//! ```

use crate::{RangeSpec, ViewError, ViewResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::rc::Rc;

/// An ordered mapping from field path to [`RangeSpec`].
///
/// Paths are unique: inserting an existing path replaces its spec in place.
/// Specs are held in `Rc`s; the allocation is the spec's identity for the
/// transform cache, so two fields given the same `Rc` share one cache entry.
#[derive(Clone, Debug, Default)]
pub struct Structure {
    entries: Vec<(String, Rc<RangeSpec>)>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field (builder pattern).
    pub fn field(mut self, path: impl Into<String>, spec: impl Into<RangeSpec>) -> Self {
        self.insert(path, Rc::new(spec.into()));
        self
    }

    /// Add a field backed by an existing spec allocation (builder pattern).
    pub fn shared_field(mut self, path: impl Into<String>, spec: Rc<RangeSpec>) -> Self {
        self.insert(path, spec);
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, path: impl Into<String>, spec: Rc<RangeSpec>) {
        let path = path.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = spec,
            None => self.entries.push((path, spec)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<RangeSpec>)> {
        self.entries.iter().map(|(p, s)| (p.as_str(), s))
    }

    /// Entries in installation order: descending by full path string.
    ///
    /// For paths sharing a prefix this puts `position.x` before `position`.
    pub(crate) fn install_order(&self) -> Vec<(&str, &Rc<RangeSpec>)> {
        let mut ordered: Vec<_> = self.iter().collect();
        ordered.sort_by(|a, b| b.0.cmp(a.0));
        ordered
    }

    /// Decode the JSON form: an object whose values are an integer index or a
    /// `[start, end]` pair.
    pub fn from_value(value: &Value) -> ViewResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| ViewError::invalid_range_spec("", "structure must be an object"))?;
        let mut structure = Structure::new();
        for (path, raw) in obj {
            structure.insert(path.clone(), Rc::new(decode_spec(path, raw)?));
        }
        Ok(structure)
    }

    /// Parse the JSON form from a string.
    pub fn from_json(json: &str) -> ViewResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Encode the JSON form. Fields whose spec carries a transform are skipped.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        for (path, spec) in self.iter() {
            match **spec {
                RangeSpec::Index(i) => {
                    out.insert(path.to_owned(), Value::from(i));
                }
                RangeSpec::Slice(s, e) => {
                    out.insert(path.to_owned(), Value::from(vec![s, e]));
                }
                _ => tracing::debug!(field = path, "skipping transform field in structure encoding"),
            }
        }
        Value::Object(out)
    }
}

fn decode_spec(field: &str, raw: &Value) -> ViewResult<RangeSpec> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .map(RangeSpec::Index)
            .ok_or_else(|| ViewError::invalid_range_spec(field, format!("index {n} is not an integer"))),
        Value::Array(bounds) => match bounds.as_slice() {
            [start, end] => match (start.as_i64(), end.as_i64()) {
                (Some(s), Some(e)) => Ok(RangeSpec::Slice(s, e)),
                _ => Err(ViewError::invalid_range_spec(field, "slice bounds must be integers")),
            },
            _ => Err(ViewError::invalid_range_spec(
                field,
                format!("slice needs 2 bounds, got {}", bounds.len()),
            )),
        },
        other => Err(ViewError::invalid_range_spec(
            field,
            format!("expected integer or [start, end], got {other}"),
        )),
    }
}

impl<K: Into<String>> FromIterator<(K, RangeSpec)> for Structure {
    fn from_iter<I: IntoIterator<Item = (K, RangeSpec)>>(iter: I) -> Self {
        let mut structure = Structure::new();
        for (path, spec) in iter {
            structure.insert(path, Rc::new(spec));
        }
        structure
    }
}

impl Serialize for Structure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Structure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Structure::from_value(&value).map_err(serde::de::Error::custom)
    }
}
