//! Range specifications and the accessors compiled from them.
//!
//! A `RangeSpec` says how a field derives its value from the value sequence.
//! [`compile`] turns one into an [`Accessor`], a zero-argument closure bound to
//! the shared store. Specs carrying a transform memoize their output in the
//! store's cache, keyed by the identity of the spec's `Rc` allocation.

use crate::store::{SharedStore, SpecKey};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// User-supplied function applied to an indexed value, a slice, or the
/// previously installed value.
///
/// Absent inputs (an out-of-range index, an empty slot) are passed as `Value::Null`.
#[derive(Clone)]
pub struct Transform(Rc<dyn Fn(&Value) -> Value>);

impl Transform {
    pub fn new(f: impl Fn(&Value) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    #[inline]
    pub fn apply(&self, input: &Value) -> Value {
        (self.0)(input)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transform").field(&"<fn>").finish()
    }
}

/// How a field is projected out of the value sequence.
///
/// ```
/// use flatview::RangeSpec;
/// use serde_json::json;
///
/// let scaled = RangeSpec::index(0).with(|v| json!(v.as_i64().unwrap_or(0) * 100));
/// assert!(scaled.is_cached());
/// assert!(!RangeSpec::slice(3, 6).is_cached());
/// ```
#[derive(Clone, Debug)]
pub enum RangeSpec {
    /// `values[i]`, negative counts from the end.
    Index(i64),
    /// `f(values[i])`.
    IndexWith(i64, Transform),
    /// `values[start..end]` with slice clamping, negative bounds allowed.
    Slice(i64, i64),
    /// `f(values[start..end])`.
    SliceWith(i64, i64, Transform),
    /// `f(previous)`, where `previous` is whatever was installed at the slot
    /// when the spec was installed.
    Derive(Transform),
}

impl RangeSpec {
    #[inline]
    pub fn index(i: i64) -> Self {
        RangeSpec::Index(i)
    }

    #[inline]
    pub fn slice(start: i64, end: i64) -> Self {
        RangeSpec::Slice(start, end)
    }

    pub fn derive(f: impl Fn(&Value) -> Value + 'static) -> Self {
        RangeSpec::Derive(Transform::new(f))
    }

    /// Attach a transform. Replaces any transform already present.
    pub fn with(self, f: impl Fn(&Value) -> Value + 'static) -> Self {
        let t = Transform::new(f);
        match self {
            RangeSpec::Index(i) | RangeSpec::IndexWith(i, _) => RangeSpec::IndexWith(i, t),
            RangeSpec::Slice(s, e) | RangeSpec::SliceWith(s, e, _) => RangeSpec::SliceWith(s, e, t),
            RangeSpec::Derive(_) => RangeSpec::Derive(t),
        }
    }

    /// The transform function, if this spec has one.
    pub fn transform(&self) -> Option<&Transform> {
        match self {
            RangeSpec::IndexWith(_, t) | RangeSpec::SliceWith(_, _, t) | RangeSpec::Derive(t) => {
                Some(t)
            }
            RangeSpec::Index(_) | RangeSpec::Slice(_, _) => None,
        }
    }

    /// Whether reads through this spec go through the transform cache.
    ///
    /// Derived specs recompute on every read.
    pub fn is_cached(&self) -> bool {
        matches!(self, RangeSpec::IndexWith(..) | RangeSpec::SliceWith(..))
    }
}

impl From<i64> for RangeSpec {
    fn from(i: i64) -> Self {
        RangeSpec::Index(i)
    }
}

impl From<(i64, i64)> for RangeSpec {
    fn from((start, end): (i64, i64)) -> Self {
        RangeSpec::Slice(start, end)
    }
}

/// A compiled, lazily evaluated field reader.
///
/// `None` means the field is absent (an out-of-range index).
#[derive(Clone)]
pub(crate) struct Accessor(Rc<dyn Fn() -> Option<Rc<Value>>>);

impl Accessor {
    #[inline]
    pub(crate) fn read(&self) -> Option<Rc<Value>> {
        (self.0)()
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Accessor").field(&"<fn>").finish()
    }
}

#[inline]
fn spec_key(spec: &Rc<RangeSpec>) -> SpecKey {
    Rc::as_ptr(spec) as usize
}

/// Compile `spec` into an accessor over `store`.
///
/// `previous` is the value installed at the target slot before this one; only
/// [`RangeSpec::Derive`] consumes it.
pub(crate) fn compile(spec: Rc<RangeSpec>, store: SharedStore, previous: Option<Value>) -> Accessor {
    match &*spec {
        RangeSpec::Index(i) => {
            let i = *i;
            Accessor(Rc::new(move || {
                store.borrow().index(i).map(|v| Rc::new(v.clone()))
            }))
        }
        RangeSpec::Slice(s, e) => {
            let (s, e) = (*s, *e);
            Accessor(Rc::new(move || {
                Some(Rc::new(Value::Array(store.borrow().slice(s, e).to_vec())))
            }))
        }
        RangeSpec::Derive(f) => {
            let f = f.clone();
            let previous = previous.unwrap_or(Value::Null);
            Accessor(Rc::new(move || Some(Rc::new(f.apply(&previous)))))
        }
        RangeSpec::IndexWith(i, f) => {
            let (i, f) = (*i, f.clone());
            cached(spec.clone(), store, move |store| {
                let input = store.borrow().index(i).cloned().unwrap_or(Value::Null);
                f.apply(&input)
            })
        }
        RangeSpec::SliceWith(s, e, f) => {
            let (s, e, f) = (*s, *e, f.clone());
            cached(spec.clone(), store, move |store| {
                let input = Value::Array(store.borrow().slice(s, e).to_vec());
                f.apply(&input)
            })
        }
    }
}

/// Wrap `compute` in a cache lookup keyed by the spec's identity.
///
/// The accessor holds `spec` so its allocation, and therefore its key, stays
/// valid for as long as the accessor is installed. No store borrow is held
/// while the transform runs.
fn cached(
    spec: Rc<RangeSpec>,
    store: SharedStore,
    compute: impl Fn(&SharedStore) -> Value + 'static,
) -> Accessor {
    Accessor(Rc::new(move || {
        let key = spec_key(&spec);
        let hit = store.borrow().cached(key);
        if let Some(hit) = hit {
            tracing::trace!(key, "transform cache hit");
            return Some(hit);
        }
        let computed = Rc::new(compute(&store));
        store.borrow_mut().insert_cached(key, computed.clone());
        Some(computed)
    }))
}
