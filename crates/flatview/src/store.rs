//! Backing value sequence and transform cache.
//!
//! Both live in one `Store` shared between the engine and every compiled
//! accessor, so accessors read the current sequence without the engine
//! re-installing anything after `set_values`.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Handle shared by the engine and its accessors.
pub(crate) type SharedStore = Rc<RefCell<Store>>;

/// Identity of a range spec allocation, used as the cache key.
pub(crate) type SpecKey = usize;

#[derive(Debug, Default)]
pub(crate) struct Store {
    values: Vec<Value>,
    cache: HashMap<SpecKey, Rc<Value>>,
}

impl Store {
    pub(crate) fn shared() -> SharedStore {
        Rc::new(RefCell::new(Store::default()))
    }

    pub(crate) fn values(&self) -> &[Value] {
        &self.values
    }

    /// Replace the sequence wholesale. Every cached transform output is dropped.
    pub(crate) fn set_values(&mut self, values: Vec<Value>) {
        self.values = values;
        self.cache.clear();
    }

    /// Element at `index`; negative indices count from the end.
    pub(crate) fn index(&self, index: i64) -> Option<&Value> {
        resolve_index(self.values.len(), index).and_then(|i| self.values.get(i))
    }

    /// Half-open slice with clamping; negative bounds count from the end.
    pub(crate) fn slice(&self, start: i64, end: i64) -> &[Value] {
        let len = self.values.len();
        let start = clamp_bound(len, start);
        let end = clamp_bound(len, end);
        if end <= start {
            &[]
        } else {
            &self.values[start..end]
        }
    }

    pub(crate) fn cached(&self, key: SpecKey) -> Option<Rc<Value>> {
        self.cache.get(&key).cloned()
    }

    pub(crate) fn insert_cached(&mut self, key: SpecKey, value: Rc<Value>) {
        self.cache.insert(key, value);
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub(crate) fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let resolved = if index < 0 {
        len as i64 + index
    } else {
        index
    };
    if resolved < 0 || resolved >= len as i64 {
        None
    } else {
        Some(resolved as usize)
    }
}

fn clamp_bound(len: usize, bound: i64) -> usize {
    if bound < 0 {
        (len as i64 + bound).max(0) as usize
    } else {
        (bound as usize).min(len)
    }
}
