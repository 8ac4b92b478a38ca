//! The structure-to-view engine.

use crate::container::{ensure_parent, lookup, resolve_parent, ContainerRef, Node};
use crate::range::{compile, Accessor};
use crate::store::{SharedStore, Store};
use crate::{Path, RangeSpec, Structure, ViewConfig, ViewError, ViewResult};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// A live field: the spec it was declared with and the accessor compiled from it.
#[derive(Clone, Debug)]
struct FieldEntry {
    spec: Rc<RangeSpec>,
    accessor: Accessor,
}

/// Projects a flat value sequence into a nested, keyed view.
///
/// Structure (field paths and their range specs) is declared rarely; values
/// are replaced often. Replacing values never touches the installed
/// structure, and every field is computed lazily on read.
///
/// # Examples
///
/// ```
/// use flatview::{FlatView, RangeSpec, Structure};
/// use serde_json::json;
///
/// let mut view = FlatView::new();
/// view.set_values([11, 12, 13, 14, 15, 16]);
/// view.set_structure(
///     &Structure::new()
///         .field("position.x", RangeSpec::index(0))
///         .field("position.y", RangeSpec::index(1))
///         .field("tail", RangeSpec::slice(-2, 6)),
/// )
/// .unwrap();
///
/// assert_eq!(*view.get("position.y").unwrap(), json!(12));
/// assert_eq!(
///     view.export(),
///     json!({"position": {"x": 11, "y": 12}, "tail": [15, 16]})
/// );
///
/// view.set_values([21, 22, 23, 24, 25, 26]);
/// assert_eq!(*view.get("position.x").unwrap(), json!(21));
/// ```
pub struct FlatView {
    config: ViewConfig,
    store: SharedStore,
    root: ContainerRef,
    registry: BTreeMap<Path, FieldEntry>,
    unused: BTreeSet<Path>,
}

impl FlatView {
    pub fn new() -> Self {
        Self::with_config(ViewConfig::default())
    }

    pub fn with_config(config: ViewConfig) -> Self {
        Self {
            config,
            store: Store::shared(),
            root: ContainerRef::new_map(),
            registry: BTreeMap::new(),
            unused: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    // ===== Value Store =====

    /// Replace the value sequence wholesale and drop every cached transform
    /// output. Installed fields read the new values on next access.
    pub fn set_values<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        tracing::trace!(len = values.len(), "set_values");
        self.store.borrow_mut().set_values(values);
    }

    /// The current value sequence.
    pub fn values(&self) -> Vec<Value> {
        self.store.borrow().values().to_vec()
    }

    // ===== Structure lifecycle =====

    /// Install every field of `structure` on top of the current structure.
    ///
    /// Fields are installed in descending order of their full path string.
    /// Containers already present along a path are reused, and a reused path
    /// that was orphaned by [`reset_structure`](Self::reset_structure) is
    /// reclaimed. Re-declaring a live path replaces its accessor.
    pub fn add_structure(&mut self, structure: &Structure) -> ViewResult<()> {
        tracing::debug!(fields = structure.len(), "add_structure");
        for (raw, spec) in structure.install_order() {
            let path = Path::parse(raw, &self.config);
            if path.is_empty() {
                return Err(ViewError::invalid_field_path(raw));
            }
            self.install(path, spec.clone())?;
        }
        self.store.borrow_mut().clear_cache();
        Ok(())
    }

    fn install(&mut self, path: Path, spec: Rc<RangeSpec>) -> ViewResult<()> {
        let unused = &mut self.unused;
        let parent = ensure_parent(&self.root, &path, |prefix| {
            if unused.remove(prefix) {
                tracing::trace!(path = %prefix, "reclaimed unused container");
            }
        })?;
        let Some(leaf) = path.last() else {
            return Err(ViewError::invalid_field_path(path.to_string()));
        };

        // Only derived specs look at what was there before.
        let previous = match *spec {
            RangeSpec::Derive(_) => parent.child(leaf).and_then(|node| node.materialize()),
            _ => None,
        };
        let replaces_container = matches!(parent.child(leaf), Some(Node::Container(_)));
        let accessor = compile(spec.clone(), self.store.clone(), previous);
        let parent_path = path.parent().unwrap_or_default();
        parent.set_child(leaf, Node::Field(accessor.clone()), &parent_path)?;

        if replaces_container {
            // Everything below the replaced container is unreachable now.
            let below = |p: &Path| p.len() > path.len() && p.starts_with(&path);
            self.registry.retain(|p, _| !below(p));
            self.unused.retain(|p| !below(p));
            tracing::trace!(path = %path, "field replaced container");
        }

        tracing::trace!(path = %path, cached = spec.is_cached(), "installed field");
        self.registry.insert(path, FieldEntry { spec, accessor });
        Ok(())
    }

    /// Remove every live field.
    ///
    /// Only leaves are deleted. The containers above a nested field stay in
    /// place, marked unused, so a following [`add_structure`](Self::add_structure)
    /// that reuses their paths keeps the same containers.
    pub fn reset_structure(&mut self) -> ViewResult<()> {
        tracing::debug!(fields = self.registry.len(), "reset_structure");
        let registry = std::mem::take(&mut self.registry);
        self.store.borrow_mut().clear_cache();
        // Deeper paths first, so a field that replaced a container is
        // removed after the fields that used to live inside it.
        for path in registry.keys().rev() {
            if let (Some(parent), Some(leaf)) = (self.live_parent(path)?, path.last()) {
                parent.remove_child(leaf);
            }
            self.unused.extend(path.ancestors());
        }
        Ok(())
    }

    /// Replace the structure: reset, add `structure`, then drop every
    /// container the new structure did not reclaim.
    pub fn set_structure(&mut self, structure: &Structure) -> ViewResult<()> {
        self.reset_structure()?;
        self.add_structure(structure)?;
        self.remove_unused_structure()
    }

    /// Permanently delete every container still marked unused.
    ///
    /// A path whose slot now holds a field is left alone, as is one whose
    /// parent has since been replaced by a field.
    pub fn remove_unused_structure(&mut self) -> ViewResult<()> {
        let unused = std::mem::take(&mut self.unused);
        tracing::debug!(containers = unused.len(), "remove_unused_structure");
        // Reverse order visits descendants before their ancestors.
        for path in unused.iter().rev() {
            let (Some(parent), Some(leaf)) = (self.live_parent(path)?, path.last()) else {
                continue;
            };
            if let Some(Node::Container(_)) = parent.child(leaf) {
                parent.remove_child(leaf);
                tracing::trace!(path = %path, "removed unused container");
            }
        }
        Ok(())
    }

    /// The container holding the last segment of `path`.
    ///
    /// `None` when a segment on the way now holds a field, which leaves
    /// everything below it unreachable. A missing segment is an error.
    fn live_parent(&self, path: &Path) -> ViewResult<Option<ContainerRef>> {
        match resolve_parent(&self.root, path) {
            Ok(parent) => Ok(Some(parent)),
            Err(ViewError::PathResolution { cursor, segment }) => {
                let mut blocker = cursor.clone();
                blocker.push(segment.clone());
                match lookup(&self.root, &blocker) {
                    Some(Node::Field(_)) => Ok(None),
                    _ => Err(ViewError::path_resolution(cursor, segment)),
                }
            }
            Err(other) => Err(other),
        }
    }

    // ===== Reads =====

    /// Read the field or container at `path`.
    ///
    /// Declared fields are found directly in the accessor table; anything
    /// else is found by walking the container tree, and a container is
    /// returned as a snapshot. `None` means nothing is there or the field's
    /// index is out of range.
    pub fn get(&self, path: &str) -> Option<Rc<Value>> {
        let path = Path::parse(path, &self.config);
        if let Some(entry) = self.registry.get(&path) {
            return entry.accessor.read();
        }
        match lookup(&self.root, &path)? {
            Node::Field(acc) => acc.read(),
            Node::Container(c) => Some(Rc::new(c.snapshot())),
        }
    }

    /// The container at `path`. An empty path yields the root.
    pub fn container(&self, path: &str) -> Option<ContainerRef> {
        let path = Path::parse(path, &self.config);
        if path.is_empty() {
            return Some(self.root.clone());
        }
        match lookup(&self.root, &path)? {
            Node::Container(c) => Some(c),
            Node::Field(_) => None,
        }
    }

    /// The root container of the view.
    pub fn root(&self) -> ContainerRef {
        self.root.clone()
    }

    /// The spec a live field was declared with.
    pub fn spec(&self, path: &str) -> Option<Rc<RangeSpec>> {
        let path = Path::parse(path, &self.config);
        self.registry.get(&path).map(|entry| entry.spec.clone())
    }

    /// Live field paths, sorted.
    pub fn fields(&self) -> Vec<Path> {
        self.registry.keys().cloned().collect()
    }

    pub fn contains_field(&self, path: &str) -> bool {
        self.registry.contains_key(&Path::parse(path, &self.config))
    }

    /// Container paths orphaned by a reset and not yet reclaimed or removed.
    pub fn unused_paths(&self) -> Vec<Path> {
        self.unused.iter().cloned().collect()
    }

    /// Number of memoized transform outputs.
    pub fn cached_len(&self) -> usize {
        self.store.borrow().cache_len()
    }

    // ===== Export =====

    /// A fully materialized plain copy of the view.
    ///
    /// Forces every field, so the cost is proportional to the whole
    /// structure. Read fields directly with [`get`](Self::get) on hot paths.
    pub fn export(&self) -> Value {
        self.root.snapshot()
    }
}

impl Default for FlatView {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FlatView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatView")
            .field("values", &self.store.borrow().values().len())
            .field("fields", &self.registry.len())
            .field("unused", &self.unused.len())
            .finish()
    }
}

impl Serialize for FlatView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.export().serialize(serializer)
    }
}
