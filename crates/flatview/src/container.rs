//! The view tree: tagged map/list containers holding installed accessors.
//!
//! Containers are shared (`Rc<RefCell<_>>`) so a caller holding a
//! [`ContainerRef`] keeps observing the same container across a
//! reset/add cycle that reuses its path.

use crate::range::Accessor;
use crate::{Path, Seg, ViewError, ViewResult};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A slot in a container.
#[derive(Clone, Debug)]
pub(crate) enum Node {
    Container(ContainerRef),
    Field(Accessor),
}

impl Node {
    /// Force the node into a plain value. Absent fields yield `None`.
    pub(crate) fn materialize(&self) -> Option<Value> {
        match self {
            Node::Container(c) => Some(c.snapshot()),
            Node::Field(acc) => acc.read().map(|v| (*v).clone()),
        }
    }
}

#[derive(Debug)]
pub(crate) enum Container {
    Map(BTreeMap<String, Node>),
    /// `None` entries are holes left by removed fields or sparse installs.
    List(Vec<Option<Node>>),
}

/// Shared handle to a container in the view tree.
///
/// Reads through a handle see the engine's current values.
#[derive(Clone, Debug)]
pub struct ContainerRef(Rc<RefCell<Container>>);

impl ContainerRef {
    pub(crate) fn new_map() -> Self {
        Self(Rc::new(RefCell::new(Container::Map(BTreeMap::new()))))
    }

    pub(crate) fn new_list() -> Self {
        Self(Rc::new(RefCell::new(Container::List(Vec::new()))))
    }

    /// A new container suited to hold `next`: a list for an index, else a map.
    pub(crate) fn for_segment(next: &Seg) -> Self {
        if next.is_index() {
            Self::new_list()
        } else {
            Self::new_map()
        }
    }

    /// True when both handles point at the same container.
    #[inline]
    pub fn ptr_eq(&self, other: &ContainerRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_list(&self) -> bool {
        matches!(&*self.0.borrow(), Container::List(_))
    }

    /// Number of slots. For lists this includes holes.
    pub fn len(&self) -> usize {
        match &*self.0.borrow() {
            Container::Map(m) => m.len(),
            Container::List(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Occupied slots, in key order for maps and index order for lists.
    pub fn keys(&self) -> Vec<Seg> {
        match &*self.0.borrow() {
            Container::Map(m) => m.keys().cloned().map(Seg::Key).collect(),
            Container::List(l) => l
                .iter()
                .enumerate()
                .filter(|(_, n)| n.is_some())
                .map(|(i, _)| Seg::Index(i))
                .collect(),
        }
    }

    /// Read the slot at `seg`. Nested containers are returned as snapshots.
    pub fn read(&self, seg: impl Into<Seg>) -> Option<Rc<Value>> {
        match self.child(&seg.into())? {
            Node::Field(acc) => acc.read(),
            Node::Container(c) => Some(Rc::new(c.snapshot())),
        }
    }

    /// The nested container at `seg`, if that slot holds one.
    pub fn get(&self, seg: impl Into<Seg>) -> Option<ContainerRef> {
        match self.child(&seg.into())? {
            Node::Container(c) => Some(c),
            Node::Field(_) => None,
        }
    }

    /// Deep copy of this container into a plain value.
    ///
    /// Map entries whose field is absent are omitted; list holes and absent
    /// list entries become `null`.
    pub fn snapshot(&self) -> Value {
        match &*self.0.borrow() {
            Container::Map(m) => {
                let mut out = Map::new();
                for (k, node) in m {
                    if let Some(v) = node.materialize() {
                        out.insert(k.clone(), v);
                    }
                }
                Value::Object(out)
            }
            Container::List(l) => Value::Array(
                l.iter()
                    .map(|slot| slot.as_ref().and_then(Node::materialize).unwrap_or(Value::Null))
                    .collect(),
            ),
        }
    }

    pub(crate) fn child(&self, seg: &Seg) -> Option<Node> {
        match (&*self.0.borrow(), seg) {
            (Container::Map(m), seg) => m.get(&seg.to_key()).cloned(),
            (Container::List(l), Seg::Index(i)) => l.get(*i).cloned().flatten(),
            (Container::List(_), Seg::Key(_)) => None,
        }
    }

    /// Put `node` at `seg`, growing a list with holes as needed.
    ///
    /// `cursor` is the path of this container, for error context.
    pub(crate) fn set_child(&self, seg: &Seg, node: Node, cursor: &Path) -> ViewResult<()> {
        match (&mut *self.0.borrow_mut(), seg) {
            (Container::Map(m), seg) => {
                m.insert(seg.to_key(), node);
            }
            (Container::List(l), Seg::Index(i)) => {
                if *i >= l.len() {
                    let len = i
                        .checked_add(1)
                        .ok_or_else(|| ViewError::path_resolution(cursor.clone(), seg.clone()))?;
                    l.resize(len, None);
                }
                l[*i] = Some(node);
            }
            (Container::List(_), Seg::Key(_)) => {
                return Err(ViewError::path_resolution(cursor.clone(), seg.clone()));
            }
        }
        Ok(())
    }

    /// Remove the slot at `seg`. List slots become holes; length is unchanged.
    pub(crate) fn remove_child(&self, seg: &Seg) -> Option<Node> {
        match (&mut *self.0.borrow_mut(), seg) {
            (Container::Map(m), seg) => m.remove(&seg.to_key()),
            (Container::List(l), Seg::Index(i)) => l.get_mut(*i).and_then(Option::take),
            (Container::List(_), Seg::Key(_)) => None,
        }
    }
}

/// Walk every segment of `path` but the last, creating missing containers.
///
/// A missing container is a list when the segment after it is an index,
/// otherwise a map. Existing containers are reused. `on_visit` receives the
/// prefix path of every container walked, created or reused. Returns the
/// container that should hold the final segment.
pub(crate) fn ensure_parent(
    root: &ContainerRef,
    path: &Path,
    mut on_visit: impl FnMut(&Path),
) -> ViewResult<ContainerRef> {
    let segs = path.segments();
    let mut cursor = root.clone();
    for depth in 0..segs.len().saturating_sub(1) {
        let seg = &segs[depth];
        let next = match cursor.child(seg) {
            Some(Node::Container(existing)) => {
                tracing::trace!(path = %path.prefix(depth + 1), "reusing container");
                existing
            }
            Some(Node::Field(_)) => {
                return Err(ViewError::path_resolution(path.prefix(depth), seg.clone()));
            }
            None => {
                let created = ContainerRef::for_segment(&segs[depth + 1]);
                tracing::trace!(
                    path = %path.prefix(depth + 1),
                    list = created.is_list(),
                    "creating container"
                );
                cursor.set_child(seg, Node::Container(created.clone()), &path.prefix(depth))?;
                created
            }
        };
        on_visit(&path.prefix(depth + 1));
        cursor = next;
    }
    Ok(cursor)
}

/// Navigate to the container holding the last segment of `path` without
/// creating anything.
///
/// Fails with [`ViewError::PathResolution`] when a walked segment is missing
/// or holds a field instead of a container.
pub(crate) fn resolve_parent(root: &ContainerRef, path: &Path) -> ViewResult<ContainerRef> {
    let segs = path.segments();
    let mut cursor = root.clone();
    for depth in 0..segs.len().saturating_sub(1) {
        match cursor.child(&segs[depth]) {
            Some(Node::Container(c)) => cursor = c,
            _ => return Err(ViewError::path_resolution(path.prefix(depth), segs[depth].clone())),
        }
    }
    Ok(cursor)
}

/// Find the node at `path`, if any.
pub(crate) fn lookup(root: &ContainerRef, path: &Path) -> Option<Node> {
    let last = path.last()?;
    let parent = resolve_parent(root, path).ok()?;
    parent.child(last)
}
