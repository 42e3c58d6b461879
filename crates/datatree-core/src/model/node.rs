//! Immutable document nodes
//!
//! A [`DataNode`] is the value users hand to `write`/`merge` and get back
//! from `read_node`. Child maps sit behind an `Arc`, so cloning a node is
//! O(1) and an edit copies only the map it changes.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{PathArg, PrettyTree, QName, Value};

/// Shared, copy-on-write child map keyed by path argument
///
/// Insertion order is preserved, which is what user-ordered lists rely on.
/// Equality ignores order; [`DataNode`] adds the order check where it matters.
#[derive(Debug, Clone, Default)]
pub struct Children(Arc<IndexMap<PathArg, DataNode>>);

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, arg: &PathArg) -> Option<&DataNode> {
        self.0.get(arg)
    }

    pub fn contains(&self, arg: &PathArg) -> bool {
        self.0.contains_key(arg)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathArg, &DataNode)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PathArg> {
        self.0.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &DataNode> {
        self.0.values()
    }

    /// Insert or replace a child. A replaced child keeps its position.
    pub fn insert(&mut self, node: DataNode) {
        Arc::make_mut(&mut self.0).insert(node.identifier(), node);
    }

    pub fn remove(&mut self, arg: &PathArg) -> Option<DataNode> {
        if !self.0.contains_key(arg) {
            return None;
        }
        Arc::make_mut(&mut self.0).shift_remove(arg)
    }

    pub fn ptr_eq(&self, other: &Children) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn same_order(&self, other: &Children) -> bool {
        self.0.keys().eq(other.0.keys())
    }
}

impl PartialEq for Children {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl FromIterator<DataNode> for Children {
    fn from_iter<T: IntoIterator<Item = DataNode>>(iter: T) -> Self {
        let mut map = IndexMap::new();
        for node in iter {
            map.insert(node.identifier(), node);
        }
        Self(Arc::new(map))
    }
}

/// Coarse node kind, used for schema matching and messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Leaf,
    LeafSetEntry,
    Container,
    Choice,
    MapEntry,
    Map,
    LeafSet,
    UnkeyedList,
    AnyData,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Leaf => "leaf",
            NodeKind::LeafSetEntry => "leaf-list entry",
            NodeKind::Container => "container",
            NodeKind::Choice => "choice",
            NodeKind::MapEntry => "list entry",
            NodeKind::Map => "list",
            NodeKind::LeafSet => "leaf-list",
            NodeKind::UnkeyedList => "unkeyed list",
            NodeKind::AnyData => "anydata",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum DataNode {
    Leaf {
        name: QName,
        value: Value,
    },
    LeafSetEntry {
        name: QName,
        value: Value,
    },
    Container {
        name: QName,
        children: Children,
    },
    /// Active case children of a choice. Cases themselves never appear in data.
    Choice {
        name: QName,
        children: Children,
    },
    /// Keyed list entry. `id` is always a [`PathArg::Entry`].
    MapEntry {
        id: PathArg,
        children: Children,
    },
    Map {
        name: QName,
        ordered: bool,
        entries: Children,
    },
    LeafSet {
        name: QName,
        ordered: bool,
        entries: Children,
    },
    /// Entries of a list without keys; replaced as a whole
    UnkeyedList {
        name: QName,
        entries: Arc<Vec<Children>>,
    },
    AnyData {
        name: QName,
        payload: Arc<serde_json::Value>,
    },
}

impl DataNode {
    pub fn identifier(&self) -> PathArg {
        match self {
            DataNode::MapEntry { id, .. } => id.clone(),
            DataNode::LeafSetEntry { name, value } => PathArg::Value {
                name: name.clone(),
                value: value.clone(),
            },
            other => PathArg::Node(other.name().clone()),
        }
    }

    pub fn name(&self) -> &QName {
        match self {
            DataNode::Leaf { name, .. }
            | DataNode::LeafSetEntry { name, .. }
            | DataNode::Container { name, .. }
            | DataNode::Choice { name, .. }
            | DataNode::Map { name, .. }
            | DataNode::LeafSet { name, .. }
            | DataNode::UnkeyedList { name, .. }
            | DataNode::AnyData { name, .. } => name,
            DataNode::MapEntry { id, .. } => id.name(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            DataNode::Leaf { .. } => NodeKind::Leaf,
            DataNode::LeafSetEntry { .. } => NodeKind::LeafSetEntry,
            DataNode::Container { .. } => NodeKind::Container,
            DataNode::Choice { .. } => NodeKind::Choice,
            DataNode::MapEntry { .. } => NodeKind::MapEntry,
            DataNode::Map { .. } => NodeKind::Map,
            DataNode::LeafSet { .. } => NodeKind::LeafSet,
            DataNode::UnkeyedList { .. } => NodeKind::UnkeyedList,
            DataNode::AnyData { .. } => NodeKind::AnyData,
        }
    }

    /// Indented one-node-per-line rendering of this subtree
    pub fn pretty_tree(&self) -> PrettyTree<'_> {
        PrettyTree(self)
    }

    /// Scalar payload of leaves and leaf-list entries
    pub fn value(&self) -> Option<&Value> {
        match self {
            DataNode::Leaf { value, .. } | DataNode::LeafSetEntry { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Child map of addressable containers; `None` for value-like nodes
    pub fn children(&self) -> Option<&Children> {
        match self {
            DataNode::Container { children, .. }
            | DataNode::Choice { children, .. }
            | DataNode::MapEntry { children, .. } => Some(children),
            DataNode::Map { entries, .. } | DataNode::LeafSet { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            DataNode::Container { children, .. }
            | DataNode::Choice { children, .. }
            | DataNode::MapEntry { children, .. } => Some(children),
            DataNode::Map { entries, .. } | DataNode::LeafSet { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub fn child(&self, arg: &PathArg) -> Option<&DataNode> {
        self.children().and_then(|c| c.get(arg))
    }

    /// Walk `args` below this node
    pub fn find<'a, I>(&self, args: I) -> Option<&DataNode>
    where
        I: IntoIterator<Item = &'a PathArg>,
    {
        let mut current = self;
        for arg in args {
            current = current.child(arg)?;
        }
        Some(current)
    }

    pub fn is_container_like(&self) -> bool {
        self.children().is_some()
    }

    /// True for container-like nodes with no children and for empty unkeyed lists
    pub fn is_empty_container(&self) -> bool {
        match self {
            DataNode::UnkeyedList { entries, .. } => entries.is_empty(),
            other => other.children().is_some_and(Children::is_empty),
        }
    }

    /// Same kind and identifier, different children
    ///
    /// Value-like nodes are returned unchanged.
    pub fn with_children(&self, children: Children) -> DataNode {
        match self {
            DataNode::Container { name, .. } => DataNode::Container {
                name: name.clone(),
                children,
            },
            DataNode::Choice { name, .. } => DataNode::Choice {
                name: name.clone(),
                children,
            },
            DataNode::MapEntry { id, .. } => DataNode::MapEntry {
                id: id.clone(),
                children,
            },
            DataNode::Map { name, ordered, .. } => DataNode::Map {
                name: name.clone(),
                ordered: *ordered,
                entries: children,
            },
            DataNode::LeafSet { name, ordered, .. } => DataNode::LeafSet {
                name: name.clone(),
                ordered: *ordered,
                entries: children,
            },
            other => other.clone(),
        }
    }

    pub fn empty_like(&self) -> DataNode {
        match self {
            DataNode::UnkeyedList { name, .. } => DataNode::UnkeyedList {
                name: name.clone(),
                entries: Arc::new(Vec::new()),
            },
            other => other.with_children(Children::new()),
        }
    }

    fn is_ordered(&self) -> bool {
        matches!(
            self,
            DataNode::Map { ordered: true, .. } | DataNode::LeafSet { ordered: true, .. }
        )
    }
}

impl PartialEq for DataNode {
    fn eq(&self, other: &Self) -> bool {
        use DataNode as N;
        match (self, other) {
            (N::Leaf { name: a, value: va }, N::Leaf { name: b, value: vb })
            | (N::LeafSetEntry { name: a, value: va }, N::LeafSetEntry { name: b, value: vb }) => {
                a == b && va == vb
            }
            (N::Container { name: a, children: ca }, N::Container { name: b, children: cb })
            | (N::Choice { name: a, children: ca }, N::Choice { name: b, children: cb }) => {
                a == b && ca == cb
            }
            (N::MapEntry { id: a, children: ca }, N::MapEntry { id: b, children: cb }) => {
                a == b && ca == cb
            }
            (
                N::Map {
                    name: a,
                    ordered: oa,
                    entries: ea,
                },
                N::Map {
                    name: b,
                    ordered: ob,
                    entries: eb,
                },
            )
            | (
                N::LeafSet {
                    name: a,
                    ordered: oa,
                    entries: ea,
                },
                N::LeafSet {
                    name: b,
                    ordered: ob,
                    entries: eb,
                },
            ) => {
                a == b
                    && oa == ob
                    && ea == eb
                    && (!self.is_ordered() || ea.ptr_eq(eb) || ea.same_order(eb))
            }
            (N::UnkeyedList { name: a, entries: ea }, N::UnkeyedList { name: b, entries: eb }) => {
                a == b && (Arc::ptr_eq(ea, eb) || ea == eb)
            }
            (N::AnyData { name: a, payload: pa }, N::AnyData { name: b, payload: pb }) => {
                a == b && (Arc::ptr_eq(pa, pb) || pa == pb)
            }
            _ => false,
        }
    }
}

impl Eq for DataNode {}
