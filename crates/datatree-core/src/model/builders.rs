//! Convenience constructors for document nodes

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Children, DataNode, PathArg, QName, Value};

pub fn leaf(name: QName, value: impl Into<Value>) -> DataNode {
    DataNode::Leaf {
        name,
        value: value.into(),
    }
}

pub fn leaf_set_entry(name: QName, value: impl Into<Value>) -> DataNode {
    DataNode::LeafSetEntry {
        name,
        value: value.into(),
    }
}

pub fn anydata(name: QName, payload: serde_json::Value) -> DataNode {
    DataNode::AnyData {
        name,
        payload: Arc::new(payload),
    }
}

/// Unkeyed list; each entry is the child set of one anonymous element
pub fn unkeyed_list(name: QName, entries: Vec<Children>) -> DataNode {
    DataNode::UnkeyedList {
        name,
        entries: Arc::new(entries),
    }
}

/// Path argument of a single-key list entry
pub fn entry_key(list: QName, key: QName, value: impl Into<Value>) -> PathArg {
    PathArg::single_key(list, key, value)
}

/// Single-key list entry containing only its key leaf
pub fn map_entry(list: QName, key: QName, value: impl Into<Value>) -> DataNode {
    MapEntryBuilder::new(list).key(key, value).build()
}

pub fn container(name: QName) -> ContainerBuilder {
    ContainerBuilder::new(name)
}

#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    name: QName,
    children: Children,
}

impl ContainerBuilder {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            children: Children::new(),
        }
    }

    pub fn child(mut self, node: DataNode) -> Self {
        self.children.insert(node);
        self
    }

    pub fn children<I: IntoIterator<Item = DataNode>>(mut self, nodes: I) -> Self {
        for node in nodes {
            self.children.insert(node);
        }
        self
    }

    pub fn build(self) -> DataNode {
        DataNode::Container {
            name: self.name,
            children: self.children,
        }
    }
}

/// Builds a keyed list entry
///
/// Every `key` call also adds the key leaf as a child, so the entry is
/// self-describing the way stored entries are.
#[derive(Debug, Clone)]
pub struct MapEntryBuilder {
    name: QName,
    keys: BTreeMap<QName, Value>,
    children: Children,
}

impl MapEntryBuilder {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            keys: BTreeMap::new(),
            children: Children::new(),
        }
    }

    pub fn key(mut self, key: QName, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.children.insert(leaf(key.clone(), value.clone()));
        self.keys.insert(key, value);
        self
    }

    pub fn child(mut self, node: DataNode) -> Self {
        self.children.insert(node);
        self
    }

    pub fn build(self) -> DataNode {
        DataNode::MapEntry {
            id: PathArg::Entry {
                name: self.name,
                keys: self.keys,
            },
            children: self.children,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapBuilder {
    name: QName,
    ordered: bool,
    entries: Children,
}

impl MapBuilder {
    /// System-ordered list
    pub fn system(name: QName) -> Self {
        Self {
            name,
            ordered: false,
            entries: Children::new(),
        }
    }

    /// `ordered-by user` list
    pub fn user(name: QName) -> Self {
        Self {
            ordered: true,
            ..Self::system(name)
        }
    }

    pub fn entry(mut self, entry: DataNode) -> Self {
        self.entries.insert(entry);
        self
    }

    pub fn build(self) -> DataNode {
        DataNode::Map {
            name: self.name,
            ordered: self.ordered,
            entries: self.entries,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeafSetBuilder {
    name: QName,
    ordered: bool,
    entries: Children,
}

impl LeafSetBuilder {
    pub fn system(name: QName) -> Self {
        Self {
            name,
            ordered: false,
            entries: Children::new(),
        }
    }

    pub fn user(name: QName) -> Self {
        Self {
            ordered: true,
            ..Self::system(name)
        }
    }

    /// Add an entry; a repeated value replaces the earlier one in place
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.entries.insert(leaf_set_entry(self.name.clone(), value));
        self
    }

    pub fn build(self) -> DataNode {
        DataNode::LeafSet {
            name: self.name,
            ordered: self.ordered,
            entries: self.entries,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChoiceBuilder {
    name: QName,
    children: Children,
}

impl ChoiceBuilder {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            children: Children::new(),
        }
    }

    pub fn child(mut self, node: DataNode) -> Self {
        self.children.insert(node);
        self
    }

    pub fn build(self) -> DataNode {
        DataNode::Choice {
            name: self.name,
            children: self.children,
        }
    }
}
