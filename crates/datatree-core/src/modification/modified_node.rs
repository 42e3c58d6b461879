use std::fmt;

use indexmap::IndexMap;

use crate::errors::{DataTreeError, Result};
use crate::model::{indent, DataNode, InstancePath, Label, PathArg};
use crate::strategy::ApplyStrategy;
use crate::tree::{TreeNode, Version};

use super::LogicalOperation;

/// One node of a transaction's pending-operation tree
///
/// `original` is the node this modification was recorded against: the
/// snapshot node, or a node taken from data written earlier in the same
/// transaction. Children keep recording order, which user-ordered lists rely
/// on when entries are added.
#[derive(Debug, Clone)]
pub(crate) struct ModifiedNode {
    identifier: PathArg,
    original: Option<TreeNode>,
    operation: LogicalOperation,
    value: Option<DataNode>,
    children: IndexMap<PathArg, ModifiedNode>,
    /// Written again after being deleted in this transaction
    reinserted: bool,
}

impl ModifiedNode {
    pub(crate) fn new(identifier: PathArg, original: Option<TreeNode>) -> Self {
        Self {
            identifier,
            original,
            operation: LogicalOperation::None,
            value: None,
            children: IndexMap::new(),
            reinserted: false,
        }
    }

    /// Transient MERGE node used to expand a merged value's children
    pub(crate) fn merge_of(value: DataNode, original: Option<TreeNode>) -> Self {
        Self {
            identifier: value.identifier(),
            original,
            operation: LogicalOperation::Merge,
            value: Some(value),
            children: IndexMap::new(),
            reinserted: false,
        }
    }

    pub(crate) fn identifier(&self) -> &PathArg {
        &self.identifier
    }

    pub(crate) fn original(&self) -> Option<&TreeNode> {
        self.original.as_ref()
    }

    pub(crate) fn operation(&self) -> LogicalOperation {
        self.operation
    }

    pub(crate) fn value(&self) -> Option<&DataNode> {
        self.value.as_ref()
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = &ModifiedNode> {
        self.children.values()
    }

    pub(crate) fn child(&self, arg: &PathArg) -> Option<&ModifiedNode> {
        self.children.get(arg)
    }

    pub(crate) fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Node to record a child operation on, creating it if needed
    ///
    /// A NONE node becomes TOUCH. A child first addressed under a MERGE whose
    /// value contains it starts out as a merge of that value.
    pub(crate) fn modify_child(
        &mut self,
        arg: &PathArg,
        child_strategy: &ApplyStrategy,
        version: Version,
        child_path: &InstancePath,
    ) -> Result<&mut ModifiedNode> {
        if self.operation == LogicalOperation::None {
            self.operation = LogicalOperation::Touch;
        }

        if !self.children.contains_key(arg) {
            let original = self.original_child(arg, version);
            let mut created = ModifiedNode::new(arg.clone(), original);
            if self.operation == LogicalOperation::Merge {
                if let Some(child_value) = self.value.as_ref().and_then(|v| v.child(arg)) {
                    created.merge_into(child_strategy, child_value.clone(), version, child_path)?;
                }
            }
            self.children.insert(arg.clone(), created);
        }

        self.children
            .get_mut(arg)
            .ok_or_else(|| DataTreeError::Internal {
                message: format!("modification child {} vanished", arg),
            })
    }

    fn original_child(&self, arg: &PathArg, version: Version) -> Option<TreeNode> {
        match self.operation {
            LogicalOperation::Delete => None,
            LogicalOperation::None | LogicalOperation::Touch | LogicalOperation::Merge => {
                self.original.as_ref().and_then(|o| o.child(arg))
            }
            LogicalOperation::Write => self
                .value
                .as_ref()
                .and_then(|v| v.child(arg))
                .map(|data| TreeNode::from_data(data.clone(), version)),
        }
    }

    /// One line per node: label and recorded operation
    pub(crate) fn write_pretty(
        &self,
        f: &mut fmt::Formatter<'_>,
        parent: Option<&str>,
        depth: usize,
    ) -> fmt::Result {
        indent(f, depth)?;
        write!(f, "{} {}", Label::new(&self.identifier, parent), self.operation)?;
        let ns = self.identifier.name().namespace();
        for child in self.children.values() {
            f.write_str("\n")?;
            child.write_pretty(f, Some(ns), depth + 1)?;
        }
        Ok(())
    }

    pub(crate) fn is_reinserted(&self) -> bool {
        self.reinserted
    }

    pub(crate) fn write(&mut self, value: DataNode) {
        self.reinserted |= self.operation == LogicalOperation::Delete && self.original.is_some();
        self.operation = LogicalOperation::Write;
        self.value = Some(value);
        self.children.clear();
    }

    pub(crate) fn delete(&mut self) {
        self.operation = match self.operation {
            LogicalOperation::Delete | LogicalOperation::None | LogicalOperation::Merge => {
                LogicalOperation::Delete
            }
            LogicalOperation::Touch | LogicalOperation::Write => {
                if self.original.is_some() {
                    LogicalOperation::Delete
                } else {
                    LogicalOperation::None
                }
            }
        };
        self.value = None;
        self.children.clear();
    }

    /// Fold a MERGE of `value` into whatever this node already records
    pub(crate) fn merge_into(
        &mut self,
        strategy: &ApplyStrategy,
        value: DataNode,
        version: Version,
        path: &InstancePath,
    ) -> Result<()> {
        if !strategy.is_container_like() {
            match self.operation {
                LogicalOperation::Delete | LogicalOperation::Write => self.write(value),
                _ => {
                    self.operation = LogicalOperation::Merge;
                    self.value = Some(value);
                }
            }
            return Ok(());
        }

        match self.operation {
            LogicalOperation::None => {
                strategy.verify_structure(&value, path, false)?;
                self.operation = LogicalOperation::Merge;
                self.value = Some(value);
            }
            LogicalOperation::Touch => {
                self.merge_children(strategy, &value, version, path)?;
                // Children are expanded already; the value only marks the merge.
                self.operation = LogicalOperation::Merge;
                self.value = Some(value.empty_like());
            }
            LogicalOperation::Merge | LogicalOperation::Write => {
                self.merge_children(strategy, &value, version, path)?;
            }
            LogicalOperation::Delete => {
                // A merge after a delete is a write. Earlier child operations
                // are folded into the written value first.
                if self.has_children() {
                    let applied = strategy.apply(self, self.original.as_ref(), version, path)?;
                    if let Some(node) = applied.node {
                        self.children.clear();
                        self.write(node.data().clone());
                        return self.merge_children(strategy, &value, version, path);
                    }
                }
                self.write(value);
            }
        }
        Ok(())
    }

    fn merge_children(
        &mut self,
        strategy: &ApplyStrategy,
        value: &DataNode,
        version: Version,
        path: &InstancePath,
    ) -> Result<()> {
        let Some(children) = value.children() else {
            return Ok(());
        };
        for child in children.values() {
            let arg = child.identifier();
            let child_path = path.clone().node(arg.clone());
            let child_strategy = strategy.child(&arg).ok_or_else(|| {
                DataTreeError::schema(
                    &child_path,
                    format!("Schema for child {} is not present.", arg),
                )
            })?;
            self.modify_child(&arg, child_strategy, version, &child_path)?
                .merge_into(child_strategy, child.clone(), version, &child_path)?;
        }
        Ok(())
    }

    /// Freeze this subtree
    ///
    /// A TOUCH without children becomes NONE. A WRITE with children is
    /// collapsed into a single written value, which loses its empty
    /// structural descendants and then gets a full structure check; a WRITE
    /// that collapses to nothing becomes DELETE.
    pub(crate) fn seal(
        &mut self,
        strategy: &ApplyStrategy,
        version: Version,
        path: &InstancePath,
    ) -> Result<()> {
        match self.operation {
            LogicalOperation::Touch if self.children.is_empty() => {
                self.operation = LogicalOperation::None;
            }
            LogicalOperation::Write => {
                if self.has_children() {
                    let applied = strategy.apply(self, self.original.as_ref(), version, path)?;
                    self.children.clear();
                    self.value = applied.node.map(|n| n.data().clone());
                }
                self.value = self
                    .value
                    .take()
                    .map(|value| strategy.without_empty_descendants(&value));
                match &self.value {
                    Some(value) => strategy.verify_structure(value, path, true)?,
                    None => self.operation = LogicalOperation::Delete,
                }
            }
            _ => {}
        }

        for child in self.children.values_mut() {
            let child_path = path.clone().node(child.identifier.clone());
            let child_strategy = strategy.child(&child.identifier).ok_or_else(|| {
                DataTreeError::schema(
                    &child_path,
                    format!("Child {} is not present in schema tree.", child_path),
                )
            })?;
            child.seal(child_strategy, version, &child_path)?;
        }
        Ok(())
    }

    /// Deepest node along `args` that fixes the data below it
    ///
    /// Stops at the first DELETE, MERGE or WRITE; otherwise returns the
    /// deepest recorded node. The count is how many arguments were consumed.
    pub(crate) fn find_closest<'a>(&'a self, args: &[PathArg]) -> (usize, &'a ModifiedNode) {
        let mut current = self;
        let mut depth = 0;
        for arg in args {
            if matches!(
                current.operation,
                LogicalOperation::Delete | LogicalOperation::Merge | LogicalOperation::Write
            ) {
                break;
            }
            match current.children.get(arg) {
                Some(child) => {
                    current = child;
                    depth += 1;
                }
                None => break,
            }
        }
        (depth, current)
    }
}
