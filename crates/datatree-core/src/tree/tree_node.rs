use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::model::{DataNode, PathArg};
use crate::strategy::UniqueIndex;

use super::Version;

/// Immutable data node with version stamps
///
/// Children that have not changed since this node was created are derived
/// from the data on demand and inherit this node's version. Children that
/// were replaced later keep their own stamps in `modified`.
#[derive(Clone)]
pub struct TreeNode(Arc<Inner>);

struct Inner {
    data: DataNode,
    version: Version,
    subtree_version: Version,
    modified: BTreeMap<PathArg, TreeNode>,
    index: Option<Arc<UniqueIndex>>,
}

impl TreeNode {
    /// Wrap `data`; every descendant reports `version`
    pub fn from_data(data: DataNode, version: Version) -> Self {
        TreeNode(Arc::new(Inner {
            data,
            version,
            subtree_version: version,
            modified: BTreeMap::new(),
            index: None,
        }))
    }

    pub fn data(&self) -> &DataNode {
        &self.0.data
    }

    pub fn identifier(&self) -> PathArg {
        self.0.data.identifier()
    }

    /// Version at which this node was created or replaced
    pub fn version(&self) -> Version {
        self.0.version
    }

    /// Most recent version at which anything below this node changed
    pub fn subtree_version(&self) -> Version {
        self.0.subtree_version
    }

    pub fn child(&self, arg: &PathArg) -> Option<TreeNode> {
        if let Some(child) = self.0.modified.get(arg) {
            return Some(child.clone());
        }
        self.0
            .data
            .child(arg)
            .map(|data| TreeNode::from_data(data.clone(), self.0.version))
    }

    pub fn find<'a, I>(&self, args: I) -> Option<TreeNode>
    where
        I: IntoIterator<Item = &'a PathArg>,
    {
        let mut current = self.clone();
        for arg in args {
            current = current.child(arg)?;
        }
        Some(current)
    }

    pub(crate) fn unique_index(&self) -> Option<&Arc<UniqueIndex>> {
        self.0.index.as_ref()
    }

    pub fn ptr_eq(&self, other: &TreeNode) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Start a mutable copy stamped with `version`
    pub(crate) fn mutable(&self, version: Version) -> MutableTreeNode {
        MutableTreeNode {
            data: self.0.data.clone(),
            version: self.0.version,
            subtree_version: version,
            modified: self.0.modified.clone(),
            index: self.0.index.clone(),
        }
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("identifier", &self.identifier())
            .field("version", &self.0.version)
            .field("subtree_version", &self.0.subtree_version)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TreeNode version={} subtree_version={}",
            self.0.version, self.0.subtree_version
        )?;
        write!(f, "{}", self.0.data.pretty_tree())
    }
}

/// Working copy of a [`TreeNode`] used while applying a modification
///
/// Keeps the original node version; only the subtree version moves.
pub(crate) struct MutableTreeNode {
    data: DataNode,
    version: Version,
    subtree_version: Version,
    modified: BTreeMap<PathArg, TreeNode>,
    index: Option<Arc<UniqueIndex>>,
}

impl MutableTreeNode {
    pub(crate) fn data(&self) -> &DataNode {
        &self.data
    }

    pub(crate) fn put_child(&mut self, child: TreeNode) {
        if let Some(children) = self.data.children_mut() {
            children.insert(child.data().clone());
            self.modified.insert(child.identifier(), child);
        }
    }

    pub(crate) fn remove_child(&mut self, arg: &PathArg) {
        if let Some(children) = self.data.children_mut() {
            children.remove(arg);
        }
        self.modified.remove(arg);
    }

    pub(crate) fn set_index(&mut self, index: Option<Arc<UniqueIndex>>) {
        self.index = index;
    }

    pub(crate) fn seal(self) -> TreeNode {
        TreeNode(Arc::new(Inner {
            data: self.data,
            version: self.version,
            subtree_version: self.subtree_version,
            modified: self.modified,
            index: self.index,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builders::{container, leaf};
    use crate::model::QName;

    fn q(name: &str) -> QName {
        QName::new("urn:test", name)
    }

    #[test]
    fn test_derived_children_inherit_version() {
        let data = container(q("top")).child(leaf(q("a"), "1")).build();
        let node = TreeNode::from_data(data, Version::initial());
        let child = node.child(&PathArg::node(q("a"))).unwrap();
        assert_eq!(child.version(), Version::initial());
        assert!(node.child(&PathArg::node(q("b"))).is_none());
    }

    #[test]
    fn test_put_child_keeps_own_version_and_updates_data() {
        let data = container(q("top")).child(leaf(q("a"), "1")).build();
        let base = TreeNode::from_data(data, Version::initial());

        let v1 = crate::tree::VersionCounter::new().next();
        let mut m = base.mutable(v1);
        m.put_child(TreeNode::from_data(leaf(q("b"), "2"), v1));
        let sealed = m.seal();

        assert_eq!(sealed.version(), Version::initial());
        assert_eq!(sealed.subtree_version(), v1);
        assert_eq!(sealed.child(&PathArg::node(q("b"))).unwrap().version(), v1);
        assert_eq!(
            sealed.child(&PathArg::node(q("a"))).unwrap().version(),
            Version::initial()
        );
        assert_eq!(sealed.data().children().map(|c| c.len()), Some(2));
        // base untouched
        assert_eq!(base.data().children().map(|c| c.len()), Some(1));
    }
}
