use std::sync::Arc;

use crate::errors::{DataTreeError, Result};
use crate::model::{InstancePath, PathArg, QName};

use super::{CaseSchema, SchemaKind, SchemaNode};

/// Read-only schema a data tree validates against
///
/// The root is a non-presence container named [`QName::root`]. Cloning is
/// O(1); the node graph is shared.
#[derive(Debug, Clone)]
pub struct SchemaContext {
    root: Arc<SchemaNode>,
}

impl SchemaContext {
    pub fn new<I: IntoIterator<Item = SchemaNode>>(nodes: I) -> Self {
        let root = nodes
            .into_iter()
            .fold(SchemaNode::container(QName::root()), SchemaNode::child);
        Self {
            root: Arc::new(root),
        }
    }

    pub fn builder() -> SchemaContextBuilder {
        SchemaContextBuilder::default()
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Schema node addressed by a data path
    ///
    /// Entry and value arguments repeat the name of the list they sit under,
    /// so they do not move the lookup.
    pub fn find(&self, path: &InstancePath) -> Option<&SchemaNode> {
        let mut current: &SchemaNode = &self.root;
        let mut previous: Option<&PathArg> = None;
        for arg in path {
            let repeats_list = matches!(arg, PathArg::Entry { .. } | PathArg::Value { .. })
                && previous.is_some_and(|p| p.name() == arg.name());
            if !repeats_list {
                current = current.data_child(arg.name())?;
            }
            previous = Some(arg);
        }
        Some(current)
    }

    pub fn ptr_eq(&self, other: &SchemaContext) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }
}

/// Collects top-level nodes and augmentations, then resolves them
#[derive(Debug, Default)]
pub struct SchemaContextBuilder {
    nodes: Vec<SchemaNode>,
    augments: Vec<(Vec<QName>, QName, Vec<SchemaNode>)>,
}

impl SchemaContextBuilder {
    pub fn node(mut self, node: SchemaNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Graft `nodes` under the schema node at `target`
    ///
    /// `target` is a schema path: choices and cases are both named, so an
    /// augmentation can add children to a single case.
    pub fn augment<T, N>(mut self, target: T, augmentation: QName, nodes: N) -> Self
    where
        T: IntoIterator<Item = QName>,
        N: IntoIterator<Item = SchemaNode>,
    {
        self.augments.push((
            target.into_iter().collect(),
            augmentation,
            nodes.into_iter().collect(),
        ));
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidInput` when an augmentation target does not exist or
    /// cannot hold children.
    pub fn build(self) -> Result<SchemaContext> {
        let mut children = self.nodes;
        for (target, augmentation, nodes) in self.augments {
            let slot = children_at(&mut children, &target).ok_or_else(|| {
                DataTreeError::InvalidInput {
                    message: format!(
                        "Augmentation {} target /{} not found",
                        augmentation,
                        target
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("/")
                    ),
                }
            })?;
            slot.extend(nodes.into_iter().map(|n| n.mark_augmented(&augmentation)));
        }
        Ok(SchemaContext::new(children))
    }
}

fn children_at<'a>(
    children: &'a mut Vec<SchemaNode>,
    path: &[QName],
) -> Option<&'a mut Vec<SchemaNode>> {
    let Some((first, rest)) = path.split_first() else {
        return Some(children);
    };
    let node = children.iter_mut().find(|n| n.name() == first)?;
    if matches!(node.kind(), SchemaKind::Choice { .. }) {
        let (case_name, rest) = rest.split_first()?;
        let case: &mut CaseSchema = node
            .cases_mut()?
            .iter_mut()
            .find(|c| &c.name == case_name)?;
        return children_at(&mut case.children, rest);
    }
    children_at(node.children_mut()?, rest)
}
