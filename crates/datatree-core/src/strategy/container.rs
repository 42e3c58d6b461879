//! Containers, list entries and the shared apply logic for container-like nodes

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::candidate::CandidateNode;
use crate::errors::{DataTreeError, Result};
use crate::model::{DataNode, InstancePath, PathArg, QName};
use crate::modification::{LogicalOperation, ModificationType, ModifiedNode};
use crate::tree::{MutableTreeNode, TreeNode, Version};

use super::{Applied, ApplyStrategy, MandatoryEnforcer, StrategyKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContainerFlavor {
    /// Tree root; never removed
    Root,
    /// List entry used as the tree root
    RootEntry { keys: Vec<QName> },
    Presence,
    Structural,
    MapEntry { keys: Vec<QName> },
}

impl ContainerFlavor {
    pub(crate) fn is_structural(&self) -> bool {
        matches!(self, ContainerFlavor::Structural)
    }

    pub(crate) fn is_entry(&self) -> bool {
        matches!(
            self,
            ContainerFlavor::MapEntry { .. } | ContainerFlavor::RootEntry { .. }
        )
    }

    fn keys(&self) -> Option<&[QName]> {
        match self {
            ContainerFlavor::MapEntry { keys } | ContainerFlavor::RootEntry { keys } => Some(keys),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ContainerStrategy {
    flavor: ContainerFlavor,
    children: BTreeMap<QName, ApplyStrategy>,
    mandatory: MandatoryEnforcer,
}

impl ContainerStrategy {
    pub(crate) fn new(
        flavor: ContainerFlavor,
        children: BTreeMap<QName, ApplyStrategy>,
        mandatory: MandatoryEnforcer,
    ) -> Self {
        Self {
            flavor,
            children,
            mandatory,
        }
    }

    pub(crate) fn flavor(&self) -> &ContainerFlavor {
        &self.flavor
    }

    pub(crate) fn child(&self, name: &QName) -> Option<&ApplyStrategy> {
        self.children.get(name)
    }

    pub(crate) fn mandatory(&self) -> &MandatoryEnforcer {
        &self.mandatory
    }

    /// List entries must carry exactly the schema keys, and key leaves that
    /// are present must agree with the identifier
    pub(crate) fn verify_identifier(&self, data: &DataNode, path: &InstancePath) -> Result<()> {
        let (Some(keys), DataNode::MapEntry { id, children }) = (self.flavor.keys(), data) else {
            return Ok(());
        };
        let predicates = id.keys().into_iter().flatten();
        let mismatch = predicates.clone().count() != keys.len()
            || predicates.clone().any(|(k, _)| !keys.contains(k));
        if mismatch {
            let expected: Vec<String> = keys.iter().map(ToString::to_string).collect();
            return Err(DataTreeError::schema(
                path,
                format!(
                    "Entry {} does not match list keys [{}]",
                    id,
                    expected.join(", ")
                ),
            ));
        }
        for (key, value) in predicates {
            if let Some(leaf) = children.get(&PathArg::node(key.clone())) {
                if leaf.value() != Some(value) {
                    return Err(DataTreeError::schema(
                        path,
                        format!(
                            "Entry {} has key leaf {} with value {}",
                            id,
                            key,
                            leaf.value().map_or_else(String::new, ToString::to_string)
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Conflict and existence checks for container-like nodes
pub(super) fn check_applicable(
    strategy: &ApplyStrategy,
    modification: &ModifiedNode,
    current: Option<&TreeNode>,
    path: &InstancePath,
) -> Result<()> {
    match modification.operation() {
        LogicalOperation::None => Ok(()),
        LogicalOperation::Delete => {
            if !modification.has_children() {
                return Ok(());
            }
            if !strategy.is_structural() {
                return Err(does_not_exist(path));
            }
            check_children(strategy, modification, None, path)?;
            check_count(strategy, modification, None, path)
        }
        LogicalOperation::Write => {
            check_conflicting_write(modification.original(), current, path)
        }
        LogicalOperation::Merge => {
            if current.is_some() {
                check_children(strategy, modification, current, path)?;
            }
            check_count(strategy, modification, current, path)
        }
        LogicalOperation::Touch => {
            if current.is_none() && !strategy.is_structural() {
                return Err(match modification.original() {
                    None => does_not_exist(path),
                    Some(_) => DataTreeError::conflict(path, "Node was deleted by other transaction."),
                });
            }
            check_children(strategy, modification, current, path)?;
            check_count(strategy, modification, current, path)
        }
    }
}

/// Version checks for a node replaced as a whole
pub(super) fn check_conflicting_write(
    original: Option<&TreeNode>,
    current: Option<&TreeNode>,
    path: &InstancePath,
) -> Result<()> {
    match (original, current) {
        (Some(original), Some(current)) => {
            if original.version() != current.version() {
                return Err(DataTreeError::conflict(
                    path,
                    "Node was replaced by other transaction.",
                ));
            }
            if original.subtree_version() != current.subtree_version() {
                return Err(DataTreeError::conflict(
                    path,
                    "Node children was modified by other transaction",
                ));
            }
            Ok(())
        }
        (Some(_), None) => Err(DataTreeError::conflict(
            path,
            "Node was deleted by other transaction.",
        )),
        (None, Some(_)) => Err(DataTreeError::conflict(
            path,
            "Node was created by other transaction.",
        )),
        (None, None) => Ok(()),
    }
}

fn check_children(
    strategy: &ApplyStrategy,
    modification: &ModifiedNode,
    current: Option<&TreeNode>,
    path: &InstancePath,
) -> Result<()> {
    for child in modification.children() {
        let arg = child.identifier();
        let child_path = path.clone().node(arg.clone());
        let child_strategy = strategy_for(strategy, arg, &child_path)?;
        let current_child = current.and_then(|c| c.child(arg));
        child_strategy.check_applicable(child, current_child.as_ref(), &child_path)?;
    }
    Ok(())
}

/// Element count bounds of a list as it would look after this modification
fn check_count(
    strategy: &ApplyStrategy,
    modification: &ModifiedNode,
    current: Option<&TreeNode>,
    path: &InstancePath,
) -> Result<()> {
    let bounds = match strategy.kind() {
        StrategyKind::Map(m) => m.bounds(),
        StrategyKind::LeafSet(l) => l.bounds(),
        _ => return Ok(()),
    };
    if !bounds.is_bounded() {
        return Ok(());
    }

    // A delete followed by child operations starts from an empty list.
    let current = match modification.operation() {
        LogicalOperation::Delete => None,
        _ => current,
    };
    let current_data = current.map(TreeNode::data);
    let mut after: BTreeMap<&PathArg, bool> = BTreeMap::new();
    if modification.operation() == LogicalOperation::Merge {
        if let Some(values) = modification.value().and_then(DataNode::children) {
            for arg in values.keys() {
                after.insert(arg, true);
            }
        }
    }
    for child in modification.children() {
        match child.operation() {
            LogicalOperation::Write | LogicalOperation::Merge => {
                after.insert(child.identifier(), true);
            }
            LogicalOperation::Delete => {
                after.insert(child.identifier(), false);
            }
            LogicalOperation::Touch | LogicalOperation::None => {}
        }
    }

    let mut count = current_data
        .and_then(DataNode::children)
        .map_or(0, |c| c.len());
    for (arg, present) in after {
        let existed = current_data.and_then(|d| d.child(arg)).is_some();
        match (existed, present) {
            (false, true) => count += 1,
            (true, false) => count -= 1,
            _ => {}
        }
    }
    bounds.check(strategy.name(), count, path)
}

pub(super) fn does_not_exist(path: &InstancePath) -> DataTreeError {
    DataTreeError::missing(
        path,
        format!(
            "Node {} does not exist. Cannot apply modification to its children.",
            path
        ),
    )
}

fn strategy_for<'a>(
    strategy: &'a ApplyStrategy,
    arg: &PathArg,
    child_path: &InstancePath,
) -> Result<&'a ApplyStrategy> {
    strategy.child(arg).ok_or_else(|| {
        DataTreeError::schema(
            child_path,
            format!("Child {} is not present in schema tree.", child_path),
        )
    })
}

/// Apply a modification to a container-like node
pub(super) fn apply(
    strategy: &ApplyStrategy,
    modification: &ModifiedNode,
    current: Option<&TreeNode>,
    version: Version,
    path: &InstancePath,
) -> Result<Applied> {
    let identifier = modification.identifier();
    match modification.operation() {
        LogicalOperation::None => Ok(Applied::unmodified(identifier.clone(), current)),
        LogicalOperation::Delete => {
            if !modification.has_children() {
                if current.is_none() {
                    tracing::trace!(path = %path, "delete of missing node is a no-op");
                }
                return Ok(deleted(identifier, current));
            }
            if !strategy.is_structural() {
                return Err(does_not_exist(path));
            }
            // Delete followed by child operations replaces the node with
            // whatever those children produce.
            let base = fresh(strategy, identifier, version, path)?;
            let touched = touch(strategy, &base, borrowed(modification), version, path)?;
            Ok(written(identifier, current, touched.node))
        }
        LogicalOperation::Write => {
            let value = strategy.without_empty_descendants(recorded_value(modification, path)?);
            let base = TreeNode::from_data(value, version);
            let node = if modification.has_children() {
                touch(strategy, &base, borrowed(modification), version, path)?.node
            } else {
                base
            };
            Ok(written(identifier, current, node))
        }
        LogicalOperation::Merge => match current {
            None => {
                let value = strategy.without_empty_descendants(recorded_value(modification, path)?);
                let base = TreeNode::from_data(value, version);
                let node = if modification.has_children() {
                    touch(strategy, &base, borrowed(modification), version, path)?.node
                } else {
                    base
                };
                if strategy.is_structural() && node.data().is_empty_container() {
                    return Ok(Applied::unmodified(identifier.clone(), None));
                }
                strategy.verify_structure(node.data(), path, true)?;
                Ok(written(identifier, None, node))
            }
            Some(current) => {
                let children = merged_children(modification, current);
                let touched = touch(strategy, current, children.into_iter(), version, path)?;
                Ok(subtree_result(identifier, current, touched))
            }
        },
        LogicalOperation::Touch => match current {
            Some(current) => {
                let touched = touch(strategy, current, borrowed(modification), version, path)?;
                Ok(subtree_result(identifier, current, touched))
            }
            None if strategy.is_structural() => {
                let base = fresh(strategy, identifier, version, path)?;
                let touched = touch(strategy, &base, borrowed(modification), version, path)?;
                if !touched.changed {
                    return Ok(Applied::unmodified(identifier.clone(), None));
                }
                Ok(Applied {
                    candidate: CandidateNode::modified(
                        identifier.clone(),
                        ModificationType::Appeared,
                        None,
                        Some(touched.node.data().clone()),
                        touched.children,
                    ),
                    node: Some(touched.node),
                })
            }
            None => Err(does_not_exist(path)),
        },
    }
}

fn recorded_value<'a>(modification: &'a ModifiedNode, path: &InstancePath) -> Result<&'a DataNode> {
    modification.value().ok_or_else(|| DataTreeError::Internal {
        message: format!("modification at {} has no value", path),
    })
}

fn fresh(
    strategy: &ApplyStrategy,
    identifier: &PathArg,
    version: Version,
    path: &InstancePath,
) -> Result<TreeNode> {
    let data = strategy.empty_node(identifier).ok_or_else(|| DataTreeError::Internal {
        message: format!("no empty node for {}", path),
    })?;
    Ok(TreeNode::from_data(data, version))
}

fn borrowed(modification: &ModifiedNode) -> impl Iterator<Item = Cow<'_, ModifiedNode>> {
    modification.children().map(Cow::Borrowed)
}

/// Explicit children followed by one MERGE per value child not addressed
/// explicitly
fn merged_children<'a>(modification: &'a ModifiedNode, current: &TreeNode) -> Vec<Cow<'a, ModifiedNode>> {
    let mut children: Vec<Cow<'a, ModifiedNode>> = borrowed(modification).collect();
    if let Some(values) = modification.value().and_then(DataNode::children) {
        for (arg, value) in values.iter() {
            if modification.child(arg).is_none() {
                children.push(Cow::Owned(ModifiedNode::merge_of(
                    value.clone(),
                    current.child(arg),
                )));
            }
        }
    }
    children
}

fn deleted(identifier: &PathArg, current: Option<&TreeNode>) -> Applied {
    match current {
        None => Applied::unmodified(identifier.clone(), None),
        Some(current) => Applied {
            node: None,
            candidate: CandidateNode::replaced(
                identifier.clone(),
                ModificationType::Delete,
                Some(current.data().clone()),
                None,
            ),
        },
    }
}

/// Result of replacing a node; equal data keeps the current node
pub(super) fn written(identifier: &PathArg, current: Option<&TreeNode>, node: TreeNode) -> Applied {
    if let Some(current) = current {
        if current.data() == node.data() {
            return Applied::unmodified(identifier.clone(), Some(current));
        }
    }
    Applied {
        candidate: CandidateNode::replaced(
            identifier.clone(),
            ModificationType::Write,
            current.map(|c| c.data().clone()),
            Some(node.data().clone()),
        ),
        node: Some(node),
    }
}

fn subtree_result(identifier: &PathArg, current: &TreeNode, touched: Touched) -> Applied {
    if !touched.changed {
        return Applied::unmodified(identifier.clone(), Some(current));
    }
    Applied {
        candidate: CandidateNode::modified(
            identifier.clone(),
            ModificationType::SubtreeModified,
            Some(current.data().clone()),
            Some(touched.node.data().clone()),
            touched.children,
        ),
        node: Some(touched.node),
    }
}

struct Touched {
    node: TreeNode,
    children: Vec<CandidateNode>,
    changed: bool,
}

/// Apply child modifications on top of `base`
fn touch<'a>(
    strategy: &ApplyStrategy,
    base: &TreeNode,
    children: impl Iterator<Item = Cow<'a, ModifiedNode>>,
    version: Version,
    path: &InstancePath,
) -> Result<Touched> {
    let ordered = is_user_ordered(strategy);
    let mut mutable = base.mutable(version);
    let mut candidates = Vec::new();
    let mut moved = false;
    for child in children {
        let arg = child.identifier();
        let child_path = path.clone().node(arg.clone());
        let child_strategy = strategy_for(strategy, arg, &child_path)?;
        let current_child = base.child(arg);
        let applied = child_strategy.apply(&child, current_child.as_ref(), version, &child_path)?;
        // Re-added entries of a user-ordered list go to the end even when
        // their data did not change.
        let reinserted = child.is_reinserted() && applied.node.is_some();
        if !applied.is_unmodified() || (ordered && reinserted) {
            if reinserted {
                mutable.remove_child(arg);
                moved |= ordered;
            }
            match &applied.node {
                Some(node) => mutable.put_child(node.clone()),
                None => mutable.remove_child(arg),
            }
        }
        candidates.push(applied.candidate);
    }

    let changed = moved || candidates.iter().any(|c| !c.is_unmodified());
    if changed {
        after_children(strategy, base, &mut mutable, &mut candidates, path)?;
    }
    Ok(Touched {
        node: mutable.seal(),
        children: candidates,
        changed,
    })
}

fn is_user_ordered(strategy: &ApplyStrategy) -> bool {
    match strategy.kind() {
        StrategyKind::Map(m) => m.is_ordered(),
        StrategyKind::LeafSet(l) => l.is_ordered(),
        _ => false,
    }
}

/// Rules that look at all children together once they are in place
fn after_children(
    strategy: &ApplyStrategy,
    base: &TreeNode,
    mutable: &mut MutableTreeNode,
    candidates: &mut Vec<CandidateNode>,
    path: &InstancePath,
) -> Result<()> {
    match strategy.kind() {
        StrategyKind::Choice(choice) => choice.exclude_other_cases(mutable, candidates, path),
        StrategyKind::Map(map) => map.unique().maintain(base, mutable, candidates, path),
        _ => Ok(()),
    }
}
