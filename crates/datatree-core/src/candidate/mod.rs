//! Data tree candidates
//!
//! A candidate is the immutable diff produced by `DataTree::prepare`. Nodes
//! reached through a modification carry their computed children; nodes that
//! were written or deleted as a whole derive children from their before and
//! after images on demand.

use std::sync::Arc;

use datatree_core_types::RequestContext;

use crate::data_tree::TreeContext;
use crate::errors::{DataTreeError, Result};
use crate::model::{DataNode, InstancePath, PathArg};
use crate::modification::{DataTreeModification, ModificationType};
use crate::tree::TreeNode;

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateNode {
    identifier: Option<PathArg>,
    modification_type: ModificationType,
    before: Option<DataNode>,
    after: Option<DataNode>,
    children: Option<Vec<CandidateNode>>,
}

impl CandidateNode {
    pub(crate) fn unmodified(identifier: PathArg, data: Option<DataNode>) -> Self {
        Self {
            identifier: Some(identifier),
            modification_type: ModificationType::Unmodified,
            before: data.clone(),
            after: data,
            children: None,
        }
    }

    /// Node whose children are derived from `before` and `after`
    pub(crate) fn replaced(
        identifier: PathArg,
        modification_type: ModificationType,
        before: Option<DataNode>,
        after: Option<DataNode>,
    ) -> Self {
        Self {
            identifier: Some(identifier),
            modification_type,
            before,
            after,
            children: None,
        }
    }

    pub(crate) fn modified(
        identifier: PathArg,
        modification_type: ModificationType,
        before: Option<DataNode>,
        after: Option<DataNode>,
        children: Vec<CandidateNode>,
    ) -> Self {
        Self {
            identifier: Some(identifier),
            modification_type,
            before,
            after,
            children: Some(children),
        }
    }

    /// Path argument of this node
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` on the synthetic root of a re-rooted candidate.
    pub fn identifier(&self) -> Result<&PathArg> {
        self.identifier.as_ref().ok_or_else(|| {
            DataTreeError::illegal_state("Synthetic candidate root has no identifier")
        })
    }

    pub fn modification_type(&self) -> ModificationType {
        self.modification_type
    }

    pub fn data_before(&self) -> Option<&DataNode> {
        self.before.as_ref()
    }

    pub fn data_after(&self) -> Option<&DataNode> {
        self.after.as_ref()
    }

    /// Changed and unchanged children reported for this node
    ///
    /// Unmodified nodes report none.
    pub fn child_nodes(&self) -> Vec<CandidateNode> {
        if self.modification_type == ModificationType::Unmodified {
            return Vec::new();
        }
        match &self.children {
            Some(children) => children.clone(),
            None => derive_children(self.before.as_ref(), self.after.as_ref()),
        }
    }

    /// Candidate node for one child, including untouched ones
    pub fn modified_child(&self, arg: &PathArg) -> Option<CandidateNode> {
        if let Some(children) = &self.children {
            if let Some(found) = children.iter().find(|c| c.identifier.as_ref() == Some(arg)) {
                return Some(found.clone());
            }
        }
        let before = self.before.as_ref().and_then(|d| d.child(arg));
        let after = self.after.as_ref().and_then(|d| d.child(arg));
        if before.is_none() && after.is_none() {
            return None;
        }
        Some(derive_node(arg, before, after))
    }

    pub(crate) fn is_unmodified(&self) -> bool {
        self.modification_type == ModificationType::Unmodified
    }

    pub(crate) fn into_synthetic_root(mut self) -> Self {
        self.identifier = None;
        self
    }
}

fn derive_children(before: Option<&DataNode>, after: Option<&DataNode>) -> Vec<CandidateNode> {
    let mut out = Vec::new();
    let before_children = before.and_then(DataNode::children);
    let after_children = after.and_then(DataNode::children);
    if let Some(bc) = before_children {
        for (arg, b) in bc.iter() {
            let a = after_children.and_then(|ac| ac.get(arg));
            out.push(derive_node(arg, Some(b), a));
        }
    }
    if let Some(ac) = after_children {
        for (arg, a) in ac.iter() {
            if before_children.is_some_and(|bc| bc.contains(arg)) {
                continue;
            }
            out.push(derive_node(arg, None, Some(a)));
        }
    }
    out
}

fn derive_node(arg: &PathArg, before: Option<&DataNode>, after: Option<&DataNode>) -> CandidateNode {
    let modification_type = match (before, after) {
        (None, None) => return CandidateNode::unmodified(arg.clone(), None),
        (None, Some(_)) => ModificationType::Write,
        (Some(_), None) => ModificationType::Delete,
        (Some(b), Some(a)) if b == a => {
            return CandidateNode::unmodified(arg.clone(), Some(b.clone()));
        }
        (Some(b), Some(a)) if b.is_container_like() && a.is_container_like() => {
            ModificationType::SubtreeModified
        }
        (Some(_), Some(_)) => ModificationType::Write,
    };
    CandidateNode::replaced(
        arg.clone(),
        modification_type,
        before.cloned(),
        after.cloned(),
    )
}

/// Immutable result of preparing a modification
///
/// `root_path` is relative to the root of the tree the candidate will be
/// applied to. Prepared candidates start at the tree root; re-rooted ones
/// start wherever they were re-rooted to and cannot be committed.
#[derive(Debug, Clone)]
pub struct DataTreeCandidate {
    root_path: InstancePath,
    root: CandidateNode,
    pub(crate) prepared: Option<PreparedState>,
}

/// Commit bookkeeping carried by a prepared candidate
#[derive(Debug, Clone)]
pub(crate) struct PreparedState {
    pub(crate) base: TreeNode,
    pub(crate) new_root: TreeNode,
    pub(crate) context: Arc<TreeContext>,
    pub(crate) request: Option<RequestContext>,
}

impl DataTreeCandidate {
    pub(crate) fn prepared(root: CandidateNode, state: PreparedState) -> Self {
        Self {
            root_path: InstancePath::empty(),
            root,
            prepared: Some(state),
        }
    }

    pub fn root_path(&self) -> &InstancePath {
        &self.root_path
    }

    pub fn root_node(&self) -> &CandidateNode {
        &self.root
    }

    /// Candidate focused on the node at `path`, with a synthetic root
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `path` is not at or below this candidate's root.
    pub fn reroot(&self, path: &InstancePath) -> Result<DataTreeCandidate> {
        let relative = path
            .relative_to(&self.root_path)
            .ok_or_else(|| DataTreeError::InvalidInput {
                message: format!(
                    "Path {} is not below candidate root {}",
                    path, self.root_path
                ),
            })?;

        let mut node = self.root.clone();
        for arg in relative.args() {
            node = node
                .modified_child(arg)
                .unwrap_or_else(|| CandidateNode::unmodified(arg.clone(), None));
        }
        Ok(DataTreeCandidate {
            root_path: path.clone(),
            root: node.into_synthetic_root(),
            prepared: None,
        })
    }

    /// Replay this candidate as operations on `modification`
    ///
    /// # Errors
    ///
    /// Propagates whatever the modification rejects.
    pub fn apply_to_modification(&self, modification: &mut DataTreeModification) -> Result<()> {
        apply_node(&self.root, &self.root_path, modification)
    }

    /// Net effect of applying `candidates` one after another
    ///
    /// Each candidate must start where the previous one left off. Changes
    /// that cancel out (a write followed by a delete of a node that did not
    /// exist before) are reported as unmodified. The result describes the
    /// combined change and cannot be committed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty slice, for candidates with
    /// different root paths, and for sequences that cannot follow each other,
    /// such as deleting a node twice.
    pub fn aggregate(candidates: &[DataTreeCandidate]) -> Result<DataTreeCandidate> {
        let first = candidates.first().ok_or_else(|| DataTreeError::InvalidInput {
            message: "Cannot aggregate an empty list of candidates".to_string(),
        })?;
        if let Some(other) = candidates.iter().find(|c| c.root_path != first.root_path) {
            return Err(DataTreeError::InvalidInput {
                message: format!(
                    "Expecting root path {}, encountered {}",
                    first.root_path, other.root_path
                ),
            });
        }

        let steps: Vec<CandidateNode> = candidates.iter().map(|c| c.root.clone()).collect();
        Ok(DataTreeCandidate {
            root_path: first.root_path.clone(),
            root: compress(&steps)?,
            prepared: None,
        })
    }
}

/// Fold the successive changes of one node into a single change
fn compress(steps: &[CandidateNode]) -> Result<CandidateNode> {
    let (Some(first), Some(last)) = (steps.first(), steps.last()) else {
        return Err(DataTreeError::Internal {
            message: "no candidate nodes to compress".to_string(),
        });
    };

    let mut net = ModificationType::Unmodified;
    let mut present = first.before.is_some();
    for step in steps {
        if step.modification_type != ModificationType::Unmodified {
            net = follow(net, step.modification_type, present)?;
            present = step.after.is_some();
        }
    }

    let identifier = first.identifier.clone();
    let before = first.before.clone();
    let after = last.after.clone();
    let node = |modification_type, children| CandidateNode {
        identifier: identifier.clone(),
        modification_type,
        before: before.clone(),
        after: after.clone(),
        children,
    };
    let unmodified = || CandidateNode {
        identifier: identifier.clone(),
        modification_type: ModificationType::Unmodified,
        before: before.clone(),
        after: before.clone(),
        children: None,
    };

    match net {
        ModificationType::Unmodified => Ok(unmodified()),
        ModificationType::Write => Ok(node(ModificationType::Write, None)),
        ModificationType::Delete if before.is_none() => Ok(unmodified()),
        ModificationType::Delete => Ok(node(ModificationType::Delete, None)),
        ModificationType::Appeared if before.is_some() => Err(illegal_sequence(
            ModificationType::Appeared,
            ModificationType::Write,
        )),
        ModificationType::SubtreeModified if before.is_none() => Err(illegal_sequence(
            ModificationType::SubtreeModified,
            ModificationType::Delete,
        )),
        ModificationType::Disappeared if before.is_none() => Ok(unmodified()),
        ModificationType::Appeared
        | ModificationType::Disappeared
        | ModificationType::SubtreeModified => {
            let children = compress_children(steps)?;
            if children.is_empty() {
                Ok(unmodified())
            } else {
                Ok(node(net, Some(children)))
            }
        }
    }
}

fn compress_children(steps: &[CandidateNode]) -> Result<Vec<CandidateNode>> {
    let mut args: Vec<PathArg> = Vec::new();
    for step in steps.iter().filter(|s| !s.is_unmodified()) {
        for child in step.child_nodes() {
            if let Some(arg) = child.identifier {
                if !args.contains(&arg) {
                    args.push(arg);
                }
            }
        }
    }

    let mut out = Vec::new();
    for arg in args {
        let per_step: Vec<CandidateNode> = steps
            .iter()
            .map(|step| {
                step.modified_child(&arg)
                    .unwrap_or_else(|| CandidateNode::unmodified(arg.clone(), None))
            })
            .collect();
        let child = compress(&per_step)?;
        if !child.is_unmodified() {
            out.push(child);
        }
    }
    Ok(out)
}

/// Net type after `second` follows `first`; `present` tells whether the node
/// existed between the two
fn follow(
    first: ModificationType,
    second: ModificationType,
    present: bool,
) -> Result<ModificationType> {
    use ModificationType::*;

    match (first, second) {
        (Unmodified, Unmodified | Write | Appeared) if !present => Ok(second),
        (Unmodified, Delete | Disappeared | SubtreeModified) if !present => {
            Err(illegal_sequence(second, Delete))
        }
        (Unmodified, Appeared) => Err(illegal_sequence(Appeared, Write)),
        (Unmodified, _) => Ok(second),

        (Write, Unmodified | Write | SubtreeModified) => Ok(Write),
        (Write, Delete | Disappeared) => Ok(second),
        (Write, Appeared) => Err(illegal_sequence(Appeared, first)),

        (Delete, Unmodified) => Ok(Delete),
        (Delete, Write | Appeared) => Ok(Write),
        (Delete, Delete | Disappeared | SubtreeModified) => Err(illegal_sequence(second, first)),

        (Appeared, Unmodified | SubtreeModified) => Ok(Appeared),
        (Appeared, Delete | Disappeared) => Ok(Unmodified),
        (Appeared, Write) => Ok(Write),
        (Appeared, Appeared) => Err(illegal_sequence(Appeared, first)),

        (Disappeared, Unmodified | Write) => Ok(second),
        (Disappeared, Appeared) => Ok(SubtreeModified),
        (Disappeared, Delete | Disappeared | SubtreeModified) => {
            Err(illegal_sequence(second, first))
        }

        (SubtreeModified, Unmodified | SubtreeModified) => Ok(SubtreeModified),
        (SubtreeModified, Write | Delete | Disappeared) => Ok(second),
        (SubtreeModified, Appeared) => Err(illegal_sequence(Appeared, first)),
    }
}

fn illegal_sequence(event: ModificationType, node: ModificationType) -> DataTreeError {
    DataTreeError::InvalidInput {
        message: format!("{} modification event on {} node", event, node),
    }
}

fn apply_node(
    node: &CandidateNode,
    path: &InstancePath,
    modification: &mut DataTreeModification,
) -> Result<()> {
    match node.modification_type() {
        ModificationType::Unmodified => Ok(()),
        ModificationType::Delete => modification.delete(path),
        ModificationType::Write => {
            let after = node.data_after().cloned().ok_or_else(|| DataTreeError::Internal {
                message: format!("written candidate node {} has no data", path),
            })?;
            modification.write(path, after)
        }
        ModificationType::SubtreeModified
        | ModificationType::Appeared
        | ModificationType::Disappeared => {
            for child in node.child_nodes() {
                let child_path = path.clone().node(child.identifier()?.clone());
                apply_node(&child, &child_path, modification)?;
            }
            Ok(())
        }
    }
}
