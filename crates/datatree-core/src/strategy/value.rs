//! Leaves, leaf-list entries, anydata and unkeyed lists
//!
//! These nodes are replaced as a whole; a merge is a write.

use crate::candidate::CandidateNode;
use crate::errors::{DataTreeError, Result};
use crate::model::{DataNode, InstancePath};
use crate::modification::{LogicalOperation, ModificationType, ModifiedNode};
use crate::schema::LeafType;
use crate::tree::{TreeNode, Version};

use super::container::{check_conflicting_write, written};
use super::{Applied, ApplyStrategy};

pub(super) fn verify(leaf_type: Option<&LeafType>, data: &DataNode, path: &InstancePath) -> Result<()> {
    let (Some(leaf_type), Some(value)) = (leaf_type, data.value()) else {
        return Ok(());
    };
    leaf_type.check(value).map_err(|reason| {
        DataTreeError::schema(path, format!("Invalid value of {}: {}", data.name(), reason))
    })
}

pub(super) fn check_applicable(
    _strategy: &ApplyStrategy,
    modification: &ModifiedNode,
    current: Option<&TreeNode>,
    path: &InstancePath,
) -> Result<()> {
    match modification.operation() {
        LogicalOperation::Write => check_conflicting_write(modification.original(), current, path),
        LogicalOperation::Merge => match (modification.original(), current) {
            (Some(original), Some(current))
                if original.data() != current.data() && original.version() != current.version() =>
            {
                Err(DataTreeError::conflict(
                    path,
                    "Node was replaced by other transaction.",
                ))
            }
            _ => Ok(()),
        },
        LogicalOperation::None | LogicalOperation::Touch | LogicalOperation::Delete => Ok(()),
    }
}

pub(super) fn apply(
    strategy: &ApplyStrategy,
    modification: &ModifiedNode,
    current: Option<&TreeNode>,
    version: Version,
    path: &InstancePath,
) -> Result<Applied> {
    let identifier = modification.identifier();
    match modification.operation() {
        LogicalOperation::None | LogicalOperation::Touch => {
            Ok(Applied::unmodified(identifier.clone(), current))
        }
        LogicalOperation::Delete => Ok(match current {
            None => {
                tracing::trace!(path = %path, "delete of missing node is a no-op");
                Applied::unmodified(identifier.clone(), None)
            }
            Some(current) => Applied {
                node: None,
                candidate: CandidateNode::replaced(
                    identifier.clone(),
                    ModificationType::Delete,
                    Some(current.data().clone()),
                    None,
                ),
            },
        }),
        LogicalOperation::Write | LogicalOperation::Merge => {
            let value = modification.value().ok_or_else(|| DataTreeError::Internal {
                message: format!("modification at {} has no value", path),
            })?;
            if modification.operation() == LogicalOperation::Merge && current.is_none() {
                strategy.verify_structure(value, path, true)?;
            }
            Ok(written(
                identifier,
                current,
                TreeNode::from_data(value.clone(), version),
            ))
        }
    }
}
