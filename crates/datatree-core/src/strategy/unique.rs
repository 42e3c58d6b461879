//! `unique` constraints on keyed lists
//!
//! Without indexes every changed entry is compared against all entries. With
//! `unique_indexes` enabled the map node carries a value index that is built
//! lazily from the first touch and then maintained incrementally.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::candidate::CandidateNode;
use crate::errors::{DataTreeError, Result};
use crate::model::{Children, DataNode, InstancePath, PathArg, Value};
use crate::tree::{MutableTreeNode, TreeNode};

#[derive(Debug, Clone)]
pub(crate) struct UniqueValidator {
    /// Leaf paths relative to the entry, one set per constraint
    constraints: Vec<Vec<InstancePath>>,
    indexed: bool,
}

/// Tuple of leaf values to the entry holding them, per constraint
///
/// Each constraint's map is shared between tree versions and copied only
/// when a transaction changes one of its tuples.
#[derive(Debug, Clone, Default)]
pub(crate) struct UniqueIndex {
    tuples: Vec<Arc<BTreeMap<Vec<Value>, PathArg>>>,
}

impl UniqueValidator {
    pub(crate) fn new(constraints: Vec<Vec<InstancePath>>, indexed: bool) -> Self {
        Self {
            constraints,
            indexed,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Check every entry of a written list
    pub(crate) fn verify_all(&self, map: &DataNode, path: &InstancePath) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        UniqueIndex::build(&self.constraints, map, path).map(|_| ())
    }

    /// Check the entries a modification changed, after they are in place
    pub(crate) fn maintain(
        &self,
        base: &TreeNode,
        mutable: &mut MutableTreeNode,
        candidates: &[CandidateNode],
        path: &InstancePath,
    ) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let changed: Vec<&CandidateNode> = candidates.iter().filter(|c| !c.is_unmodified()).collect();

        if self.indexed {
            let mut index = match base.unique_index() {
                Some(index) => UniqueIndex::clone(index),
                None => UniqueIndex::build(&self.constraints, base.data(), path)?,
            };
            // Old tuples go first so entries may swap values in one transaction.
            for candidate in &changed {
                if let Some(before) = candidate.data_before() {
                    index.remove(&self.constraints, before, candidate.data_after());
                }
            }
            for candidate in &changed {
                if let Some(after) = candidate.data_after() {
                    index.insert(&self.constraints, after, path)?;
                }
            }
            mutable.set_index(Some(Arc::new(index)));
            return Ok(());
        }

        let Some(entries) = mutable.data().children() else {
            return Ok(());
        };
        for after in changed.iter().filter_map(|c| c.data_after()) {
            self.scan(entries, after, path)?;
        }
        Ok(())
    }

    fn scan(&self, entries: &Children, entry: &DataNode, path: &InstancePath) -> Result<()> {
        let id = entry.identifier();
        for constraint in &self.constraints {
            let Some(tuple) = tuple_of(entry, constraint) else {
                continue;
            };
            let clash = entries
                .iter()
                .any(|(other, node)| other != &id && tuple_of(node, constraint).as_ref() == Some(&tuple));
            if clash {
                return Err(violation(&id, &tuple, constraint, path));
            }
        }
        Ok(())
    }
}

impl UniqueIndex {
    fn build(constraints: &[Vec<InstancePath>], map: &DataNode, path: &InstancePath) -> Result<Self> {
        let mut index = UniqueIndex {
            tuples: constraints.iter().map(|_| Arc::default()).collect(),
        };
        if let Some(entries) = map.children() {
            for entry in entries.values() {
                index.insert(constraints, entry, path)?;
            }
        }
        Ok(index)
    }

    /// Drop `entry`'s tuples, except those `replacement` keeps unchanged
    fn remove(
        &mut self,
        constraints: &[Vec<InstancePath>],
        entry: &DataNode,
        replacement: Option<&DataNode>,
    ) {
        let id = entry.identifier();
        for (constraint, tuples) in constraints.iter().zip(self.tuples.iter_mut()) {
            let Some(tuple) = tuple_of(entry, constraint) else {
                continue;
            };
            if replacement.and_then(|r| tuple_of(r, constraint)).as_ref() == Some(&tuple) {
                continue;
            }
            if tuples.get(&tuple) == Some(&id) {
                Arc::make_mut(tuples).remove(&tuple);
            }
        }
    }

    fn insert(
        &mut self,
        constraints: &[Vec<InstancePath>],
        entry: &DataNode,
        path: &InstancePath,
    ) -> Result<()> {
        let id = entry.identifier();
        for (constraint, tuples) in constraints.iter().zip(self.tuples.iter_mut()) {
            let Some(tuple) = tuple_of(entry, constraint) else {
                continue;
            };
            match tuples.get(&tuple) {
                Some(holder) if holder == &id => {}
                Some(_) => return Err(violation(&id, &tuple, constraint, path)),
                None => {
                    Arc::make_mut(tuples).insert(tuple, id.clone());
                }
            }
        }
        Ok(())
    }
}

/// Values of all constraint leaves, or `None` if any is missing
fn tuple_of(entry: &DataNode, constraint: &[InstancePath]) -> Option<Vec<Value>> {
    constraint
        .iter()
        .map(|leaf| entry.find(leaf.args()).and_then(DataNode::value).cloned())
        .collect()
}

fn violation(
    entry: &PathArg,
    tuple: &[Value],
    constraint: &[InstancePath],
    path: &InstancePath,
) -> DataTreeError {
    let values: Vec<String> = tuple.iter().map(ToString::to_string).collect();
    let leaves: Vec<String> = constraint
        .iter()
        .map(|leaf| {
            leaf.args()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    DataTreeError::UniqueViolation {
        path: path.clone(),
        message: format!(
            "{} violates unique constraint on [{}] of [{}]",
            entry,
            values.join(", "),
            leaves.join(", ")
        ),
    }
}
