//! Leafref validation
//!
//! Runs over a prepared candidate, separately from the commit pipeline, so
//! callers decide whether dangling references block a commit. Only leafrefs
//! whose own subtree or target subtree the candidate changed are checked, and
//! every failure is collected before reporting.

use std::collections::BTreeSet;
use std::time::Instant;

use crate::candidate::{CandidateNode, DataTreeCandidate};
use crate::errors::{DataTreeError, Result};
use crate::logging_facility::elapsed_ms;
use crate::model::{DataNode, InstancePath, PathArg, QName, Value};
use crate::modification::ModificationType;
use crate::schema::{SchemaContext, SchemaKind, SchemaNode};
use crate::{log_op_end, log_op_error, log_op_start};

/// A leaf or leaf-list typed as a leafref
#[derive(Debug)]
struct LeafRef {
    /// Data path of the referencing node, names only
    source: Vec<QName>,
    target: InstancePath,
}

impl LeafRef {
    fn target_names(&self) -> Vec<QName> {
        self.target.args().iter().map(|a| a.name().clone()).collect()
    }
}

/// Check every leafref affected by `candidate` against the data it leaves
///
/// The candidate must come from a tree rooted at the schema root.
///
/// # Errors
///
/// * `LeafRefValidation` - one message per referencing value with no matching
///   target value
/// * `InvalidInput` - the candidate is rerooted or comes from a tree mounted
///   below the schema root
pub fn validate_leafrefs(candidate: &DataTreeCandidate, schema: &SchemaContext) -> Result<()> {
    let start = Instant::now();
    log_op_start!("validate_leafrefs");

    let result = run(candidate, schema);

    match &result {
        Ok(checked) => log_op_end!(
            "validate_leafrefs",
            duration_ms = elapsed_ms(start),
            checked = *checked
        ),
        Err(err) => log_op_error!("validate_leafrefs", err, duration_ms = elapsed_ms(start)),
    }
    result.map(|_| ())
}

fn run(candidate: &DataTreeCandidate, schema: &SchemaContext) -> Result<usize> {
    let root = candidate.root_node();
    let Some(after) = root.data_after() else {
        return Ok(0);
    };
    if !candidate.root_path().is_empty() || after.name() != schema.root().name() {
        return Err(DataTreeError::InvalidInput {
            message: format!(
                "Leafref validation needs a candidate of the schema root, not {}",
                after.identifier()
            ),
        });
    }

    let mut leafrefs = Vec::new();
    collect_leafrefs(schema.root().children(), &[], &mut leafrefs);
    if leafrefs.is_empty() {
        return Ok(0);
    }

    let mut changed = Vec::new();
    collect_changes(root, &[], &mut changed);

    let mut messages = Vec::new();
    let mut checked = 0;
    for leafref in &leafrefs {
        let target_names = leafref.target_names();
        let affected = changed
            .iter()
            .any(|c| overlaps(c, &leafref.source) || overlaps(c, &target_names));
        if !affected {
            continue;
        }
        checked += 1;

        let mut allowed = BTreeSet::new();
        collect_values(after, &target_names, &mut allowed);
        let mut values = BTreeSet::new();
        collect_values(after, &leafref.source, &mut values);

        for value in values.iter().filter(|v| !allowed.contains(*v)) {
            let node = leafref.source.last().map(ToString::to_string).unwrap_or_default();
            tracing::debug!(
                leafref = %node,
                value = %value,
                target = %leafref.target,
                "dangling leafref"
            );
            messages.push(format!(
                "Invalid leafref value [{}] allowed values [{}] of LEAFREF node: {} leafRef target path: {}",
                value,
                allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                node,
                leafref.target
            ));
        }
    }

    if messages.is_empty() {
        Ok(checked)
    } else {
        Err(DataTreeError::LeafRefValidation {
            count: messages.len(),
            messages,
        })
    }
}

/// One path is a prefix of the other
fn overlaps(a: &[QName], b: &[QName]) -> bool {
    let n = a.len().min(b.len());
    a[..n] == b[..n]
}

fn collect_leafrefs(nodes: &[SchemaNode], prefix: &[QName], out: &mut Vec<LeafRef>) {
    for node in nodes {
        let mut path = prefix.to_vec();
        path.push(node.name().clone());
        match node.kind() {
            SchemaKind::Leaf { leaf_type, .. } | SchemaKind::LeafList { leaf_type, .. } => {
                if let Some(target) = leaf_type.leafref_path() {
                    out.push(LeafRef {
                        source: path,
                        target: target.clone(),
                    });
                }
            }
            SchemaKind::Choice { cases } => {
                for case in cases {
                    collect_leafrefs(&case.children, &path, out);
                }
            }
            _ => collect_leafrefs(node.children(), &path, out),
        }
    }
}

/// Name paths of candidate nodes replaced, created or removed as a whole
fn collect_changes(node: &CandidateNode, prefix: &[QName], out: &mut Vec<Vec<QName>>) {
    for child in node.child_nodes() {
        let Ok(arg) = child.identifier() else {
            continue;
        };
        let path = extend(prefix, arg);
        match child.modification_type() {
            ModificationType::Unmodified => {}
            ModificationType::SubtreeModified => collect_changes(&child, &path, out),
            _ => out.push(path),
        }
    }
}

/// Entry and value arguments repeat their list's name and add no step
fn extend(prefix: &[QName], arg: &PathArg) -> Vec<QName> {
    let mut path = prefix.to_vec();
    let repeats = matches!(arg, PathArg::Entry { .. } | PathArg::Value { .. })
        && prefix.last() == Some(arg.name());
    if !repeats {
        path.push(arg.name().clone());
    }
    path
}

/// Values of every leaf or leaf-list entry reachable along `names`
fn collect_values(node: &DataNode, names: &[QName], out: &mut BTreeSet<Value>) {
    match node {
        DataNode::Map { entries, .. } => {
            for entry in entries.values() {
                collect_values(entry, names, out);
            }
            return;
        }
        DataNode::UnkeyedList { name, entries } => {
            for children in entries.iter() {
                let entry = DataNode::Container {
                    name: name.clone(),
                    children: children.clone(),
                };
                collect_values(&entry, names, out);
            }
            return;
        }
        _ => {}
    }

    let Some((first, rest)) = names.split_first() else {
        match node {
            DataNode::Leaf { value, .. } | DataNode::LeafSetEntry { value, .. } => {
                out.insert(value.clone());
            }
            DataNode::LeafSet { entries, .. } => {
                out.extend(entries.values().filter_map(DataNode::value).cloned());
            }
            _ => {}
        }
        return;
    };

    let Some(children) = node.children() else {
        return;
    };
    for child in children.values().filter(|c| c.name() == first) {
        collect_values(child, rest, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(name: &str) -> QName {
        QName::new("urn:test", name)
    }

    #[test]
    fn test_overlaps_is_prefix_either_way() {
        assert!(overlaps(&[q("a")], &[q("a"), q("b")]));
        assert!(overlaps(&[q("a"), q("b")], &[q("a")]));
        assert!(!overlaps(&[q("a"), q("c")], &[q("a"), q("b")]));
    }

    #[test]
    fn test_extend_skips_entry_argument() {
        let prefix = [q("top"), q("l")];
        let entry = PathArg::single_key(q("l"), q("id"), 1);
        assert_eq!(extend(&prefix, &entry), vec![q("top"), q("l")]);
        assert_eq!(
            extend(&prefix, &PathArg::node(q("id"))),
            vec![q("top"), q("l"), q("id")]
        );
    }
}
