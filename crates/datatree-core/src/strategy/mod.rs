//! Per-schema-node apply strategies
//!
//! A strategy tree mirrors the schema for one tree configuration. It knows how
//! to verify written data, how to check a recorded modification against the
//! current tree, and how to apply it to produce new tree nodes plus the
//! candidate diff.

mod choice;
mod container;
mod list;
mod mandatory;
mod min_max;
mod unique;
mod value;

use std::collections::BTreeMap;

use crate::candidate::CandidateNode;
use crate::config::TreeConfig;
use crate::errors::{DataTreeError, Result};
use crate::model::{Children, DataNode, InstancePath, NodeKind, PathArg, QName};
use crate::modification::{ModificationType, ModifiedNode};
use crate::schema::{LeafType, SchemaContext, SchemaKind, SchemaNode};
use crate::tree::{TreeNode, Version};

pub(crate) use choice::ChoiceStrategy;
pub(crate) use container::{ContainerFlavor, ContainerStrategy};
pub(crate) use list::{LeafSetStrategy, MapStrategy, UnkeyedListStrategy};
pub(crate) use mandatory::MandatoryEnforcer;
pub(crate) use min_max::ElementBounds;
pub(crate) use unique::{UniqueIndex, UniqueValidator};

/// Outcome of applying one modified node
#[derive(Debug)]
pub(crate) struct Applied {
    pub(crate) node: Option<TreeNode>,
    pub(crate) candidate: CandidateNode,
}

impl Applied {
    pub(crate) fn unmodified(identifier: PathArg, current: Option<&TreeNode>) -> Self {
        Applied {
            node: current.cloned(),
            candidate: CandidateNode::unmodified(identifier, current.map(|c| c.data().clone())),
        }
    }

    pub(crate) fn is_unmodified(&self) -> bool {
        self.candidate.is_unmodified()
    }
}

enum Pruned {
    Keep,
    Replace(DataNode),
    Drop,
}

/// Options fixed for a whole strategy tree
#[derive(Debug, Clone, Copy)]
struct BuildOptions {
    config_only: bool,
    mandatory: bool,
    unique_indexes: bool,
}

impl From<&TreeConfig> for BuildOptions {
    fn from(config: &TreeConfig) -> Self {
        BuildOptions {
            config_only: config.is_configuration(),
            mandatory: config.mandatory_validation,
            unique_indexes: config.unique_indexes,
        }
    }
}

impl BuildOptions {
    fn admits(&self, node: &SchemaNode) -> bool {
        !self.config_only || node.is_config()
    }
}

#[derive(Debug)]
pub(crate) enum StrategyKind {
    Value {
        expected: NodeKind,
        leaf_type: Option<LeafType>,
    },
    Container(ContainerStrategy),
    Choice(ChoiceStrategy),
    Map(MapStrategy),
    LeafSet(LeafSetStrategy),
    UnkeyedList(UnkeyedListStrategy),
}

#[derive(Debug)]
pub(crate) struct ApplyStrategy {
    name: QName,
    /// Whether written data is checked below the written node
    verify_children: bool,
    kind: StrategyKind,
}

impl ApplyStrategy {
    /// Strategy tree for the node `config.root_path` points at
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the root path does not name a container or
    /// a list entry admitted by the tree type.
    pub(crate) fn for_tree(schema: &SchemaContext, config: &TreeConfig) -> Result<ApplyStrategy> {
        let options = BuildOptions::from(config);
        let root_path = &config.root_path;
        let Some(last) = root_path.last() else {
            return Ok(Self::container(schema.root(), ContainerFlavor::Root, options));
        };

        let invalid = |reason: &str| DataTreeError::InvalidInput {
            message: format!("Tree root {} {}", root_path, reason),
        };
        let node = schema
            .find(root_path)
            .ok_or_else(|| invalid("is not present in the schema"))?;
        if !options.admits(node) {
            return Err(invalid("is not a configuration node"));
        }
        match (node.kind(), last) {
            (SchemaKind::Container { .. }, PathArg::Node(_)) => {
                Ok(Self::container(node, ContainerFlavor::Root, options))
            }
            (SchemaKind::List(list), PathArg::Entry { .. }) => Ok(Self::container(
                node,
                ContainerFlavor::RootEntry {
                    keys: list.keys.clone(),
                },
                options,
            )),
            _ => Err(invalid("must be a container or a list entry")),
        }
    }

    fn build(node: &SchemaNode, options: BuildOptions) -> ApplyStrategy {
        let name = node.name().clone();
        let leaf = |expected, leaf_type: &LeafType| StrategyKind::Value {
            expected,
            leaf_type: Some(leaf_type.clone()),
        };
        let kind = match node.kind() {
            SchemaKind::Leaf { leaf_type, .. } => leaf(NodeKind::Leaf, leaf_type),
            SchemaKind::AnyData { .. } => StrategyKind::Value {
                expected: NodeKind::AnyData,
                leaf_type: None,
            },
            SchemaKind::Container { presence, .. } => {
                let flavor = if *presence {
                    ContainerFlavor::Presence
                } else {
                    ContainerFlavor::Structural
                };
                return Self::container(node, flavor, options);
            }
            SchemaKind::Choice { cases } => {
                StrategyKind::Choice(ChoiceStrategy::build(cases, options))
            }
            SchemaKind::List(list) => {
                let entry = Self::container(
                    node,
                    ContainerFlavor::MapEntry {
                        keys: list.keys.clone(),
                    },
                    options,
                );
                StrategyKind::Map(MapStrategy::new(
                    list.ordered,
                    entry,
                    ElementBounds::new(list.min_elements, list.max_elements),
                    UniqueValidator::new(list.unique.clone(), options.unique_indexes),
                ))
            }
            SchemaKind::LeafList {
                ordered,
                min_elements,
                max_elements,
                leaf_type,
            } => {
                let entry = ApplyStrategy {
                    name: name.clone(),
                    verify_children: options.config_only,
                    kind: leaf(NodeKind::LeafSetEntry, leaf_type),
                };
                StrategyKind::LeafSet(LeafSetStrategy::new(
                    *ordered,
                    entry,
                    ElementBounds::new(*min_elements, *max_elements),
                ))
            }
            SchemaKind::UnkeyedList {
                min_elements,
                max_elements,
                ..
            } => {
                let entry = Self::container(node, ContainerFlavor::Structural, options);
                StrategyKind::UnkeyedList(UnkeyedListStrategy::new(
                    entry,
                    ElementBounds::new(*min_elements, *max_elements),
                ))
            }
        };
        ApplyStrategy {
            name,
            verify_children: options.config_only,
            kind,
        }
    }

    fn container(node: &SchemaNode, flavor: ContainerFlavor, options: BuildOptions) -> ApplyStrategy {
        let mandatory = match flavor {
            ContainerFlavor::Presence
            | ContainerFlavor::MapEntry { .. }
            | ContainerFlavor::RootEntry { .. }
                if options.mandatory =>
            {
                MandatoryEnforcer::for_children(node.children(), options.config_only)
            }
            _ => MandatoryEnforcer::default(),
        };
        ApplyStrategy {
            name: node.name().clone(),
            verify_children: options.config_only,
            kind: StrategyKind::Container(ContainerStrategy::new(
                flavor,
                Self::children_of(node.children(), options),
                mandatory,
            )),
        }
    }

    fn children_of(nodes: &[SchemaNode], options: BuildOptions) -> BTreeMap<QName, ApplyStrategy> {
        nodes
            .iter()
            .filter(|n| options.admits(n))
            .map(|n| (n.name().clone(), Self::build(n, options)))
            .collect()
    }

    pub(crate) fn name(&self) -> &QName {
        &self.name
    }

    pub(crate) fn kind(&self) -> &StrategyKind {
        &self.kind
    }

    /// Strategy for the child addressed by `arg`
    pub(crate) fn child(&self, arg: &PathArg) -> Option<&ApplyStrategy> {
        match (&self.kind, arg) {
            (StrategyKind::Container(c), PathArg::Node(name)) => c.child(name),
            (StrategyKind::Choice(c), PathArg::Node(name)) => c.child(name),
            (StrategyKind::Map(m), PathArg::Entry { name, .. }) if name == &self.name => {
                Some(m.entry())
            }
            (StrategyKind::LeafSet(l), PathArg::Value { name, .. }) if name == &self.name => {
                Some(l.entry())
            }
            _ => None,
        }
    }

    /// Nodes with addressable children
    pub(crate) fn is_container_like(&self) -> bool {
        matches!(
            self.kind,
            StrategyKind::Container(_)
                | StrategyKind::Choice(_)
                | StrategyKind::Map(_)
                | StrategyKind::LeafSet(_)
        )
    }

    /// Nodes that exist only while they have children
    pub(crate) fn is_structural(&self) -> bool {
        match &self.kind {
            StrategyKind::Container(c) => c.flavor().is_structural(),
            StrategyKind::Choice(_)
            | StrategyKind::Map(_)
            | StrategyKind::LeafSet(_)
            | StrategyKind::UnkeyedList(_) => true,
            StrategyKind::Value { .. } => false,
        }
    }

    fn expected_kind(&self) -> NodeKind {
        match &self.kind {
            StrategyKind::Value { expected, .. } => *expected,
            StrategyKind::Container(c) if c.flavor().is_entry() => NodeKind::MapEntry,
            StrategyKind::Container(_) => NodeKind::Container,
            StrategyKind::Choice(_) => NodeKind::Choice,
            StrategyKind::Map(_) => NodeKind::Map,
            StrategyKind::LeafSet(_) => NodeKind::LeafSet,
            StrategyKind::UnkeyedList(_) => NodeKind::UnkeyedList,
        }
    }

    /// Empty node of this strategy's kind, identified by `arg`
    pub(crate) fn empty_node(&self, arg: &PathArg) -> Option<DataNode> {
        let name = self.name.clone();
        let node = match &self.kind {
            StrategyKind::Value { .. } => return None,
            StrategyKind::Container(c) if c.flavor().is_entry() => DataNode::MapEntry {
                id: arg.clone(),
                children: entry_key_leaves(arg),
            },
            StrategyKind::Container(_) => DataNode::Container {
                name,
                children: Children::new(),
            },
            StrategyKind::Choice(_) => DataNode::Choice {
                name,
                children: Children::new(),
            },
            StrategyKind::Map(m) => DataNode::Map {
                name,
                ordered: m.is_ordered(),
                entries: Children::new(),
            },
            StrategyKind::LeafSet(l) => DataNode::LeafSet {
                name,
                ordered: l.is_ordered(),
                entries: Children::new(),
            },
            StrategyKind::UnkeyedList(_) => DataNode::UnkeyedList {
                name,
                entries: Default::default(),
            },
        };
        Some(node)
    }

    /// `data` with every structural descendant that holds nothing removed
    ///
    /// The node itself is kept even when it ends up empty; eliding it is up
    /// to the caller.
    pub(crate) fn without_empty_descendants(&self, data: &DataNode) -> DataNode {
        match self.prune(data) {
            Pruned::Keep => data.clone(),
            Pruned::Replace(node) => node,
            Pruned::Drop => data.empty_like(),
        }
    }

    fn prune(&self, data: &DataNode) -> Pruned {
        let mut edited: Option<Children> = None;
        if let Some(children) = data.children() {
            for (arg, child) in children.iter() {
                // unknown children are reported by structure verification
                let Some(strategy) = self.child(arg) else {
                    continue;
                };
                match strategy.prune(child) {
                    Pruned::Keep => {}
                    Pruned::Replace(node) => {
                        edited.get_or_insert_with(|| children.clone()).insert(node);
                    }
                    Pruned::Drop => {
                        edited.get_or_insert_with(|| children.clone()).remove(arg);
                    }
                }
            }
        }
        let node = edited.map(|children| data.with_children(children));
        let empty = node.as_ref().unwrap_or(data).is_empty_container();
        match node {
            _ if empty && self.is_structural() => Pruned::Drop,
            Some(node) => Pruned::Replace(node),
            None => Pruned::Keep,
        }
    }

    /// Shallow check of a node about to be written or merged
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidation` when the node's kind, name or value does not
    /// fit this schema node.
    pub(crate) fn verify_value(&self, data: &DataNode, path: &InstancePath) -> Result<()> {
        let expected = self.expected_kind();
        if data.kind() != expected {
            return Err(DataTreeError::schema(
                path,
                format!(
                    "Node {} is a {} but schema node {} is a {}",
                    data.identifier(),
                    data.kind(),
                    self.name,
                    expected
                ),
            ));
        }
        if data.name() != &self.name {
            return Err(DataTreeError::schema(
                path,
                format!(
                    "Node {} does not match schema node {}",
                    data.identifier(),
                    self.name
                ),
            ));
        }
        match &self.kind {
            StrategyKind::Value { leaf_type, .. } => value::verify(leaf_type.as_ref(), data, path),
            StrategyKind::Container(c) => c.verify_identifier(data, path),
            StrategyKind::Map(m) => list::verify_ordering(&self.name, m.is_ordered(), data, path),
            StrategyKind::LeafSet(l) => {
                list::verify_ordering(&self.name, l.is_ordered(), data, path)
            }
            StrategyKind::Choice(_) | StrategyKind::UnkeyedList(_) => Ok(()),
        }
    }

    /// Check written data against this strategy
    ///
    /// Descends into children only for configuration trees. With `full` set
    /// the completeness rules run as well: mandatory descendants, element
    /// counts and unique constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub(crate) fn verify_structure(
        &self,
        data: &DataNode,
        path: &InstancePath,
        full: bool,
    ) -> Result<()> {
        self.verify_node(data, path, full, false)
    }

    /// Full check of data already stored in a tree, every descendant included
    pub(crate) fn verify_stored(&self, data: &DataNode, path: &InstancePath) -> Result<()> {
        self.verify_node(data, path, true, true)
    }

    pub(super) fn verify_node(
        &self,
        data: &DataNode,
        path: &InstancePath,
        full: bool,
        deep: bool,
    ) -> Result<()> {
        self.verify_value(data, path)?;
        let descend = deep || self.verify_children;
        match &self.kind {
            StrategyKind::Value { .. } => Ok(()),
            StrategyKind::Container(c) => {
                if descend {
                    self.verify_children_of(data, path, full, deep)?;
                }
                if full {
                    c.mandatory().enforce(data, path)?;
                }
                Ok(())
            }
            StrategyKind::Choice(c) => {
                if descend {
                    self.verify_children_of(data, path, full, deep)?;
                }
                c.verify_cases(data, path, full)
            }
            StrategyKind::Map(m) => {
                if descend {
                    self.verify_children_of(data, path, full, deep)?;
                }
                if full {
                    m.verify_complete(&self.name, data, path)?;
                }
                Ok(())
            }
            StrategyKind::LeafSet(l) => {
                if descend {
                    self.verify_children_of(data, path, full, deep)?;
                }
                if full {
                    l.bounds()
                        .check(&self.name, data.children().map_or(0, Children::len), path)?;
                }
                Ok(())
            }
            StrategyKind::UnkeyedList(u) => u.verify(&self.name, data, path, full, deep),
        }
    }

    fn verify_children_of(
        &self,
        data: &DataNode,
        path: &InstancePath,
        full: bool,
        deep: bool,
    ) -> Result<()> {
        let Some(children) = data.children() else {
            return Ok(());
        };
        for (arg, child) in children.iter() {
            let child_path = path.clone().node(arg.clone());
            let strategy = self.child(arg).ok_or_else(|| {
                DataTreeError::schema(
                    &child_path,
                    format!(
                        "Node {} is not a valid child of {} according to the schema.",
                        arg, self.name
                    ),
                )
            })?;
            strategy.verify_node(child, &child_path, full, deep)?;
        }
        Ok(())
    }

    /// Check that `modification`, recorded against its original, can still be
    /// applied to `current`
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when another commit changed what this modification
    /// depends on, `NodeDoesNotExist` when children are modified under a node
    /// that is gone, and min/max errors for lists that would end up out of
    /// bounds.
    pub(crate) fn check_applicable(
        &self,
        modification: &ModifiedNode,
        current: Option<&TreeNode>,
        path: &InstancePath,
    ) -> Result<()> {
        if self.is_container_like() {
            container::check_applicable(self, modification, current, path)
        } else {
            value::check_applicable(self, modification, current, path)
        }
    }

    /// Apply `modification` on top of `current`
    ///
    /// Every node created or replaced is stamped with `version`.
    ///
    /// # Errors
    ///
    /// Returns schema and constraint violations discovered while applying.
    pub(crate) fn apply(
        &self,
        modification: &ModifiedNode,
        current: Option<&TreeNode>,
        version: Version,
        path: &InstancePath,
    ) -> Result<Applied> {
        let applied = if self.is_container_like() {
            container::apply(self, modification, current, version, path)?
        } else {
            value::apply(self, modification, current, version, path)?
        };
        let applied = self.elide_empty(applied, modification.identifier(), current);
        if !applied.is_unmodified() {
            if let Some(node) = &applied.node {
                self.enforce_after_apply(node.data(), path)?;
            }
        }
        Ok(applied)
    }

    /// Structural nodes left without children disappear
    fn elide_empty(
        &self,
        applied: Applied,
        identifier: &PathArg,
        current: Option<&TreeNode>,
    ) -> Applied {
        if !self.is_structural() || applied.is_unmodified() {
            return applied;
        }
        match &applied.node {
            Some(node) if node.data().is_empty_container() => {}
            _ => return applied,
        }

        let identifier = identifier.clone();
        let Some(current) = current else {
            return Applied::unmodified(identifier, None);
        };
        let before = Some(current.data().clone());
        let candidate = if applied.candidate.modification_type()
            == ModificationType::SubtreeModified
        {
            CandidateNode::modified(
                identifier,
                ModificationType::Disappeared,
                before,
                None,
                applied.candidate.child_nodes(),
            )
        } else {
            CandidateNode::replaced(
                identifier,
                ModificationType::Delete,
                before,
                None,
            )
        };
        Applied {
            node: None,
            candidate,
        }
    }

    /// Rules checked on every node a modification leaves present
    fn enforce_after_apply(&self, data: &DataNode, path: &InstancePath) -> Result<()> {
        match &self.kind {
            StrategyKind::Container(c) => c.mandatory().enforce(data, path),
            StrategyKind::Choice(c) => c.enforce_active_case(data, path),
            StrategyKind::Map(m) => m.bounds().check(&self.name, count(data), path),
            StrategyKind::LeafSet(l) => l.bounds().check(&self.name, count(data), path),
            StrategyKind::UnkeyedList(u) => u.bounds().check(&self.name, count(data), path),
            StrategyKind::Value { .. } => Ok(()),
        }
    }
}

fn count(data: &DataNode) -> usize {
    match data {
        DataNode::UnkeyedList { entries, .. } => entries.len(),
        other => other.children().map_or(0, Children::len),
    }
}

/// Key leaves implied by a list entry identifier
fn entry_key_leaves(arg: &PathArg) -> Children {
    arg.keys()
        .into_iter()
        .flatten()
        .map(|(key, value)| DataNode::Leaf {
            name: key.clone(),
            value: value.clone(),
        })
        .collect()
}
