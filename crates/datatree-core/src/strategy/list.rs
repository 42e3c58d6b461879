//! Keyed lists, leaf-lists and unkeyed lists

use crate::errors::{DataTreeError, Result};
use crate::model::{DataNode, InstancePath, QName};

use super::{ApplyStrategy, ElementBounds, UniqueValidator};

#[derive(Debug)]
pub(crate) struct MapStrategy {
    ordered: bool,
    entry: Box<ApplyStrategy>,
    bounds: ElementBounds,
    unique: UniqueValidator,
}

impl MapStrategy {
    pub(crate) fn new(
        ordered: bool,
        entry: ApplyStrategy,
        bounds: ElementBounds,
        unique: UniqueValidator,
    ) -> Self {
        Self {
            ordered,
            entry: Box::new(entry),
            bounds,
            unique,
        }
    }

    pub(crate) fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub(crate) fn entry(&self) -> &ApplyStrategy {
        &self.entry
    }

    pub(crate) fn bounds(&self) -> ElementBounds {
        self.bounds
    }

    pub(crate) fn unique(&self) -> &UniqueValidator {
        &self.unique
    }

    /// Element count and unique constraints of a written list
    pub(crate) fn verify_complete(&self, name: &QName, data: &DataNode, path: &InstancePath) -> Result<()> {
        let count = data.children().map_or(0, |c| c.len());
        self.bounds.check(name, count, path)?;
        self.unique.verify_all(data, path)
    }
}

#[derive(Debug)]
pub(crate) struct LeafSetStrategy {
    ordered: bool,
    entry: Box<ApplyStrategy>,
    bounds: ElementBounds,
}

impl LeafSetStrategy {
    pub(crate) fn new(ordered: bool, entry: ApplyStrategy, bounds: ElementBounds) -> Self {
        Self {
            ordered,
            entry: Box::new(entry),
            bounds,
        }
    }

    pub(crate) fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub(crate) fn entry(&self) -> &ApplyStrategy {
        &self.entry
    }

    pub(crate) fn bounds(&self) -> ElementBounds {
        self.bounds
    }
}

/// List without keys; entries are not addressable and the list is replaced
/// as a whole
#[derive(Debug)]
pub(crate) struct UnkeyedListStrategy {
    entry: Box<ApplyStrategy>,
    bounds: ElementBounds,
}

impl UnkeyedListStrategy {
    pub(crate) fn new(entry: ApplyStrategy, bounds: ElementBounds) -> Self {
        Self {
            entry: Box::new(entry),
            bounds,
        }
    }

    pub(crate) fn bounds(&self) -> ElementBounds {
        self.bounds
    }

    /// Each entry is checked as a container of the list's children
    pub(crate) fn verify(
        &self,
        name: &QName,
        data: &DataNode,
        path: &InstancePath,
        full: bool,
        deep: bool,
    ) -> Result<()> {
        let DataNode::UnkeyedList { entries, .. } = data else {
            return Ok(());
        };
        for children in entries.iter() {
            let entry = DataNode::Container {
                name: name.clone(),
                children: children.clone(),
            };
            self.entry.verify_node(&entry, path, full, deep)?;
        }
        if full {
            self.bounds.check(name, entries.len(), path)?;
        }
        Ok(())
    }
}

/// Written lists must use the ordering the schema declares
pub(super) fn verify_ordering(
    name: &QName,
    ordered: bool,
    data: &DataNode,
    path: &InstancePath,
) -> Result<()> {
    let actual = matches!(
        data,
        DataNode::Map { ordered: true, .. } | DataNode::LeafSet { ordered: true, .. }
    );
    if actual == ordered {
        return Ok(());
    }
    let describe = |user: bool| if user { "user" } else { "system" };
    Err(DataTreeError::schema(
        path,
        format!(
            "Node {} is ordered by {} but the schema orders it by {}",
            name,
            describe(actual),
            describe(ordered)
        ),
    ))
}
