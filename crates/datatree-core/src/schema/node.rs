//! Schema node definitions

use crate::model::{InstancePath, QName};

use super::LeafType;

/// Keyed list properties
#[derive(Debug, Clone)]
pub struct ListSchema {
    pub keys: Vec<QName>,
    pub ordered: bool,
    pub min_elements: usize,
    pub max_elements: Option<usize>,
    /// Each constraint is a set of leaf paths relative to the entry
    pub unique: Vec<Vec<InstancePath>>,
    pub children: Vec<SchemaNode>,
}

#[derive(Debug, Clone)]
pub struct CaseSchema {
    pub name: QName,
    pub children: Vec<SchemaNode>,
}

#[derive(Debug, Clone)]
pub enum SchemaKind {
    Container {
        presence: bool,
        children: Vec<SchemaNode>,
    },
    List(ListSchema),
    UnkeyedList {
        min_elements: usize,
        max_elements: Option<usize>,
        children: Vec<SchemaNode>,
    },
    LeafList {
        ordered: bool,
        min_elements: usize,
        max_elements: Option<usize>,
        leaf_type: LeafType,
    },
    Leaf {
        leaf_type: LeafType,
        mandatory: bool,
    },
    Choice {
        cases: Vec<CaseSchema>,
    },
    AnyData {
        mandatory: bool,
    },
}

/// One node of a schema
///
/// Built with the kind constructors and chained modifiers. A modifier that
/// does not apply to the node's kind is ignored.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    name: QName,
    config: bool,
    augmented_by: Option<QName>,
    kind: SchemaKind,
}

impl SchemaNode {
    fn new(name: QName, kind: SchemaKind) -> Self {
        Self {
            name,
            config: true,
            augmented_by: None,
            kind,
        }
    }

    pub fn container(name: QName) -> Self {
        Self::new(
            name,
            SchemaKind::Container {
                presence: false,
                children: Vec::new(),
            },
        )
    }

    pub fn presence_container(name: QName) -> Self {
        Self::new(
            name,
            SchemaKind::Container {
                presence: true,
                children: Vec::new(),
            },
        )
    }

    pub fn list<I: IntoIterator<Item = QName>>(name: QName, keys: I) -> Self {
        Self::new(
            name,
            SchemaKind::List(ListSchema {
                keys: keys.into_iter().collect(),
                ordered: false,
                min_elements: 0,
                max_elements: None,
                unique: Vec::new(),
                children: Vec::new(),
            }),
        )
    }

    pub fn unkeyed_list(name: QName) -> Self {
        Self::new(
            name,
            SchemaKind::UnkeyedList {
                min_elements: 0,
                max_elements: None,
                children: Vec::new(),
            },
        )
    }

    pub fn leaf_list(name: QName, leaf_type: LeafType) -> Self {
        Self::new(
            name,
            SchemaKind::LeafList {
                ordered: false,
                min_elements: 0,
                max_elements: None,
                leaf_type,
            },
        )
    }

    pub fn leaf(name: QName, leaf_type: LeafType) -> Self {
        Self::new(
            name,
            SchemaKind::Leaf {
                leaf_type,
                mandatory: false,
            },
        )
    }

    pub fn choice(name: QName) -> Self {
        Self::new(name, SchemaKind::Choice { cases: Vec::new() })
    }

    pub fn anydata(name: QName) -> Self {
        Self::new(name, SchemaKind::AnyData { mandatory: false })
    }

    /// Add a data child to a container or list
    pub fn child(mut self, node: SchemaNode) -> Self {
        if let Some(children) = self.children_mut() {
            children.push(node);
        }
        self
    }

    /// Add a case to a choice
    pub fn case<I: IntoIterator<Item = SchemaNode>>(mut self, name: QName, children: I) -> Self {
        if let SchemaKind::Choice { cases } = &mut self.kind {
            cases.push(CaseSchema {
                name,
                children: children.into_iter().collect(),
            });
        }
        self
    }

    pub fn mandatory(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::Leaf { mandatory, .. } | SchemaKind::AnyData { mandatory } => {
                *mandatory = true
            }
            _ => {}
        }
        self
    }

    /// Mark as state data (`config false`)
    pub fn state(mut self) -> Self {
        self.config = false;
        self
    }

    pub fn ordered_by_user(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::List(list) => list.ordered = true,
            SchemaKind::LeafList { ordered, .. } => *ordered = true,
            _ => {}
        }
        self
    }

    pub fn min_elements(mut self, n: usize) -> Self {
        match &mut self.kind {
            SchemaKind::List(list) => list.min_elements = n,
            SchemaKind::LeafList { min_elements, .. }
            | SchemaKind::UnkeyedList { min_elements, .. } => *min_elements = n,
            _ => {}
        }
        self
    }

    pub fn max_elements(mut self, n: usize) -> Self {
        match &mut self.kind {
            SchemaKind::List(list) => list.max_elements = Some(n),
            SchemaKind::LeafList { max_elements, .. }
            | SchemaKind::UnkeyedList { max_elements, .. } => *max_elements = Some(n),
            _ => {}
        }
        self
    }

    /// Add a unique constraint over leaf paths relative to each entry
    pub fn unique<I: IntoIterator<Item = InstancePath>>(mut self, leaves: I) -> Self {
        if let SchemaKind::List(list) = &mut self.kind {
            list.unique.push(leaves.into_iter().collect());
        }
        self
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn is_config(&self) -> bool {
        self.config
    }

    /// Augmentation that contributed this node, if any
    pub fn augmented_by(&self) -> Option<&QName> {
        self.augmented_by.as_ref()
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    pub fn is_presence(&self) -> bool {
        matches!(self.kind, SchemaKind::Container { presence: true, .. })
    }

    /// Direct data children of containers and lists. Empty for other kinds.
    pub fn children(&self) -> &[SchemaNode] {
        match &self.kind {
            SchemaKind::Container { children, .. }
            | SchemaKind::UnkeyedList { children, .. } => children,
            SchemaKind::List(list) => &list.children,
            _ => &[],
        }
    }

    /// Child addressable by `name` in data; looks through choice cases
    pub fn data_child(&self, name: &QName) -> Option<&SchemaNode> {
        match &self.kind {
            SchemaKind::Choice { cases } => cases
                .iter()
                .flat_map(|c| c.children.iter())
                .find(|n| &n.name == name),
            _ => self.children().iter().find(|n| &n.name == name),
        }
    }

    /// Case of this choice containing the child `name`
    pub fn case_of(&self, name: &QName) -> Option<&CaseSchema> {
        match &self.kind {
            SchemaKind::Choice { cases } => cases
                .iter()
                .find(|c| c.children.iter().any(|n| &n.name == name)),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<SchemaNode>> {
        match &mut self.kind {
            SchemaKind::Container { children, .. }
            | SchemaKind::UnkeyedList { children, .. } => Some(children),
            SchemaKind::List(list) => Some(&mut list.children),
            _ => None,
        }
    }

    pub(crate) fn cases_mut(&mut self) -> Option<&mut Vec<CaseSchema>> {
        match &mut self.kind {
            SchemaKind::Choice { cases } => Some(cases),
            _ => None,
        }
    }

    pub(crate) fn mark_augmented(mut self, augmentation: &QName) -> Self {
        self.augmented_by = Some(augmentation.clone());
        self
    }
}
