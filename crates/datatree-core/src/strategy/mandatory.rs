use crate::errors::{DataTreeError, Result};
use crate::model::{DataNode, InstancePath};
use crate::schema::{SchemaKind, SchemaNode};

/// Mandatory descendants of a presence container, list entry or case
///
/// Paths are relative and only cross non-presence containers. Choices are not
/// looked into; their cases enforce their own descendants.
#[derive(Debug, Clone, Default)]
pub(crate) struct MandatoryEnforcer {
    paths: Vec<InstancePath>,
}

impl MandatoryEnforcer {
    pub(crate) fn for_children(children: &[SchemaNode], config_only: bool) -> Self {
        let mut paths = Vec::new();
        collect(children, &InstancePath::empty(), config_only, &mut paths);
        Self { paths }
    }

    /// # Errors
    ///
    /// Returns `MissingMandatory` naming the first absent descendant.
    pub(crate) fn enforce(&self, data: &DataNode, path: &InstancePath) -> Result<()> {
        match self.paths.iter().find(|p| data.find(p.args()).is_none()) {
            None => Ok(()),
            Some(missing) => Err(DataTreeError::MissingMandatory {
                path: path.clone(),
                message: format!(
                    "Node {} is missing mandatory descendant {}",
                    data.identifier(),
                    missing
                ),
            }),
        }
    }
}

fn collect(
    children: &[SchemaNode],
    prefix: &InstancePath,
    config_only: bool,
    out: &mut Vec<InstancePath>,
) {
    for child in children {
        if config_only && !child.is_config() {
            continue;
        }
        let path = prefix.clone().node(child.name().clone());
        match child.kind() {
            SchemaKind::Leaf { mandatory, .. } | SchemaKind::AnyData { mandatory } => {
                if *mandatory {
                    out.push(path);
                }
            }
            SchemaKind::List(list) if list.min_elements > 0 => out.push(path),
            SchemaKind::LeafList { min_elements, .. }
            | SchemaKind::UnkeyedList { min_elements, .. }
                if *min_elements > 0 =>
            {
                out.push(path)
            }
            SchemaKind::Container {
                presence: false,
                children,
            } => collect(children, &path, config_only, out),
            _ => {}
        }
    }
}
