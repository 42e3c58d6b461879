//! Shared fixtures for integration tests

use datatree_core::model::builders::{container, ChoiceBuilder, MapBuilder, MapEntryBuilder};
use datatree_core::model::{DataNode, InstancePath, PathArg, QName};
use datatree_core::schema::{LeafType, SchemaContext, SchemaNode};
use datatree_core::{DataTree, DataTreeModification, ModificationType, Result, TreeConfig};

pub const NS: &str = "urn:test:datatree";

#[allow(dead_code)]
pub fn q(name: &str) -> QName {
    QName::new(NS, name)
}

/// `test` container with a keyed `outer-list`; each entry has a choice and a
/// nested `inner-list`
///
/// ```text
/// container test {
///   list outer-list { key id;
///     leaf id { type int; }
///     choice outer-choice {
///       case one { leaf one { type string; } }
///       case two-three { leaf two; leaf three; }
///     }
///     list inner-list { key name; leaf name; leaf value; }
///   }
///   leaf name { type string; }
/// }
/// ```
#[allow(dead_code)]
pub fn test_schema() -> SchemaContext {
    SchemaContext::new([SchemaNode::container(q("test"))
        .child(
            SchemaNode::list(q("outer-list"), [q("id")])
                .child(SchemaNode::leaf(q("id"), LeafType::int()))
                .child(
                    SchemaNode::choice(q("outer-choice"))
                        .case(q("one"), [SchemaNode::leaf(q("one"), LeafType::string())])
                        .case(
                            q("two-three"),
                            [
                                SchemaNode::leaf(q("two"), LeafType::string()),
                                SchemaNode::leaf(q("three"), LeafType::string()),
                            ],
                        ),
                )
                .child(
                    SchemaNode::list(q("inner-list"), [q("name")])
                        .child(SchemaNode::leaf(q("name"), LeafType::string()))
                        .child(SchemaNode::leaf(q("value"), LeafType::string())),
                ),
        )
        .child(SchemaNode::leaf(q("name"), LeafType::string()))])
}

#[allow(dead_code)]
pub fn configuration_tree(schema: SchemaContext) -> DataTree {
    DataTree::create(schema, TreeConfig::default_configuration()).unwrap()
}

#[allow(dead_code)]
pub fn test_path() -> InstancePath {
    InstancePath::of([q("test")])
}

#[allow(dead_code)]
pub fn outer_list_path() -> InstancePath {
    InstancePath::of([q("test"), q("outer-list")])
}

#[allow(dead_code)]
pub fn outer_entry_arg(id: i64) -> PathArg {
    PathArg::single_key(q("outer-list"), q("id"), id)
}

#[allow(dead_code)]
pub fn outer_entry_path(id: i64) -> InstancePath {
    outer_list_path().node(outer_entry_arg(id))
}

#[allow(dead_code)]
pub fn outer_entry(id: i64) -> DataNode {
    MapEntryBuilder::new(q("outer-list")).key(q("id"), id).build()
}

/// Outer entry whose choice holds the given case leaf
#[allow(dead_code)]
pub fn outer_entry_with_case(id: i64, leaf_name: &str, value: &str) -> DataNode {
    MapEntryBuilder::new(q("outer-list"))
        .key(q("id"), id)
        .child(
            ChoiceBuilder::new(q("outer-choice"))
                .child(datatree_core::model::builders::leaf(q(leaf_name), value))
                .build(),
        )
        .build()
}

#[allow(dead_code)]
pub fn outer_list(ids: &[i64]) -> DataNode {
    ids.iter()
        .fold(MapBuilder::system(q("outer-list")), |b, id| b.entry(outer_entry(*id)))
        .build()
}

/// `test` container holding an outer list with `ids`
#[allow(dead_code)]
pub fn test_container(ids: &[i64]) -> DataNode {
    container(q("test")).child(outer_list(ids)).build()
}

/// Seal, validate, prepare and commit; returns the root modification type
#[allow(dead_code)]
pub fn commit(tree: &DataTree, mut modification: DataTreeModification) -> Result<ModificationType> {
    if !modification.is_sealed() {
        modification.ready()?;
    }
    tree.validate(&modification)?;
    let candidate = tree.prepare(&modification)?;
    let root_type = candidate.root_node().modification_type();
    tree.commit(candidate)?;
    Ok(root_type)
}

/// Keys of the entries of a map node, in data order
#[allow(dead_code)]
pub fn entry_ids(map: &DataNode) -> Vec<i64> {
    map.children()
        .map(|c| {
            c.values()
                .filter_map(|e| e.child(&PathArg::node(q("id"))))
                .filter_map(|leaf| leaf.value().and_then(|v| v.as_i128()))
                .filter_map(|v| i64::try_from(v).ok())
                .collect()
        })
        .unwrap_or_default()
}
