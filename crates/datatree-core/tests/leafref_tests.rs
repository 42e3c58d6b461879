#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use datatree_core::errors::{ExError, ExErrorKind};
use datatree_core::model::builders::{container, leaf, LeafSetBuilder, MapBuilder, MapEntryBuilder};
use datatree_core::model::{DataNode, InstancePath, PathArg};
use datatree_core::schema::{LeafType, SchemaContext, SchemaNode};
use datatree_core::{validate_leafrefs, DataTree, DataTreeCandidate, DataTreeError};

fn target() -> InstancePath {
    InstancePath::of([q("top"), q("interface"), q("name")])
}

/// ```text
/// container top {
///   list interface { key name; leaf name; }
///   container binding { leaf if-ref { type leafref { path /top/interface/name; } } }
///   leaf-list refs { type leafref { path /top/interface/name; } }
///   leaf description;
/// }
/// ```
fn schema() -> SchemaContext {
    SchemaContext::new([SchemaNode::container(q("top"))
        .child(
            SchemaNode::list(q("interface"), [q("name")])
                .child(SchemaNode::leaf(q("name"), LeafType::string())),
        )
        .child(
            SchemaNode::container(q("binding"))
                .child(SchemaNode::leaf(q("if-ref"), LeafType::leafref(target()))),
        )
        .child(SchemaNode::leaf_list(q("refs"), LeafType::leafref(target())))
        .child(SchemaNode::leaf(q("description"), LeafType::string()))])
}

fn top_path() -> InstancePath {
    InstancePath::of([q("top")])
}

fn interface_path(name: &str) -> InstancePath {
    top_path()
        .node(q("interface"))
        .node(PathArg::single_key(q("interface"), q("name"), name))
}

fn interfaces(names: &[&str]) -> DataNode {
    names
        .iter()
        .fold(MapBuilder::system(q("interface")), |b, n| {
            b.entry(MapEntryBuilder::new(q("interface")).key(q("name"), *n).build())
        })
        .build()
}

fn binding(value: &str) -> DataNode {
    container(q("binding")).child(leaf(q("if-ref"), value)).build()
}

fn prepared(tree: &DataTree, path: &InstancePath, data: Option<DataNode>) -> DataTreeCandidate {
    let mut m = tree.take_snapshot().new_modification();
    match data {
        Some(data) => m.write(path, data).unwrap(),
        None => m.delete(path).unwrap(),
    }
    m.ready().unwrap();
    tree.validate(&m).unwrap();
    tree.prepare(&m).unwrap()
}

fn seeded(top: DataNode) -> DataTree {
    let tree = configuration_tree(schema());
    let candidate = prepared(&tree, &top_path(), Some(top));
    tree.commit(candidate).unwrap();
    tree
}

#[test]
fn test_resolving_reference_passes() {
    let tree = configuration_tree(schema());
    let top = container(q("top"))
        .child(interfaces(&["eth0", "eth1"]))
        .child(binding("eth0"))
        .build();

    let candidate = prepared(&tree, &top_path(), Some(top));

    validate_leafrefs(&candidate, &tree.schema()).unwrap();
}

#[test]
fn test_dangling_reference_reported() {
    // GIVEN a binding to an interface that does not exist
    let tree = configuration_tree(schema());
    let top = container(q("top"))
        .child(interfaces(&["eth0", "eth1"]))
        .child(binding("eth9"))
        .build();
    let candidate = prepared(&tree, &top_path(), Some(top));

    // WHEN validating leafrefs
    let err = validate_leafrefs(&candidate, &tree.schema()).unwrap_err();

    // THEN the message names the value, the allowed values and the target
    match err {
        DataTreeError::LeafRefValidation { count, messages } => {
            assert_eq!(count, 1);
            assert_eq!(
                messages[0],
                format!(
                    "Invalid leafref value [eth9] allowed values [eth0, eth1] of LEAFREF node: {} leafRef target path: {}",
                    q("if-ref"),
                    target()
                )
            );
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_every_failure_is_collected() {
    // GIVEN three dangling values across a leaf and a leaf-list
    let tree = configuration_tree(schema());
    let top = container(q("top"))
        .child(interfaces(&["eth0"]))
        .child(binding("z"))
        .child(LeafSetBuilder::system(q("refs")).value("x").value("eth0").value("y").build())
        .build();
    let candidate = prepared(&tree, &top_path(), Some(top));

    // WHEN validating
    let err = validate_leafrefs(&candidate, &tree.schema()).unwrap_err();

    // THEN all of them are in one aggregate error
    let ex: ExError = err.into();
    assert_eq!(ex.kind(), ExErrorKind::LeafRefValidation);
    assert_eq!(ex.messages().map(<[String]>::len), Some(3));
}

#[test]
fn test_removing_referenced_target_is_detected() {
    // GIVEN a stored binding to eth0
    let tree = seeded(
        container(q("top"))
            .child(interfaces(&["eth0", "eth1"]))
            .child(binding("eth0"))
            .build(),
    );

    // WHEN eth0 is deleted
    let candidate = prepared(&tree, &interface_path("eth0"), None);

    // THEN the binding no longer resolves
    let err = validate_leafrefs(&candidate, &tree.schema()).unwrap_err();
    assert!(err.to_string().contains("Invalid leafref value [eth0] allowed values [eth1]"));
}

#[test]
fn test_unrelated_change_does_not_check_references() {
    // GIVEN a dangling reference already stored; commits do not check leafrefs
    let tree = seeded(container(q("top")).child(binding("eth9")).build());

    // WHEN an unrelated leaf changes
    let candidate = prepared(
        &tree,
        &top_path().node(q("description")),
        Some(leaf(q("description"), "d")),
    );

    // THEN the stale reference is not re-examined
    validate_leafrefs(&candidate, &tree.schema()).unwrap();
}

#[test]
fn test_rerooted_candidate_is_rejected() {
    let tree = configuration_tree(schema());
    let candidate = prepared(
        &tree,
        &top_path(),
        Some(container(q("top")).child(binding("eth0")).build()),
    );
    let rerooted = candidate.reroot(&top_path()).unwrap();

    let err = validate_leafrefs(&rerooted, &tree.schema()).unwrap_err();

    assert!(matches!(err, DataTreeError::InvalidInput { .. }));
}

#[test]
fn test_events_logged() {
    let capture = datatree_core::logging_facility::init_test_capture();
    let tree = configuration_tree(schema());
    let candidate = prepared(
        &tree,
        &top_path(),
        Some(container(q("top")).child(binding("missing")).build()),
    );

    validate_leafrefs(&candidate, &tree.schema()).unwrap_err();

    capture.assert_event_exists("validate_leafrefs", "start");
    capture.assert_event_exists("validate_leafrefs", "end_error");
}
