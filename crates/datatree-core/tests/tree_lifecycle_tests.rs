#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use datatree_core::errors::{ExError, ExErrorKind};
use datatree_core::model::builders::{container, leaf};
use datatree_core::model::{InstancePath, PathArg};
use datatree_core::schema::{LeafType, SchemaContext, SchemaNode};
use datatree_core::{DataTree, DataTreeError, ModificationType, TreeConfig};

fn name_path() -> InstancePath {
    test_path().node(q("name"))
}

fn with_name(tree: &DataTree, value: &str) {
    let mut m = tree.take_snapshot().new_modification();
    m.write(&name_path(), leaf(q("name"), value)).unwrap();
    commit(tree, m).unwrap();
}

// ---------- structural nodes ----------

#[test]
fn test_leaf_below_missing_container_makes_it_appear() {
    // GIVEN an empty tree
    let tree = configuration_tree(test_schema());

    // WHEN a leaf is written below the absent structural container
    let mut m = tree.take_snapshot().new_modification();
    m.write(&name_path(), leaf(q("name"), "a")).unwrap();
    m.ready().unwrap();
    tree.validate(&m).unwrap();
    let candidate = tree.prepare(&m).unwrap();

    // THEN the container appears in the candidate
    let root = candidate.root_node();
    assert_eq!(root.modification_type(), ModificationType::SubtreeModified);
    let test = root.modified_child(&PathArg::node(q("test"))).unwrap();
    assert_eq!(test.modification_type(), ModificationType::Appeared);
    assert!(test.data_before().is_none());
    let name = test.modified_child(&PathArg::node(q("name"))).unwrap();
    assert_eq!(name.modification_type(), ModificationType::Write);

    tree.commit(candidate).unwrap();
    assert_eq!(
        tree.take_snapshot().read_node(&name_path()),
        Some(leaf(q("name"), "a"))
    );
}

#[test]
fn test_removing_last_child_makes_container_disappear() {
    let tree = configuration_tree(test_schema());
    with_name(&tree, "a");

    let mut m = tree.take_snapshot().new_modification();
    m.delete(&name_path()).unwrap();
    m.ready().unwrap();
    let candidate = tree.prepare(&m).unwrap();

    let test = candidate
        .root_node()
        .modified_child(&PathArg::node(q("test")))
        .unwrap();
    assert_eq!(test.modification_type(), ModificationType::Disappeared);
    assert!(test.data_after().is_none());

    tree.commit(candidate).unwrap();
    assert!(tree.take_snapshot().read_node(&test_path()).is_none());
}

#[test]
fn test_delete_of_never_written_node_changes_nothing() {
    // GIVEN an empty tree
    let tree = configuration_tree(test_schema());

    // WHEN a node that never existed is deleted
    let mut m = tree.take_snapshot().new_modification();
    m.delete(&name_path()).unwrap();

    // THEN the whole transaction is a no-op
    let root_type = commit(&tree, m).unwrap();
    assert_eq!(root_type, ModificationType::Unmodified);
    assert!(tree.take_snapshot().read_node(&test_path()).is_none());
}

#[test]
fn test_empty_modification_commits_as_unmodified() {
    let tree = configuration_tree(test_schema());
    with_name(&tree, "a");
    let before = tree.take_snapshot();

    let root_type = commit(&tree, before.new_modification()).unwrap();

    assert_eq!(root_type, ModificationType::Unmodified);
    assert_eq!(
        tree.take_snapshot().read_node(&InstancePath::empty()),
        before.read_node(&InstancePath::empty())
    );
}

#[test]
fn test_written_empty_structural_container_is_elided() {
    let tree = configuration_tree(test_schema());
    let mut m = tree.take_snapshot().new_modification();
    m.write(&test_path(), container(q("test")).build()).unwrap();

    let root_type = commit(&tree, m).unwrap();

    assert_eq!(root_type, ModificationType::Unmodified);
    assert!(tree.take_snapshot().read_node(&test_path()).is_none());
}

#[test]
fn test_merged_nested_empty_list_is_not_stored() {
    // GIVEN an empty tree
    let tree = configuration_tree(test_schema());

    // WHEN merging a container that only holds an empty list
    let mut m = tree.take_snapshot().new_modification();
    m.merge(&test_path(), test_container(&[])).unwrap();
    let root_type = commit(&tree, m).unwrap();

    // THEN nothing appears
    assert_eq!(root_type, ModificationType::Unmodified);
    let snapshot = tree.take_snapshot();
    assert!(snapshot.read_node(&outer_list_path()).is_none());
    assert!(snapshot.read_node(&test_path()).is_none());
}

#[test]
fn test_written_nested_empty_list_is_dropped() {
    // GIVEN a write of a container with a leaf and an empty list
    let tree = configuration_tree(test_schema());
    let mut m = tree.take_snapshot().new_modification();
    m.write(
        &test_path(),
        container(q("test"))
            .child(outer_list(&[]))
            .child(leaf(q("name"), "a"))
            .build(),
    )
    .unwrap();

    // WHEN it commits
    let root_type = commit(&tree, m).unwrap();

    // THEN the leaf is stored and the empty list is not
    assert_eq!(root_type, ModificationType::SubtreeModified);
    let snapshot = tree.take_snapshot();
    assert!(snapshot.read_node(&outer_list_path()).is_none());
    assert_eq!(
        snapshot.read_node(&test_path()),
        Some(container(q("test")).child(leaf(q("name"), "a")).build())
    );
}

#[test]
fn test_sealed_write_drops_emptied_nested_list() {
    // GIVEN a written container whose only entry is deleted before sealing
    let tree = configuration_tree(test_schema());
    let mut m = tree.take_snapshot().new_modification();
    m.write(&test_path(), test_container(&[1])).unwrap();
    m.delete(&outer_entry_path(1)).unwrap();

    // WHEN it commits
    let root_type = commit(&tree, m).unwrap();

    // THEN neither the list nor the container remains
    assert_eq!(root_type, ModificationType::Unmodified);
    assert!(tree.take_snapshot().read_node(&test_path()).is_none());
}

#[test]
fn test_pending_read_after_delete_returns_nothing() {
    // GIVEN a pending write of two entries
    let tree = configuration_tree(test_schema());
    let mut m = tree.take_snapshot().new_modification();
    m.write(&test_path(), test_container(&[1, 2])).unwrap();

    // WHEN one entry is deleted
    m.delete(&outer_entry_path(1)).unwrap();

    // THEN it reads as absent while its sibling is still there
    assert_eq!(m.read_node(&outer_entry_path(1)).unwrap(), None);
    assert_eq!(
        m.read_node(&outer_entry_path(2)).unwrap(),
        Some(outer_entry(2))
    );

    // AND deleting the container hides everything below it
    m.delete(&test_path()).unwrap();
    assert_eq!(m.read_node(&outer_entry_path(2)).unwrap(), None);
    assert_eq!(m.read_node(&test_path()).unwrap(), None);
}

#[test]
fn test_empty_presence_container_is_kept() {
    let schema = SchemaContext::new([SchemaNode::presence_container(q("enabled"))
        .child(SchemaNode::leaf(q("mode"), LeafType::string()))]);
    let tree = configuration_tree(schema);
    let path = InstancePath::of([q("enabled")]);

    let mut m = tree.take_snapshot().new_modification();
    m.write(&path, container(q("enabled")).build()).unwrap();
    let root_type = commit(&tree, m).unwrap();

    assert_eq!(root_type, ModificationType::SubtreeModified);
    assert_eq!(
        tree.take_snapshot().read_node(&path),
        Some(container(q("enabled")).build())
    );
}

#[test]
fn test_touch_below_missing_presence_container_fails() {
    let schema = SchemaContext::new([SchemaNode::presence_container(q("enabled"))
        .child(SchemaNode::leaf(q("mode"), LeafType::string()))]);
    let tree = configuration_tree(schema);
    let path = InstancePath::of([q("enabled"), q("mode")]);

    let mut m = tree.take_snapshot().new_modification();
    m.write(&path, leaf(q("mode"), "on")).unwrap();
    m.ready().unwrap();

    let err = tree.validate(&m).unwrap_err();
    assert!(matches!(err, DataTreeError::NodeDoesNotExist { .. }));
    assert_eq!(err.path(), Some(&InstancePath::of([q("enabled")])));
}

// ---------- tree types ----------

fn state_schema() -> SchemaContext {
    SchemaContext::new([SchemaNode::container(q("top"))
        .child(SchemaNode::leaf(q("name"), LeafType::string()))
        .child(SchemaNode::leaf(q("counter"), LeafType::uint()).state())])
}

#[test]
fn test_configuration_tree_rejects_state_nodes() {
    let tree = configuration_tree(state_schema());
    let mut m = tree.take_snapshot().new_modification();

    let err = m
        .write(&InstancePath::of([q("top"), q("counter")]), leaf(q("counter"), 1u64))
        .unwrap_err();

    assert!(matches!(err, DataTreeError::SchemaValidation { .. }));
}

#[test]
fn test_operational_tree_accepts_state_nodes() {
    let tree = DataTree::create(state_schema(), TreeConfig::default_operational()).unwrap();
    let path = InstancePath::of([q("top"), q("counter")]);

    let mut m = tree.take_snapshot().new_modification();
    m.write(&path, leaf(q("counter"), 7u64)).unwrap();
    commit(&tree, m).unwrap();

    assert_eq!(tree.take_snapshot().read_node(&path), Some(leaf(q("counter"), 7u64)));
}

// ---------- reconfigure ----------

/// Same tree shape with `name` turned into an integer
fn int_name_schema() -> SchemaContext {
    SchemaContext::new([SchemaNode::container(q("test"))
        .child(SchemaNode::leaf(q("name"), LeafType::int()))])
}

#[test]
fn test_reconfigure_invalidates_outstanding_modifications() {
    // GIVEN a sealed modification
    let tree = configuration_tree(test_schema());
    let mut m = tree.take_snapshot().new_modification();
    m.write(&name_path(), leaf(q("name"), "a")).unwrap();
    m.ready().unwrap();

    // WHEN the tree switches schema
    tree.reconfigure(test_schema()).unwrap();

    // THEN the modification can no longer be used
    let err = tree.validate(&m).unwrap_err();
    assert!(matches!(err, DataTreeError::IllegalState { .. }));
    assert_eq!(
        err.to_string(),
        "Modification was created for schema generation 0 but the tree is at generation 1"
    );
    assert!(tree.prepare(&m).is_err());
}

#[test]
fn test_reconfigure_rejects_candidate_prepared_earlier() {
    let tree = configuration_tree(test_schema());
    let mut m = tree.take_snapshot().new_modification();
    m.write(&name_path(), leaf(q("name"), "a")).unwrap();
    m.ready().unwrap();
    let candidate = tree.prepare(&m).unwrap();

    tree.reconfigure(test_schema()).unwrap();

    let err = tree.commit(candidate).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Candidate was prepared for a schema that has since been replaced"
    );
}

#[test]
fn test_reconfigure_rejects_incompatible_stored_data() {
    // GIVEN a string stored where the new schema wants an integer
    let tree = configuration_tree(test_schema());
    with_name(&tree, "not-a-number");

    // WHEN reconfiguring
    let err = tree.reconfigure(int_name_schema()).unwrap_err();

    // THEN the tree reports the offending node and keeps its old schema
    assert!(matches!(err, DataTreeError::SchemaIncompatible { .. }));
    assert_eq!(err.path(), Some(&name_path()));
    assert!(err
        .to_string()
        .starts_with("Stored data does not fit the new schema: "));
    let ex: ExError = err.into();
    assert_eq!(ex.kind(), ExErrorKind::SchemaIncompatible);
    assert_eq!(ex.op(), Some("reconfigure"));

    with_name(&tree, "still-a-string");
}

#[test]
fn test_reconfigure_keeps_compatible_data() {
    // GIVEN stored data under the original schema
    let tree = configuration_tree(test_schema());
    with_name(&tree, "a");

    // WHEN the schema gains a leaf
    let extended = SchemaContext::new([SchemaNode::container(q("test"))
        .child(SchemaNode::leaf(q("name"), LeafType::string()))
        .child(SchemaNode::leaf(q("description"), LeafType::string()))]);
    tree.reconfigure(extended.clone()).unwrap();

    // THEN old data is readable and the new leaf writable
    assert!(tree.schema().ptr_eq(&extended));
    assert_eq!(
        tree.take_snapshot().read_node(&name_path()),
        Some(leaf(q("name"), "a"))
    );
    let description = test_path().node(q("description"));
    let mut m = tree.take_snapshot().new_modification();
    m.write(&description, leaf(q("description"), "d")).unwrap();
    commit(&tree, m).unwrap();
    assert!(tree.take_snapshot().read_node(&description).is_some());
}
