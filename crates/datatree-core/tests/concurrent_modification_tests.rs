#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use datatree_core::model::builders::{container, leaf};
use datatree_core::model::InstancePath;
use datatree_core::{DataTreeError, ModificationType};

fn name_path() -> InstancePath {
    test_path().node(q("name"))
}

#[test]
fn test_write_write_same_container_conflicts() {
    // GIVEN two modifications from the same empty snapshot
    let tree = configuration_tree(test_schema());
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.write(&test_path(), test_container(&[1])).unwrap();
    m2.write(&test_path(), test_container(&[2])).unwrap();

    // WHEN the first commits
    commit(&tree, m1).unwrap();

    // THEN the second no longer validates
    m2.ready().unwrap();
    let err = tree.validate(&m2).unwrap_err();
    assert!(matches!(err, DataTreeError::Conflict { .. }), "{err:?}");
    assert_eq!(err.to_string(), "Node was created by other transaction.");
    assert_eq!(err.path(), Some(&test_path()));
}

#[test]
fn test_write_then_merge_same_container_unions() {
    // GIVEN a write and a merge of the same container from one snapshot
    let tree = configuration_tree(test_schema());
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.write(&test_path(), test_container(&[1])).unwrap();
    m2.merge(&test_path(), test_container(&[2])).unwrap();

    // WHEN both commit in order
    commit(&tree, m1).unwrap();
    commit(&tree, m2).unwrap();

    // THEN the list holds both entries
    let list = tree.take_snapshot().read_node(&outer_list_path()).unwrap();
    let mut ids = entry_ids(&list);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_merge_then_write_same_container_conflicts() {
    let tree = configuration_tree(test_schema());
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.merge(&test_path(), test_container(&[1])).unwrap();
    m2.write(&test_path(), test_container(&[2])).unwrap();

    commit(&tree, m1).unwrap();

    m2.ready().unwrap();
    assert!(matches!(
        tree.validate(&m2),
        Err(DataTreeError::Conflict { .. })
    ));
}

#[test]
fn test_write_container_and_merge_list_entry_yields_both() {
    // GIVEN M1 writing test with entry 1 and M2 merging entry 2 into the list
    let tree = configuration_tree(test_schema());
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.write(&test_path(), test_container(&[1])).unwrap();
    m2.merge(&outer_list_path(), outer_list(&[2])).unwrap();

    // WHEN M1 then M2 commit
    commit(&tree, m1).unwrap();
    commit(&tree, m2).unwrap();

    // THEN reading outer-list yields {1, 2}
    let list = tree.take_snapshot().read_node(&outer_list_path()).unwrap();
    let mut ids = entry_ids(&list);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_disjoint_entry_writes_both_commit() {
    // GIVEN a committed list with entry 3
    let tree = configuration_tree(test_schema());
    let mut init = tree.take_snapshot().new_modification();
    init.write(&test_path(), test_container(&[3])).unwrap();
    commit(&tree, init).unwrap();

    // WHEN two modifications write different entries
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.write(&outer_entry_path(1), outer_entry(1)).unwrap();
    m2.write(&outer_entry_path(2), outer_entry(2)).unwrap();
    commit(&tree, m1).unwrap();

    // THEN the second still applies and the result is the union
    commit(&tree, m2).unwrap();
    let list = tree.take_snapshot().read_node(&outer_list_path()).unwrap();
    let mut ids = entry_ids(&list);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_write_write_existing_leaf_conflicts() {
    // GIVEN a committed leaf
    let tree = configuration_tree(test_schema());
    let mut init = tree.take_snapshot().new_modification();
    init.write(&test_path(), container(q("test")).child(leaf(q("name"), "a")).build())
        .unwrap();
    commit(&tree, init).unwrap();

    // WHEN two modifications replace it with different values
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.write(&name_path(), leaf(q("name"), "b")).unwrap();
    m2.write(&name_path(), leaf(q("name"), "c")).unwrap();
    commit(&tree, m1).unwrap();

    // THEN the second reports the replacement
    m2.ready().unwrap();
    let err = tree.validate(&m2).unwrap_err();
    assert_eq!(err.to_string(), "Node was replaced by other transaction.");
    assert_eq!(err.path(), Some(&name_path()));
}

#[test]
fn test_blind_merges_of_new_leaf_commute() {
    // GIVEN an existing container without the leaf
    let tree = configuration_tree(test_schema());
    let mut init = tree.take_snapshot().new_modification();
    init.write(&test_path(), test_container(&[1])).unwrap();
    commit(&tree, init).unwrap();

    // WHEN two modifications merge the same value
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.merge(&name_path(), leaf(q("name"), "x")).unwrap();
    m2.merge(&name_path(), leaf(q("name"), "x")).unwrap();

    // THEN both commit and the second changes nothing
    commit(&tree, m1).unwrap();
    let second = commit(&tree, m2).unwrap();
    assert_eq!(second, ModificationType::Unmodified);
    assert_eq!(
        tree.take_snapshot().read_node(&name_path()),
        Some(leaf(q("name"), "x"))
    );
}

#[test]
fn test_delete_then_modify_below_deleted_entry_fails() {
    // GIVEN an entry with an inner list
    let tree = configuration_tree(test_schema());
    let mut init = tree.take_snapshot().new_modification();
    init.write(&test_path(), test_container(&[1])).unwrap();
    commit(&tree, init).unwrap();

    // WHEN one transaction deletes the entry and another writes below it
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.delete(&outer_entry_path(1)).unwrap();
    let choice_leaf = outer_entry_path(1).node(q("outer-choice")).node(q("one"));
    m2.write(&choice_leaf, leaf(q("one"), "x")).unwrap();
    commit(&tree, m1).unwrap();

    // THEN the second sees the entry deleted by the first
    m2.ready().unwrap();
    let err = tree.validate(&m2).unwrap_err();
    assert_eq!(err.to_string(), "Node was deleted by other transaction.");
}

#[test]
fn test_stale_candidate_rejected_then_reprepared() {
    // GIVEN two candidates prepared against the same root
    let tree = configuration_tree(test_schema());
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.write(&outer_entry_path(1), outer_entry(1)).unwrap();
    m2.write(&outer_entry_path(2), outer_entry(2)).unwrap();
    m1.ready().unwrap();
    m2.ready().unwrap();
    let c1 = tree.prepare(&m1).unwrap();
    let c2 = tree.prepare(&m2).unwrap();

    // WHEN the first commits
    tree.commit(c1).unwrap();

    // THEN the second candidate is stale
    let err = tree.commit(c2).unwrap_err();
    assert!(matches!(err, DataTreeError::IllegalState { .. }));
    assert_eq!(err.to_string(), "Store tree and candidate base differ");

    // AND re-validating and re-preparing the same modification succeeds
    tree.validate(&m2).unwrap();
    let c2 = tree.prepare(&m2).unwrap();
    tree.commit(c2).unwrap();
    let list = tree.take_snapshot().read_node(&outer_list_path()).unwrap();
    assert_eq!(list.children().map(|c| c.len()), Some(2));
}

#[test]
fn test_prepare_rechecks_when_root_moved_after_validate() {
    // GIVEN two writes of the same container, the second already validated
    let tree = configuration_tree(test_schema());
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.write(&test_path(), test_container(&[1])).unwrap();
    m2.write(&test_path(), test_container(&[2])).unwrap();
    m2.ready().unwrap();
    tree.validate(&m2).unwrap();

    // WHEN the first commits in between
    commit(&tree, m1).unwrap();

    // THEN preparing the second reports the conflict instead of overwriting
    let err = tree.prepare(&m2).unwrap_err();
    assert!(matches!(err, DataTreeError::Conflict { .. }), "{err:?}");
    assert_eq!(err.to_string(), "Node was created by other transaction.");
    assert_eq!(err.path(), Some(&test_path()));
    let list = tree.take_snapshot().read_node(&outer_list_path()).unwrap();
    assert_eq!(entry_ids(&list), vec![1]);
}

#[test]
fn test_prepare_after_moved_root_accepts_commuting_change() {
    // GIVEN two blind merges of the same leaf, the second already validated
    let tree = configuration_tree(test_schema());
    let mut init = tree.take_snapshot().new_modification();
    init.write(&test_path(), test_container(&[1])).unwrap();
    commit(&tree, init).unwrap();
    let snapshot = tree.take_snapshot();
    let mut m1 = snapshot.new_modification();
    let mut m2 = snapshot.new_modification();
    m1.merge(&name_path(), leaf(q("name"), "x")).unwrap();
    m2.merge(&name_path(), leaf(q("name"), "x")).unwrap();
    m2.ready().unwrap();
    tree.validate(&m2).unwrap();

    // WHEN the first commits in between
    commit(&tree, m1).unwrap();

    // THEN the second still prepares and commits without a change
    let candidate = tree.prepare(&m2).unwrap();
    assert_eq!(
        candidate.root_node().modification_type(),
        ModificationType::Unmodified
    );
    tree.commit(candidate).unwrap();
}

#[test]
fn test_snapshot_is_isolated_from_later_commits() {
    let tree = configuration_tree(test_schema());
    let before = tree.take_snapshot();

    let mut m = before.new_modification();
    m.write(&test_path(), test_container(&[1])).unwrap();
    commit(&tree, m).unwrap();

    assert!(before.read_node(&test_path()).is_none());
    assert!(tree.take_snapshot().read_node(&test_path()).is_some());
}
