#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use datatree_core::model::builders::{container, leaf};
use datatree_core::tree::{TreeNode, Version};

const ROOT: &str = "(urn:ietf:params:xml:ns:netconf:base:1.0)data";

fn sample() -> datatree_core::model::DataNode {
    container(q("test"))
        .child(outer_list(&[1]))
        .child(leaf(q("name"), "a"))
        .build()
}

#[test]
fn test_data_node_renders_one_node_per_line() {
    assert_eq!(
        sample().pretty_tree().to_string(),
        [
            "(urn:test:datatree)test",
            "    outer-list",
            "        outer-list[{id=1}]",
            "            id 1",
            "    name \"a\"",
        ]
        .join("\n")
    );
}

#[test]
fn test_tree_node_shows_versions_then_data() {
    let node = TreeNode::from_data(leaf(q("name"), "a"), Version::initial());

    assert_eq!(
        node.to_string(),
        "TreeNode version=v0 subtree_version=v0\n(urn:test:datatree)name \"a\""
    );
}

#[test]
fn test_modification_shows_recorded_operations() {
    // GIVEN an entry written below two untouched ancestors
    let tree = configuration_tree(test_schema());
    let mut m = tree.take_snapshot().new_modification();
    m.write(&outer_entry_path(1), outer_entry(1)).unwrap();

    // WHEN rendered
    let text = m.to_string();

    // THEN ancestors show TOUCH and the entry shows WRITE
    assert_eq!(
        text,
        [
            "DataTreeModification sealed=false",
            format!("{ROOT} TOUCH").as_str(),
            "    (urn:test:datatree)test TOUCH",
            "        outer-list TOUCH",
            "            outer-list[{id=1}] WRITE",
        ]
        .join("\n")
    );
}

#[test]
fn test_data_tree_shows_config_and_committed_root() {
    // GIVEN committed content
    let tree = configuration_tree(test_schema());
    let mut m = tree.take_snapshot().new_modification();
    m.write(&test_path(), sample()).unwrap();
    commit(&tree, m).unwrap();

    // WHEN rendered
    let text = tree.to_string();
    let lines: Vec<&str> = text.lines().collect();

    // THEN the header is followed by the root node and its data
    assert_eq!(lines[0], "DataTree tree_type=Configuration root_path=/");
    assert!(lines[1].starts_with("TreeNode version="), "{text}");
    assert_eq!(lines[2], ROOT);
    assert_eq!(lines[3], "    (urn:test:datatree)test");
    assert_eq!(lines[7], "        name \"a\"");
    assert_eq!(lines.len(), 8);
}
