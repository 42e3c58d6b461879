//! Versioned, copy-on-write tree nodes

mod tree_node;
mod version;

pub use tree_node::TreeNode;
pub(crate) use tree_node::MutableTreeNode;
pub use version::Version;
pub(crate) use version::VersionCounter;
