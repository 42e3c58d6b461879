//! Transaction-local modifications
//!
//! A [`DataTreeModification`] records write, merge and delete calls as a tree
//! of pending operations. Nothing is applied to shared state until the tree
//! prepares and commits it.

mod data_modification;
mod modified_node;
mod operation;

pub use data_modification::DataTreeModification;
pub(crate) use modified_node::ModifiedNode;
pub use operation::{LogicalOperation, ModificationType};
