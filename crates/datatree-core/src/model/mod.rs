//! Document model: names, values, paths and immutable data nodes

pub mod builders;
mod node;
mod path;
mod pretty;
mod qname;
mod value;

pub use node::{Children, DataNode, NodeKind};
pub use path::{InstancePath, PathArg};
pub use pretty::PrettyTree;
pub(crate) use pretty::{indent, write_node, Label};
pub use qname::QName;
pub use value::Value;
