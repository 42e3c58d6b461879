//! Schema capability
//!
//! A programmatic stand-in for a compiled YANG model: node kinds, config
//! flags, cardinality, unique constraints and leaf types.

mod context;
mod node;
mod types;

pub use context::{SchemaContext, SchemaContextBuilder};
pub use node::{CaseSchema, ListSchema, SchemaKind, SchemaNode};
pub use types::{BaseType, LeafType};
