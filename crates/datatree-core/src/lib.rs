//! Data Tree Core - in-memory, schema-validated transactional data store
//!
//! This crate provides the engine behind a hierarchical configuration and
//! operational datastore, including:
//! - Immutable document model (containers, lists, leaf-lists, choices, anydata)
//! - Versioned copy-on-write tree nodes with cheap snapshots
//! - Per-transaction modification trees (write/merge/delete)
//! - Schema-aware apply strategies with mandatory, min/max, unique and case checks
//! - Optimistic concurrency: validate against the live root, compare-and-swap commit
//! - Candidate diffs with rerooting and replay, plus a leafref validation pass
//!
//! # Example
//!
//! ```
//! use datatree_core::model::{builders::{container, leaf}, InstancePath, QName};
//! use datatree_core::schema::{LeafType, SchemaContext, SchemaNode};
//! use datatree_core::{DataTree, ModificationType, TreeConfig};
//!
//! let top = QName::new("urn:example", "top");
//! let name = top.sibling("name");
//! let schema = SchemaContext::new([SchemaNode::container(top.clone())
//!     .child(SchemaNode::leaf(name.clone(), LeafType::string()))]);
//! let tree = DataTree::create(schema, TreeConfig::default_configuration()).unwrap();
//!
//! let mut m = tree.take_snapshot().new_modification();
//! m.merge(&InstancePath::of([top.clone()]), container(top.clone()).build()).unwrap();
//! m.ready().unwrap();
//! tree.validate(&m).unwrap();
//! let candidate = tree.prepare(&m).unwrap();
//!
//! // an empty non-presence container is not created
//! assert_eq!(candidate.root_node().modification_type(), ModificationType::Unmodified);
//! ```

pub mod candidate;
pub mod config;
pub mod data_tree;
pub mod errors;
pub mod leafref;
pub mod logging_facility;
pub mod model;
pub mod modification;
pub mod schema;
mod strategy;
pub mod tree;

// Re-export commonly used types
pub use candidate::{CandidateNode, DataTreeCandidate};
pub use config::{TreeConfig, TreeType};
pub use data_tree::{DataTree, DataTreeSnapshot};
pub use errors::{DataTreeError, ExError, ExErrorKind, Result};
pub use leafref::validate_leafrefs;
pub use modification::{DataTreeModification, LogicalOperation, ModificationType};
