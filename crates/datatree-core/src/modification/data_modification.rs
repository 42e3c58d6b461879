use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use datatree_core_types::RequestContext;

use crate::data_tree::{DataTreeSnapshot, TreeContext};
use crate::errors::{DataTreeError, Result};
use crate::logging_facility::{elapsed_ms, request_span};
use crate::model::{DataNode, InstancePath};
use crate::strategy::ApplyStrategy;
use crate::tree::{TreeNode, Version};
use crate::{log_op_end, log_op_error, log_op_start};

use super::ModifiedNode;

/// Pending changes against one snapshot
///
/// Paths are relative to the tree root. Operations compose in call order;
/// [`ready`](Self::ready) freezes the modification so the tree can validate,
/// prepare and commit it.
///
/// # Example
///
/// ```
/// use datatree_core::model::{builders::leaf, InstancePath, QName};
/// use datatree_core::schema::{LeafType, SchemaContext, SchemaNode};
/// use datatree_core::{DataTree, TreeConfig};
///
/// let name = QName::new("urn:example", "hostname");
/// let schema = SchemaContext::new([SchemaNode::leaf(name.clone(), LeafType::string())]);
/// let tree = DataTree::create(schema, TreeConfig::default_configuration()).unwrap();
///
/// let mut m = tree.take_snapshot().new_modification();
/// let path = InstancePath::of([name.clone()]);
/// m.write(&path, leaf(name.clone(), "router-1")).unwrap();
/// assert_eq!(m.read_node(&path).unwrap(), Some(leaf(name, "router-1")));
/// ```
#[derive(Debug)]
pub struct DataTreeModification {
    snapshot: DataTreeSnapshot,
    root: ModifiedNode,
    version: Version,
    sealed: bool,
    /// Root of the last successful validation
    validated_root: Mutex<Option<TreeNode>>,
    request: Option<RequestContext>,
}

impl DataTreeModification {
    pub(crate) fn new(snapshot: DataTreeSnapshot) -> Self {
        let context = snapshot.context();
        let root = ModifiedNode::new(context.root_identifier.clone(), Some(snapshot.root().clone()));
        let version = context.counter.next();
        Self {
            snapshot,
            root,
            version,
            sealed: false,
            validated_root: Mutex::new(None),
            request: None,
        }
    }

    /// Tag this modification's `ready`, `validate`, `prepare` and `commit`
    /// log events with the caller's correlation ids
    pub fn with_request_context(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    pub fn request_context(&self) -> Option<&RequestContext> {
        self.request.as_ref()
    }

    /// Replace the node at `path` with `data`
    ///
    /// Missing ancestors are recorded as touched; existing siblings stay.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` once sealed, `InvalidInput` when the identifier
    /// of `data` differs from the last path argument, and `SchemaValidation`
    /// when the path or the node kind is not in the schema.
    pub fn write(&mut self, path: &InstancePath, data: DataNode) -> Result<()> {
        self.check_open()?;
        self.check_identifier(path, &data)?;
        self.resolve(path, |node, strategy, _| {
            strategy.verify_value(&data, path)?;
            node.write(data);
            Ok(())
        })
    }

    /// Merge `data` into whatever exists at `path`
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn merge(&mut self, path: &InstancePath, data: DataNode) -> Result<()> {
        self.check_open()?;
        self.check_identifier(path, &data)?;
        self.resolve(path, |node, strategy, version| {
            strategy.verify_value(&data, path)?;
            node.merge_into(strategy, data, version, path)
        })
    }

    /// Remove the node at `path`; deleting a missing node is allowed
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` once sealed and `SchemaValidation` for paths
    /// outside the schema.
    pub fn delete(&mut self, path: &InstancePath) -> Result<()> {
        self.check_open()?;
        self.resolve(path, |node, _, _| {
            node.delete();
            Ok(())
        })
    }

    /// Node at `path` as this modification would leave it
    ///
    /// # Errors
    ///
    /// Returns constraint violations found while applying the pending
    /// operations above `path`.
    pub fn read_node(&self, path: &InstancePath) -> Result<Option<DataNode>> {
        let (depth, closest) = self.root.find_closest(path.args());
        let closest_path = path.ancestor(depth);
        let Some(strategy) = self.strategy_at(&closest_path) else {
            return Ok(None);
        };
        let applied = strategy.apply(closest, closest.original(), self.version, &closest_path)?;
        Ok(applied
            .node
            .and_then(|node| node.data().find(&path.args()[depth..]).cloned()))
    }

    /// Freeze this modification
    ///
    /// Collapses written subtrees and runs the full structure check on every
    /// written value: mandatory descendants, element counts and unique
    /// constraints.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` when already sealed and the first violation
    /// found otherwise. A failed seal leaves the modification open.
    pub fn ready(&mut self) -> Result<()> {
        let _span = request_span(self.request.as_ref()).entered();
        let start = Instant::now();
        log_op_start!("ready", tx_version = self.version.value());

        let result = if self.sealed {
            Err(DataTreeError::illegal_state(
                "Attempted to seal an already sealed modification",
            ))
        } else {
            let context = Arc::clone(self.snapshot.context());
            self.root
                .seal(&context.strategy, self.version, &InstancePath::empty())
        };

        match &result {
            Ok(()) => {
                self.sealed = true;
                log_op_end!("ready", duration_ms = elapsed_ms(start));
            }
            Err(err) => log_op_error!("ready", err, duration_ms = elapsed_ms(start)),
        }
        result
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Modification based on the state this sealed modification produces
    ///
    /// A request context carries over as a child span.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` when this modification is not sealed, and any
    /// violation found while applying it.
    pub fn new_modification(&self) -> Result<DataTreeModification> {
        if !self.sealed {
            return Err(DataTreeError::illegal_state(
                "Attempted to chain on an unsealed modification",
            ));
        }
        let context = self.snapshot.context();
        let applied = context.strategy.apply(
            &self.root,
            Some(self.snapshot.root()),
            self.version,
            &InstancePath::empty(),
        )?;
        let root = match applied.node {
            Some(root) => root,
            None => context.empty_root(self.version)?,
        };
        let mut chained = DataTreeModification::new(DataTreeSnapshot::new(root, Arc::clone(context)));
        chained.request = self.request.as_ref().map(RequestContext::child_span);
        Ok(chained)
    }

    pub fn snapshot(&self) -> &DataTreeSnapshot {
        &self.snapshot
    }

    pub(crate) fn root(&self) -> &ModifiedNode {
        &self.root
    }

    pub(crate) fn context(&self) -> &Arc<TreeContext> {
        self.snapshot.context()
    }

    pub(crate) fn record_validated(&self, root: &TreeNode) {
        let mut validated = self
            .validated_root
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *validated = Some(root.clone());
    }

    /// Whether the last successful validation ran against exactly `root`
    pub(crate) fn validated_against(&self, root: &TreeNode) -> bool {
        self.validated_root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|validated| validated.ptr_eq(root))
    }

    fn check_open(&self) -> Result<()> {
        if self.sealed {
            return Err(DataTreeError::illegal_state(
                "Attempted to modify a sealed modification",
            ));
        }
        Ok(())
    }

    fn check_identifier(&self, path: &InstancePath, data: &DataNode) -> Result<()> {
        let expected = path
            .last()
            .unwrap_or(&self.snapshot.context().root_identifier);
        let actual = data.identifier();
        if &actual != expected {
            return Err(DataTreeError::InvalidInput {
                message: format!(
                    "Instance identifier references {} but data identifier is {}",
                    expected, actual
                ),
            });
        }
        Ok(())
    }

    fn strategy_at(&self, path: &InstancePath) -> Option<&ApplyStrategy> {
        let mut strategy = &self.snapshot.context().strategy;
        for arg in path.args() {
            strategy = strategy.child(arg)?;
        }
        Some(strategy)
    }

    /// Walk to the node for `path`, creating TOUCH nodes on the way, then run
    /// `record` on it
    fn resolve<F>(&mut self, path: &InstancePath, record: F) -> Result<()>
    where
        F: FnOnce(&mut ModifiedNode, &ApplyStrategy, Version) -> Result<()>,
    {
        let context = Arc::clone(self.snapshot.context());
        let version = self.version;
        let mut strategy = &context.strategy;
        let mut node = &mut self.root;
        let mut current = InstancePath::empty();
        for arg in path.args() {
            current.push(arg.clone());
            let child = strategy.child(arg).ok_or_else(|| {
                DataTreeError::schema(
                    &current,
                    format!("Child {} is not present in schema tree.", current),
                )
            })?;
            node = node.modify_child(arg, child, version, &current)?;
            strategy = child;
        }
        record(node, strategy, version)
    }
}

impl fmt::Display for DataTreeModification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DataTreeModification sealed={}", self.sealed)?;
        self.root.write_pretty(f, None, 0)
    }
}
