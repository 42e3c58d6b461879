//! Datastore root and commit coordinator
//!
//! ## Transaction lifecycle
//!
//! 1. [`DataTree::take_snapshot`] pins the current root.
//! 2. [`DataTreeSnapshot::new_modification`] starts recording changes.
//! 3. [`DataTreeModification::ready`] seals them.
//! 4. [`DataTree::validate`] checks them against the *current* root, which may
//!    be newer than the snapshot.
//! 5. [`DataTree::prepare`] applies them and yields a [`DataTreeCandidate`],
//!    validating again if another commit moved the root in between.
//! 6. [`DataTree::commit`] installs the candidate if the root has not moved
//!    since it was prepared.
//!
//! Snapshots are immutable and share structure with the live tree; reads
//! never take the commit lock for longer than an `Arc` clone.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Instant;

use crate::candidate::{DataTreeCandidate, PreparedState};
use crate::config::TreeConfig;
use crate::errors::{DataTreeError, Result};
use crate::logging_facility::{elapsed_ms, request_span};
use crate::model::{DataNode, InstancePath, PathArg};
use crate::modification::DataTreeModification;
use crate::schema::SchemaContext;
use crate::strategy::ApplyStrategy;
use crate::tree::{TreeNode, Version, VersionCounter};
use crate::{log_op_end, log_op_error, log_op_start};

/// Everything a tree derives from its schema and configuration
///
/// Replaced wholesale by [`DataTree::reconfigure`]; modifications remember
/// the context they were created under.
#[derive(Debug)]
pub(crate) struct TreeContext {
    pub(crate) schema: SchemaContext,
    pub(crate) config: TreeConfig,
    pub(crate) strategy: ApplyStrategy,
    pub(crate) root_identifier: PathArg,
    pub(crate) counter: VersionCounter,
    pub(crate) generation: u64,
}

impl TreeContext {
    fn new(
        schema: SchemaContext,
        config: TreeConfig,
        counter: VersionCounter,
        generation: u64,
    ) -> Result<Self> {
        let strategy = ApplyStrategy::for_tree(&schema, &config)?;
        let root_identifier = match config.root_path.last() {
            Some(arg) => arg.clone(),
            None => PathArg::node(schema.root().name().clone()),
        };
        Ok(Self {
            schema,
            config,
            strategy,
            root_identifier,
            counter,
            generation,
        })
    }

    /// Root node with no children, stamped with `version`
    pub(crate) fn empty_root(&self, version: Version) -> Result<TreeNode> {
        let data = self
            .strategy
            .empty_node(&self.root_identifier)
            .ok_or_else(|| DataTreeError::Internal {
                message: format!("tree root {} is not a container", self.root_identifier),
            })?;
        Ok(TreeNode::from_data(data, version))
    }
}

#[derive(Debug)]
struct TreeState {
    root: TreeNode,
    context: Arc<TreeContext>,
}

/// In-memory, schema-validated data tree
///
/// # Example
///
/// ```
/// use datatree_core::model::{builders::{container, leaf}, InstancePath, QName};
/// use datatree_core::schema::{LeafType, SchemaContext, SchemaNode};
/// use datatree_core::{DataTree, TreeConfig};
///
/// let system = QName::new("urn:example", "system");
/// let hostname = system.sibling("hostname");
/// let schema = SchemaContext::new([SchemaNode::container(system.clone())
///     .child(SchemaNode::leaf(hostname.clone(), LeafType::string()))]);
/// let tree = DataTree::create(schema, TreeConfig::default_configuration()).unwrap();
///
/// let mut m = tree.take_snapshot().new_modification();
/// let path = InstancePath::of([system.clone()]);
/// m.write(&path, container(system).child(leaf(hostname, "r1")).build()).unwrap();
/// m.ready().unwrap();
///
/// tree.validate(&m).unwrap();
/// let candidate = tree.prepare(&m).unwrap();
/// tree.commit(candidate).unwrap();
///
/// assert!(tree.take_snapshot().read_node(&path).is_some());
/// ```
#[derive(Debug)]
pub struct DataTree {
    state: RwLock<TreeState>,
}

impl DataTree {
    /// Create an empty tree for `schema`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `config.root_path` does not name a
    /// container or list entry of the schema.
    pub fn create(schema: SchemaContext, config: TreeConfig) -> Result<DataTree> {
        let counter = VersionCounter::new();
        let context = TreeContext::new(schema, config, counter, 0)?;
        let root = context.empty_root(context.counter.next())?;
        tracing::debug!(
            tree_type = ?context.config.tree_type,
            root_path = %context.config.root_path,
            "data tree created"
        );
        Ok(DataTree {
            state: RwLock::new(TreeState {
                root,
                context: Arc::new(context),
            }),
        })
    }

    /// Immutable view of the current root
    pub fn take_snapshot(&self) -> DataTreeSnapshot {
        let state = self.read_state();
        DataTreeSnapshot::new(state.root.clone(), Arc::clone(&state.context))
    }

    /// Schema the tree currently validates against
    pub fn schema(&self) -> SchemaContext {
        self.read_state().context.schema.clone()
    }

    /// Options the tree was created with
    pub fn config(&self) -> TreeConfig {
        self.read_state().context.config.clone()
    }

    // state is swapped in one assignment, so a poisoned lock still holds a
    // consistent root and context
    fn read_state(&self) -> RwLockReadGuard<'_, TreeState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Check a sealed modification against the current root
    ///
    /// Commutative changes made by other commits since the modification's
    /// snapshot are accepted; overlapping replacements are conflicts.
    ///
    /// # Errors
    ///
    /// * `IllegalState` - modification not sealed, or created before the last
    ///   reconfiguration
    /// * `Conflict` - another commit changed what this modification relies on
    /// * `NodeDoesNotExist` - children modified under a node that is gone
    /// * `MinMaxElements` - a list would end up out of bounds
    pub fn validate(&self, modification: &DataTreeModification) -> Result<()> {
        let _span = request_span(modification.request_context()).entered();
        let start = Instant::now();
        log_op_start!("validate");

        let result = self.state.read().map_err(DataTreeError::from).and_then(|state| {
            check_usable(&state, modification)?;
            state.context.strategy.check_applicable(
                modification.root(),
                Some(&state.root),
                &InstancePath::empty(),
            )?;
            modification.record_validated(&state.root);
            Ok(())
        });

        match &result {
            Ok(()) => log_op_end!("validate", duration_ms = elapsed_ms(start)),
            Err(err) => {
                tracing::debug!(path = ?err.path(), "modification does not apply to current tree");
                log_op_error!("validate", err, duration_ms = elapsed_ms(start));
            }
        }
        result
    }

    /// Apply a sealed modification to the current root
    ///
    /// The result is not visible until [`commit`](Self::commit). When the
    /// root is not the one the modification was last validated against, it
    /// is validated again first, under the same lock.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` for unsealed or invalidated modifications,
    /// `Conflict` when a commit since validation made it inapplicable, and
    /// any constraint violation found while applying.
    pub fn prepare(&self, modification: &DataTreeModification) -> Result<DataTreeCandidate> {
        let _span = request_span(modification.request_context()).entered();
        let start = Instant::now();
        log_op_start!("prepare");

        let result = self.state.read().map_err(DataTreeError::from).and_then(|state| {
            check_usable(&state, modification)?;
            if !modification.validated_against(&state.root) {
                tracing::debug!("root moved since validation, checking modification again");
                state.context.strategy.check_applicable(
                    modification.root(),
                    Some(&state.root),
                    &InstancePath::empty(),
                )?;
                modification.record_validated(&state.root);
            }
            let context = Arc::clone(&state.context);
            let version = context.counter.next();
            let applied = context.strategy.apply(
                modification.root(),
                Some(&state.root),
                version,
                &InstancePath::empty(),
            )?;
            let new_root = match applied.node {
                Some(root) => root,
                None => context.empty_root(version)?,
            };
            tracing::trace!(
                tx_version = version.value(),
                modification_type = %applied.candidate.modification_type(),
                "modification applied"
            );
            Ok(DataTreeCandidate::prepared(
                applied.candidate,
                PreparedState {
                    base: state.root.clone(),
                    new_root,
                    context,
                    request: modification.request_context().cloned(),
                },
            ))
        });

        match &result {
            Ok(candidate) => log_op_end!(
                "prepare",
                duration_ms = elapsed_ms(start),
                modification_type = %candidate.root_node().modification_type()
            ),
            Err(err) => log_op_error!("prepare", err, duration_ms = elapsed_ms(start)),
        }
        result
    }

    /// Install a prepared candidate
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` when the candidate was not prepared by a tree,
    /// was prepared under an older schema, or another commit moved the root
    /// since it was prepared ("Store tree and candidate base differ").
    pub fn commit(&self, candidate: DataTreeCandidate) -> Result<()> {
        let request = candidate.prepared.as_ref().and_then(|p| p.request.as_ref());
        let _span = request_span(request).entered();
        let start = Instant::now();
        log_op_start!("commit");

        let result = self.state.write().map_err(DataTreeError::from).and_then(|mut state| {
            let prepared = candidate.prepared.as_ref().ok_or_else(|| {
                DataTreeError::illegal_state("Candidate was not prepared by a data tree")
            })?;
            if !Arc::ptr_eq(&prepared.context, &state.context) {
                return Err(DataTreeError::illegal_state(
                    "Candidate was prepared for a schema that has since been replaced",
                ));
            }
            if !prepared.base.ptr_eq(&state.root) {
                return Err(DataTreeError::illegal_state(
                    "Store tree and candidate base differ",
                ));
            }
            state.root = prepared.new_root.clone();
            Ok(state.root.subtree_version())
        });

        match result {
            Ok(version) => {
                log_op_end!(
                    "commit",
                    duration_ms = elapsed_ms(start),
                    root_version = version.value()
                );
                Ok(())
            }
            Err(err) => {
                log_op_error!("commit", &err, duration_ms = elapsed_ms(start));
                Err(err)
            }
        }
    }

    /// Switch to a new schema
    ///
    /// Stored data is checked against the new schema in full. Modifications
    /// created before the switch can no longer be validated or prepared.
    ///
    /// # Errors
    ///
    /// Returns `SchemaIncompatible` when the stored data does not fit the new
    /// schema, and `InvalidInput` when the configured root path is not in it.
    pub fn reconfigure(&self, schema: SchemaContext) -> Result<()> {
        let start = Instant::now();
        log_op_start!("reconfigure");

        let result = self.state.write().map_err(DataTreeError::from).and_then(|mut state| {
            let current = &state.context;
            let context = TreeContext::new(
                schema,
                current.config.clone(),
                current.counter.clone(),
                current.generation + 1,
            )?;
            context
                .strategy
                .verify_stored(state.root.data(), &InstancePath::empty())
                .map_err(|err| DataTreeError::SchemaIncompatible {
                    path: err.path().cloned().unwrap_or_default(),
                    message: format!("Stored data does not fit the new schema: {}", err),
                })?;
            state.context = Arc::new(context);
            Ok(state.context.generation)
        });

        match result {
            Ok(generation) => {
                log_op_end!("reconfigure", duration_ms = elapsed_ms(start), generation = generation);
                Ok(())
            }
            Err(err) => {
                log_op_error!("reconfigure", &err, duration_ms = elapsed_ms(start));
                Err(err)
            }
        }
    }
}

impl fmt::Display for DataTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        writeln!(
            f,
            "DataTree tree_type={:?} root_path={}",
            state.context.config.tree_type, state.context.config.root_path
        )?;
        write!(f, "{}", state.root)
    }
}

fn check_usable(state: &TreeState, modification: &DataTreeModification) -> Result<()> {
    if !modification.is_sealed() {
        return Err(DataTreeError::illegal_state(
            "Modification must be sealed before it is validated or prepared",
        ));
    }
    if !Arc::ptr_eq(modification.context(), &state.context) {
        return Err(DataTreeError::illegal_state(format!(
            "Modification was created for schema generation {} but the tree is at generation {}",
            modification.context().generation,
            state.context.generation
        )));
    }
    Ok(())
}

/// Immutable point-in-time view of a tree
#[derive(Debug, Clone)]
pub struct DataTreeSnapshot {
    root: TreeNode,
    context: Arc<TreeContext>,
}

impl DataTreeSnapshot {
    pub(crate) fn new(root: TreeNode, context: Arc<TreeContext>) -> Self {
        Self { root, context }
    }

    pub fn read_node(&self, path: &InstancePath) -> Option<DataNode> {
        self.root.data().find(path.args()).cloned()
    }

    pub fn new_modification(&self) -> DataTreeModification {
        DataTreeModification::new(self.clone())
    }

    pub fn schema(&self) -> &SchemaContext {
        &self.context.schema
    }

    pub fn config(&self) -> &TreeConfig {
        &self.context.config
    }

    pub(crate) fn root(&self) -> &TreeNode {
        &self.root
    }

    pub(crate) fn context(&self) -> &Arc<TreeContext> {
        &self.context
    }
}
