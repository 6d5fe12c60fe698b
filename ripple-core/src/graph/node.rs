//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.
//!
//! A node carries only the graph-facing state of a reactive entity: its
//! edges, its dirty flag and, for reactions, the hook the scheduler needs to
//! run it. Values stay with the handle that created the node.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

use crate::reactive::ReactionCore;

/// Unique identifier for a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A mutable cell (signal). Only ever a dependency.
    Cell,

    /// A lazily memoized derivation. Both an observer and a dependency.
    Derivation,

    /// A scheduled side effect. Only ever an observer.
    Reaction,
}

/// Variant-specific node state.
pub(crate) enum NodeState {
    Cell,
    Derivation {
        /// The cached value is stale and must be recomputed before the next read.
        dirty: bool,
        label: Option<Rc<str>>,
    },
    Reaction(Rc<ReactionCore>),
}

/// What a node asks the propagation walk to do after being notified.
pub(crate) enum Notify {
    /// Nothing further; the node was already stale or cannot observe.
    Stop,
    /// The node just became dirty; its own observers must be notified.
    Propagate,
    /// The node is a reaction that was just queued.
    Enqueue(Rc<ReactionCore>),
}

/// A node in the dependency graph.
pub(crate) struct Node {
    id: NodeId,
    state: NodeState,

    /// Entities this node read during its last evaluation.
    dependencies: IndexSet<NodeId>,

    /// Observers that read this node during their last evaluation.
    observers: IndexSet<NodeId>,
}

impl Node {
    fn new(id: NodeId, state: NodeState) -> Self {
        Self {
            id,
            state,
            dependencies: IndexSet::new(),
            observers: IndexSet::new(),
        }
    }

    pub(crate) fn cell(id: NodeId) -> Self {
        Self::new(id, NodeState::Cell)
    }

    /// Derivations start dirty so the first read evaluates them.
    pub(crate) fn derivation(id: NodeId, label: Option<Rc<str>>) -> Self {
        Self::new(id, NodeState::Derivation { dirty: true, label })
    }

    pub(crate) fn reaction(core: Rc<ReactionCore>) -> Self {
        Self::new(core.id(), NodeState::Reaction(core))
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self.state {
            NodeState::Cell => NodeKind::Cell,
            NodeState::Derivation { .. } => NodeKind::Derivation,
            NodeState::Reaction(_) => NodeKind::Reaction,
        }
    }

    /// Only derivations can be dirty.
    pub(crate) fn is_dirty(&self) -> bool {
        matches!(self.state, NodeState::Derivation { dirty: true, .. })
    }

    pub(crate) fn mark_clean(&mut self) {
        if let NodeState::Derivation { dirty, .. } = &mut self.state {
            *dirty = false;
        }
    }

    pub(crate) fn label(&self) -> Option<Rc<str>> {
        match &self.state {
            NodeState::Derivation { label, .. } => label.clone(),
            _ => None,
        }
    }

    /// React to a change in one of this node's dependencies.
    pub(crate) fn notify(&mut self) -> Notify {
        match &mut self.state {
            NodeState::Cell => Notify::Stop,
            NodeState::Derivation { dirty: true, .. } => Notify::Stop,
            NodeState::Derivation { dirty, .. } => {
                *dirty = true;
                Notify::Propagate
            }
            NodeState::Reaction(core) => {
                if core.mark_queued() {
                    Notify::Enqueue(Rc::clone(core))
                } else {
                    Notify::Stop
                }
            }
        }
    }

    pub(crate) fn add_dependency(&mut self, node_id: NodeId) {
        self.dependencies.insert(node_id);
    }

    pub(crate) fn remove_dependency(&mut self, node_id: NodeId) {
        self.dependencies.shift_remove(&node_id);
    }

    pub(crate) fn dependencies(&self) -> &IndexSet<NodeId> {
        &self.dependencies
    }

    pub(crate) fn take_dependencies(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.dependencies)
    }

    pub(crate) fn add_observer(&mut self, node_id: NodeId) {
        self.observers.insert(node_id);
    }

    pub(crate) fn remove_observer(&mut self, node_id: NodeId) {
        self.observers.shift_remove(&node_id);
    }

    pub(crate) fn observers(&self) -> &IndexSet<NodeId> {
        &self.observers
    }

    pub(crate) fn take_observers(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.observers)
    }
}
