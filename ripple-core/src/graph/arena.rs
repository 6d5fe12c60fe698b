//! Node Arena
//!
//! All nodes of one runtime live here, addressed by [`NodeId`]. Edges are
//! stored on both ends (dependencies on the observer, observers on the
//! dependency) and are always added and removed as a pair.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use smallvec::SmallVec;

use super::node::{Node, NodeId, Notify};
use crate::reactive::ReactionCore;

/// The dependency graph of a single runtime.
#[derive(Default)]
pub(crate) struct Graph {
    /// All nodes in the graph, indexed by ID.
    nodes: HashMap<NodeId, Node>,
}

impl Graph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph.
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every edge touching it.
    ///
    /// The node is handed back so the caller can drop it after releasing its
    /// borrow of the graph: a reaction node owns user closures whose drop
    /// may release other nodes.
    pub(crate) fn remove(&mut self, node_id: NodeId) -> Option<Node> {
        let mut node = self.nodes.remove(&node_id)?;

        for dep_id in node.take_dependencies() {
            if let Some(dep) = self.nodes.get_mut(&dep_id) {
                dep.remove_observer(node_id);
            }
        }

        for observer_id in node.take_observers() {
            if let Some(observer) = self.nodes.get_mut(&observer_id) {
                observer.remove_dependency(node_id);
            }
        }

        Some(node)
    }

    pub(crate) fn get(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Record that `observer` read `dependency`. Idempotent.
    pub(crate) fn link(&mut self, dependency: NodeId, observer: NodeId) {
        if dependency == observer
            || !self.nodes.contains_key(&dependency)
            || !self.nodes.contains_key(&observer)
        {
            return;
        }
        if let Some(dep_node) = self.nodes.get_mut(&dependency) {
            dep_node.add_observer(observer);
        }
        if let Some(observer_node) = self.nodes.get_mut(&observer) {
            observer_node.add_dependency(dependency);
        }
    }

    /// Detach every dependency edge of `observer`, ahead of a re-evaluation
    /// that will rebuild them.
    pub(crate) fn unlink_dependencies(&mut self, observer: NodeId) {
        let Some(node) = self.nodes.get_mut(&observer) else {
            return;
        };
        for dep_id in node.take_dependencies() {
            if let Some(dep) = self.nodes.get_mut(&dep_id) {
                dep.remove_observer(observer);
            }
        }
    }

    pub(crate) fn is_dirty(&self, node_id: NodeId) -> bool {
        self.nodes.get(&node_id).is_some_and(Node::is_dirty)
    }

    pub(crate) fn mark_clean(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.mark_clean();
        }
    }

    /// Propagate a change of `source` through the graph.
    ///
    /// Derivations become dirty transitively; the walk stops at nodes that
    /// were already dirty. Reactions reached along the way are returned in
    /// discovery order, each at most once.
    pub(crate) fn mark_changed(&mut self, source: NodeId) -> Vec<Rc<ReactionCore>> {
        let mut reactions = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(source);

        while let Some(node_id) = queue.pop_front() {
            let observers: SmallVec<[NodeId; 8]> = match self.nodes.get(&node_id) {
                Some(node) => node.observers().iter().copied().collect(),
                None => continue,
            };

            for observer_id in observers {
                let Some(observer) = self.nodes.get_mut(&observer_id) else {
                    continue;
                };
                match observer.notify() {
                    Notify::Stop => {}
                    Notify::Propagate => queue.push_back(observer_id),
                    Notify::Enqueue(core) => reactions.push(core),
                }
            }
        }

        reactions
    }

    /// Get the total number of nodes in the graph.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}
