//! Dependency Graph
//!
//! This module implements the dependency graph that links reactive values to
//! the computations that read them, plus the queue that schedules reactions.
//!
//! # Overview
//!
//! - Nodes represent cells (signals), derivations (memos) or reactions
//!   (effects).
//! - Edges are bidirectional: a dependency knows its observers and an
//!   observer knows its dependencies. They are rebuilt on every evaluation of
//!   the observer, so dependency sets may change from run to run.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena addressed by [`NodeId`] rather than pointing at
//!    each other. Edges are mutated from both ends on every evaluation, which
//!    plain owning references cannot express.
//!
//! 2. Values are not stored in the graph. The graph is untyped; each handle
//!    keeps its own typed value next to its node ID.
//!
//! 3. Cycles are not forbidden structurally. A derivation that re-enters its
//!    own evaluation is caught by the runtime's evaluation stack.

mod arena;
mod node;
mod scheduler;

pub(crate) use arena::Graph;
pub(crate) use node::Node;
pub use node::{NodeId, NodeKind};
pub(crate) use scheduler::{FlushGuard, Scheduler};
