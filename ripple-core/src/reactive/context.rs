//! Tracking Context
//!
//! The tracking context records which observer is currently evaluating, so
//! that reads can register themselves as dependencies of it.
//!
//! # Implementation
//!
//! One slot holds the active observer. Entering an evaluation swaps the slot
//! and returns a guard that restores the previous observer on drop. Nested
//! evaluations (a memo read inside an effect, a memo inside a memo) therefore
//! unwind correctly, including when the inner computation panics.
//!
//! Derivations additionally push themselves onto an evaluation stack. A read
//! of a derivation already on that stack is a cycle, and the stack slice from
//! its first occurrence is the cycle path.
//!
//! A reaction depth counter tells the runtime whether a failing read happens
//! inside an effect body, where the flush loop or effect creation is waiting
//! to recover the typed error.

use std::cell::{Cell, RefCell};

use smallvec::SmallVec;

use crate::error::ReactiveError;
use crate::graph::NodeId;

/// The per-runtime tracking state.
#[derive(Default)]
pub(crate) struct Tracking {
    current: Cell<Option<NodeId>>,
    evaluating: RefCell<SmallVec<[NodeId; 8]>>,
    reactions: Cell<usize>,
}

impl Tracking {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Install `observer` as the active observer until the guard drops.
    /// `None` opens an untracked scope.
    pub(crate) fn enter(&self, observer: Option<NodeId>) -> ObserverScope<'_> {
        let previous = self.current.replace(observer);
        ObserverScope {
            tracking: self,
            previous,
        }
    }

    /// The observer that reads are currently attributed to, if any.
    pub(crate) fn current(&self) -> Option<NodeId> {
        self.current.get()
    }

    /// Whether any derivation evaluation is in progress.
    pub(crate) fn is_evaluating(&self) -> bool {
        !self.evaluating.borrow().is_empty()
    }

    /// Count a reaction body as running until the guard drops.
    pub(crate) fn enter_reaction(&self) -> ReactionScope<'_> {
        self.reactions.set(self.reactions.get() + 1);
        ReactionScope { tracking: self }
    }

    /// Whether any reaction body is on the stack.
    pub(crate) fn in_reaction(&self) -> bool {
        self.reactions.get() > 0
    }

    /// Push `node` onto the evaluation stack, failing if it is already there.
    pub(crate) fn begin_evaluation(
        &self,
        node: NodeId,
    ) -> Result<EvaluationScope<'_>, ReactiveError> {
        let mut stack = self.evaluating.borrow_mut();
        if let Some(start) = stack.iter().position(|id| *id == node) {
            let mut path: Vec<NodeId> = stack[start..].to_vec();
            path.push(node);
            return Err(ReactiveError::CyclicEvaluation { path });
        }
        stack.push(node);
        Ok(EvaluationScope {
            tracking: self,
            node,
        })
    }
}

/// Restores the previously active observer when dropped.
pub(crate) struct ObserverScope<'a> {
    tracking: &'a Tracking,
    previous: Option<NodeId>,
}

impl Drop for ObserverScope<'_> {
    fn drop(&mut self) {
        self.tracking.current.set(self.previous);
    }
}

/// Leaves a reaction body when dropped.
pub(crate) struct ReactionScope<'a> {
    tracking: &'a Tracking,
}

impl Drop for ReactionScope<'_> {
    fn drop(&mut self) {
        let depth = self.tracking.reactions.get().saturating_sub(1);
        self.tracking.reactions.set(depth);
    }
}

/// Pops the evaluation stack when dropped.
pub(crate) struct EvaluationScope<'a> {
    tracking: &'a Tracking,
    node: NodeId,
}

impl Drop for EvaluationScope<'_> {
    fn drop(&mut self) {
        let popped = self.tracking.evaluating.borrow_mut().pop();

        // Scopes are strictly nested; anything else is a bug in the runtime.
        debug_assert_eq!(
            popped,
            Some(self.node),
            "evaluation stack mismatch: expected {}, got {:?}",
            self.node,
            popped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_sets_and_restores_observer() {
        let tracking = Tracking::new();
        let id = NodeId::next();

        assert!(tracking.current().is_none());
        {
            let _scope = tracking.enter(Some(id));
            assert_eq!(tracking.current(), Some(id));
        }
        assert!(tracking.current().is_none());
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let tracking = Tracking::new();
        let outer = NodeId::next();
        let inner = NodeId::next();

        let _outer = tracking.enter(Some(outer));
        {
            let _inner = tracking.enter(Some(inner));
            assert_eq!(tracking.current(), Some(inner));
            {
                let _untracked = tracking.enter(None);
                assert!(tracking.current().is_none());
            }
            assert_eq!(tracking.current(), Some(inner));
        }
        assert_eq!(tracking.current(), Some(outer));
    }

    #[test]
    fn reentering_an_evaluation_reports_the_cycle_path() {
        let tracking = Tracking::new();
        let a = NodeId::next();
        let b = NodeId::next();
        let c = NodeId::next();

        let _root = tracking.begin_evaluation(a).unwrap();
        let _b = tracking.begin_evaluation(b).unwrap();
        let _c = tracking.begin_evaluation(c).unwrap();

        match tracking.begin_evaluation(b) {
            Err(ReactiveError::CyclicEvaluation { path }) => assert_eq!(path, vec![b, c, b]),
            other => panic!("expected a cycle, got {:?}", other.map(|_| ())),
        }
        assert!(tracking.is_evaluating());
    }

    #[test]
    fn evaluation_stack_empties_after_scopes_drop() {
        let tracking = Tracking::new();
        {
            let _scope = tracking.begin_evaluation(NodeId::next()).unwrap();
            assert!(tracking.is_evaluating());
        }
        assert!(!tracking.is_evaluating());
    }

    #[test]
    fn reaction_scopes_nest() {
        let tracking = Tracking::new();
        assert!(!tracking.in_reaction());
        {
            let _outer = tracking.enter_reaction();
            {
                let _inner = tracking.enter_reaction();
                assert!(tracking.in_reaction());
            }
            assert!(tracking.in_reaction());
        }
        assert!(!tracking.in_reaction());
    }
}
