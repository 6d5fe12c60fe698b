//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. A memo starts dirty and computes nothing until first read.
//!
//! 2. While clean, reads return the cached value without running the
//!    computation.
//!
//! 3. A write to any transitive dependency marks the memo dirty (and, through
//!    it, every memo built on top of it).
//!
//! 4. The next read re-runs the computation, rebuilding the dependency set
//!    from what that run actually touched.
//!
//! A memo that reads itself, directly or through other memos, while it is
//! being computed fails with [`ReactiveError::CyclicEvaluation`].

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::trace;

use crate::error::{ReactiveError, Result};
use crate::graph::{Node, NodeId};

use super::Runtime;

/// A cached derived value that recomputes only when dependencies change.
///
/// Cloning a memo yields another handle to the same derivation.
pub struct Memo<T> {
    inner: Rc<MemoInner<T>>,
}

struct MemoInner<T> {
    runtime: Runtime,
    id: NodeId,
    label: Option<Rc<str>>,
    compute: Box<dyn Fn() -> T>,

    /// The cached value (None if never computed).
    value: RefCell<Option<T>>,
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        self.runtime.release(self.id);
    }
}

impl<T> Memo<T>
where
    T: Clone + 'static,
{
    pub(crate) fn new<F>(runtime: &Runtime, label: Option<Rc<str>>, compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let id = runtime.register(Node::derivation(NodeId::next(), label.clone()));
        Self {
            inner: Rc::new(MemoInner {
                runtime: runtime.clone(),
                id,
                label,
                compute: Box::new(compute),
                value: RefCell::new(None),
            }),
        }
    }

    /// Get the memo's node ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the debug label, if the memo was created with one.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Get the current value, recomputing if necessary, and register the
    /// memo as a dependency of the active observer.
    ///
    /// # Panics
    ///
    /// Panics on a cyclic evaluation. Use [`Memo::try_get`] to handle it.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => self.inner.runtime.raise(err),
        }
    }

    /// Fallible form of [`Memo::get`].
    pub fn try_get(&self) -> Result<T> {
        self.ensure_fresh()?;
        self.inner.runtime.track(self.inner.id);
        Ok(self.cached())
    }

    /// Get the current value, recomputing if necessary, without registering
    /// a dependency.
    ///
    /// # Panics
    ///
    /// Panics on a cyclic evaluation. Use [`Memo::try_peek`] to handle it.
    pub fn peek(&self) -> T {
        match self.try_peek() {
            Ok(value) => value,
            Err(err) => self.inner.runtime.raise(err),
        }
    }

    /// Fallible form of [`Memo::peek`].
    pub fn try_peek(&self) -> Result<T> {
        let _untracked = self.inner.runtime.tracking().enter(None);
        self.ensure_fresh()?;
        Ok(self.cached())
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.inner.runtime.graph().borrow().is_dirty(self.inner.id)
    }

    /// Get the number of observers that read this memo on their last run.
    pub fn observer_count(&self) -> usize {
        self.inner.runtime.observer_count(self.inner.id)
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    fn ensure_fresh(&self) -> Result<()> {
        if self.is_dirty() {
            self.evaluate()?;
        }
        Ok(())
    }

    fn evaluate(&self) -> Result<()> {
        let runtime = &self.inner.runtime;
        let id = self.inner.id;

        let computed = {
            let _evaluation = runtime.tracking().begin_evaluation(id)?;
            runtime.graph().borrow_mut().unlink_dependencies(id);
            let _scope = runtime.tracking().enter(Some(id));
            panic::catch_unwind(AssertUnwindSafe(|| (self.inner.compute)()))
        };

        let value = match computed {
            Ok(value) => value,
            Err(payload) => match payload.downcast::<ReactiveError>() {
                Ok(err) => return Err(*err),
                Err(payload) => panic::resume_unwind(payload),
            },
        };

        let previous = self.inner.value.borrow_mut().replace(value);
        drop(previous);
        runtime.graph().borrow_mut().mark_clean(id);

        trace!(memo = %id, label = self.label(), "derivation evaluated");
        runtime.diagnostics().on_derivation_run(id, self.label());
        Ok(())
    }

    fn cached(&self) -> T {
        self.inner
            .value
            .borrow()
            .clone()
            .expect("clean memo should have a value")
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("dirty", &self.is_dirty())
            .field("has_value", &self.has_value())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn memo_computes_on_first_access() {
        let rt = Runtime::new();
        let calls = Rc::new(Cell::new(0));

        let memo = rt.memo({
            let calls = Rc::clone(&calls);
            move || {
                calls.set(calls.get() + 1);
                42
            }
        });

        // Not computed yet
        assert!(!memo.has_value());
        assert!(memo.is_dirty());
        assert_eq!(calls.get(), 0);

        assert_eq!(memo.get(), 42);
        assert_eq!(calls.get(), 1);
        assert!(memo.has_value());
        assert!(!memo.is_dirty());
    }

    #[test]
    fn memo_caches_value_when_clean() {
        let rt = Runtime::new();
        let base = rt.signal(2);
        let calls = Rc::new(Cell::new(0));

        let doubled = rt.memo({
            let base = base.clone();
            let calls = Rc::clone(&calls);
            move || {
                calls.set(calls.get() + 1);
                base.get() * 2
            }
        });

        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.peek(), 4);
        assert_eq!(calls.get(), 1);

        // Dirtying is lazy: no recompute until read.
        base.set(3);
        assert!(doubled.is_dirty());
        assert_eq!(calls.get(), 1);
        assert_eq!(doubled.get(), 6);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn memo_depends_on_memo() {
        let rt = Runtime::new();
        let base = rt.signal(5);
        let doubled = rt.memo({
            let base = base.clone();
            move || base.get() * 2
        });
        let plus_ten = rt.memo({
            let doubled = doubled.clone();
            move || doubled.get() + 10
        });

        assert_eq!(plus_ten.get(), 20);
        base.set(10);
        assert!(doubled.is_dirty());
        assert!(plus_ten.is_dirty());
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn dependencies_follow_the_last_run() {
        let rt = Runtime::new();
        let use_left = rt.signal(true);
        let left = rt.signal(1);
        let right = rt.signal(2);

        let pick = rt.memo({
            let (use_left, left, right) = (use_left.clone(), left.clone(), right.clone());
            move || if use_left.get() { left.get() } else { right.get() }
        });

        assert_eq!(pick.get(), 1);
        assert_eq!(left.observer_count(), 1);
        assert_eq!(right.observer_count(), 0);

        use_left.set(false);
        assert_eq!(pick.get(), 2);
        assert_eq!(left.observer_count(), 0);
        assert_eq!(right.observer_count(), 1);

        // The stale edge is gone: writing `left` leaves the memo clean.
        left.set(100);
        assert!(!pick.is_dirty());
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let rt = Runtime::new();
        let slot: Rc<RefCell<Option<Memo<i32>>>> = Rc::new(RefCell::new(None));

        let memo = rt.memo({
            let slot = Rc::clone(&slot);
            move || match slot.borrow().as_ref() {
                Some(me) => me.get() + 1,
                None => 0,
            }
        });
        *slot.borrow_mut() = Some(memo.clone());

        let err = memo.try_get().unwrap_err();
        assert_eq!(
            err,
            ReactiveError::CyclicEvaluation {
                path: vec![memo.id(), memo.id()]
            }
        );

        // The runtime is left consistent: nothing is evaluating.
        assert!(!rt.is_tracking());
        assert!(memo.is_dirty());
    }

    #[test]
    fn transitive_cycle_reports_full_path() {
        let rt = Runtime::new();
        let a_slot: Rc<RefCell<Option<Memo<i32>>>> = Rc::new(RefCell::new(None));

        let a = rt.memo({
            let a_slot = Rc::clone(&a_slot);
            move || a_slot.borrow().as_ref().map_or(0, |b| b.get())
        });
        let b = rt.memo({
            let a = a.clone();
            move || a.get() + 1
        });
        *a_slot.borrow_mut() = Some(b.clone());

        match a.try_get() {
            Err(ReactiveError::CyclicEvaluation { path }) => {
                assert_eq!(path, vec![a.id(), b.id(), a.id()]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "cyclic derivation evaluation")]
    fn get_panics_on_cycle_at_top_level() {
        let rt = Runtime::new();
        let slot: Rc<RefCell<Option<Memo<i32>>>> = Rc::new(RefCell::new(None));
        let memo = rt.memo({
            let slot = Rc::clone(&slot);
            move || slot.borrow().as_ref().map_or(0, |me| me.get())
        });
        *slot.borrow_mut() = Some(memo.clone());
        memo.get();
    }

    #[test]
    fn labeled_memo_reports_label() {
        let rt = Runtime::new();
        let memo = rt.memo_named("answer", || 42);
        assert_eq!(memo.label(), Some("answer"));
        assert_eq!(memo.get(), 42);
    }
}
