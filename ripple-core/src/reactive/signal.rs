//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as an observer.
//!
//! 2. When a signal's value changes, dependent memos are marked dirty and
//!    dependent effects are queued.
//!
//! 3. Outside a batch, the write then flushes the queue before returning.
//!
//! Writing a value equal to the current one is a no-op: nothing is dirtied
//! and nothing is scheduled.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::graph::{Node, NodeId};

use super::Runtime;

/// A reactive signal holding a value of type T.
///
/// Cloning a signal yields another handle to the same cell. The cell is
/// removed from the graph when the last handle is dropped.
///
/// Writes are compared with `PartialEq`, so `T`'s equality must be
/// reflexive for unchanged writes to be skipped. A value that is not equal
/// to itself (`f64::NAN`) counts as a change on every write.
///
/// # Example
///
/// ```rust,ignore
/// let rt = Runtime::new();
/// let count = rt.signal(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies observers)
/// count.set(5);
/// count.update(|n| n + 1);
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

struct SignalInner<T> {
    runtime: Runtime,
    id: NodeId,
    value: RefCell<T>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        self.runtime.release(self.id);
    }
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    pub(crate) fn new(runtime: &Runtime, value: T) -> Self {
        let id = runtime.register(Node::cell(NodeId::next()));
        Self {
            inner: Rc::new(SignalInner {
                runtime: runtime.clone(),
                id,
                value: RefCell::new(value),
            }),
        }
    }

    /// Get the signal's node ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as an observer.
    pub fn get(&self) -> T {
        self.inner.runtime.track(self.inner.id);
        self.peek()
    }

    /// Get the current value without tracking dependencies.
    pub fn peek(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Set a new value and notify observers if it differs from the current one.
    pub fn set(&self, value: T) {
        let previous = {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            std::mem::replace(&mut *current, value)
        };
        drop(previous);

        let runtime = &self.inner.runtime;
        runtime.diagnostics().on_cell_write(self.inner.id);
        runtime.notify_changed(self.inner.id);
    }

    /// Update the value using a function of the previous value.
    ///
    /// `f` receives a copy of the current value, so it may read or write
    /// this signal itself; its result is written last.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let previous = self.peek();
        self.set(f(&previous));
    }

    /// Get the number of observers that read this signal on their last run.
    pub fn observer_count(&self) -> usize {
        self.inner.runtime.observer_count(self.inner.id)
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &self.peek())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn signal_get_and_set() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
        assert_eq!(signal.peek(), 42);
    }

    #[test]
    fn signal_update() {
        let rt = Runtime::new();
        let signal = rt.signal(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn updater_may_write_the_same_signal() {
        let rt = Runtime::new();
        let count = rt.signal(1);

        count.update({
            let count = count.clone();
            move |n| {
                count.set(100);
                n + 1
            }
        });
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn values_unequal_to_themselves_always_notify() {
        let rt = Runtime::new();
        let reading = rt.signal(f64::NAN);
        let runs = Rc::new(Cell::new(0));

        rt.effect({
            let reading = reading.clone();
            let runs = Rc::clone(&runs);
            move || {
                reading.get();
                runs.set(runs.get() + 1);
            }
        });

        reading.set(f64::NAN);
        reading.set(f64::NAN);
        assert_eq!(runs.get(), 3);

        reading.set(1.5);
        reading.set(1.5);
        assert_eq!(runs.get(), 4);
    }

    #[test]
    fn equal_writes_are_ignored() {
        let rt = Runtime::new();
        let signal = rt.signal(String::from("a"));
        let runs = Rc::new(Cell::new(0));

        let _effect = rt.effect({
            let signal = signal.clone();
            let runs = Rc::clone(&runs);
            move || {
                signal.get();
                runs.set(runs.get() + 1);
            }
        });

        signal.set(String::from("a"));
        signal.update(|s| s.clone());
        assert_eq!(runs.get(), 1);

        signal.set(String::from("b"));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn peek_registers_no_dependency() {
        let rt = Runtime::new();
        let signal = rt.signal(1);

        let _effect = rt.effect({
            let signal = signal.clone();
            move || {
                signal.peek();
            }
        });

        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn signal_clone_shares_state() {
        let rt = Runtime::new();
        let signal1 = rt.signal(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn dropping_the_last_handle_removes_the_node() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let other = signal.clone();
        assert_eq!(rt.node_count(), 1);

        drop(signal);
        assert_eq!(rt.node_count(), 1);
        drop(other);
        assert_eq!(rt.node_count(), 0);
    }
}
