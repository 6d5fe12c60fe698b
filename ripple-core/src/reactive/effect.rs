//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately and synchronously
//!    to establish its initial dependencies.
//!
//! 2. When any dependency changes, the effect is queued (once, however many
//!    writes happen) and re-run by the next flush.
//!
//! 3. Before re-running, the previous cleanup is invoked and the old
//!    dependency edges are dropped; the new run tracks a fresh set.
//!
//! # Differences from Memo
//!
//! - Memos return a value; effects do not.
//! - Memos are lazy (compute on access); effects are eager (run when deps change).
//! - Memos cache results; effects just run their side effect.
//!
//! # Cleanup
//!
//! A body may return a [`Cleanup`]. It runs before the next execution of the
//! body and when the effect is disposed.
//!
//! # Lifetime
//!
//! Dropping an [`Effect`] handle does not stop it. The runtime keeps the
//! effect alive until [`Effect::dispose`] is called.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic;
use std::rc::Rc;

use crate::error::ReactiveError;
use crate::graph::{Node, NodeId};

use super::Runtime;

/// A callback run before an effect's next execution or on its disposal.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self(Box::new(cleanup))
    }

    pub(crate) fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Values an effect body may return.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

type Body = Box<dyn FnMut() -> Option<Cleanup>>;

/// Scheduler-facing state of an effect. Owned by its graph node while the
/// effect is alive, and shared with the user's [`Effect`] handle.
pub(crate) struct ReactionCore {
    id: NodeId,
    body: RefCell<Body>,
    cleanup: RefCell<Option<Cleanup>>,
    queued: Cell<bool>,
    disposed: Cell<bool>,
    runs: Cell<usize>,
}

impl ReactionCore {
    pub(crate) fn new<F, R>(id: NodeId, mut body: F) -> Self
    where
        F: FnMut() -> R + 'static,
        R: IntoCleanup,
    {
        Self {
            id,
            body: RefCell::new(Box::new(move || body().into_cleanup())),
            cleanup: RefCell::new(None),
            queued: Cell::new(false),
            disposed: Cell::new(false),
            runs: Cell::new(0),
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// Flag the reaction as queued. Returns false if it already was, or if
    /// it has been disposed.
    pub(crate) fn mark_queued(&self) -> bool {
        if self.disposed.get() || self.queued.get() {
            return false;
        }
        self.queued.set(true);
        true
    }

    pub(crate) fn clear_queued(&self) {
        self.queued.set(false);
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Returns true the first time only.
    pub(crate) fn mark_disposed(&self) -> bool {
        !self.disposed.replace(true)
    }

    /// The body is currently on the stack.
    pub(crate) fn is_running(&self) -> bool {
        self.body.try_borrow_mut().is_err()
    }

    pub(crate) fn take_cleanup(&self) -> Option<Cleanup> {
        self.cleanup.borrow_mut().take()
    }

    /// Run the body once and keep whatever cleanup it hands back.
    pub(crate) fn invoke(&self) {
        self.runs.set(self.runs.get() + 1);
        let cleanup = {
            let mut body = self.body.borrow_mut();
            (&mut *body)()
        };
        if let Some(cleanup) = cleanup {
            // The body may have disposed its own effect.
            if self.disposed.get() {
                cleanup.run();
            } else {
                *self.cleanup.borrow_mut() = Some(cleanup);
            }
        }
    }

    pub(crate) fn runs(&self) -> usize {
        self.runs.get()
    }
}

/// Handle to a running effect.
///
/// # Example
///
/// ```rust,ignore
/// let rt = Runtime::new();
/// let count = rt.signal(0);
///
/// let effect = rt.effect({
///     let count = count.clone();
///     move || println!("Count is: {}", count.get())
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// effect.dispose();
/// ```
#[derive(Clone)]
pub struct Effect {
    runtime: Runtime,
    core: Rc<ReactionCore>,
}

impl Effect {
    /// Register the effect and run it for the first time.
    ///
    /// A panic from the first run disposes the effect and then propagates
    /// to the caller. Effects queued by the first run, this one included,
    /// are flushed before returning.
    pub(crate) fn spawn<F, R>(runtime: &Runtime, body: F) -> Self
    where
        F: FnMut() -> R + 'static,
        R: IntoCleanup,
    {
        let core = Rc::new(ReactionCore::new(NodeId::next(), body));
        runtime.register(Node::reaction(Rc::clone(&core)));

        let effect = Self {
            runtime: runtime.clone(),
            core,
        };

        // Writes made by the first run only queue; the flush below picks up
        // everything, this effect included.
        let outcome = {
            let _deferred = runtime.defer_flush();
            runtime.run_reaction(&effect.core)
        };
        if let Err(payload) = outcome {
            effect.dispose();
            match payload.downcast::<ReactiveError>() {
                Ok(error) => runtime.raise(*error),
                Err(payload) => panic::resume_unwind(payload),
            }
        }

        runtime.flush();
        effect
    }

    /// Get the effect's node ID.
    pub fn id(&self) -> NodeId {
        self.core.id()
    }

    /// Stop the effect: detach it from every dependency and run its pending
    /// cleanup. Idempotent; a disposed effect is never scheduled again.
    pub fn dispose(&self) {
        if !self.core.mark_disposed() {
            return;
        }
        self.runtime.release(self.core.id());
        if let Some(cleanup) = self.core.take_cleanup() {
            cleanup.run();
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// Get the number of times the body has run.
    pub fn run_count(&self) -> usize {
        self.core.runs()
    }

    /// Get the number of dependencies tracked by the last run.
    pub fn dependency_count(&self) -> usize {
        self.runtime.dependency_count(self.core.id())
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
