//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the dependency graph, the tracking context and the
//! reaction scheduler.
//!
//! # How It Works
//!
//! 1. Every signal, memo and effect registers a node with its runtime.
//!
//! 2. When a memo or effect reads a signal or memo, the runtime records the
//!    edge between them.
//!
//! 3. When a signal's value changes, the runtime:
//!    a. Marks dependent memos dirty, transitively
//!    b. Queues dependent effects
//!    c. Flushes the queue, unless a batch is open
//!    d. Memos are lazy - they recompute on next access
//!
//! # Threading
//!
//! A runtime is single-threaded (`!Send`). Any number of runtimes may live
//! on one thread; entities of different runtimes never interact.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::config::{RuntimeBuilder, RuntimeConfig, Spawner};
use crate::diagnostics::Diagnostics;
use crate::error::{panic_message, ReactiveError};
use crate::graph::{FlushGuard, Graph, Node, NodeId, NodeKind, Scheduler};
use crate::resource::{Resource, ResourceOptions};

use super::context::Tracking;
use super::effect::{Effect, IntoCleanup, ReactionCore};
use super::memo::Memo;
use super::signal::Signal;

/// Handle to a reactive runtime. Cheap to clone; clones share all state.
///
/// # Example
///
/// ```rust,ignore
/// let rt = Runtime::new();
/// let count = rt.signal(1);
/// let doubled = rt.memo({
///     let count = count.clone();
///     move || count.get() * 2
/// });
///
/// rt.batch(|| {
///     count.set(2);
///     count.set(3);
/// });
/// assert_eq!(doubled.get(), 6);
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
    graph: RefCell<Graph>,
    tracking: Tracking,
    scheduler: Scheduler,
    diagnostics: std::sync::Arc<dyn Diagnostics>,
    spawner: Rc<dyn Spawner>,

    /// Nodes whose handles were dropped while the graph was borrowed.
    orphans: RefCell<Vec<NodeId>>,
}

impl Runtime {
    /// Create a runtime with default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                graph: RefCell::new(Graph::new()),
                tracking: Tracking::new(),
                scheduler: Scheduler::new(),
                diagnostics: config.diagnostics,
                spawner: config.spawner,
                orphans: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create a signal holding `value`.
    pub fn signal<T>(&self, value: T) -> Signal<T>
    where
        T: Clone + PartialEq + 'static,
    {
        Signal::new(self, value)
    }

    /// Create a lazily evaluated memo.
    pub fn memo<T, F>(&self, compute: F) -> Memo<T>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
    {
        Memo::new(self, None, compute)
    }

    /// Create a memo carrying a label for diagnostics.
    pub fn memo_named<T, F>(&self, label: &str, compute: F) -> Memo<T>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
    {
        Memo::new(self, Some(Rc::from(label)), compute)
    }

    /// Create an effect and run it once, synchronously.
    pub fn effect<F, R>(&self, body: F) -> Effect
    where
        F: FnMut() -> R + 'static,
        R: IntoCleanup,
    {
        Effect::spawn(self, body)
    }

    /// Create an async resource around `producer`.
    pub fn resource<T, E, F, Fut>(&self, producer: F, options: ResourceOptions<T, E>) -> Resource<T, E>
    where
        T: Clone + PartialEq + 'static,
        E: 'static,
        F: Fn(CancellationToken) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        Resource::new(self, producer, options)
    }

    /// Run `f` with flushing deferred until the outermost batch exits.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.scheduler.begin_batch();
        let _batch = BatchScope { runtime: self };
        f()
    }

    /// Run `f` with dependency tracking switched off.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.inner.tracking.enter(None);
        f()
    }

    /// Run every queued effect.
    ///
    /// Writes flush on their own; this is for hosts that drive flushing from
    /// their own event loop. Does nothing inside a batch or a running flush.
    ///
    /// A panicking effect is logged and reported to diagnostics, and the
    /// remaining effects still run.
    ///
    /// # Panics
    ///
    /// Panics if an effect hits a cyclic derivation evaluation. Effects still
    /// queued at that point stay queued for the next flush.
    pub fn flush(&self) {
        if self.inner.scheduler.is_batching() {
            return;
        }
        if let Some(error) = self.drain() {
            self.raise(error);
        }
    }

    /// Run the flush loop. A cyclic evaluation stops it and is handed back
    /// once the flush claim has been released.
    fn drain(&self) -> Option<ReactiveError> {
        let _flushing = self.inner.scheduler.begin_flush()?;

        let mut runs = 0usize;
        while let Some(core) = self.inner.scheduler.pop() {
            if core.is_disposed() {
                continue;
            }
            runs += 1;
            let Err(payload) = self.run_reaction(&core) else {
                continue;
            };
            let payload = match payload.downcast::<ReactiveError>() {
                Ok(error) if matches!(*error, ReactiveError::CyclicEvaluation { .. }) => {
                    return Some(*error);
                }
                Ok(error) => error as Box<dyn std::any::Any + Send>,
                Err(payload) => payload,
            };
            let error = ReactiveError::ReactionPanicked {
                id: core.id(),
                message: panic_message(payload.as_ref()),
            };
            warn!(reaction = %core.id(), %error, "reaction failed during flush");
            self.inner.diagnostics.on_reaction_error(&error);
        }

        if runs > 0 {
            trace!(runs, "flushed reaction queue");
        }
        None
    }

    /// Whether reads are currently attributed to an observer.
    pub fn is_tracking(&self) -> bool {
        self.inner.tracking.current().is_some()
    }

    /// Whether a batch is open.
    pub fn is_batching(&self) -> bool {
        self.inner.scheduler.is_batching()
    }

    /// Whether the effect queue is being drained right now.
    pub fn is_flushing(&self) -> bool {
        self.inner.scheduler.is_flushing()
    }

    /// What kind of node `node_id` is, or `None` once it has been released.
    pub fn node_kind(&self, node_id: NodeId) -> Option<NodeKind> {
        self.inner.graph.borrow().get(node_id).map(Node::kind)
    }

    /// Debug label of a derivation node.
    pub fn node_label(&self, node_id: NodeId) -> Option<Rc<str>> {
        self.inner.graph.borrow().get(node_id).and_then(Node::label)
    }

    /// Get the total number of live nodes.
    pub fn node_count(&self) -> usize {
        self.inner.graph.borrow().len()
    }

    /// Get the number of effects waiting for a flush.
    pub fn pending_reactions(&self) -> usize {
        self.inner.scheduler.pending()
    }

    // ------------------------------------------------------------------
    // Crate-internal plumbing
    // ------------------------------------------------------------------

    pub(crate) fn graph(&self) -> &RefCell<Graph> {
        &self.inner.graph
    }

    pub(crate) fn tracking(&self) -> &Tracking {
        &self.inner.tracking
    }

    pub(crate) fn diagnostics(&self) -> &dyn Diagnostics {
        self.inner.diagnostics.as_ref()
    }

    /// Hold the flush claim so writes queue their effects without draining.
    /// `None` when a flush is already running; its loop picks the work up.
    pub(crate) fn defer_flush(&self) -> Option<FlushGuard<'_>> {
        self.inner.scheduler.begin_flush()
    }

    pub(crate) fn spawner(&self) -> Rc<dyn Spawner> {
        Rc::clone(&self.inner.spawner)
    }

    pub(crate) fn register(&self, node: Node) -> NodeId {
        self.reap_orphans();
        self.inner.graph.borrow_mut().insert(node)
    }

    /// Remove a node whose owner is gone.
    pub(crate) fn release(&self, node_id: NodeId) {
        let removed = {
            let Ok(mut graph) = self.inner.graph.try_borrow_mut() else {
                self.inner.orphans.borrow_mut().push(node_id);
                return;
            };
            graph.remove(node_id)
        };
        // Dropping a reaction node may release further nodes.
        drop(removed);
    }

    fn reap_orphans(&self) {
        let orphans = std::mem::take(&mut *self.inner.orphans.borrow_mut());
        for node_id in orphans {
            self.release(node_id);
        }
    }

    /// Register `dependency` with the active observer, if any.
    pub(crate) fn track(&self, dependency: NodeId) {
        if let Some(observer) = self.inner.tracking.current() {
            self.inner.graph.borrow_mut().link(dependency, observer);
        }
    }

    /// Propagate a committed write of `source` and flush unless batching.
    pub(crate) fn notify_changed(&self, source: NodeId) {
        let reactions = self.inner.graph.borrow_mut().mark_changed(source);
        self.inner.scheduler.enqueue(reactions);
        if !self.inner.scheduler.is_batching() {
            self.flush();
        }
    }

    pub(crate) fn observer_count(&self, node_id: NodeId) -> usize {
        self.inner
            .graph
            .borrow()
            .get(node_id)
            .map_or(0, |node| node.observers().len())
    }

    pub(crate) fn dependency_count(&self, node_id: NodeId) -> usize {
        self.inner
            .graph
            .borrow()
            .get(node_id)
            .map_or(0, |node| node.dependencies().len())
    }

    /// Run a reaction once: cleanup, drop old edges, run the body tracked.
    pub(crate) fn run_reaction(&self, core: &Rc<ReactionCore>) -> std::thread::Result<()> {
        if core.is_disposed() {
            return Ok(());
        }
        if core.is_running() {
            warn!(reaction = %core.id(), "reaction re-entered its own run; skipping");
            return Ok(());
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            if let Some(cleanup) = core.take_cleanup() {
                cleanup.run();
            }
            self.inner.graph.borrow_mut().unlink_dependencies(core.id());
            let _reaction = self.inner.tracking.enter_reaction();
            let _scope = self.inner.tracking.enter(Some(core.id()));
            core.invoke();
        }));

        self.inner.diagnostics.on_reaction_run(core.id());
        outcome
    }

    /// Fail a read with `error`.
    ///
    /// Inside a derivation evaluation or a reaction body the typed error is
    /// unwound silently so the enclosing `try_get`, flush or effect creation
    /// recovers it. Anywhere else this is an ordinary panic carrying the
    /// error message.
    pub(crate) fn raise(&self, error: ReactiveError) -> ! {
        if self.inner.tracking.is_evaluating() || self.inner.tracking.in_reaction() {
            panic::resume_unwind(Box::new(error));
        }
        panic!("{error}");
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("node_count", &self.node_count())
            .field("pending_reactions", &self.pending_reactions())
            .field("batching", &self.is_batching())
            .finish()
    }
}

/// Closes a batch when dropped and flushes if it was the outermost one.
struct BatchScope<'a> {
    runtime: &'a Runtime,
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        let outermost = self.runtime.inner.scheduler.end_batch();
        // Running effects while unwinding risks a double panic; the queue
        // is picked up by the next flush instead.
        if outermost && !std::thread::panicking() {
            self.runtime.flush();
        }
    }
}
