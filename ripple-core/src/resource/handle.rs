//! Resource Implementation
//!
//! A resource turns an async producer into four signals (`data`, `error`,
//! `loading`, `state`) that the rest of the graph can observe.
//!
//! # Consistency
//!
//! Every refresh takes the next version number. A result may only commit if
//! its version is still the latest when it completes and the resource is not
//! disposed; anything else is dropped on the floor. This makes concurrent
//! refreshes latest-wins regardless of completion order.
//!
//! Cancellation is advisory. Starting a refresh cancels the previous token,
//! but the previous producer keeps running unless it chooses to watch its
//! token. The version check is what actually enforces discard.
//!
//! # Tracking
//!
//! The producer is called and polled once synchronously, inside whatever
//! tracking context `refresh` was called from. In auto mode that is the
//! resource's own effect, so signals read before the producer's first
//! suspension become its dependencies. Reads after a suspension happen from
//! the executor, outside any observer, and are not tracked.
//!
//! All internal writes happen untracked and batched, so the auto effect
//! never depends on the state it writes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures_util::future::{FutureExt, LocalBoxFuture};
use futures_util::task::noop_waker;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Spawner;
use crate::graph::NodeId;
use crate::reactive::{Effect, Runtime, Signal};

use super::options::ResourceOptions;
use super::refresh::Refresh;
use super::state::ResourceState;

type Producer<T, E> = Box<dyn Fn(CancellationToken) -> LocalBoxFuture<'static, Result<T, E>>>;

/// Producer error held by the error signal. Compared by identity, so every
/// failure counts as a change even if the error values are equal.
struct SharedError<E>(Rc<E>);

impl<E> Clone for SharedError<E> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<E> PartialEq for SharedError<E> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Async data wrapped in reactive state.
///
/// Cloning yields another handle to the same resource. Dropping the last
/// handle disposes it.
///
/// # Example
///
/// ```rust,ignore
/// let rt = Runtime::new();
/// let user_id = rt.signal(1);
/// let user = rt.resource(
///     {
///         let user_id = user_id.clone();
///         move |token| {
///             let id = user_id.get();
///             async move { fetch_user(id, token).await }
///         }
///     },
///     ResourceOptions::default().auto(true),
/// );
///
/// user_id.set(2); // refetches
/// ```
pub struct Resource<T, E> {
    inner: Rc<ResourceInner<T, E>>,
}

pub(crate) struct ResourceInner<T, E> {
    runtime: Runtime,
    producer: Producer<T, E>,

    data: Signal<Option<T>>,
    error: Signal<Option<SharedError<E>>>,
    loading: Signal<bool>,
    state: Signal<ResourceState>,

    /// Version of the most recent refresh or clear.
    version: Cell<u64>,
    token: RefCell<Option<CancellationToken>>,
    disposed: Cell<bool>,
    auto: RefCell<Option<Effect>>,

    keep_previous_data: bool,
    on_success: Option<Box<dyn Fn(&T)>>,
    on_error: Option<Box<dyn Fn(&E)>>,
}

impl<T, E> Resource<T, E>
where
    T: Clone + PartialEq + 'static,
    E: 'static,
{
    pub(crate) fn new<F, Fut>(runtime: &Runtime, producer: F, options: ResourceOptions<T, E>) -> Self
    where
        F: Fn(CancellationToken) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        let ResourceOptions {
            auto,
            keep_previous_data,
            initial_data,
            on_success,
            on_error,
        } = options;

        let initial_state = if initial_data.is_some() {
            ResourceState::Success
        } else {
            ResourceState::Idle
        };

        let inner = Rc::new(ResourceInner {
            runtime: runtime.clone(),
            producer: Box::new(move |token| producer(token).boxed_local()),
            data: runtime.signal(initial_data),
            error: runtime.signal(None),
            loading: runtime.signal(false),
            state: runtime.signal(initial_state),
            version: Cell::new(0),
            token: RefCell::new(None),
            disposed: Cell::new(false),
            auto: RefCell::new(None),
            keep_previous_data,
            on_success,
            on_error,
        });

        if auto {
            let effect = runtime.effect({
                let owner = Rc::downgrade(&inner);
                let spawner = runtime.spawner();
                move || {
                    let Some(inner) = owner.upgrade() else {
                        return;
                    };
                    if let Some(task) = ResourceInner::start(&inner).detach() {
                        spawner.spawn_local(task);
                    }
                }
            });
            *inner.auto.borrow_mut() = Some(effect);
        }

        Self { inner }
    }

    /// Latest committed data. Tracked.
    pub fn data(&self) -> Option<T> {
        self.inner.data.get()
    }

    /// Error of the latest failed fetch, cleared by the next refresh. Tracked.
    pub fn error(&self) -> Option<Rc<E>> {
        self.inner.error.get().map(|shared| shared.0)
    }

    /// Whether a fetch is in flight. Tracked.
    pub fn loading(&self) -> bool {
        self.inner.loading.get()
    }

    /// Current lifecycle state. Tracked.
    pub fn state(&self) -> ResourceState {
        self.inner.state.get()
    }

    /// Version of the most recent refresh or clear.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Node ID of the auto-refresh effect, if auto mode is on.
    pub fn auto_effect(&self) -> Option<NodeId> {
        self.inner.auto.borrow().as_ref().map(Effect::id)
    }

    /// Start a fetch. See [`Refresh`] for what awaiting or dropping it does.
    pub fn refresh(&self) -> Refresh<T, E> {
        ResourceInner::start(&self.inner)
    }

    /// Replace the data directly, as if a fetch had succeeded with `value`.
    /// The producer is not invoked.
    pub fn mutate(&self, value: T) {
        self.inner.apply_mutation(value);
    }

    /// Like [`Resource::mutate`], computing the value from the current data.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(Option<&T>) -> T,
    {
        if self.inner.disposed.get() {
            return;
        }
        let next = f(self.inner.data.peek().as_ref());
        self.inner.apply_mutation(next);
    }

    /// Cancel in-flight work and reset to idle with no data and no error.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Stop auto-refreshing, cancel in-flight work and return to idle.
    /// Late results are discarded. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl<T, E> ResourceInner<T, E>
where
    T: Clone + PartialEq + 'static,
    E: 'static,
{
    /// Synchronous half of a refresh: bump the version, swap the token,
    /// enter loading, start the producer and poll it once.
    fn start(this: &Rc<Self>) -> Refresh<T, E> {
        if this.disposed.get() {
            return Refresh::finished();
        }

        let version = this.version.get() + 1;
        this.version.set(version);

        let token = CancellationToken::new();
        if let Some(previous) = this.token.replace(Some(token.clone())) {
            previous.cancel();
        }

        this.write_untracked(|| {
            this.loading.set(true);
            this.state.set(ResourceState::Loading);
            this.error.set(None);
            if !this.keep_previous_data {
                this.data.set(None);
            }
        });
        debug!(version, "resource refresh started");

        let mut future = (this.producer)(token.clone());
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(result) => {
                this.commit(version, &token, result);
                Refresh::finished()
            }
            Poll::Pending => Refresh::pending(Rc::downgrade(this), version, token, future),
        }
    }

    /// Whether a fetch started as `version` may still commit.
    pub(crate) fn is_current(&self, version: u64) -> bool {
        !self.disposed.get() && self.version.get() == version
    }

    pub(crate) fn spawner(&self) -> Rc<dyn Spawner> {
        self.runtime.spawner()
    }

    /// Commit a finished producer call if it is still the latest one.
    pub(crate) fn commit(&self, version: u64, token: &CancellationToken, result: Result<T, E>) {
        let latest = self.version.get();
        if !self.is_current(version) {
            debug!(version, latest, "discarding stale resource result");
            return;
        }

        match result {
            Ok(value) => {
                self.write_untracked(|| {
                    self.data.set(Some(value.clone()));
                    self.loading.set(false);
                    self.state.set(ResourceState::Success);
                });
                debug!(version, "resource fetch succeeded");
                if let Some(on_success) = &self.on_success {
                    self.runtime.untrack(|| on_success(&value));
                }
            }
            Err(_) if token.is_cancelled() => {
                debug!(version, "resource producer stopped on cancellation");
            }
            Err(err) => {
                let shared = SharedError(Rc::new(err));
                self.write_untracked(|| {
                    if !self.keep_previous_data {
                        self.data.set(None);
                    }
                    self.loading.set(false);
                    self.state.set(ResourceState::Error);
                    self.error.set(Some(shared.clone()));
                });
                debug!(version, "resource fetch failed");
                if let Some(on_error) = &self.on_error {
                    self.runtime.untrack(|| on_error(&shared.0));
                }
            }
        }
    }

    fn apply_mutation(&self, value: T) {
        if self.disposed.get() {
            return;
        }
        self.write_untracked(|| {
            self.data.set(Some(value));
            self.loading.set(false);
            self.state.set(ResourceState::Success);
            self.error.set(None);
        });
    }

    fn clear(&self) {
        if self.disposed.get() {
            return;
        }
        self.cancel_in_flight();
        self.version.set(self.version.get() + 1);
        self.write_untracked(|| {
            self.data.set(None);
            self.error.set(None);
            self.loading.set(false);
            self.state.set(ResourceState::Idle);
        });
        debug!(version = self.version.get(), "resource cleared");
    }

    fn dispose(&self) {
        let auto = self.auto.borrow_mut().take();
        if let Some(effect) = auto {
            effect.dispose();
        }
        if self.disposed.replace(true) {
            return;
        }
        self.cancel_in_flight();
        self.write_untracked(|| {
            self.loading.set(false);
            self.state.set(ResourceState::Idle);
        });
        debug!("resource disposed");
    }

    fn cancel_in_flight(&self) {
        if let Some(token) = self.token.borrow().as_ref() {
            token.cancel();
        }
    }

    /// Internal state writes: never tracked, observed as one transition.
    fn write_untracked(&self, write: impl FnOnce()) {
        self.runtime.untrack(|| self.runtime.batch(write));
    }
}

impl<T, E> Drop for ResourceInner<T, E> {
    fn drop(&mut self) {
        if let Some(effect) = self.auto.get_mut().take() {
            effect.dispose();
        }
        if let Some(token) = self.token.get_mut().take() {
            token.cancel();
        }
    }
}

impl<T, E> Clone for Resource<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Resource<T, E>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
    E: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("state", &self.inner.state.peek())
            .field("loading", &self.inner.loading.peek())
            .field("data", &self.inner.data.peek())
            .field("version", &self.version())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
