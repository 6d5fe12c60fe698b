//! The future returned by a refresh.

use std::future::Future;
use std::pin::Pin;
use std::rc::Weak;
use std::task::{ready, Context, Poll};

use futures_util::future::{FutureExt, LocalBoxFuture};
use tokio_util::sync::CancellationToken;

use super::handle::ResourceInner;

/// Completion of one [`Resource::refresh`](crate::Resource::refresh) call.
///
/// The synchronous part of the refresh (state transition, producer start,
/// first poll) has already happened when this value is returned. Awaiting it
/// drives the producer to completion and commits the result, unless a newer
/// refresh, a clear or a dispose superseded it in the meantime.
///
/// Dropping it unawaited does not abandon the fetch: the remaining work is
/// handed to the runtime's [`Spawner`](crate::Spawner), which with the
/// default spawner needs a running tokio `LocalSet`. A fetch that was already
/// superseded is dropped instead.
///
/// Resolves to `()` in every case; outcomes are read from the resource.
pub struct Refresh<T, E>
where
    T: Clone + PartialEq + 'static,
    E: 'static,
{
    pending: Option<PendingFetch<T, E>>,
}

/// A started fetch waiting for its producer, committing when it finishes.
struct PendingFetch<T, E> {
    owner: Weak<ResourceInner<T, E>>,
    version: u64,
    token: CancellationToken,
    future: LocalBoxFuture<'static, Result<T, E>>,
}

impl<T, E> Refresh<T, E>
where
    T: Clone + PartialEq + 'static,
    E: 'static,
{
    pub(crate) fn finished() -> Self {
        Self { pending: None }
    }

    pub(crate) fn pending(
        owner: Weak<ResourceInner<T, E>>,
        version: u64,
        token: CancellationToken,
        future: LocalBoxFuture<'static, Result<T, E>>,
    ) -> Self {
        Self {
            pending: Some(PendingFetch {
                owner,
                version,
                token,
                future,
            }),
        }
    }

    /// True when the producer completed during the synchronous first poll
    /// (or never started), so awaiting is a no-op.
    pub fn is_finished(&self) -> bool {
        self.pending.is_none()
    }

    /// The version this refresh will try to commit as, if still pending.
    pub fn version(&self) -> Option<u64> {
        self.pending.as_ref().map(|pending| pending.version)
    }

    /// Take the unfinished work out as a standalone task.
    pub(crate) fn detach(mut self) -> Option<LocalBoxFuture<'static, ()>> {
        self.pending.take().map(FutureExt::boxed_local)
    }
}

impl<T, E> Unpin for Refresh<T, E>
where
    T: Clone + PartialEq + 'static,
    E: 'static,
{
}

impl<T, E> Future for Refresh<T, E>
where
    T: Clone + PartialEq + 'static,
    E: 'static,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let Some(pending) = this.pending.as_mut() else {
            return Poll::Ready(());
        };

        ready!(Pin::new(pending).poll(cx));
        this.pending = None;
        Poll::Ready(())
    }
}

impl<T, E> Drop for Refresh<T, E>
where
    T: Clone + PartialEq + 'static,
    E: 'static,
{
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if std::thread::panicking() {
            return;
        }
        let Some(owner) = pending.owner.upgrade() else {
            return;
        };
        if owner.is_current(pending.version) {
            owner.spawner().spawn_local(pending.boxed_local());
        }
    }
}

impl<T, E> Unpin for PendingFetch<T, E> {}

impl<T, E> Future for PendingFetch<T, E>
where
    T: Clone + PartialEq + 'static,
    E: 'static,
{
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let result = ready!(self.future.as_mut().poll(cx));
        if let Some(owner) = self.owner.upgrade() {
            owner.commit(self.version, &self.token, result);
        }
        Poll::Ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use tokio::sync::oneshot;

    use crate::config::Spawner;
    use crate::resource::{ResourceOptions, ResourceState};
    use crate::Runtime;

    /// Collects detached tasks so the test can drive them by hand.
    #[derive(Default)]
    struct Collecting {
        tasks: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    }

    impl Spawner for Collecting {
        fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
            self.tasks.borrow_mut().push(task);
        }
    }

    #[test]
    fn dropped_refresh_is_handed_to_the_spawner() {
        let collecting = Rc::new(Collecting::default());
        let rt = Runtime::builder().spawner(collecting.clone()).build();
        let (tx, rx) = oneshot::channel::<i32>();
        let reply = RefCell::new(Some(rx));

        let resource = rt.resource(
            move |_token| {
                let rx = reply.borrow_mut().take();
                async move {
                    match rx {
                        Some(rx) => rx.await.map_err(|_| ()),
                        None => Err(()),
                    }
                }
            },
            ResourceOptions::default(),
        );

        drop(resource.refresh());
        assert_eq!(collecting.tasks.borrow().len(), 1);
        assert_eq!(resource.state(), ResourceState::Loading);

        tx.send(5).unwrap();
        let mut task = collecting.tasks.borrow_mut().pop().unwrap();
        assert!(task.as_mut().now_or_never().is_some());

        assert_eq!(resource.data(), Some(5));
        assert_eq!(resource.state(), ResourceState::Success);
    }

    #[test]
    fn superseded_refresh_is_not_spawned_on_drop() {
        let collecting = Rc::new(Collecting::default());
        let rt = Runtime::builder().spawner(collecting.clone()).build();
        let resource = rt.resource(
            |_token| futures_util::future::pending::<Result<i32, ()>>(),
            ResourceOptions::default(),
        );

        let first = resource.refresh();
        let second = resource.refresh();
        drop(first);
        assert!(collecting.tasks.borrow().is_empty());

        resource.dispose();
        drop(second);
        assert!(collecting.tasks.borrow().is_empty());
    }
}
