//! Reaction Scheduler
//!
//! Reactions are never run inline by a write. A write queues every affected
//! reaction here and the runtime drains the queue in a single flush loop.
//!
//! # Rules
//!
//! 1. A reaction sits in the queue at most once between flushes; the
//!    reaction's own `queued` flag enforces this before it reaches us.
//! 2. The queue is drained first-in first-out.
//! 3. A flush never nests. Work queued while a flush is running is picked up
//!    by the loop already in progress.
//! 4. While any batch is open no flush starts; the outermost batch exit
//!    triggers exactly one.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::reactive::ReactionCore;

/// Run queue plus the batch and flush bookkeeping around it.
#[derive(Default)]
pub(crate) struct Scheduler {
    queue: RefCell<VecDeque<Rc<ReactionCore>>>,
    batch_depth: Cell<usize>,
    flushing: Cell<bool>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append newly queued reactions in the order they were discovered.
    pub(crate) fn enqueue(&self, reactions: impl IntoIterator<Item = Rc<ReactionCore>>) {
        self.queue.borrow_mut().extend(reactions);
    }

    /// Take the next reaction to run, clearing its queued flag.
    pub(crate) fn pop(&self) -> Option<Rc<ReactionCore>> {
        let next = self.queue.borrow_mut().pop_front();
        if let Some(core) = &next {
            core.clear_queued();
        }
        next
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub(crate) fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    pub(crate) fn begin_batch(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    /// Close one batch level. Returns true when the outermost batch closed.
    pub(crate) fn end_batch(&self) -> bool {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth == 0
    }

    /// Claim the flush loop. Returns `None` if a flush is already running.
    pub(crate) fn begin_flush(&self) -> Option<FlushGuard<'_>> {
        if self.flushing.replace(true) {
            return None;
        }
        Some(FlushGuard { scheduler: self })
    }

    pub(crate) fn is_flushing(&self) -> bool {
        self.flushing.get()
    }
}

/// Releases the flush claim when dropped, including on unwind.
pub(crate) struct FlushGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.flushing.set(false);
    }
}
