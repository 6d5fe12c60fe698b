//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, and effects.
//! These primitives form the foundation of fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal automatically
//! registers that context as an observer. When the signal's value changes, all
//! observers are notified.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only when
//! one of its dependencies changed and it is read again.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its dependencies
//! change. Effects are used to synchronize reactive state with external systems,
//! such as updating a host tree or logging.
//!
//! # Implementation Notes
//!
//! Every primitive belongs to a [`Runtime`], which holds the active-observer
//! slot. When a signal is read, the runtime checks that slot and, if an
//! observer is active, records the dependency.

mod context;
mod effect;
mod memo;
mod runtime;
mod signal;

pub use effect::{Cleanup, Effect, IntoCleanup};
pub use memo::Memo;
pub use runtime::Runtime;
pub use signal::Signal;

pub(crate) use effect::ReactionCore;
