//! Ripple Core
//!
//! A fine-grained reactive engine. It implements:
//!
//! - Reactive primitives (signals, memos, effects)
//! - A dependency graph with lazy, memoized derivations
//! - A FIFO effect scheduler with batching and untracked reads
//! - Async resources with latest-wins commits and cooperative cancellation
//! - Stack-scoped context values
//!
//! Everything lives inside an explicit [`Runtime`]. The runtime and its
//! handles are single-threaded (`!Send`); async resource work runs on a
//! tokio `LocalSet` by default.
//!
//! # Architecture
//!
//! - `graph`: node arena, dependency edges and the effect queue
//! - `reactive`: the runtime, tracking context and primitive handles
//! - `resource`: async data wrapped in reactive state
//! - `scope`: scoped context values
//! - `diagnostics`: injectable observer for runtime activity
//! - `config`: runtime construction and host hooks
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::Runtime;
//!
//! let rt = Runtime::new();
//!
//! // Create a signal
//! let count = rt.signal(0);
//!
//! // Create a derived value
//! let doubled = rt.memo({
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! // Create an effect
//! rt.effect(move || {
//!     println!("Doubled: {}", doubled.get());
//! });
//!
//! // Update the signal
//! count.set(5);
//! // Effect runs again, prints: "Doubled: 10"
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod resource;
pub mod scope;

pub use config::{RuntimeBuilder, RuntimeConfig, Spawner, TokioSpawner};
pub use diagnostics::{Diagnostics, DiagnosticsCounter, DiagnosticsSnapshot, NoopDiagnostics};
pub use error::{ReactiveError, Result};
pub use graph::{NodeId, NodeKind};
pub use reactive::{Cleanup, Effect, IntoCleanup, Memo, Runtime, Signal};
pub use resource::{CancellationToken, Refresh, Resource, ResourceOptions, ResourceState};
pub use scope::ScopedContext;
