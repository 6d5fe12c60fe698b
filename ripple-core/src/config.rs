//! Runtime Configuration
//!
//! A runtime has two host-facing seams: the diagnostics observer and the
//! spawner that drives async producer continuations. Both default to
//! something sensible and can be replaced through [`RuntimeBuilder`].

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use futures_util::future::LocalBoxFuture;

use crate::diagnostics::{Diagnostics, NoopDiagnostics};
use crate::reactive::Runtime;

/// Host hook that drives a detached, single-threaded future to completion.
///
/// Used for the continuation of auto-mode resource fetches, which cannot be
/// awaited by anyone because a reaction started them.
pub trait Spawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);
}

/// Spawns onto the current tokio `LocalSet`.
///
/// Panics (inside tokio) if no `LocalSet` is running on this thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl Spawner for TokioSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}

/// Settings a runtime is constructed from.
#[derive(Clone)]
pub struct RuntimeConfig {
    pub diagnostics: Arc<dyn Diagnostics>,
    pub spawner: Rc<dyn Spawner>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            diagnostics: Arc::new(NoopDiagnostics),
            spawner: Rc::new(TokioSpawner),
        }
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig").finish_non_exhaustive()
    }
}

/// Builder for [`Runtime`].
///
/// ```rust,ignore
/// let counter = Arc::new(DiagnosticsCounter::new());
/// let rt = Runtime::builder().diagnostics(counter.clone()).build();
/// ```
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.config.diagnostics = diagnostics;
        self
    }

    pub fn spawner(mut self, spawner: Rc<dyn Spawner>) -> Self {
        self.config.spawner = spawner;
        self
    }

    pub fn config(self) -> RuntimeConfig {
        self.config
    }

    pub fn build(self) -> Runtime {
        Runtime::with_config(self.config)
    }
}
