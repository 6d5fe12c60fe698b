//! Diagnostics
//!
//! The runtime reports what it does through an injected [`Diagnostics`]
//! observer instead of a process-wide registry. Every hook has a no-op
//! default, so an implementation only overrides what it cares about.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ReactiveError;
use crate::graph::NodeId;

/// Label used for derivations created without one.
pub const UNLABELED_MEMO: &str = "memo";

/// Observer of runtime activity.
///
/// Implementations must be cheap: hooks are called synchronously on the hot
/// path of every write and evaluation.
pub trait Diagnostics: Send + Sync {
    /// A cell stored a new, distinct value.
    fn on_cell_write(&self, _cell: NodeId) {}

    /// A derivation recomputed its value.
    fn on_derivation_run(&self, _derivation: NodeId, _label: Option<&str>) {}

    /// A reaction body ran, initially or from a flush.
    fn on_reaction_run(&self, _reaction: NodeId) {}

    /// A reaction body failed during a scheduled run.
    fn on_reaction_error(&self, _error: &ReactiveError) {}
}

/// Diagnostics that discard everything. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {}

/// Point-in-time counters collected by [`DiagnosticsCounter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub cell_writes: u64,
    pub reaction_runs: u64,
    pub reaction_errors: u64,
    /// Derivation runs keyed by label, in first-seen order.
    pub derivation_runs: IndexMap<String, u64>,
}

/// Diagnostics that count events.
///
/// Shareable across runtimes (and threads) behind an `Arc`.
#[derive(Debug, Default)]
pub struct DiagnosticsCounter {
    counts: Mutex<DiagnosticsSnapshot>,
}

impl DiagnosticsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.counts.lock().clone()
    }

    /// One-line summary, e.g. `signal writes=3; reactions=4; memos: total:2`.
    pub fn summary(&self) -> String {
        let counts = self.counts.lock();
        let memos = if counts.derivation_runs.is_empty() {
            "none".to_string()
        } else {
            counts
                .derivation_runs
                .iter()
                .map(|(label, runs)| format!("{label}:{runs}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "signal writes={}; reactions={}; memos: {}",
            counts.cell_writes, counts.reaction_runs, memos
        )
    }

    pub fn reset(&self) {
        *self.counts.lock() = DiagnosticsSnapshot::default();
    }
}

impl Diagnostics for DiagnosticsCounter {
    fn on_cell_write(&self, _cell: NodeId) {
        self.counts.lock().cell_writes += 1;
    }

    fn on_derivation_run(&self, _derivation: NodeId, label: Option<&str>) {
        let mut counts = self.counts.lock();
        *counts
            .derivation_runs
            .entry(label.unwrap_or(UNLABELED_MEMO).to_string())
            .or_insert(0) += 1;
    }

    fn on_reaction_run(&self, _reaction: NodeId) {
        self.counts.lock().reaction_runs += 1;
    }

    fn on_reaction_error(&self, _error: &ReactiveError) {
        self.counts.lock().reaction_errors += 1;
    }
}
