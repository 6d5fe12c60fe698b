//! Resource lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a resource is in its fetch lifecycle.
///
/// ```text
/// idle ──refresh──▶ loading ──ok──▶ success
///                      │
///                      └──err──▶ error
/// success | error ──refresh──▶ loading
/// any ──clear/dispose──▶ idle
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    /// Nothing fetched yet, or cleared.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The latest fetch (or mutation) produced data.
    Success,
    /// The latest fetch failed.
    Error,
}

impl ResourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
