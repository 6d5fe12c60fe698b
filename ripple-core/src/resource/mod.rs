//! Async Resources
//!
//! A resource wraps an async producer with reactive state, latest-wins
//! commit ordering and cooperative cancellation. See [`Resource`].

mod handle;
mod options;
mod refresh;
mod state;

pub use handle::Resource;
pub use options::ResourceOptions;
pub use refresh::Refresh;
pub use state::ResourceState;

pub use tokio_util::sync::CancellationToken;
