//! Resource construction options.

use std::fmt;

/// Options for [`Runtime::resource`](crate::Runtime::resource).
///
/// ```rust,ignore
/// let options = ResourceOptions::default()
///     .auto(true)
///     .keep_previous_data(false)
///     .on_error(|err: &FetchError| tracing::warn!(%err, "fetch failed"));
/// ```
pub struct ResourceOptions<T, E> {
    pub(crate) auto: bool,
    pub(crate) keep_previous_data: bool,
    pub(crate) initial_data: Option<T>,
    pub(crate) on_success: Option<Box<dyn Fn(&T)>>,
    pub(crate) on_error: Option<Box<dyn Fn(&E)>>,
}

impl<T, E> Default for ResourceOptions<T, E> {
    fn default() -> Self {
        Self {
            auto: false,
            keep_previous_data: true,
            initial_data: None,
            on_success: None,
            on_error: None,
        }
    }
}

impl<T, E> ResourceOptions<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh immediately and again whenever a signal the producer reads
    /// before its first suspension changes. Off by default.
    pub fn auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    /// Keep the last data visible while a refresh is loading or after it
    /// fails. On by default.
    pub fn keep_previous_data(mut self, keep: bool) -> Self {
        self.keep_previous_data = keep;
        self
    }

    /// Seed the resource with data; it then starts in the success state.
    pub fn initial_data(mut self, data: T) -> Self {
        self.initial_data = Some(data);
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E) + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }
}

impl<T, E> fmt::Debug for ResourceOptions<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("auto", &self.auto)
            .field("keep_previous_data", &self.keep_previous_data)
            .field("has_initial_data", &self.initial_data.is_some())
            .field("has_on_success", &self.on_success.is_some())
            .field("has_on_error", &self.on_error.is_some())
            .finish()
    }
}
