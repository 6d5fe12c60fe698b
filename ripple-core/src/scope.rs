//! Scoped Context
//!
//! A value passed down a synchronous call tree without threading it through
//! every signature. `provide` pushes a value, runs a closure and pops the
//! value again; `current` reads the innermost provided value or falls back
//! to a default.
//!
//! # How Scoping Works
//!
//! Each context owns a stack. The pop in `provide` is done by a drop guard,
//! so a panicking closure still leaves the stack balanced. The closure runs
//! to completion before `provide` returns; if it returns a future, that
//! future is polled later with the value already popped. Providers cannot
//! span a suspension point.
//!
//! Contexts are independent of the reactive runtime: reading one never
//! registers a dependency.

use std::cell::RefCell;
use std::fmt;

use crate::error::{ReactiveError, Result};

/// A stack-scoped value with an optional default.
///
/// # Example
///
/// ```rust,ignore
/// let theme = ScopedContext::new("light");
///
/// assert_eq!(theme.current(), "light");
/// theme.provide("dark", || {
///     assert_eq!(theme.current(), "dark");
/// });
/// assert_eq!(theme.current(), "light");
/// ```
pub struct ScopedContext<T> {
    name: &'static str,
    default: Option<T>,
    stack: RefCell<Vec<T>>,
}

impl<T: Clone> ScopedContext<T> {
    /// A context that reads as `default` outside any provider.
    pub fn new(default: T) -> Self {
        Self {
            name: "context",
            default: Some(default),
            stack: RefCell::new(Vec::new()),
        }
    }

    /// A context with no default. Reading it outside a provider is an error
    /// naming `name`.
    pub fn strict(name: &'static str) -> Self {
        Self {
            name,
            default: None,
            stack: RefCell::new(Vec::new()),
        }
    }

    /// Run `f` with `value` as the current value.
    pub fn provide<R>(&self, value: T, f: impl FnOnce() -> R) -> R {
        self.stack.borrow_mut().push(value);
        let _frame = ProvideFrame { context: self };
        f()
    }

    /// The innermost provided value, or the default.
    ///
    /// # Panics
    ///
    /// Panics if this is a strict context and nothing provides it. Use
    /// [`ScopedContext::try_current`] to handle that case.
    pub fn current(&self) -> T {
        match self.try_current() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Like [`ScopedContext::current`], returning
    /// [`ReactiveError::MissingProvider`] instead of panicking.
    pub fn try_current(&self) -> Result<T> {
        if let Some(value) = self.stack.borrow().last() {
            return Ok(value.clone());
        }
        self.default
            .clone()
            .ok_or(ReactiveError::MissingProvider { name: self.name })
    }

    /// Number of active providers.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    pub fn is_strict(&self) -> bool {
        self.default.is_none()
    }
}

struct ProvideFrame<'a, T> {
    context: &'a ScopedContext<T>,
}

impl<T> Drop for ProvideFrame<'_, T> {
    fn drop(&mut self) {
        self.context.stack.borrow_mut().pop();
    }
}

impl<T: fmt::Debug> fmt::Debug for ScopedContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedContext")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("depth", &self.stack.borrow().len())
            .finish()
    }
}
