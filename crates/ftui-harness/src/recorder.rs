#![forbid(unsafe_code)]

//! Call recording for assertions.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ftui_hooks::Invoker;

/// Shared log of the values a callback was called with. Cloning shares the log.
pub struct Recorder<T> {
    calls: Rc<RefCell<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Rc::clone(&self.calls),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Recorder").field(&*self.calls.borrow()).finish()
    }
}

impl<T: 'static> Recorder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A closure that records its argument.
    pub fn sink(&self) -> impl Fn(T) + 'static {
        let calls = Rc::clone(&self.calls);
        move |value| calls.borrow_mut().push(value)
    }

    /// A fresh invoker that records its argument.
    #[must_use]
    pub fn invoker(&self) -> Invoker<T> {
        Invoker::new(self.sink())
    }

    /// Record a value directly.
    pub fn record(&self, value: T) {
        self.calls.borrow_mut().push(value);
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl<T: Clone + 'static> Recorder<T> {
    /// Copy of everything recorded so far.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.calls.borrow().clone()
    }

    /// The most recent value.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.calls.borrow().last().cloned()
    }
}
