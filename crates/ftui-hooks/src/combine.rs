#![forbid(unsafe_code)]

//! Node references, receivers, and fan-out of attach/detach notifications.
//!
//! A host tells whoever wants to know about a node that it is now attached
//! (`Some(node)`) or gone (`None`). Two receiver styles exist:
//!
//! - **Object style**: a [`NodeRef`] cell whose value is overwritten.
//! - **Function style**: a callback invoked with the value.
//!
//! [`CombinedReceiver`] lets several uncoordinated subscribers share one
//! node: it is itself a function-style receiver that forwards each value to
//! every constituent in declaration order, skipping absent ones.
//!
//! # Failure policy
//!
//! Catch and continue. A constituent that panics does not stop the ones after
//! it; the failures are collected into one [`CombineError`].
//! [`CombinedReceiver::try_deliver`] returns it and
//! [`CombinedReceiver::deliver`] logs it at `warn`. This requires unwinding
//! panics; with `panic = "abort"` the first panic aborts as usual.

use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::error::{CombineError, ConstituentFailure};

// ---------------------------------------------------------------------------
// NodeRef<T>
// ---------------------------------------------------------------------------

/// A shared, possibly-empty reference to a live node.
///
/// Cloning shares the cell; [`NodeRef::same`] compares cells, not values.
pub struct NodeRef<T> {
    cell: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&*self.cell.borrow()).finish()
    }
}

impl<T> Default for NodeRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeRef<T> {
    /// An empty reference.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: Rc::new(RefCell::new(None)),
        }
    }

    /// A reference already pointing at `value`.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(Some(value))),
        }
    }

    /// Point at `value`, or clear with `None`.
    pub fn set(&self, value: Option<T>) {
        *self.cell.borrow_mut() = value;
    }

    /// Clear and return the current value.
    pub fn take(&self) -> Option<T> {
        self.cell.borrow_mut().take()
    }

    /// Whether the reference currently resolves.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.cell.borrow().is_some()
    }

    /// Whether two references share a cell.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: Clone> NodeRef<T> {
    /// Resolve the reference.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.cell.borrow().clone()
    }
}

// ---------------------------------------------------------------------------
// Receiver<T>
// ---------------------------------------------------------------------------

/// Something that wants to hear about a node being attached or detached.
pub enum Receiver<T> {
    /// Invoked with the value.
    Function(Rc<dyn Fn(Option<T>)>),
    /// Assigned the value.
    Object(NodeRef<T>),
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Function(f) => Self::Function(Rc::clone(f)),
            Self::Object(r) => Self::Object(r.clone()),
        }
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Receiver::Function"),
            Self::Object(_) => f.write_str("Receiver::Object"),
        }
    }
}

impl<T> Receiver<T> {
    /// Function-style receiver from a closure.
    pub fn function(f: impl Fn(Option<T>) + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    /// Hand `value` to the receiver. `None` is the detach signal.
    pub fn deliver(&self, value: Option<T>) {
        match self {
            Self::Function(f) => f(value),
            Self::Object(r) => r.set(value),
        }
    }
}

impl<T> From<NodeRef<T>> for Receiver<T> {
    fn from(node_ref: NodeRef<T>) -> Self {
        Self::Object(node_ref)
    }
}

impl<T> From<&NodeRef<T>> for Receiver<T> {
    fn from(node_ref: &NodeRef<T>) -> Self {
        Self::Object(node_ref.clone())
    }
}

// ---------------------------------------------------------------------------
// CombinedReceiver<T>
// ---------------------------------------------------------------------------

/// Fan-out of one value to several receivers, in declaration order.
///
/// Stateless apart from the constituent list; delivering `None` forwards
/// the detach signal to every constituent.
pub struct CombinedReceiver<T> {
    receivers: Rc<[Option<Receiver<T>>]>,
}

impl<T> Clone for CombinedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            receivers: Rc::clone(&self.receivers),
        }
    }
}

impl<T> fmt::Debug for CombinedReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedReceiver")
            .field("slots", &self.receivers.len())
            .field("present", &self.len())
            .finish()
    }
}

impl<T> CombinedReceiver<T> {
    /// Number of present constituents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receivers.iter().flatten().count()
    }

    /// Whether there is no present constituent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + 'static> CombinedReceiver<T> {
    /// Combine receivers; `None` entries are kept as skipped slots.
    pub fn new(receivers: impl IntoIterator<Item = Option<Receiver<T>>>) -> Self {
        Self {
            receivers: receivers.into_iter().collect(),
        }
    }

    /// Deliver `value` to every present constituent.
    ///
    /// # Errors
    ///
    /// [`CombineError`] listing each constituent that panicked. All others
    /// were still delivered to.
    pub fn try_deliver(&self, value: Option<T>) -> Result<(), CombineError> {
        let mut failures = Vec::new();
        for (index, receiver) in self.receivers.iter().enumerate() {
            let Some(receiver) = receiver else {
                continue;
            };
            let item = value.clone();
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| receiver.deliver(item))) {
                failures.push(ConstituentFailure {
                    index,
                    message: panic_message(payload.as_ref()),
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CombineError { failures })
        }
    }

    /// Deliver `value`, logging aggregated failures instead of returning them.
    pub fn deliver(&self, value: Option<T>) {
        let attach = value.is_some();
        if let Err(err) = self.try_deliver(value) {
            tracing::warn!(attach, failed = err.failures.len(), error = %err, "combined receiver");
        }
    }

    /// View as a single function-style receiver.
    #[must_use]
    pub fn into_receiver(self) -> Receiver<T> {
        Receiver::function(move |value| self.deliver(value))
    }
}

/// Combine receivers into one function-style receiver.
pub fn combine<T: Clone + 'static>(
    receivers: impl IntoIterator<Item = Option<Receiver<T>>>,
) -> Receiver<T> {
    CombinedReceiver::new(receivers).into_receiver()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}
