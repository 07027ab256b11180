#![forbid(unsafe_code)]

//! Callback-ref style binding: the host hands the node to a receiver.
//!
//! Instead of reading a [`NodeRef`](crate::combine::NodeRef) on dependency
//! notifications, the binder exposes a function-style [`Receiver`] that the
//! host calls with `Some(node)` on mount and `None` on unmount. It combines
//! with other receivers through [`combine`](crate::combine::combine).

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::Attachment;
use crate::combine::Receiver;
use crate::effect::Teardown;
use crate::host::{EventKind, EventSource, Invoker};

struct CallbackRefState<S: EventSource<E>, E> {
    kind: EventKind,
    listener: Invoker<E>,
    attachment: Option<Attachment<S, E>>,
    torn_down: bool,
}

/// Binds a listener to whichever node its receiver was last given.
pub struct CallbackRefBinder<S: EventSource<E>, E> {
    state: Rc<RefCell<CallbackRefState<S, E>>>,
    receiver: Receiver<S>,
}

impl<S: EventSource<E>, E> fmt::Debug for CallbackRefBinder<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CallbackRefBinder")
            .field("kind", &state.kind)
            .field("attached", &state.attachment.is_some())
            .finish()
    }
}

fn replace_attachment<S, E>(
    state: &RefCell<CallbackRefState<S, E>>,
    node: Option<S>,
) where
    S: EventSource<E>,
{
    // Detach outside the borrow: a source may call back into us.
    let previous = state.borrow_mut().attachment.take();
    drop(previous);

    let Some(node) = node else {
        return;
    };
    let (kind, listener) = {
        let state = state.borrow();
        if state.torn_down {
            return;
        }
        (state.kind.clone(), state.listener.clone())
    };
    let attachment = Attachment::attach(node, kind, listener);
    state.borrow_mut().attachment = Some(attachment);
}

impl<S, E> CallbackRefBinder<S, E>
where
    S: EventSource<E> + Clone + 'static,
    E: 'static,
{
    /// Create a binder that attaches `listener` for `kind` to received nodes.
    pub fn new(kind: impl Into<EventKind>, listener: Invoker<E>) -> Self {
        let state = Rc::new(RefCell::new(CallbackRefState {
            kind: kind.into(),
            listener,
            attachment: None,
            torn_down: false,
        }));
        let weak: Weak<RefCell<CallbackRefState<S, E>>> = Rc::downgrade(&state);
        let receiver = Receiver::function(move |node: Option<S>| {
            if let Some(state) = weak.upgrade() {
                replace_attachment(&state, node);
            }
        });
        Self { state, receiver }
    }

    /// The receiver to hand to the host. Identity-stable.
    #[must_use]
    pub fn receiver(&self) -> Receiver<S> {
        self.receiver.clone()
    }

    /// Switch the kind; a current attachment moves to the new kind.
    pub fn set_kind(&self, kind: impl Into<EventKind>) {
        let kind = kind.into();
        let current = {
            let mut state = self.state.borrow_mut();
            if state.kind == kind {
                return;
            }
            state.kind = kind;
            state.attachment.as_ref().map(|a| a.source().clone())
        };
        if current.is_some() {
            replace_attachment(&self.state, current);
        }
    }

    /// Whether a node is currently bound.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.borrow().attachment.is_some()
    }
}

impl<S: EventSource<E>, E> Teardown for CallbackRefBinder<S, E> {
    fn teardown(&mut self) {
        let previous = {
            let mut state = self.state.borrow_mut();
            state.torn_down = true;
            state.attachment.take()
        };
        drop(previous);
    }
}

impl<S: EventSource<E>, E> Drop for CallbackRefBinder<S, E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
