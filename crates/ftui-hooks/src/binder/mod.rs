#![forbid(unsafe_code)]

//! Binding invokers to external sources for exactly as long as they are live.
//!
//! Every binder here reduces to one primitive, [`Attachment`]: an explicit
//! dispose handle for a single `(source, kind, listener)` registration. A
//! binder holds at most one attachment per `(source, kind)` and replaces it
//! under a strict discipline: the old one is fully detached before anything
//! new is evaluated.
//!
//! - [`EventBinder`]: target reference + kind + `active` flag, driven by
//!   dependency notifications.
//! - [`GlobalListener`]: always-present global source, bound for the
//!   binder's whole life.
//! - [`CallbackRefBinder`]: binds whatever node a host hands to its receiver.
//! - [`ResizeBinder`]: same shape, for size observers.
//!
//! # Invariants
//!
//! 1. Active with a live source ⇒ exactly one attachment; otherwise none.
//! 2. Any change of source identity, kind, active flag or listener identity
//!    detaches first, then re-evaluates. The reattach is never skipped.
//! 3. Teardown (explicit or by drop) always detaches and is idempotent.
//! 4. Detach goes to the source the listener was attached to, even if the
//!    target reference has since moved on.

pub mod callback_ref;
pub mod event;
pub mod resize;

pub use callback_ref::CallbackRefBinder;
pub use event::{EventBinder, GlobalListener};
pub use resize::ResizeBinder;

use std::fmt;

use crate::host::{EventKind, EventSource, Invoker};

/// One live registration of a listener on a source.
///
/// Dropping the attachment detaches it.
pub struct Attachment<S: EventSource<E>, E> {
    source: S,
    kind: EventKind,
    listener: Invoker<E>,
    live: bool,
}

impl<S: EventSource<E>, E> Attachment<S, E> {
    /// Register `listener` on `source` for `kind`.
    pub fn attach(source: S, kind: EventKind, listener: Invoker<E>) -> Self {
        source.register(&kind, &listener);
        tracing::debug!(kind = %kind, listener = ?listener.id(), "attached");
        Self {
            source,
            kind,
            listener,
            live: true,
        }
    }

    /// Unregister. A second call does nothing.
    pub fn detach(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        self.source.unregister(&self.kind, &self.listener);
        tracing::debug!(kind = %self.kind, listener = ?self.listener.id(), "detached");
    }

    /// Whether the registration is still in place.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// The source this attachment was made on.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The attached kind.
    #[must_use]
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }
}

impl<S: EventSource<E>, E> Drop for Attachment<S, E> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<S: EventSource<E>, E> fmt::Debug for Attachment<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("kind", &self.kind)
            .field("listener", &self.listener.id())
            .field("live", &self.live)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal recording source shared by the binder unit tests.

    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::host::{EventKind, EventSource, InvokerId, Invoker};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Op {
        Register(&'static str, String, InvokerId),
        Unregister(&'static str, String, InvokerId),
    }

    /// A named source that logs register/unregister into a shared journal.
    #[derive(Clone)]
    pub struct FakeSource {
        pub name: &'static str,
        pub journal: Rc<RefCell<Vec<Op>>>,
        pub listeners: Rc<RefCell<Vec<(EventKind, Invoker<u32>)>>>,
    }

    impl PartialEq for FakeSource {
        fn eq(&self, other: &Self) -> bool {
            self.name == other.name && Rc::ptr_eq(&self.listeners, &other.listeners)
        }
    }

    impl FakeSource {
        pub fn new(name: &'static str, journal: &Rc<RefCell<Vec<Op>>>) -> Self {
            Self {
                name,
                journal: Rc::clone(journal),
                listeners: Rc::new(RefCell::new(Vec::new())),
            }
        }

        pub fn emit(&self, kind: &EventKind, value: u32) {
            let targets: Vec<Invoker<u32>> = self
                .listeners
                .borrow()
                .iter()
                .filter(|(k, _)| k == kind)
                .map(|(_, l)| l.clone())
                .collect();
            for listener in targets {
                listener.call(value);
            }
        }

        pub fn listener_count(&self) -> usize {
            self.listeners.borrow().len()
        }
    }

    impl EventSource<u32> for FakeSource {
        fn register(&self, kind: &EventKind, listener: &Invoker<u32>) {
            self.journal.borrow_mut().push(Op::Register(
                self.name,
                kind.to_string(),
                listener.id(),
            ));
            self.listeners
                .borrow_mut()
                .push((kind.clone(), listener.clone()));
        }

        fn unregister(&self, kind: &EventKind, listener: &Invoker<u32>) {
            self.journal.borrow_mut().push(Op::Unregister(
                self.name,
                kind.to_string(),
                listener.id(),
            ));
            self.listeners
                .borrow_mut()
                .retain(|(k, l)| !(k == kind && l.same(listener)));
        }
    }

    pub fn journal() -> Rc<RefCell<Vec<Op>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    pub fn registers(journal: &Rc<RefCell<Vec<Op>>>) -> usize {
        journal
            .borrow()
            .iter()
            .filter(|op| matches!(op, Op::Register(..)))
            .count()
    }

    pub fn unregisters(journal: &Rc<RefCell<Vec<Op>>>) -> usize {
        journal
            .borrow()
            .iter()
            .filter(|op| matches!(op, Op::Unregister(..)))
            .count()
    }
}
