#![forbid(unsafe_code)]

//! Collaborator contracts consumed by the hooks core.
//!
//! Nothing in this crate reaches for an ambient global. Timers, frames, event
//! sources, size observers and the region tree are all injected through the
//! traits below, so a native event loop, a wasm host, and the deterministic
//! doubles in `ftui-harness` are interchangeable.
//!
//! # Identity
//!
//! [`Invoker`] is the unit of listener identity. Two invokers are the same
//! listener exactly when they share an allocation; cloning an invoker keeps
//! its identity, wrapping the same closure twice does not. Event sources must
//! compare listeners with [`Invoker::id`] when unregistering.
//!
//! # Contracts
//!
//! | Collaborator | Acquire | Release | Release twice |
//! |--------------|---------|---------|---------------|
//! | [`EventSource`] | `register` | `unregister` | no-op |
//! | [`TimerSource`] | `schedule_after` | `cancel` | no-op |
//! | [`FrameSource`] | `schedule_next_frame` | `cancel` | no-op |
//! | [`ObserveSource`] | `observe` | `disconnect` | no-op |

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Invoker
// ---------------------------------------------------------------------------

/// Opaque listener identity derived from an [`Invoker`]'s allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvokerId(usize);

/// A cloneable, identity-comparable callable.
///
/// This is the Rust counterpart of "a function reference": cheap to clone,
/// and two clones compare equal under [`same`](Self::same).
pub struct Invoker<A, R = ()> {
    f: Rc<dyn Fn(A) -> R>,
}

impl<A, R> Clone for Invoker<A, R> {
    fn clone(&self) -> Self {
        Self {
            f: Rc::clone(&self.f),
        }
    }
}

impl<A, R> fmt::Debug for Invoker<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker").field("id", &self.id()).finish()
    }
}

impl<A, R> Invoker<A, R> {
    /// Wrap a closure in a fresh identity.
    pub fn new(f: impl Fn(A) -> R + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    /// Invoke the underlying closure.
    #[inline]
    pub fn call(&self, args: A) -> R {
        (self.f)(args)
    }

    /// Identity of this invoker. Data pointer only; vtables are ignored.
    #[must_use]
    pub fn id(&self) -> InvokerId {
        InvokerId(Rc::as_ptr(&self.f).cast::<()>() as usize)
    }

    /// Whether `self` and `other` are the same listener.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Name of an event or notification kind (`"keydown"`, `"resize"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKind(Cow<'static, str>);

impl EventKind {
    pub const CLICK: Self = Self::from_static("click");
    pub const POINTER_DOWN: Self = Self::from_static("pointerdown");
    pub const MOUSE_DOWN: Self = Self::from_static("mousedown");
    pub const TOUCH_START: Self = Self::from_static("touchstart");
    pub const KEY_DOWN: Self = Self::from_static("keydown");
    pub const RESIZE: Self = Self::from_static("resize");
    pub const SCROLL: Self = Self::from_static("scroll");

    /// Kind from a static name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Kind from an owned or borrowed name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The event name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Something listeners can be attached to: a node, the global scope, ...
pub trait EventSource<E> {
    /// Attach `listener` for `kind`.
    fn register(&self, kind: &EventKind, listener: &Invoker<E>);

    /// Detach `listener` for `kind`. Unknown listeners are ignored.
    fn unregister(&self, kind: &EventKind, listener: &Invoker<E>);
}

impl<E, S: EventSource<E> + ?Sized> EventSource<E> for Rc<S> {
    fn register(&self, kind: &EventKind, listener: &Invoker<E>) {
        (**self).register(kind, listener);
    }

    fn unregister(&self, kind: &EventKind, listener: &Invoker<E>) {
        (**self).unregister(kind, listener);
    }
}

/// A one-shot unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// Handle to a requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(pub u64);

/// Handle to an active observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationToken(pub u64);

/// Wall-clock one-shot timers.
pub trait TimerSource {
    /// Run `task` once, `delay` after now.
    fn schedule_after(&self, delay: Duration, task: Task) -> TimerToken;

    /// Drop a scheduled task without running it. Fired or unknown tokens are ignored.
    fn cancel(&self, token: TimerToken);
}

/// Rendering-frame callbacks.
pub trait FrameSource {
    /// Run `task` at the next frame boundary.
    fn schedule_next_frame(&self, task: Task) -> FrameToken;

    /// Drop a requested callback without running it. Fired or unknown tokens are ignored.
    fn cancel(&self, token: FrameToken);
}

/// Observers that report changes of a node (for example its size).
pub trait ObserveSource<N, E> {
    /// Start delivering notifications about `node` to `listener`.
    fn observe(&self, node: &N, listener: &Invoker<E>) -> ObservationToken;

    /// Stop an observation. Unknown tokens are ignored.
    fn disconnect(&self, token: ObservationToken);
}

impl<N, E, O: ObserveSource<N, E> + ?Sized> ObserveSource<N, E> for Rc<O> {
    fn observe(&self, node: &N, listener: &Invoker<E>) -> ObservationToken {
        (**self).observe(node, listener)
    }

    fn disconnect(&self, token: ObservationToken) {
        (**self).disconnect(token);
    }
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

/// Containment queries over the host's node tree.
pub trait RegionTree<N> {
    /// Whether `region` is `node` or one of its ancestors. Must be side-effect free.
    fn contains(&self, region: &N, node: &N) -> bool;

    /// The element that currently holds keyboard focus, if any.
    fn active_element(&self) -> Option<N>;
}

impl<N, T: RegionTree<N> + ?Sized> RegionTree<N> for Rc<T> {
    fn contains(&self, region: &N, node: &N) -> bool {
        (**self).contains(region, node)
    }

    fn active_element(&self) -> Option<N> {
        (**self).active_element()
    }
}

/// Accessors the outside-interaction detector needs from an input event.
pub trait InteractionEvent<N> {
    /// Kind the event was dispatched as.
    fn kind(&self) -> &EventKind;

    /// Node the event originated from, if any.
    fn target(&self) -> Option<&N>;

    /// Key name for keyboard events (`"Enter"`, `"Escape"`, ...).
    fn key(&self) -> Option<&str>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn invoker_clone_keeps_identity() {
        let a = Invoker::new(|x: i32| x + 1);
        let b = a.clone();
        assert!(a.same(&b));
        assert_eq!(a.id(), b.id());
        assert_eq!(b.call(1), 2);
    }

    #[test]
    fn distinct_invokers_differ() {
        let hits = Rc::new(Cell::new(0));
        let h1 = Rc::clone(&hits);
        let h2 = Rc::clone(&hits);
        let a = Invoker::new(move |()| h1.set(h1.get() + 1));
        let b = Invoker::new(move |()| h2.set(h2.get() + 1));
        assert!(!a.same(&b));
        a.call(());
        b.call(());
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn event_kind_display_and_eq() {
        assert_eq!(EventKind::KEY_DOWN.to_string(), "keydown");
        assert_eq!(EventKind::from("click"), EventKind::CLICK);
        assert_eq!(EventKind::new(String::from("resize")), EventKind::RESIZE);
        assert_ne!(EventKind::MOUSE_DOWN, EventKind::POINTER_DOWN);
    }
}
