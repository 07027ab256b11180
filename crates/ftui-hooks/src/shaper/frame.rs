#![forbid(unsafe_code)]

//! Frame-aligned throttle over a [`StableHandle`].
//!
//! The first call while nothing is outstanding requests the next frame and
//! captures its arguments. Calls made before that frame arrives are dropped:
//! first call wins within a frame, unlike [`Debounced`](super::Debounced)
//! where the last call wins. The result is at most one firing per frame.
//!
//! # Invariants
//!
//! 1. At most one frame request is outstanding.
//! 2. The outstanding marker is cleared before the callback runs, so the
//!    callback (or a call made after it panics) can schedule the next frame.
//! 3. [`FrameThrottled::cancel`] aborts the request without firing and is
//!    idempotent.
//! 4. Dropping a [`FrameThrottled`] cancels synchronously.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::effect::Teardown;
use crate::handle::StableHandle;
use crate::host::{FrameSource, FrameToken, Invoker};

struct ThrottleState<A> {
    frames: Rc<dyn FrameSource>,
    handle: RefCell<StableHandle<A>>,
    pending: Cell<Option<FrameToken>>,
    fired: Cell<u64>,
    dropped: Cell<u64>,
}

impl<A: 'static> ThrottleState<A> {
    fn request(self: &Rc<Self>, args: A) {
        if self.pending.get().is_some() {
            self.dropped.set(self.dropped.get() + 1);
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        let token = self.frames.schedule_next_frame(Box::new(move || {
            if let Some(state) = weak.upgrade() {
                state.fire(args);
            }
        }));
        tracing::trace!(token = token.0, "frame throttle requested");
        self.pending.set(Some(token));
    }

    fn fire(&self, args: A) {
        self.pending.set(None);
        self.fired.set(self.fired.get() + 1);
        let target = self.handle.borrow().invoker();
        target.call(args);
    }
}

impl<A> ThrottleState<A> {
    fn cancel(&self) {
        if let Some(token) = self.pending.take() {
            self.frames.cancel(token);
            tracing::trace!(token = token.0, "frame throttle cancelled");
        }
    }
}

/// A frame-throttled caller of a stable handle.
pub struct FrameThrottled<A> {
    state: Rc<ThrottleState<A>>,
    caller: Invoker<A>,
}

impl<A> fmt::Debug for FrameThrottled<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameThrottled")
            .field("pending", &self.state.pending.get().is_some())
            .field("fired", &self.state.fired.get())
            .field("dropped", &self.state.dropped.get())
            .finish()
    }
}

impl<A: 'static> FrameThrottled<A> {
    /// Throttle `f` with a fresh stable handle.
    pub fn new(frames: Rc<dyn FrameSource>, f: impl Fn(A) + 'static) -> Self {
        Self::from_handle(frames, &StableHandle::new(f))
    }

    /// Throttle an existing stable handle. Revisions of `handle` are honored.
    pub fn from_handle(frames: Rc<dyn FrameSource>, handle: &StableHandle<A>) -> Self {
        let state = Rc::new(ThrottleState {
            frames,
            handle: RefCell::new(handle.clone()),
            pending: Cell::new(None),
            fired: Cell::new(0),
            dropped: Cell::new(0),
        });
        let weak = Rc::downgrade(&state);
        let caller = Invoker::new(move |args: A| {
            if let Some(state) = weak.upgrade() {
                state.request(args);
            }
        });
        Self { state, caller }
    }

    /// Call the throttled function.
    pub fn call(&self, args: A) {
        self.state.request(args);
    }

    /// Identity-stable caller; ignored once this `FrameThrottled` is dropped.
    #[must_use]
    pub fn invoker(&self) -> Invoker<A> {
        self.caller.clone()
    }

    /// Abort the outstanding frame request without firing.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Whether a frame request is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.pending.get().is_some()
    }

    /// Number of invocations that fired.
    #[must_use]
    pub fn fired(&self) -> u64 {
        self.state.fired.get()
    }

    /// Number of calls dropped because a frame was already requested.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.state.dropped.get()
    }

    /// Install a new callback revision.
    pub fn revise(&self, f: impl Fn(A) + 'static) {
        self.state.handle.borrow().revise(f);
    }

    /// Wrap a different stable handle. Cancels the outstanding request first.
    pub fn rebind(&self, handle: &StableHandle<A>) {
        self.state.cancel();
        *self.state.handle.borrow_mut() = handle.clone();
    }
}

impl<A> Teardown for FrameThrottled<A> {
    fn teardown(&mut self) {
        self.state.cancel();
    }
}

impl<A> Drop for FrameThrottled<A> {
    fn drop(&mut self) {
        self.state.cancel();
    }
}
