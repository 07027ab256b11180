#![forbid(unsafe_code)]

//! Trailing-edge debounce over a [`StableHandle`].
//!
//! Each call cancels the pending invocation and schedules a new one `delay`
//! after *this* call. Only the last call of a burst fires, with its own
//! arguments; there is no leading edge.
//!
//! # Invariants
//!
//! 1. At most one pending invocation exists at a time.
//! 2. A fired invocation uses the arguments of the last call before it.
//! 3. [`Debounced::cancel`] discards the pending invocation without firing;
//!    with nothing pending it does nothing.
//! 4. Changing the delay or rebinding the handle cancels first, so nothing
//!    scheduled under the old configuration can fire.
//! 5. Dropping a [`Debounced`] cancels synchronously, and invokers obtained
//!    from [`Debounced::invoker`] become no-ops.
//!
//! Callback revisions through [`Debounced::revise`] do not cancel: a pending
//! invocation runs the newest revision, never a stale one.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::config::DebounceConfig;
use crate::effect::Teardown;
use crate::handle::StableHandle;
use crate::host::{Invoker, TimerSource, TimerToken};

struct DebounceState<A> {
    timers: Rc<dyn TimerSource>,
    handle: RefCell<StableHandle<A>>,
    delay: Cell<Duration>,
    pending: Cell<Option<TimerToken>>,
    fired: Cell<u64>,
}

impl<A: 'static> DebounceState<A> {
    fn schedule(self: &Rc<Self>, args: A) {
        if let Some(token) = self.pending.take() {
            self.timers.cancel(token);
            tracing::trace!(token = token.0, "debounce superseded");
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        let token = self.timers.schedule_after(
            self.delay.get(),
            Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    state.fire(args);
                }
            }),
        );
        self.pending.set(Some(token));
    }

    fn fire(&self, args: A) {
        self.pending.set(None);
        self.fired.set(self.fired.get() + 1);
        let target = self.handle.borrow().invoker();
        tracing::trace!(fired = self.fired.get(), "debounce fired");
        target.call(args);
    }

    fn cancel(&self) {
        if let Some(token) = self.pending.take() {
            self.timers.cancel(token);
            tracing::trace!(token = token.0, "debounce cancelled");
        }
    }
}

/// A debounced caller of a stable handle.
pub struct Debounced<A> {
    state: Rc<DebounceState<A>>,
    caller: Invoker<A>,
}

impl<A> fmt::Debug for Debounced<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounced")
            .field("delay", &self.state.delay.get())
            .field("pending", &self.state.pending.get().is_some())
            .field("fired", &self.state.fired.get())
            .finish()
    }
}

impl<A: 'static> Debounced<A> {
    /// Debounce `f` with a fresh stable handle.
    pub fn new(timers: Rc<dyn TimerSource>, delay: Duration, f: impl Fn(A) + 'static) -> Self {
        Self::from_handle(timers, delay, &StableHandle::new(f))
    }

    /// Debounce `f` with the quiet period from `config`.
    pub fn with_config(
        timers: Rc<dyn TimerSource>,
        config: &DebounceConfig,
        f: impl Fn(A) + 'static,
    ) -> Self {
        Self::new(timers, config.delay, f)
    }

    /// Debounce an existing stable handle. Revisions of `handle` are honored.
    pub fn from_handle(
        timers: Rc<dyn TimerSource>,
        delay: Duration,
        handle: &StableHandle<A>,
    ) -> Self {
        let state = Rc::new(DebounceState {
            timers,
            handle: RefCell::new(handle.clone()),
            delay: Cell::new(delay),
            pending: Cell::new(None),
            fired: Cell::new(0),
        });
        let weak = Rc::downgrade(&state);
        let caller = Invoker::new(move |args: A| {
            if let Some(state) = weak.upgrade() {
                state.schedule(args);
            }
        });
        Self { state, caller }
    }

    /// Call the debounced function: (re)start the quiet period with `args`.
    pub fn call(&self, args: A) {
        self.state.schedule(args);
    }

    /// Identity-stable caller, suitable for handing to an event binder.
    ///
    /// It holds no strong reference; once this `Debounced` is dropped, calls
    /// are ignored.
    #[must_use]
    pub fn invoker(&self) -> Invoker<A> {
        self.caller.clone()
    }

    /// Drop the pending invocation, if any, without firing it.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Whether an invocation is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.pending.get().is_some()
    }

    /// Number of invocations that actually fired.
    #[must_use]
    pub fn fired(&self) -> u64 {
        self.state.fired.get()
    }

    /// Current quiet period.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.state.delay.get()
    }

    /// Change the quiet period. Cancels any pending invocation first.
    pub fn set_delay(&self, delay: Duration) {
        if delay == self.state.delay.get() {
            return;
        }
        self.state.cancel();
        self.state.delay.set(delay);
    }

    /// Install a new callback revision. A pending invocation will run it.
    pub fn revise(&self, f: impl Fn(A) + 'static) {
        self.state.handle.borrow().revise(f);
    }

    /// Wrap a different stable handle. Cancels any pending invocation first.
    pub fn rebind(&self, handle: &StableHandle<A>) {
        self.state.cancel();
        *self.state.handle.borrow_mut() = handle.clone();
    }
}

impl<A> Teardown for Debounced<A> {
    fn teardown(&mut self) {
        if let Some(token) = self.state.pending.take() {
            self.state.timers.cancel(token);
        }
    }
}

impl<A> Drop for Debounced<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}
