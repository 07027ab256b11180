#![forbid(unsafe_code)]

//! Identity-stable callbacks backed by a latest-value slot.
//!
//! A host re-renders and hands us a new closure each time. Subscribers want a
//! function whose identity never changes, so they are not torn down and
//! rebuilt on every revision, while its behaviour always follows the newest
//! closure. [`StableHandle`] provides exactly that: one [`Invoker`] for its
//! whole life, reading a [`Latest`] slot at call time.
//!
//! # Invariants
//!
//! 1. [`StableHandle::invoker`] returns the same identity every time.
//! 2. An invocation runs the closure installed by the most recent
//!    [`revise`](StableHandle::revise) that completed before the call.
//! 3. The slot is not borrowed while the callback runs, so a callback may
//!    revise its own handle, and a panicking callback leaves the slot usable.
//!
//! # Ordering
//!
//! `revise` is a synchronous write. Hosts must deliver it in the same pass
//! that produced the new closure, before any effect of that pass can fire the
//! handle.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::host::Invoker;

// ---------------------------------------------------------------------------
// Latest<T>
// ---------------------------------------------------------------------------

/// Shared single-writer cell that always holds the latest value.
///
/// Cloning shares the slot.
pub struct Latest<T> {
    slot: Rc<RefCell<T>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Latest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latest")
            .field("value", &*self.slot.borrow())
            .finish()
    }
}

impl<T> Latest<T> {
    /// Create a slot holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(value)),
        }
    }

    /// Replace the held value.
    pub fn set(&self, value: T) {
        *self.slot.borrow_mut() = value;
    }

    /// Read the held value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slot.borrow())
    }
}

impl<T: Clone> Latest<T> {
    /// Clone out the held value.
    #[must_use]
    pub fn get(&self) -> T {
        self.slot.borrow().clone()
    }
}

// ---------------------------------------------------------------------------
// StableHandle<A, R>
// ---------------------------------------------------------------------------

type Callback<A, R> = Rc<dyn Fn(A) -> R>;

/// A fixed-identity invoker that always runs the latest callback revision.
pub struct StableHandle<A, R = ()> {
    slot: Latest<Callback<A, R>>,
    revision: Rc<Cell<u64>>,
    invoker: Invoker<A, R>,
}

impl<A, R> Clone for StableHandle<A, R> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            revision: Rc::clone(&self.revision),
            invoker: self.invoker.clone(),
        }
    }
}

impl<A, R> fmt::Debug for StableHandle<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StableHandle")
            .field("invoker", &self.invoker.id())
            .field("revision", &self.revision.get())
            .finish()
    }
}

impl<A: 'static, R: 'static> StableHandle<A, R> {
    /// Create a handle running `f` until the first revision.
    pub fn new(f: impl Fn(A) -> R + 'static) -> Self {
        let slot: Latest<Callback<A, R>> = Latest::new(Rc::new(f));
        let reader = slot.clone();
        let invoker = Invoker::new(move |args: A| {
            // Clone the callback out so the borrow ends before it runs.
            let current = reader.get();
            current(args)
        });
        Self {
            slot,
            revision: Rc::new(Cell::new(0)),
            invoker,
        }
    }

    /// Install a new callback revision. The invoker identity is unchanged.
    pub fn revise(&self, f: impl Fn(A) -> R + 'static) {
        self.slot.set(Rc::new(f));
        self.revision.set(self.revision.get() + 1);
    }

    /// The identity-stable invoker.
    #[must_use]
    pub fn invoker(&self) -> Invoker<A, R> {
        self.invoker.clone()
    }

    /// Invoke the latest revision directly.
    pub fn call(&self, args: A) -> R {
        self.invoker.call(args)
    }

    /// Number of revisions installed after construction.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_tracks_last_write() {
        let latest = Latest::new(1);
        let reader = latest.clone();
        latest.set(2);
        latest.set(3);
        assert_eq!(reader.get(), 3);
        assert_eq!(reader.with(|v| v * 10), 30);
    }

    #[test]
    fn invoker_identity_is_stable_across_revisions() {
        let handle = StableHandle::new(|x: i32| x);
        let first = handle.invoker();
        for n in 0..5 {
            handle.revise(move |x: i32| x + n);
        }
        assert!(first.same(&handle.invoker()));
        assert_eq!(handle.revision(), 5);
    }

    #[test]
    fn invocation_runs_newest_revision() {
        let handle = StableHandle::new(|x: i32| x);
        let invoker = handle.invoker();
        assert_eq!(invoker.call(1), 1);

        handle.revise(|x: i32| x * 100);
        assert_eq!(invoker.call(1), 100);

        handle.revise(|x: i32| -x);
        assert_eq!(invoker.call(2), -2);
        assert_eq!(invoker.call(3), -3, "repeated calls keep the newest revision");
    }

    #[test]
    fn captured_state_is_never_stale() {
        let handle = StableHandle::new(|(): ()| 0u32);
        let invoker = handle.invoker();
        for render in 1..=10u32 {
            handle.revise(move |(): ()| render);
            assert_eq!(invoker.call(()), render);
        }
    }

    #[test]
    fn callback_may_revise_its_own_handle() {
        let handle: StableHandle<(), &'static str> = StableHandle::new(|()| "first");
        let inner = handle.clone();
        handle.revise(move |()| {
            inner.revise(|()| "third");
            "second"
        });
        assert_eq!(handle.call(()), "second");
        assert_eq!(handle.call(()), "third");
    }

    #[test]
    fn panicking_callback_leaves_slot_usable() {
        let handle = StableHandle::new(|n: i32| {
            if n < 0 {
                panic!("negative");
            }
            n
        });
        let invoker = handle.invoker();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| invoker.call(-1)));
        assert!(result.is_err());

        handle.revise(|n: i32| n + 1);
        assert_eq!(invoker.call(1), 2);
    }

    #[test]
    fn noop_callback_is_fine() {
        let handle = StableHandle::new(|_: ()| {});
        handle.call(());
        handle.revise(|_: ()| {});
        handle.call(());
        assert_eq!(handle.revision(), 1);
    }

    #[test]
    fn debug_format_shows_revision() {
        let handle = StableHandle::new(|_: ()| {});
        handle.revise(|_: ()| {});
        let debug = format!("{handle:?}");
        assert!(debug.contains("revision: 1"));
    }
}
