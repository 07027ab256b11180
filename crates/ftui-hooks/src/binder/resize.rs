#![forbid(unsafe_code)]

//! Callback-ref style binding to a size observer.
//!
//! At most one observation is live per binder. Receiving a new node
//! disconnects the previous observation before observing the new one;
//! receiving `None`, tearing down, or dropping disconnects.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::combine::Receiver;
use crate::effect::Teardown;
use crate::host::{Invoker, ObservationToken, ObserveSource};

struct ResizeState<N, E> {
    observer: Rc<dyn ObserveSource<N, E>>,
    listener: Invoker<E>,
    current: Option<ObservationToken>,
    /// Bumped by every delivery and by teardown. An observation whose
    /// delivery was overtaken while `observe` ran is disconnected.
    generation: u64,
    observations: u64,
    torn_down: bool,
}

fn disconnect<N, E>(observer: &dyn ObserveSource<N, E>, token: ObservationToken) {
    observer.disconnect(token);
    tracing::debug!(token = token.0, "observer disconnected");
}

/// Observes whichever node its receiver was last given.
pub struct ResizeBinder<N, E> {
    state: Rc<RefCell<ResizeState<N, E>>>,
    receiver: Receiver<N>,
}

impl<N, E> fmt::Debug for ResizeBinder<N, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ResizeBinder")
            .field("observing", &state.current.is_some())
            .field("observations", &state.observations)
            .finish()
    }
}

impl<N: 'static, E: 'static> ResizeBinder<N, E> {
    /// Create a binder that reports changes through `listener`.
    pub fn new(observer: Rc<dyn ObserveSource<N, E>>, listener: Invoker<E>) -> Self {
        let state = Rc::new(RefCell::new(ResizeState {
            observer,
            listener,
            current: None,
            generation: 0,
            observations: 0,
            torn_down: false,
        }));
        let weak: Weak<RefCell<ResizeState<N, E>>> = Rc::downgrade(&state);
        let receiver = Receiver::function(move |node: Option<N>| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let (observer, listener, previous, generation, torn_down) = {
                let mut state = state.borrow_mut();
                state.generation += 1;
                (
                    Rc::clone(&state.observer),
                    state.listener.clone(),
                    state.current.take(),
                    state.generation,
                    state.torn_down,
                )
            };
            if let Some(token) = previous {
                disconnect(&*observer, token);
            }
            let Some(node) = node else {
                return;
            };
            if torn_down {
                return;
            }
            let token = observer.observe(&node, &listener);
            let superseded = {
                let mut state = state.borrow_mut();
                let superseded = state.torn_down || state.generation != generation;
                if !superseded {
                    state.current = Some(token);
                    state.observations += 1;
                }
                superseded
            };
            if superseded {
                tracing::debug!(token = token.0, "observation overtaken while connecting");
                disconnect(&*observer, token);
                return;
            }
            tracing::debug!(token = token.0, "observer connected");
        });
        Self { state, receiver }
    }

    /// The receiver to hand to the host. Identity-stable.
    #[must_use]
    pub fn receiver(&self) -> Receiver<N> {
        self.receiver.clone()
    }

    /// Whether an observation is live.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.state.borrow().current.is_some()
    }

    /// Number of observations started over the binder's life.
    #[must_use]
    pub fn observations(&self) -> u64 {
        self.state.borrow().observations
    }
}

impl<N, E> Teardown for ResizeBinder<N, E> {
    fn teardown(&mut self) {
        let (observer, current) = {
            let mut state = self.state.borrow_mut();
            state.torn_down = true;
            state.generation += 1;
            (Rc::clone(&state.observer), state.current.take())
        };
        if let Some(token) = current {
            disconnect(&*observer, token);
        }
    }
}

impl<N, E> Drop for ResizeBinder<N, E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
