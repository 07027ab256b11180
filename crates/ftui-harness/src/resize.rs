#![forbid(unsafe_code)]

//! Size observation double.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ftui_hooks::{Invoker, ObservationToken, ObserveSource};

use crate::dom::Node;

/// One size notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeEntry {
    pub node: Node,
    pub width: u32,
    pub height: u32,
}

#[derive(Default)]
struct HubInner {
    next: u64,
    observations: BTreeMap<u64, (Node, Invoker<ResizeEntry>)>,
    connects: u64,
    disconnects: u64,
}

/// Delivers resize notifications to whoever observes a node. Cloning shares the hub.
#[derive(Clone, Default)]
pub struct ResizeHub {
    inner: Rc<RefCell<HubInner>>,
}

impl fmt::Debug for ResizeHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ResizeHub")
            .field("live", &inner.observations.len())
            .field("connects", &inner.connects)
            .field("disconnects", &inner.disconnects)
            .finish()
    }
}

impl ResizeHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that `node` now measures `width` x `height`.
    /// Returns the number of observers notified.
    pub fn resize(&self, node: &Node, width: u32, height: u32) -> usize {
        let targets: Vec<Invoker<ResizeEntry>> = self
            .inner
            .borrow()
            .observations
            .values()
            .filter(|(observed, _)| observed == node)
            .map(|(_, listener)| listener.clone())
            .collect();
        let entry = ResizeEntry {
            node: node.clone(),
            width,
            height,
        };
        for listener in &targets {
            listener.call(entry.clone());
        }
        targets.len()
    }

    /// Observations currently live.
    #[must_use]
    pub fn live(&self) -> usize {
        self.inner.borrow().observations.len()
    }

    /// Observations started so far.
    #[must_use]
    pub fn connects(&self) -> u64 {
        self.inner.borrow().connects
    }

    /// Observations stopped so far.
    #[must_use]
    pub fn disconnects(&self) -> u64 {
        self.inner.borrow().disconnects
    }
}

impl ObserveSource<Node, ResizeEntry> for ResizeHub {
    fn observe(&self, node: &Node, listener: &Invoker<ResizeEntry>) -> ObservationToken {
        let mut inner = self.inner.borrow_mut();
        inner.next += 1;
        let id = inner.next;
        inner.observations.insert(id, (node.clone(), listener.clone()));
        inner.connects += 1;
        ObservationToken(id)
    }

    fn disconnect(&self, token: ObservationToken) {
        let mut inner = self.inner.borrow_mut();
        if inner.observations.remove(&token.0).is_some() {
            inner.disconnects += 1;
        }
    }
}
