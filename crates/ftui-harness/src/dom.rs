#![forbid(unsafe_code)]

//! A minimal in-memory node tree with listener registries.
//!
//! [`Dom`] owns a tree rooted at the document node. [`Node`] handles are
//! cheap to clone, compare by identity, and implement
//! [`EventSource<DomEvent>`], so they can be handed directly to the binders
//! in `ftui-hooks`. [`Window`] is a separate global source outside the tree.
//!
//! # Dispatch
//!
//! [`Dom::dispatch`] delivers to the target, then to each ancestor up to
//! the document (bubbling). Listeners are snapshotted per node before any of
//! them runs, so a listener that unregisters itself or others does not skip
//! delivery within the same node. A listener that panics is logged and the
//! remaining listeners still run.

use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use ftui_hooks::{EventKind, EventSource, InteractionEvent, Invoker, RegionTree};

/// Index of a node inside its [`Dom`].
pub type NodeId = usize;

const DOCUMENT: NodeId = 0;
const WINDOW: NodeId = 1;

struct NodeData {
    label: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(EventKind, Invoker<DomEvent>)>,
}

impl NodeData {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

#[derive(Default)]
struct DomInner {
    nodes: Vec<NodeData>,
    focused: Option<NodeId>,
    registrations: u64,
    unregistrations: u64,
    failures: u64,
}

impl DomInner {
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            path.push(n);
            current = self.nodes.get(n).and_then(|node| node.parent);
        }
        path
    }

    fn is_connected(&self, id: NodeId) -> bool {
        id == DOCUMENT || self.ancestors(id).last() == Some(&DOCUMENT)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Handle to one node of a [`Dom`].
#[derive(Clone)]
pub struct Node {
    dom: Weak<RefCell<DomInner>>,
    id: NodeId,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.dom, &other.dom)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.with_data(|n| n.label.clone()) {
            Some(label) => write!(f, "Node({label}#{})", self.id),
            None => write!(f, "Node(#{} detached)", self.id),
        }
    }
}

impl Node {
    /// Index of this node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn with_data<R>(&self, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
        let dom = self.dom.upgrade()?;
        let dom = dom.borrow();
        dom.nodes.get(self.id).map(f)
    }

    /// Label given at creation.
    #[must_use]
    pub fn label(&self) -> String {
        self.with_data(|n| n.label.clone()).unwrap_or_default()
    }

    /// Number of listeners currently registered on this node.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.with_data(|n| n.listeners.len()).unwrap_or(0)
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listeners_for(&self, kind: &EventKind) -> usize {
        self.with_data(|n| n.listeners.iter().filter(|(k, _)| k == kind).count())
            .unwrap_or(0)
    }
}

impl EventSource<DomEvent> for Node {
    fn register(&self, kind: &EventKind, listener: &Invoker<DomEvent>) {
        let Some(dom) = self.dom.upgrade() else {
            return;
        };
        let mut dom = dom.borrow_mut();
        let Some(node) = dom.nodes.get_mut(self.id) else {
            return;
        };
        // Same (kind, listener) twice is a single registration.
        if node
            .listeners
            .iter()
            .any(|(k, l)| k == kind && l.same(listener))
        {
            return;
        }
        node.listeners.push((kind.clone(), listener.clone()));
        dom.registrations += 1;
        tracing::trace!(node = self.id, kind = %kind, "register");
    }

    fn unregister(&self, kind: &EventKind, listener: &Invoker<DomEvent>) {
        let Some(dom) = self.dom.upgrade() else {
            return;
        };
        let mut dom = dom.borrow_mut();
        let Some(node) = dom.nodes.get_mut(self.id) else {
            return;
        };
        let before = node.listeners.len();
        node.listeners
            .retain(|(k, l)| !(k == kind && l.same(listener)));
        if node.listeners.len() != before {
            dom.unregistrations += 1;
            tracing::trace!(node = self.id, kind = %kind, "unregister");
        }
    }
}

/// The global window: an event source that is not part of the tree.
#[derive(Clone, PartialEq, Eq)]
pub struct Window(Node);

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Window")
    }
}

impl Window {
    /// Number of listeners currently registered on the window.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.0.listener_count()
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listeners_for(&self, kind: &EventKind) -> usize {
        self.0.listeners_for(kind)
    }
}

impl EventSource<DomEvent> for Window {
    fn register(&self, kind: &EventKind, listener: &Invoker<DomEvent>) {
        self.0.register(kind, listener);
    }

    fn unregister(&self, kind: &EventKind, listener: &Invoker<DomEvent>) {
        self.0.unregister(kind, listener);
    }
}

// ---------------------------------------------------------------------------
// DomEvent
// ---------------------------------------------------------------------------

/// An input event as delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: Option<Node>,
    pub key: Option<String>,
}

impl DomEvent {
    /// Event of `kind` targeting `target`.
    pub fn new(kind: impl Into<EventKind>, target: Option<Node>) -> Self {
        Self {
            kind: kind.into(),
            target,
            key: None,
        }
    }

    /// Key-down event for `key`.
    pub fn key_down(key: impl Into<String>, target: Option<Node>) -> Self {
        Self {
            kind: EventKind::KEY_DOWN,
            target,
            key: Some(key.into()),
        }
    }
}

impl InteractionEvent<Node> for DomEvent {
    fn kind(&self) -> &EventKind {
        &self.kind
    }

    fn target(&self) -> Option<&Node> {
        self.target.as_ref()
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Dom
// ---------------------------------------------------------------------------

/// In-memory node tree. Cloning shares the tree.
#[derive(Clone)]
pub struct Dom {
    inner: Rc<RefCell<DomInner>>,
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Dom")
            .field("nodes", &inner.nodes.len())
            .field("focused", &inner.focused)
            .field("registrations", &inner.registrations)
            .field("unregistrations", &inner.unregistrations)
            .finish()
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// A tree holding only the document, plus the window.
    #[must_use]
    pub fn new() -> Self {
        let inner = DomInner {
            nodes: vec![NodeData::new("document"), NodeData::new("window")],
            ..DomInner::default()
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    fn handle(&self, id: NodeId) -> Node {
        Node {
            dom: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// The document root.
    #[must_use]
    pub fn document(&self) -> Node {
        self.handle(DOCUMENT)
    }

    /// The global window.
    #[must_use]
    pub fn window(&self) -> Window {
        Window(self.handle(WINDOW))
    }

    /// Create a node that is not yet in the tree.
    pub fn create_element(&self, label: impl Into<String>) -> Node {
        let mut inner = self.inner.borrow_mut();
        inner.nodes.push(NodeData::new(label));
        let id = inner.nodes.len() - 1;
        drop(inner);
        self.handle(id)
    }

    /// Create a node and append it to `parent`.
    pub fn create_child(&self, parent: &Node, label: impl Into<String>) -> Node {
        let node = self.create_element(label);
        self.append_child(parent, &node);
        node
    }

    /// Move `child` under `parent`, detaching it from any previous parent.
    /// Appending a node under itself or its own descendant is ignored.
    pub fn append_child(&self, parent: &Node, child: &Node) {
        let mut inner = self.inner.borrow_mut();
        if child.id == DOCUMENT
            || child.id == WINDOW
            || inner.ancestors(parent.id).contains(&child.id)
        {
            tracing::warn!(parent = parent.id, child = child.id, "refusing cyclic append");
            return;
        }
        detach(&mut inner, child.id);
        inner.nodes[child.id].parent = Some(parent.id);
        inner.nodes[parent.id].children.push(child.id);
    }

    /// Take `node` (and its subtree) out of the tree. Focus inside it is lost.
    pub fn remove(&self, node: &Node) {
        let mut inner = self.inner.borrow_mut();
        detach(&mut inner, node.id);
        if let Some(focused) = inner.focused {
            if inner.ancestors(focused).contains(&node.id) {
                inner.focused = None;
            }
        }
    }

    /// Whether `node` is reachable from the document.
    #[must_use]
    pub fn is_connected(&self, node: &Node) -> bool {
        self.inner.borrow().is_connected(node.id)
    }

    /// Give `node` keyboard focus.
    pub fn focus(&self, node: &Node) {
        self.inner.borrow_mut().focused = Some(node.id);
    }

    /// Drop keyboard focus.
    pub fn blur(&self) {
        self.inner.borrow_mut().focused = None;
    }

    /// Total successful registrations across all nodes.
    #[must_use]
    pub fn registrations(&self) -> u64 {
        self.inner.borrow().registrations
    }

    /// Total successful unregistrations across all nodes.
    #[must_use]
    pub fn unregistrations(&self) -> u64 {
        self.inner.borrow().unregistrations
    }

    /// Listeners that panicked during dispatch.
    #[must_use]
    pub fn listener_failures(&self) -> u64 {
        self.inner.borrow().failures
    }

    /// Deliver `event` to its target and then up to the document.
    ///
    /// Events without a target go to the document only. Returns the number
    /// of listeners that ran to completion.
    pub fn dispatch(&self, event: &DomEvent) -> usize {
        let path = match &event.target {
            Some(target) => self.inner.borrow().ancestors(target.id),
            None => vec![DOCUMENT],
        };
        let mut delivered = 0;
        for id in path {
            let listeners: Vec<Invoker<DomEvent>> = self.inner.borrow().nodes[id]
                .listeners
                .iter()
                .filter(|(k, _)| *k == event.kind)
                .map(|(_, l)| l.clone())
                .collect();
            for listener in listeners {
                let ev = event.clone();
                match catch_unwind(AssertUnwindSafe(|| listener.call(ev))) {
                    Ok(()) => delivered += 1,
                    Err(_) => {
                        self.inner.borrow_mut().failures += 1;
                        tracing::warn!(node = id, kind = %event.kind, "listener panicked");
                    }
                }
            }
        }
        delivered
    }

    /// Dispatch a pointer-down on `target`.
    pub fn pointer_down(&self, target: &Node) -> usize {
        self.dispatch(&DomEvent::new(EventKind::POINTER_DOWN, Some(target.clone())))
    }

    /// Dispatch a touch-start on `target`.
    pub fn touch_start(&self, target: &Node) -> usize {
        self.dispatch(&DomEvent::new(EventKind::TOUCH_START, Some(target.clone())))
    }

    /// Dispatch a click on `target`.
    pub fn click(&self, target: &Node) -> usize {
        self.dispatch(&DomEvent::new(EventKind::CLICK, Some(target.clone())))
    }

    /// Dispatch a key-down for `key` at the focused element (or the document).
    pub fn press_key(&self, key: &str) -> usize {
        let target = self.active_element();
        self.dispatch(&DomEvent::key_down(key, target))
    }

    /// Dispatch `kind` on the window.
    pub fn dispatch_window(&self, kind: impl Into<EventKind>) -> usize {
        let kind = kind.into();
        let listeners: Vec<Invoker<DomEvent>> = self.inner.borrow().nodes[WINDOW]
            .listeners
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| l.clone())
            .collect();
        let event = DomEvent::new(kind, None);
        let mut delivered = 0;
        for listener in listeners {
            let ev = event.clone();
            if catch_unwind(AssertUnwindSafe(|| listener.call(ev))).is_ok() {
                delivered += 1;
            } else {
                self.inner.borrow_mut().failures += 1;
                tracing::warn!(kind = %event.kind, "window listener panicked");
            }
        }
        delivered
    }
}

fn detach(inner: &mut DomInner, id: NodeId) {
    if let Some(parent) = inner.nodes[id].parent.take() {
        inner.nodes[parent].children.retain(|&c| c != id);
    }
}

impl RegionTree<Node> for Dom {
    fn contains(&self, region: &Node, node: &Node) -> bool {
        if !Weak::ptr_eq(&region.dom, &node.dom) {
            return false;
        }
        self.inner.borrow().ancestors(node.id).contains(&region.id)
    }

    fn active_element(&self) -> Option<Node> {
        let focused = self.inner.borrow().focused;
        focused.map(|id| self.handle(id))
    }
}
