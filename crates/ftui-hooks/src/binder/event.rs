#![forbid(unsafe_code)]

//! Event binders driven by dependency notifications.

use std::fmt;

use super::Attachment;
use crate::combine::NodeRef;
use crate::effect::{Cleanup, Effect, Teardown};
use crate::host::{EventKind, EventSource, Invoker, InvokerId};

/// Everything whose change forces a detach/reattach cycle.
#[derive(Debug, Clone, PartialEq)]
struct BinderDeps<S> {
    source: Option<S>,
    kind: EventKind,
    active: bool,
    listener: InvokerId,
}

fn attach_cleanup<S, E>(source: S, kind: EventKind, listener: Invoker<E>) -> Option<Cleanup>
where
    S: EventSource<E> + 'static,
    E: 'static,
{
    let mut attachment = Attachment::attach(source, kind, listener);
    Some(Box::new(move || attachment.detach()))
}

// ---------------------------------------------------------------------------
// EventBinder
// ---------------------------------------------------------------------------

/// Binds a listener to the node behind a [`NodeRef`] while `active`.
///
/// The host calls [`sync`](Self::sync) on activation and whenever one of its
/// inputs may have changed; the binder compares the resolved source, kind,
/// active flag and listener identity against the last sync and, if anything
/// differs, detaches before re-evaluating.
///
/// # Example
///
/// ```ignore
/// let handle = StableHandle::new(|ev: DomEvent| on_scroll(ev));
/// let mut binder = EventBinder::new(list_ref.clone(), EventKind::SCROLL, handle.invoker());
/// binder.sync(show);        // attaches if `show` and the node is mounted
/// binder.sync(false);       // detaches
/// ```
pub struct EventBinder<S, E> {
    target: NodeRef<S>,
    kind: EventKind,
    listener: Invoker<E>,
    active: bool,
    effect: Effect<BinderDeps<S>>,
    torn_down: bool,
}

impl<S: fmt::Debug, E> fmt::Debug for EventBinder<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBinder")
            .field("kind", &self.kind)
            .field("active", &self.active)
            .field("attached", &self.effect.is_armed())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl<S, E> EventBinder<S, E>
where
    S: EventSource<E> + Clone + PartialEq + 'static,
    E: 'static,
{
    /// Create an inactive binder. Nothing is attached until [`sync`](Self::sync).
    pub fn new(target: NodeRef<S>, kind: impl Into<EventKind>, listener: Invoker<E>) -> Self {
        Self {
            target,
            kind: kind.into(),
            listener,
            active: false,
            effect: Effect::new(),
            torn_down: false,
        }
    }

    /// Deliver the `active` flag and re-evaluate the attachment.
    pub fn sync(&mut self, active: bool) {
        self.active = active;
        self.evaluate();
    }

    /// Re-evaluate with the current flag, e.g. after the target node changed.
    pub fn refresh(&mut self) {
        self.evaluate();
    }

    /// Switch the event kind.
    pub fn set_kind(&mut self, kind: impl Into<EventKind>) {
        self.kind = kind.into();
        self.evaluate();
    }

    /// Point at a different target reference.
    pub fn set_target(&mut self, target: NodeRef<S>) {
        self.target = target;
        self.evaluate();
    }

    /// Use a different listener identity.
    pub fn set_listener(&mut self, listener: Invoker<E>) {
        self.listener = listener;
        self.evaluate();
    }

    /// Whether the listener is currently attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.effect.is_armed()
    }

    /// Current `active` flag.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn evaluate(&mut self) {
        if self.torn_down {
            return;
        }
        let deps = BinderDeps {
            source: self.target.get(),
            kind: self.kind.clone(),
            active: self.active,
            listener: self.listener.id(),
        };
        let source = deps.source.clone();
        let active = self.active;
        let kind = self.kind.clone();
        let listener = self.listener.clone();
        self.effect.run(deps, move || match source {
            Some(source) if active => attach_cleanup(source, kind, listener),
            _ => None,
        });
    }
}

impl<S, E> Teardown for EventBinder<S, E> {
    fn teardown(&mut self) {
        self.torn_down = true;
        self.effect.teardown();
    }
}

// ---------------------------------------------------------------------------
// GlobalListener
// ---------------------------------------------------------------------------

/// Listener on an always-present global source (window, document, app bus).
///
/// Attached on construction, reattached when the kind or listener changes,
/// detached on teardown or drop.
pub struct GlobalListener<S, E> {
    source: S,
    kind: EventKind,
    listener: Invoker<E>,
    effect: Effect<(EventKind, InvokerId)>,
    torn_down: bool,
}

impl<S, E> fmt::Debug for GlobalListener<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalListener")
            .field("kind", &self.kind)
            .field("attached", &self.effect.is_armed())
            .finish()
    }
}

impl<S, E> GlobalListener<S, E>
where
    S: EventSource<E> + Clone + 'static,
    E: 'static,
{
    /// Attach `listener` to `source` for `kind`.
    pub fn new(source: S, kind: impl Into<EventKind>, listener: Invoker<E>) -> Self {
        let mut this = Self {
            source,
            kind: kind.into(),
            listener,
            effect: Effect::new(),
            torn_down: false,
        };
        this.evaluate();
        this
    }

    /// Switch the event kind.
    pub fn set_kind(&mut self, kind: impl Into<EventKind>) {
        self.kind = kind.into();
        self.evaluate();
    }

    /// Use a different listener identity.
    pub fn set_listener(&mut self, listener: Invoker<E>) {
        self.listener = listener;
        self.evaluate();
    }

    /// Whether the listener is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.effect.is_armed()
    }

    fn evaluate(&mut self) {
        if self.torn_down {
            return;
        }
        let source = self.source.clone();
        let kind = self.kind.clone();
        let listener = self.listener.clone();
        self.effect.run((self.kind.clone(), self.listener.id()), move || {
            attach_cleanup(source, kind, listener)
        });
    }
}

impl<S, E> Teardown for GlobalListener<S, E> {
    fn teardown(&mut self) {
        self.torn_down = true;
        self.effect.teardown();
    }
}
