#![forbid(unsafe_code)]

//! Detection of interactions that land outside a region.
//!
//! [`OutsideInteraction`] watches document-level pointer and keyboard
//! sources and reports every interaction whose node is not contained by the
//! primary region or by an optional trigger region. The trigger exclusion is
//! what lets a toggle button close a popover without its own click counting
//! as "outside".
//!
//! # State machine
//!
//! ```text
//!            attached && region resolves
//!   Idle ───────────────────────────────▶ Watching
//!    ▲                                       │
//!    └──────── !attached / teardown ─────────┘
//! ```
//!
//! # Invariants
//!
//! 1. All configured kinds are registered together on entering `Watching`
//!    and unregistered together on leaving it. `Idle` holds none.
//! 2. The ignore set is rebuilt from the current references on every event.
//!    A reference that does not resolve contributes nothing.
//! 3. Pointer events are checked by target; the activation key is checked
//!    by the focused element. Other keys never fire.
//! 4. The callback always runs the latest revision with the originating event.
//!
//! # Failure Modes
//!
//! - An event without a target, or an activation key press with nothing
//!   focused, has no node to contain and is reported as outside.
//! - A configuration with no modality is rejected by [`OutsideInteraction::new`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::binder::Attachment;
use crate::combine::NodeRef;
use crate::config::OutsideConfig;
use crate::effect::{Cleanup, Effect, Teardown};
use crate::error::ConfigError;
use crate::handle::StableHandle;
use crate::host::{EventKind, EventSource, InteractionEvent, Invoker, RegionTree};

/// Whether the detector currently holds its document registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorState {
    /// Nothing registered.
    Idle,
    /// Pointer and keyboard kinds registered on the document.
    Watching,
}

struct Regions<N, D> {
    tree: D,
    region: NodeRef<N>,
    trigger: RefCell<Option<NodeRef<N>>>,
}

impl<N: Clone, D: RegionTree<N>> Regions<N, D> {
    fn ignore_set(&self) -> Vec<N> {
        let mut set = Vec::with_capacity(2);
        set.extend(self.region.get());
        if let Some(trigger) = self.trigger.borrow().as_ref() {
            set.extend(trigger.get());
        }
        set
    }

    fn is_inside(&self, node: &N) -> bool {
        self.ignore_set()
            .iter()
            .any(|region| self.tree.contains(region, node))
    }
}

/// Which node an event should be checked against, if it qualifies at all.
enum Subject<N> {
    Ignored,
    Node(Option<N>),
}

fn subject_of<N, D, E>(config: &OutsideConfig, tree: &D, event: &E) -> Subject<N>
where
    N: Clone,
    D: RegionTree<N>,
    E: InteractionEvent<N>,
{
    let kind = event.kind();
    if config.pointer_kinds.contains(kind) {
        return Subject::Node(event.target().cloned());
    }
    if config.keyboard
        && *kind == EventKind::KEY_DOWN
        && event.key() == Some(config.activation_key.as_str())
    {
        return Subject::Node(tree.active_element());
    }
    Subject::Ignored
}

/// Reports interactions outside a region through a stable callback.
///
/// # Example
///
/// ```ignore
/// let mut outside = OutsideInteraction::new(
///     dom.document(), dom.clone(), popover_ref.clone(),
///     move |_ev: DomEvent| close(),
///     OutsideConfig::default(),
/// )?
/// .with_trigger(toggle_ref.clone());
/// outside.set_attached(open);
/// ```
pub struct OutsideInteraction<N, S, D, E> {
    document: S,
    regions: Rc<Regions<N, D>>,
    kinds: Vec<EventKind>,
    handle: StableHandle<E>,
    listener: Invoker<E>,
    attached: bool,
    effect: Effect<bool>,
    torn_down: bool,
}

impl<N, S, D, E: 'static> fmt::Debug for OutsideInteraction<N, S, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutsideInteraction")
            .field("attached", &self.attached)
            .field("watching", &self.effect.is_armed())
            .field("kinds", &self.kinds)
            .field("revision", &self.handle.revision())
            .finish()
    }
}

impl<N, S, D, E> OutsideInteraction<N, S, D, E>
where
    N: Clone + 'static,
    S: EventSource<E> + Clone + 'static,
    D: RegionTree<N> + 'static,
    E: InteractionEvent<N> + 'static,
{
    /// Create an idle detector for `region`.
    ///
    /// # Errors
    ///
    /// Whatever [`OutsideConfig::validate`] rejects.
    pub fn new(
        document: S,
        tree: D,
        region: NodeRef<N>,
        callback: impl Fn(E) + 'static,
        config: OutsideConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut kinds = config.pointer_kinds.clone();
        if config.keyboard && !kinds.contains(&EventKind::KEY_DOWN) {
            kinds.push(EventKind::KEY_DOWN);
        }

        let regions = Rc::new(Regions {
            tree,
            region,
            trigger: RefCell::new(None),
        });
        let handle = StableHandle::new(callback);
        let listener = {
            let regions = Rc::clone(&regions);
            let callback = handle.invoker();
            Invoker::new(move |event: E| {
                let node = match subject_of(&config, &regions.tree, &event) {
                    Subject::Ignored => return,
                    Subject::Node(node) => node,
                };
                if node.as_ref().is_some_and(|node| regions.is_inside(node)) {
                    tracing::trace!(kind = %event.kind(), "interaction inside");
                    return;
                }
                tracing::trace!(kind = %event.kind(), "interaction outside");
                callback.call(event);
            })
        };

        Ok(Self {
            document,
            regions,
            kinds,
            handle,
            listener,
            attached: false,
            effect: Effect::new(),
            torn_down: false,
        })
    }

    /// Exclude a trigger region as well.
    #[must_use]
    pub fn with_trigger(self, trigger: NodeRef<N>) -> Self {
        self.set_trigger(Some(trigger));
        self
    }

    /// Replace or remove the trigger region. Takes effect on the next event.
    pub fn set_trigger(&self, trigger: Option<NodeRef<N>>) {
        *self.regions.trigger.borrow_mut() = trigger;
    }

    /// Deliver the `attached` flag.
    pub fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
        self.evaluate();
    }

    /// Re-evaluate after the primary region may have mounted or unmounted.
    ///
    /// A mounted region moves an attached `Idle` detector to `Watching`. An
    /// unmounted region never moves it back.
    pub fn sync(&mut self) {
        self.evaluate();
    }

    /// Install a new callback revision. Registrations are untouched.
    pub fn revise(&self, callback: impl Fn(E) + 'static) {
        self.handle.revise(callback);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DetectorState {
        if self.effect.is_armed() {
            DetectorState::Watching
        } else {
            DetectorState::Idle
        }
    }

    /// Regions an event would currently be checked against.
    #[must_use]
    pub fn ignore_set(&self) -> Vec<N> {
        self.regions.ignore_set()
    }

    /// The kinds registered while watching.
    #[must_use]
    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    fn evaluate(&mut self) {
        if self.torn_down {
            return;
        }
        // The region gates entry only; once watching, an unmounted region
        // just drops out of the ignore set.
        let watch = self.attached && (self.effect.is_armed() || self.regions.region.is_set());
        let document = self.document.clone();
        let kinds = self.kinds.clone();
        let listener = self.listener.clone();
        let ran = self.effect.run(watch, move || {
            if !watch {
                return None;
            }
            let attachments: Vec<Attachment<S, E>> = kinds
                .into_iter()
                .map(|kind| Attachment::attach(document.clone(), kind, listener.clone()))
                .collect();
            let cleanup: Cleanup = Box::new(move || drop(attachments));
            Some(cleanup)
        });
        if ran {
            tracing::debug!(state = ?self.state(), "outside detector transition");
        }
    }
}

impl<N, S, D, E> Teardown for OutsideInteraction<N, S, D, E> {
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.effect.teardown();
    }
}

impl<N, S, D, E> Drop for OutsideInteraction<N, S, D, E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
