#![forbid(unsafe_code)]

//! Lifecycle plumbing: dependency-keyed effects and owning scopes.
//!
//! The host never hands us a render loop. It delivers three notifications:
//! initial activation, "a dependency changed", and "about to deactivate".
//! [`Effect`] turns the first two into a setup/cleanup discipline and
//! [`Scope`] turns the third into a guaranteed, ordered release.
//!
//! # Invariants
//!
//! 1. An [`Effect`] runs the previous cleanup before every new setup.
//! 2. Setup runs on the first activation (unless [`Effect::skip_initial`])
//!    and again only when the dependencies differ from the last run.
//! 3. [`Effect::teardown`] and [`Scope::teardown`] are idempotent and run
//!    synchronously; dropping either tears it down.
//! 4. A [`Scope`] releases its items in reverse registration order.

use std::fmt;

/// Cleanup returned by an effect setup.
pub type Cleanup = Box<dyn FnOnce()>;

/// Synchronous, idempotent release of whatever a hook holds.
pub trait Teardown {
    /// Release everything. Calling it again must be a no-op.
    fn teardown(&mut self);
}

// ---------------------------------------------------------------------------
// Effect<D>
// ---------------------------------------------------------------------------

/// A dependency-keyed setup/cleanup pair.
pub struct Effect<D> {
    deps: Option<D>,
    cleanup: Option<Cleanup>,
    skip_initial: bool,
    runs: u64,
}

impl<D: fmt::Debug> fmt::Debug for Effect<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("deps", &self.deps)
            .field("has_cleanup", &self.cleanup.is_some())
            .field("runs", &self.runs)
            .finish()
    }
}

impl<D> Default for Effect<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Effect<D> {
    /// An effect that runs on first activation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deps: None,
            cleanup: None,
            skip_initial: false,
            runs: 0,
        }
    }

    /// An effect that only runs on dependency changes after the first activation.
    #[must_use]
    pub fn skip_initial() -> Self {
        let mut effect = Self::new();
        effect.skip_initial = true;
        effect
    }

    /// Number of times setup has run.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Whether a cleanup is outstanding.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.cleanup.is_some()
    }

    /// Dependencies of the last activation, if any.
    #[must_use]
    pub fn deps(&self) -> Option<&D> {
        self.deps.as_ref()
    }

    fn run_cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl<D: PartialEq> Effect<D> {
    /// Deliver an activation or dependency notification.
    ///
    /// Returns `true` when setup ran.
    pub fn run(&mut self, deps: D, setup: impl FnOnce() -> Option<Cleanup>) -> bool {
        let first = self.deps.is_none();
        if !first && self.deps.as_ref() == Some(&deps) {
            return false;
        }
        self.deps = Some(deps);
        if first && self.skip_initial {
            return false;
        }
        self.run_cleanup();
        self.cleanup = setup();
        self.runs += 1;
        true
    }

    /// Re-run setup even though the dependencies are unchanged.
    pub fn rerun(&mut self, setup: impl FnOnce() -> Option<Cleanup>) {
        self.run_cleanup();
        self.cleanup = setup();
        self.runs += 1;
    }
}

impl<D> Teardown for Effect<D> {
    fn teardown(&mut self) {
        self.run_cleanup();
    }
}

impl<D> Drop for Effect<D> {
    fn drop(&mut self) {
        self.run_cleanup();
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

enum ScopeItem {
    Held(Box<dyn Teardown>),
    Deferred(Cleanup),
}

/// Owns the hooks of one logical scope (for example a widget instance).
///
/// When the scope is torn down or dropped, everything it holds is released
/// in reverse registration order, so later hooks (which may depend on earlier
/// ones) go first.
pub struct Scope {
    items: Vec<ScopeItem>,
    torn_down: bool,
}

impl Scope {
    /// Create an empty, live scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            torn_down: false,
        }
    }

    /// Take ownership of a hook; its teardown runs with the scope's.
    ///
    /// Holding into a scope that is already torn down tears the item down
    /// immediately.
    pub fn hold(&mut self, item: impl Teardown + 'static) -> &mut Self {
        let mut item: Box<dyn Teardown> = Box::new(item);
        if self.torn_down {
            item.teardown();
        } else {
            self.items.push(ScopeItem::Held(item));
        }
        self
    }

    /// Run `cleanup` when the scope is torn down.
    pub fn defer(&mut self, cleanup: impl FnOnce() + 'static) -> &mut Self {
        if self.torn_down {
            cleanup();
        } else {
            self.items.push(ScopeItem::Deferred(Box::new(cleanup)));
        }
        self
    }

    /// Number of held items and deferred cleanups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the scope has ended.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Teardown for Scope {
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        tracing::debug!(items = self.items.len(), "scope teardown");
        while let Some(item) = self.items.pop() {
            match item {
                ScopeItem::Held(mut held) => held.teardown(),
                ScopeItem::Deferred(cleanup) => cleanup(),
            }
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("len", &self.items.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn log() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn logging_setup(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> Option<Cleanup> {
        log.borrow_mut().push(format!("setup {tag}"));
        let log = Rc::clone(log);
        let tag = tag.to_owned();
        Some(Box::new(move || log.borrow_mut().push(format!("cleanup {tag}"))))
    }

    #[test]
    fn effect_runs_on_first_activation() {
        let events = log();
        let mut effect = Effect::new();
        assert!(effect.run(1, || logging_setup(&events, "a")));
        assert_eq!(*events.borrow(), ["setup a"]);
        assert!(effect.is_armed());
    }

    #[test]
    fn effect_skips_unchanged_deps() {
        let events = log();
        let mut effect = Effect::new();
        effect.run(1, || logging_setup(&events, "a"));
        assert!(!effect.run(1, || logging_setup(&events, "b")));
        assert_eq!(effect.runs(), 1);
        assert_eq!(*events.borrow(), ["setup a"]);
    }

    #[test]
    fn effect_cleans_up_before_next_setup() {
        let events = log();
        let mut effect = Effect::new();
        effect.run(1, || logging_setup(&events, "a"));
        effect.run(2, || logging_setup(&events, "b"));
        assert_eq!(*events.borrow(), ["setup a", "cleanup a", "setup b"]);
    }

    #[test]
    fn effect_teardown_is_idempotent() {
        let events = log();
        let mut effect = Effect::new();
        effect.run((), || logging_setup(&events, "a"));
        effect.teardown();
        effect.teardown();
        drop(effect);
        assert_eq!(*events.borrow(), ["setup a", "cleanup a"]);
    }

    #[test]
    fn effect_drop_runs_cleanup() {
        let events = log();
        {
            let mut effect = Effect::new();
            effect.run("x", || logging_setup(&events, "a"));
        }
        assert_eq!(*events.borrow(), ["setup a", "cleanup a"]);
    }

    #[test]
    fn skip_initial_waits_for_a_change() {
        let events = log();
        let mut effect = Effect::skip_initial();
        assert!(!effect.run(1, || logging_setup(&events, "a")));
        assert!(!effect.run(1, || logging_setup(&events, "b")));
        assert!(effect.run(2, || logging_setup(&events, "c")));
        assert_eq!(*events.borrow(), ["setup c"]);
        assert_eq!(effect.deps(), Some(&2));
    }

    #[test]
    fn rerun_forces_cleanup_and_setup() {
        let events = log();
        let mut effect = Effect::new();
        effect.run(1, || logging_setup(&events, "a"));
        effect.rerun(|| logging_setup(&events, "b"));
        assert_eq!(*events.borrow(), ["setup a", "cleanup a", "setup b"]);
        assert_eq!(effect.runs(), 2);
    }

    struct Tagged(&'static str, Rc<RefCell<Vec<String>>>);

    impl Teardown for Tagged {
        fn teardown(&mut self) {
            self.1.borrow_mut().push(format!("teardown {}", self.0));
        }
    }

    #[test]
    fn scope_releases_in_reverse_order() {
        let events = log();
        let mut scope = Scope::new();
        scope.hold(Tagged("first", Rc::clone(&events)));
        let e = Rc::clone(&events);
        scope.defer(move || e.borrow_mut().push("deferred".into()));
        scope.hold(Tagged("last", Rc::clone(&events)));
        assert_eq!(scope.len(), 3);

        drop(scope);
        assert_eq!(
            *events.borrow(),
            ["teardown last", "deferred", "teardown first"]
        );
    }

    #[test]
    fn scope_teardown_is_idempotent() {
        let events = log();
        let mut scope = Scope::new();
        scope.hold(Tagged("only", Rc::clone(&events)));
        scope.teardown();
        scope.teardown();
        assert!(scope.is_torn_down());
        assert!(scope.is_empty());
        drop(scope);
        assert_eq!(*events.borrow(), ["teardown only"]);
    }

    #[test]
    fn holding_into_ended_scope_releases_immediately() {
        let events = log();
        let mut scope = Scope::new();
        scope.teardown();
        scope.hold(Tagged("late", Rc::clone(&events)));
        assert_eq!(*events.borrow(), ["teardown late"]);
        assert!(scope.is_empty());
    }
}
