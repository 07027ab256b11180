#![forbid(unsafe_code)]

//! End-to-end scenarios against the deterministic harness host.
//!
//! Each test wires hooks exactly as a widget would: injected timer and frame
//! sources, nodes from the harness tree, and teardown through a [`Scope`].

use std::rc::Rc;

use ftui_harness::{DomEvent, Node, Recorder, ResizeEntry, TestHost, init_test_logging};
use ftui_hooks::{
    CallbackRefBinder, Debounced, DetectorState, EventBinder, EventKind, FrameThrottled,
    GlobalListener, HooksConfig, NodeRef, OutsideConfig, OutsideInteraction, Receiver,
    ResizeBinder, Scope, StableHandle, combine,
};

// ============================================================================
// Temporal shaping
// ============================================================================

#[test]
fn debounce_burst_fires_once_with_last_arguments() {
    init_test_logging();
    let host = TestHost::new();
    let calls: Recorder<(u32, u128)> = Recorder::new();
    let sink = calls.sink();
    let clock = host.clone();
    let debounced = Debounced::new(
        host.timer_source(),
        std::time::Duration::from_millis(200),
        move |v: u32| {
            sink((v, clock.now_ms()));
        },
    );

    debounced.call(1);
    host.advance_to_ms(50);
    debounced.call(2);
    host.advance_to_ms(100);
    debounced.call(3);

    host.advance_to_ms(299);
    assert!(calls.is_empty());
    host.advance_to_ms(300);
    assert_eq!(calls.values(), [(3, 300)]);

    host.advance_to_ms(1_000);
    assert_eq!(calls.len(), 1);
}

#[test]
fn default_debounce_config_is_200ms() {
    let host = TestHost::new();
    let calls: Recorder<u32> = Recorder::new();
    let config = HooksConfig::default();
    let debounced = Debounced::with_config(host.timer_source(), &config.debounce, calls.sink());
    debounced.call(7);
    host.advance_ms(199);
    assert!(calls.is_empty());
    host.advance_ms(1);
    assert_eq!(calls.values(), [7]);
}

#[test]
fn frame_throttle_keeps_first_call_of_the_frame() {
    let host = TestHost::new();
    let calls: Recorder<u32> = Recorder::new();
    let throttled = FrameThrottled::new(host.frame_source(), calls.sink());

    for v in 1..=5 {
        throttled.call(v);
    }
    assert_eq!(host.run_frame(), 1);
    assert_eq!(calls.values(), [1]);
    assert_eq!(throttled.dropped(), 4);

    throttled.call(6);
    host.run_frame();
    assert_eq!(calls.values(), [1, 6]);
}

#[test]
fn scope_teardown_cancels_pending_work() {
    let host = TestHost::new();
    let calls: Recorder<u32> = Recorder::new();
    let debounced = Debounced::new(
        host.timer_source(),
        std::time::Duration::from_millis(10),
        calls.sink(),
    );
    let throttled = FrameThrottled::new(host.frame_source(), calls.sink());
    let debounce_in = debounced.invoker();
    let throttle_in = throttled.invoker();

    let mut scope = Scope::new();
    scope.hold(debounced).hold(throttled);
    debounce_in.call(1);
    throttle_in.call(2);
    drop(scope);

    host.advance_ms(100);
    host.run_frame();
    assert!(calls.is_empty());

    // Invokers outlive their shaper as inert callables.
    debounce_in.call(3);
    throttle_in.call(4);
    host.advance_ms(100);
    host.run_frame();
    assert!(calls.is_empty());
}

#[test]
fn shaped_listener_bound_to_node() {
    let host = TestHost::new();
    let list = host.dom.create_child(&host.dom.document(), "list");
    let scrolls: Recorder<DomEvent> = Recorder::new();
    let throttled = FrameThrottled::new(host.frame_source(), scrolls.sink());
    let mut binder = EventBinder::new(
        NodeRef::with_value(list.clone()),
        EventKind::SCROLL,
        throttled.invoker(),
    );
    binder.sync(true);

    for _ in 0..3 {
        host.dom.dispatch(&DomEvent::new(EventKind::SCROLL, Some(list.clone())));
    }
    host.run_frame();
    assert_eq!(scrolls.len(), 1);
}

// ============================================================================
// Binders
// ============================================================================

#[test]
fn binder_toggle_attaches_and_detaches_exactly_once() {
    let host = TestHost::new();
    let button = host.dom.create_child(&host.dom.document(), "button");
    let clicks: Recorder<DomEvent> = Recorder::new();
    let handle = StableHandle::new(clicks.sink());
    let mut binder = EventBinder::new(
        NodeRef::with_value(button.clone()),
        EventKind::CLICK,
        handle.invoker(),
    );

    binder.sync(false);
    binder.sync(true);
    host.dom.click(&button);
    binder.sync(false);
    host.dom.click(&button);

    assert_eq!(clicks.len(), 1);
    assert_eq!(host.dom.registrations(), 1);
    assert_eq!(host.dom.unregistrations(), 1);
    assert_eq!(button.listener_count(), 0);
}

#[test]
fn binder_without_node_never_touches_the_source() {
    let host = TestHost::new();
    let handle = StableHandle::new(|_: DomEvent| {});
    let mut binder: EventBinder<Node, DomEvent> =
        EventBinder::new(NodeRef::new(), EventKind::CLICK, handle.invoker());
    binder.sync(true);
    binder.sync(false);
    binder.sync(true);
    drop(binder);
    assert_eq!(host.dom.registrations(), 0);
    assert_eq!(host.dom.unregistrations(), 0);
}

#[test]
fn window_listener_follows_scope() {
    let host = TestHost::new();
    let window = host.dom.window();
    let seen: Recorder<DomEvent> = Recorder::new();
    let mut scope = Scope::new();
    scope.hold(GlobalListener::new(window.clone(), EventKind::RESIZE, seen.invoker()));

    host.dom.dispatch_window(EventKind::RESIZE);
    assert_eq!(seen.len(), 1);
    assert_eq!(window.listener_count(), 1);

    drop(scope);
    host.dom.dispatch_window(EventKind::RESIZE);
    assert_eq!(seen.len(), 1);
    assert_eq!(window.listener_count(), 0);
}

#[test]
fn combined_receivers_share_one_node() {
    let host = TestHost::new();
    let panel = host.dom.create_child(&host.dom.document(), "panel");

    let clicks: Recorder<DomEvent> = Recorder::new();
    let sizes: Recorder<ResizeEntry> = Recorder::new();
    let click_binder = CallbackRefBinder::new(EventKind::CLICK, clicks.invoker());
    let resize_binder = ResizeBinder::new(host.observer(), sizes.invoker());
    let object = NodeRef::new();

    let receiver = combine([
        Some(Receiver::from(&object)),
        Some(click_binder.receiver()),
        None,
        Some(resize_binder.receiver()),
    ]);

    receiver.deliver(Some(panel.clone()));
    assert_eq!(object.get(), Some(panel.clone()));
    host.dom.click(&panel);
    host.resize.resize(&panel, 80, 24);
    assert_eq!(clicks.len(), 1);
    assert_eq!(sizes.values()[0].width, 80);

    receiver.deliver(None);
    assert_eq!(object.get(), None);
    assert_eq!(panel.listener_count(), 0);
    assert_eq!(host.resize.live(), 0);
}

#[test]
fn resize_binder_moves_between_nodes() {
    let host = TestHost::new();
    let a = host.dom.create_child(&host.dom.document(), "a");
    let b = host.dom.create_child(&host.dom.document(), "b");
    let sizes: Recorder<ResizeEntry> = Recorder::new();
    let binder = ResizeBinder::new(host.observer(), sizes.invoker());
    let receiver = binder.receiver();

    receiver.deliver(Some(a.clone()));
    receiver.deliver(Some(b.clone()));
    host.resize.resize(&a, 1, 1);
    host.resize.resize(&b, 2, 2);
    assert_eq!(sizes.len(), 1);
    assert_eq!(host.resize.connects(), 2);
    assert_eq!(host.resize.disconnects(), 1);

    drop(binder);
    assert_eq!(host.resize.live(), 0);
}

// ============================================================================
// Outside interaction
// ============================================================================

struct Popover {
    host: TestHost,
    a: Node,
    b: Node,
    c: Node,
    hits: Recorder<DomEvent>,
    detector: OutsideInteraction<Node, Node, ftui_harness::Dom, DomEvent>,
}

fn popover() -> Popover {
    let host = TestHost::new();
    let doc = host.dom.document();
    let a = host.dom.create_child(&doc, "A");
    let b = host.dom.create_child(&doc, "B");
    let c = host.dom.create_child(&doc, "C");
    let hits: Recorder<DomEvent> = Recorder::new();
    let detector = OutsideInteraction::new(
        doc,
        host.dom.clone(),
        NodeRef::with_value(a.clone()),
        hits.sink(),
        OutsideConfig::default(),
    )
    .expect("default config is valid")
    .with_trigger(NodeRef::with_value(b.clone()));
    Popover {
        host,
        a,
        b,
        c,
        hits,
        detector,
    }
}

#[test]
fn outside_trigger_and_sibling() {
    let mut p = popover();
    p.detector.set_attached(true);
    assert_eq!(p.detector.state(), DetectorState::Watching);

    p.host.dom.pointer_down(&p.b);
    assert!(p.hits.is_empty());

    p.host.dom.pointer_down(&p.c);
    let hits = p.hits.values();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].target, Some(p.c.clone()));
    assert_eq!(hits[0].kind, EventKind::POINTER_DOWN);
}

#[test]
fn inside_primary_region_is_ignored() {
    let mut p = popover();
    let nested = p.host.dom.create_child(&p.a, "nested");
    p.detector.set_attached(true);
    p.host.dom.pointer_down(&p.a);
    p.host.dom.touch_start(&nested);
    assert!(p.hits.is_empty());
    p.host.dom.touch_start(&p.c);
    assert_eq!(p.hits.len(), 1);
}

#[test]
fn enter_on_focused_element_outside_fires() {
    let mut p = popover();
    p.detector.set_attached(true);

    p.host.dom.focus(&p.a);
    p.host.dom.press_key("Enter");
    assert!(p.hits.is_empty());

    p.host.dom.focus(&p.c);
    p.host.dom.press_key("Tab");
    assert!(p.hits.is_empty());
    p.host.dom.press_key("Enter");
    assert_eq!(p.hits.len(), 1);
    assert_eq!(p.hits.values()[0].key.as_deref(), Some("Enter"));
}

#[test]
fn detaching_removes_every_registration() {
    let mut p = popover();
    let doc = p.host.dom.document();
    p.detector.set_attached(true);
    assert_eq!(doc.listener_count(), 3);

    p.detector.set_attached(false);
    assert_eq!(p.detector.state(), DetectorState::Idle);
    assert_eq!(doc.listener_count(), 0);
    p.host.dom.pointer_down(&p.c);
    assert!(p.hits.is_empty());

    p.detector.set_attached(true);
    drop(p.detector);
    assert_eq!(doc.listener_count(), 0);
}

#[test]
fn revision_reaches_document_listener() {
    let mut p = popover();
    p.detector.set_attached(true);
    let registrations = p.host.dom.registrations();

    let revised: Recorder<DomEvent> = Recorder::new();
    p.detector.revise(revised.sink());
    p.detector.set_attached(true);
    p.host.dom.pointer_down(&p.c);

    assert!(p.hits.is_empty());
    assert_eq!(revised.len(), 1);
    assert_eq!(p.host.dom.registrations(), registrations);
}

#[test]
fn detector_waits_for_region_to_mount() {
    let host = TestHost::new();
    let doc = host.dom.document();
    let region = NodeRef::new();
    let hits: Recorder<DomEvent> = Recorder::new();
    let mut detector = OutsideInteraction::new(
        doc.clone(),
        host.dom.clone(),
        region.clone(),
        hits.sink(),
        OutsideConfig::default().with_keyboard(false),
    )
    .expect("pointer-only config is valid");

    detector.set_attached(true);
    assert_eq!(detector.state(), DetectorState::Idle);
    assert_eq!(doc.listener_count(), 0);

    let menu = host.dom.create_child(&doc, "menu");
    region.set(Some(menu));
    detector.sync();
    assert_eq!(detector.state(), DetectorState::Watching);
    assert_eq!(doc.listener_count(), 2);
}

#[test]
fn region_unmount_keeps_detector_watching() {
    let host = TestHost::new();
    let doc = host.dom.document();
    let menu = host.dom.create_child(&doc, "menu");
    let sibling = host.dom.create_child(&doc, "sibling");
    let region = NodeRef::with_value(menu.clone());
    let hits: Recorder<DomEvent> = Recorder::new();
    let mut detector = OutsideInteraction::new(
        doc.clone(),
        host.dom.clone(),
        region.clone(),
        hits.sink(),
        OutsideConfig::default(),
    )
    .expect("default config is valid");
    detector.set_attached(true);
    let registrations = host.dom.registrations();

    region.set(None);
    detector.sync();
    assert_eq!(detector.state(), DetectorState::Watching);
    assert_eq!(doc.listener_count(), 3);
    assert_eq!(host.dom.registrations(), registrations);
    assert_eq!(host.dom.unregistrations(), 0);

    host.dom.pointer_down(&sibling);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits.values()[0].target, Some(sibling));

    region.set(Some(menu.clone()));
    detector.sync();
    host.dom.pointer_down(&menu);
    assert_eq!(hits.len(), 1);
}

#[test]
fn panicking_callback_leaves_detector_usable() {
    let mut p = popover();
    p.detector.set_attached(true);
    let hits = p.hits.clone();
    let first = Rc::new(std::cell::Cell::new(true));
    p.detector.revise(move |ev: DomEvent| {
        if first.replace(false) {
            panic!("callback failed");
        }
        hits.record(ev);
    });

    p.host.dom.pointer_down(&p.c);
    assert_eq!(p.host.dom.listener_failures(), 1);
    p.host.dom.pointer_down(&p.c);
    assert_eq!(p.hits.len(), 1);
    assert_eq!(p.detector.state(), DetectorState::Watching);
}
