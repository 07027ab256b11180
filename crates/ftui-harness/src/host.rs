#![forbid(unsafe_code)]

//! A complete deterministic host: virtual timers, manual frames, a node
//! tree and a resize hub.

use std::rc::Rc;
use std::time::Duration;

use ftui_hooks::{FrameQueue, FrameSource, ObserveSource, TimerQueue, TimerSource};

use crate::dom::{Dom, Node};
use crate::resize::{ResizeEntry, ResizeHub};

/// Everything a hook might need from its environment, fully scripted.
#[derive(Debug, Clone, Default)]
pub struct TestHost {
    pub timers: TimerQueue,
    pub frames: FrameQueue,
    pub dom: Dom,
    pub resize: ResizeHub,
}

impl TestHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The timer queue as an injectable source.
    #[must_use]
    pub fn timer_source(&self) -> Rc<dyn TimerSource> {
        Rc::new(self.timers.clone())
    }

    /// The frame queue as an injectable source.
    #[must_use]
    pub fn frame_source(&self) -> Rc<dyn FrameSource> {
        Rc::new(self.frames.clone())
    }

    /// The resize hub as an injectable observer.
    #[must_use]
    pub fn observer(&self) -> Rc<dyn ObserveSource<Node, ResizeEntry>> {
        Rc::new(self.resize.clone())
    }

    /// Advance virtual time by `ms`, firing due timers. Returns how many fired.
    pub fn advance_ms(&self, ms: u64) -> usize {
        self.timers.advance(Duration::from_millis(ms))
    }

    /// Move virtual time to `ms` since start, firing due timers.
    pub fn advance_to_ms(&self, ms: u64) -> usize {
        self.timers.advance_to(Duration::from_millis(ms))
    }

    /// Current virtual time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u128 {
        self.timers.now().as_millis()
    }

    /// Run one frame boundary. Returns how many callbacks ran.
    pub fn run_frame(&self) -> usize {
        self.frames.run_frame()
    }
}
