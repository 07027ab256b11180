#![forbid(unsafe_code)]

//! Single-threaded event scheduling and binding primitives for FrankenTUI.
//!
//! This crate provides:
//! - [`StableHandle`] for an identity-stable invoker backed by the latest callback
//! - [`Debounced`] and [`FrameThrottled`] for time and frame shaping
//! - [`combine`] for fanning one node out to several receivers
//! - [`EventBinder`], [`GlobalListener`], [`CallbackRefBinder`] and [`ResizeBinder`]
//!   for attach/detach discipline against live sources
//! - [`OutsideInteraction`] for detecting interactions outside a region
//!
//! Timers, frames, event sources and region trees are injected through the
//! traits in [`host`]. [`TimerQueue`] and [`FrameQueue`] are deterministic
//! implementations for event loops and tests.

pub mod binder;
pub mod combine;
pub mod config;
pub mod effect;
pub mod error;
pub mod handle;
pub mod host;
pub mod outside;
pub mod queue;
pub mod shaper;

pub use binder::{Attachment, CallbackRefBinder, EventBinder, GlobalListener, ResizeBinder};
pub use combine::{CombinedReceiver, NodeRef, Receiver, combine};
pub use config::{DebounceConfig, HooksConfig, OutsideConfig};
pub use effect::{Cleanup, Effect, Scope, Teardown};
pub use error::{CombineError, ConfigError, ConstituentFailure};
pub use handle::{Latest, StableHandle};
pub use host::{
    EventKind, EventSource, FrameSource, FrameToken, InteractionEvent, Invoker, InvokerId,
    ObservationToken, ObserveSource, RegionTree, Task, TimerSource, TimerToken,
};
pub use outside::{DetectorState, OutsideInteraction};
pub use queue::{FrameQueue, TimerQueue};
pub use shaper::{Debounced, FrameThrottled};
