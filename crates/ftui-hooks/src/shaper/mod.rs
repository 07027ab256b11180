#![forbid(unsafe_code)]

//! Temporal shaping of calls to a stable handle.
//!
//! | Policy | Winner | Clock | Pending after burst |
//! |--------|--------|-------|---------------------|
//! | [`Debounced`] | last call | wall-clock timer | one, `delay` after the last call |
//! | [`FrameThrottled`] | first call | rendering frame | one, next frame |
//!
//! Both hold at most one pending invocation, expose an idempotent `cancel`,
//! and cancel synchronously on drop so nothing fires after the owning scope
//! has gone. Firings of one shaper are never reordered relative to its calls;
//! separate shapers are independent.

pub mod debounce;
pub mod frame;

pub use debounce::Debounced;
pub use frame::FrameThrottled;
