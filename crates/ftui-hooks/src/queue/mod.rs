#![forbid(unsafe_code)]

//! Reference host drivers for the timer and frame contracts.
//!
//! Both queues are cooperative and single-threaded: nothing runs until the
//! owner of the event loop pumps them. That makes them equally suited to a
//! native loop (call [`TimerQueue::poll`] and [`FrameQueue::run_frame`] each
//! iteration) and to tests (advance virtual time explicitly).
//!
//! - [`TimerQueue`]: virtual clock with deadline-ordered one-shot tasks.
//! - [`FrameQueue`]: batch of callbacks flushed once per frame.

pub mod frames;
pub mod timers;

pub use frames::FrameQueue;
pub use timers::TimerQueue;
