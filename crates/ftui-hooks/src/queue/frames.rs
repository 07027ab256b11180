#![forbid(unsafe_code)]

//! Per-frame callback batches.
//!
//! A frame runs exactly the callbacks that were requested before it began,
//! in request order. Requests made from inside a frame wait for the next one,
//! and a callback cancelled by an earlier callback of the same frame does not
//! run.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::host::{FrameSource, FrameToken, Task};

#[derive(Default)]
struct FrameInner {
    next_id: u64,
    requested: BTreeMap<u64, Task>,
    running: BTreeMap<u64, Task>,
    frames: u64,
}

/// Moves whatever is left of the running batch back into the requested one.
/// Ids are monotonic, so leftovers keep their place ahead of newer requests.
struct Requeue<'a>(&'a RefCell<FrameInner>);

impl Drop for Requeue<'_> {
    fn drop(&mut self) {
        let mut inner = self.0.borrow_mut();
        if inner.running.is_empty() {
            return;
        }
        let mut leftover = std::mem::take(&mut inner.running);
        tracing::debug!(callbacks = leftover.len(), "frame unwound; requeueing");
        inner.requested.append(&mut leftover);
    }
}

/// Frame callback queue. Cloning shares the queue.
#[derive(Clone, Default)]
pub struct FrameQueue {
    inner: Rc<RefCell<FrameInner>>,
}

impl fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FrameQueue")
            .field("pending", &inner.requested.len())
            .field("frames", &inner.frames)
            .finish()
    }
}

impl FrameQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks waiting for the next frame.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().requested.len()
    }

    /// Frames run so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.inner.borrow().frames
    }

    /// Run one frame boundary. Returns the number of callbacks run.
    ///
    /// If a callback panics, the callbacks it left unrun go back to the
    /// front of the queue and run on the next frame.
    pub fn run_frame(&self) -> usize {
        {
            let mut inner = self.inner.borrow_mut();
            let batch = std::mem::take(&mut inner.requested);
            inner.running = batch;
            inner.frames += 1;
        }
        let _requeue = Requeue(&self.inner);
        let mut count = 0;
        loop {
            let task = {
                let mut inner = self.inner.borrow_mut();
                inner.running.pop_first().map(|(_, task)| task)
            };
            let Some(task) = task else {
                break;
            };
            task();
            count += 1;
        }
        tracing::trace!(frame = self.frame_count(), callbacks = count, "frame ran");
        count
    }
}

impl FrameSource for FrameQueue {
    fn schedule_next_frame(&self, task: Task) -> FrameToken {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.requested.insert(id, task);
        FrameToken(id)
    }

    fn cancel(&self, token: FrameToken) {
        let mut inner = self.inner.borrow_mut();
        if inner.requested.remove(&token.0).is_none() {
            inner.running.remove(&token.0);
        }
    }
}
