#![forbid(unsafe_code)]

//! Deadline-ordered one-shot timers on a virtual clock.
//!
//! # Invariants
//!
//! 1. Tasks fire in deadline order; equal deadlines fire in scheduling order.
//! 2. While a task runs, [`TimerQueue::now`] equals its deadline, so a task
//!    that schedules another timer measures the delay from its own firing.
//! 3. The clock never moves backwards.
//! 4. `cancel` of a fired, cancelled, or unknown token is a no-op.
//!
//! # Failure Modes
//!
//! - A task that panics is already removed from the queue; the clock stays
//!   at its deadline and later tasks remain scheduled.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::host::{Task, TimerSource, TimerToken};

struct TimerInner {
    origin: Instant,
    now: Duration,
    next_id: u64,
    /// Keyed by `(deadline, id)` so iteration order is firing order.
    entries: BTreeMap<(Duration, u64), Task>,
    deadlines: HashMap<u64, Duration>,
    fired: u64,
}

/// Virtual-clock timer queue. Cloning shares the queue.
#[derive(Clone)]
pub struct TimerQueue {
    inner: Rc<RefCell<TimerInner>>,
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("TimerQueue")
            .field("now", &inner.now)
            .field("pending", &inner.entries.len())
            .field("fired", &inner.fired)
            .finish()
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerQueue {
    /// Create an empty queue whose clock starts at zero, now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(TimerInner {
                origin: Instant::now(),
                now: Duration::ZERO,
                next_id: 1,
                entries: BTreeMap::new(),
                deadlines: HashMap::new(),
                fired: 0,
            })),
        }
    }

    /// Current virtual time since the queue was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of scheduled, unfired tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Total tasks fired so far.
    #[must_use]
    pub fn fired(&self) -> u64 {
        self.inner.borrow().fired
    }

    /// Deadline of the earliest scheduled task.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.inner
            .borrow()
            .entries
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    /// Time left until the earliest task is due, for sizing a poll timeout.
    #[must_use]
    pub fn time_until_next(&self) -> Option<Duration> {
        let now = self.now();
        self.next_deadline().map(|d| d.saturating_sub(now))
    }

    /// Advance the clock by `by`, firing every task that comes due.
    ///
    /// Returns the number of tasks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        self.advance_to(target)
    }

    /// Advance the clock to `target`, firing every task due at or before it.
    ///
    /// Tasks scheduled by firing tasks are honored if they also fall due.
    /// A `target` in the past only fires tasks that are already overdue.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut count = 0;
        while let Some(task) = self.pop_due(target) {
            task();
            count += 1;
        }
        let mut inner = self.inner.borrow_mut();
        if target > inner.now {
            inner.now = target;
        }
        count
    }

    /// Advance to the wall clock, as measured from the queue's creation.
    pub fn poll(&self) -> usize {
        let elapsed = self.inner.borrow().origin.elapsed();
        self.advance_to(elapsed)
    }

    /// Fire tasks until none remain, jumping the clock to each deadline.
    ///
    /// Returns the number fired. Stops after `limit` tasks to bound
    /// self-rescheduling loops.
    pub fn run_until_idle(&self, limit: usize) -> usize {
        let mut count = 0;
        while count < limit {
            let Some(deadline) = self.next_deadline() else {
                break;
            };
            let Some(task) = self.pop_due(deadline) else {
                break;
            };
            task();
            count += 1;
        }
        count
    }

    fn pop_due(&self, target: Duration) -> Option<Task> {
        let mut inner = self.inner.borrow_mut();
        let (&(deadline, id), _) = inner.entries.iter().next()?;
        if deadline > target {
            return None;
        }
        let task = inner.entries.remove(&(deadline, id))?;
        inner.deadlines.remove(&id);
        if deadline > inner.now {
            inner.now = deadline;
        }
        inner.fired += 1;
        tracing::trace!(id, deadline_ms = deadline.as_millis() as u64, "timer fired");
        Some(task)
    }
}

impl TimerSource for TimerQueue {
    fn schedule_after(&self, delay: Duration, task: Task) -> TimerToken {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        let deadline = inner.now.saturating_add(delay);
        inner.entries.insert((deadline, id), task);
        inner.deadlines.insert(id, deadline);
        TimerToken(id)
    }

    fn cancel(&self, token: TimerToken) {
        let mut inner = self.inner.borrow_mut();
        if let Some(deadline) = inner.deadlines.remove(&token.0) {
            inner.entries.remove(&(deadline, token.0));
        }
    }
}
