// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-shot timers for the resend schedule.
//!
//! Timers do not call back into the socket. Expiries are pulled with
//! [`Timer::poll_expired`] by whoever owns the socket (its `process_timers`
//! method, or the [`driver`](crate::driver) loop), so an expiry is always
//! handled on the same thread, and under the same `&mut` borrow, as
//! `send`/`recv`. A cancelled handle is never reported.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest delay a deadline is computed for; larger delays are capped.
pub const MAX_DELAY: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, capped at [`MAX_DELAY`] so it never overflows `Instant`.
pub fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(MAX_DELAY)).unwrap_or(now)
}

/// Time source for [`DeadlineTimer`].
pub trait Clock: Send {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall clock (`Instant::now`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock, shared between clones.
///
/// # Example
/// ```
/// use spreq::timer::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(60));
/// assert_eq!(clock.now() - start, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Opaque handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// One-shot timer service.
pub trait Timer: Send {
    /// Arm a timer expiring `delay` from now.
    fn start(&mut self, delay: Duration) -> TimerHandle;

    /// Disarm a timer. Idempotent: unknown, fired or already cancelled
    /// handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);

    /// Earliest deadline among armed timers.
    fn next_deadline(&self) -> Option<Instant>;

    /// Pop one timer whose deadline has passed.
    fn poll_expired(&mut self) -> Option<TimerHandle>;
}

/// Deadline-ordered timer set driven by a [`Clock`].
#[derive(Debug)]
pub struct DeadlineTimer<C: Clock = SystemClock> {
    clock: C,
    next_handle: u64,
    /// (deadline, handle) ordered by deadline then arming order
    armed: BTreeSet<(Instant, u64)>,
    deadlines: HashMap<u64, Instant>,
}

impl DeadlineTimer<SystemClock> {
    /// Timer on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for DeadlineTimer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> DeadlineTimer<C> {
    /// Timer on a custom clock.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            next_handle: 0,
            armed: BTreeSet::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Number of armed timers.
    pub fn armed(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether `handle` is still armed.
    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }
}

impl<C: Clock> Timer for DeadlineTimer<C> {
    fn start(&mut self, delay: Duration) -> TimerHandle {
        let id = self.next_handle;
        self.next_handle += 1;

        let deadline = deadline_after(self.clock.now(), delay);
        self.armed.insert((deadline, id));
        self.deadlines.insert(id, deadline);

        log::trace!("[timer] Armed #{} for {:?}", id, delay);
        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(deadline) = self.deadlines.remove(&handle.0) {
            self.armed.remove(&(deadline, handle.0));
            log::trace!("[timer] Cancelled #{}", handle.0);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.armed.first().map(|(deadline, _)| *deadline)
    }

    fn poll_expired(&mut self) -> Option<TimerHandle> {
        let &(deadline, id) = self.armed.first()?;
        if deadline > self.clock.now() {
            return None;
        }
        self.armed.remove(&(deadline, id));
        self.deadlines.remove(&id);
        Some(TimerHandle(id))
    }
}
