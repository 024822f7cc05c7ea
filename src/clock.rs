//! Clock abstractions used by the orchestrator, the cache and the rate limiter.
//!
//! A [`Clock`] answers two questions. [`Clock::now`] is the calendar time, used for the special
//! date and the `prepared` stamp. [`Clock::now_millis`] is a monotonic reading, used for every
//! elapsed-time check (cache expiry, rate windows, breaker cool-down) so wall-clock steps never
//! stretch or shrink a duration. A single [`ManualClock`] drives both in tests.

use chrono::{DateTime, FixedOffset, Local, TimeDelta};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

/// Clock abstraction so timing can be faked in tests.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Wall-clock time with the local UTC offset attached. Calendar checks use this offset.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Milliseconds since an arbitrary fixed origin. Never goes backwards.
    fn now_millis(&self) -> u64;
}

/// System time: the local time zone for the calendar, `Instant` for elapsed time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

fn process_start() -> Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    *START.get_or_init(Instant::now)
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn now_millis(&self) -> u64 {
        millis(process_start().elapsed())
    }
}

#[derive(Debug)]
struct Readings {
    wall: DateTime<FixedOffset>,
    millis: u64,
}

/// Hand-driven clock. Clones share the same readings.
///
/// [`advance`](ManualClock::advance) moves both readings; [`set`](ManualClock::set) steps the
/// calendar only, the way an NTP correction would.
#[derive(Debug, Clone)]
pub struct ManualClock {
    readings: Arc<Mutex<Readings>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self { readings: Arc::new(Mutex::new(Readings { wall: start, millis: 0 })) }
    }

    fn lock(&self) -> MutexGuard<'_, Readings> {
        self.readings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Let `by` pass. Saturates at the latest representable instant.
    pub fn advance(&self, by: Duration) {
        let mut readings = self.lock();
        if let Some(next) = readings.wall.checked_add_signed(to_delta(by)) {
            readings.wall = next;
        }
        readings.millis = readings.millis.saturating_add(millis(by));
    }

    /// Jump the calendar to an arbitrary instant (backwards jumps allowed).
    pub fn set(&self, to: DateTime<FixedOffset>) {
        self.lock().wall = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.lock().wall
    }

    fn now_millis(&self) -> u64 {
        self.lock().millis
    }
}

/// Convert a std duration to a chrono delta, saturating on overflow.
pub(crate) fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
