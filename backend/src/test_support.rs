//! Test utilities shared by unit tests (in `src/`) and integration tests (in
//! `tests/`). Compiled for tests and with the `test-support` feature.

use std::sync::Mutex;

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

/// Clock whose current time is set by the test.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        *self.lock_clock() += TimeDelta::days(days);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}
