//! Host clock adapter.
//!
//! Monotonic time comes from `std::time::Instant`; wall time from the
//! local time zone via `chrono`.  A wall clock that reads before 2020 is
//! treated as not yet synchronised.

use std::time::{Duration, Instant};

use chrono::prelude::*;

use crate::app::ports::ClockPort;
use crate::protocol::fields::WallTime;

/// Anything earlier has not been set by NTP yet.
const EARLIEST_SYNCED_YEAR: i32 = 2020;

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn wall_time(&self) -> Option<WallTime> {
        wall_time_from(&Local::now().naive_local())
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Convert a civil date-time; `None` before the sync threshold or past
/// what a time frame can carry.
pub fn wall_time_from(t: &NaiveDateTime) -> Option<WallTime> {
    if !(EARLIEST_SYNCED_YEAR..2256).contains(&t.year()) {
        return None;
    }
    Some(WallTime {
        year: t.year() as u16,
        month: t.month() as u8,
        day: t.day() as u8,
        hour: t.hour() as u8,
        minute: t.minute() as u8,
        second: t.second() as u8,
    })
}
