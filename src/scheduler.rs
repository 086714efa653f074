//! Periodic housekeeping.
//!
//! A short list of recurring tasks measured on the monotonic clock.  When
//! one falls due the scheduler hands it to a [`SchedulerDelegate`]; the
//! gateway collects the tasks and runs them after the scheduler borrow
//! ends.
//!
//! ```text
//!   ReplenishCredit  (every credit window) ─┐
//!                                           ├─▶ SchedulerDelegate ─▶ Gateway::tick
//!   BroadcastTime    (every hour)          ─┘
//! ```
//!
//! Time broadcasts are spread over several hours: each firing targets one
//! slice of the device list, chosen by [`TimeSyncRotation`].

use heapless::Vec;
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════
//  Task types
// ═══════════════════════════════════════════════════════════════

/// Work the scheduler can ask the gateway to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Reset airtime credit to the full quota.
    ReplenishCredit,
    /// Send the current time to the next slice of thermostats.
    BroadcastTime,
}

/// A recurring task.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub label: &'static str,
    pub task: Task,
    pub interval_ms: u64,
}

/// Receives each task as it falls due.
pub trait SchedulerDelegate {
    fn on_task_due(&mut self, task: Task);
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Room for every housekeeping task plus spare.
const MAX_SCHEDULES: usize = 4;

#[derive(Debug, Clone)]
struct Recurring {
    schedule: Schedule,
    /// Monotonic time the task last fired, or was added.
    last_fired_ms: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<Recurring, MAX_SCHEDULES>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schedule`; its first period starts at `now_ms`.  Returns
    /// `false` when every slot is taken.
    pub fn add(&mut self, schedule: Schedule, now_ms: u64) -> bool {
        let (label, secs) = (schedule.label, schedule.interval_ms / 1000);
        let added = self
            .entries
            .push(Recurring {
                schedule,
                last_fired_ms: now_ms,
            })
            .is_ok();
        if added {
            info!("Scheduler: '{}' every {} s", label, secs);
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hand every task whose interval has elapsed since its last firing to
    /// `delegate`.  The next period counts from now.
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        for entry in &mut self.entries {
            if now_ms.saturating_sub(entry.last_fired_ms) < entry.schedule.interval_ms {
                continue;
            }
            debug!("Scheduler: '{}' due", entry.schedule.label);
            entry.last_fired_ms = now_ms;
            delegate.on_task_due(entry.schedule.task);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Time broadcast rotation
// ═══════════════════════════════════════════════════════════════

/// Cycles through `chunks` slices of the device list, one per broadcast.
#[derive(Debug, Clone)]
pub struct TimeSyncRotation {
    chunks: usize,
    next: usize,
}

impl TimeSyncRotation {
    pub fn new(chunks: u8) -> Self {
        Self {
            chunks: usize::from(chunks.max(1)),
            next: 0,
        }
    }

    /// Slice to serve now; advances the rotation.
    pub fn advance(&mut self) -> usize {
        let current = self.next;
        self.next = (self.next + 1) % self.chunks;
        current
    }

    /// Whether the device at `index` belongs to `slice`.
    pub fn includes(&self, slice: usize, index: usize) -> bool {
        index % self.chunks == slice
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
