//! Airtime credit.
//!
//! The 868 MHz band allows 1% duty cycle: 36 s per hour, handed out as a
//! fixed quota per window.  Each transmission is charged its estimated
//! on-air time, one millisecond per bit plus the long preamble if used.

/// Remaining transmit airtime in the current window.
#[derive(Debug, Clone)]
pub struct CreditBudget {
    quota_ms: u32,
    remaining_ms: u32,
    long_preamble_ms: u32,
}

impl CreditBudget {
    /// Start with a full quota.
    pub fn new(quota_ms: u32, long_preamble_ms: u32) -> Self {
        Self {
            quota_ms,
            remaining_ms: quota_ms,
            long_preamble_ms,
        }
    }

    /// Airtime a frame of `wire_len` bytes costs.
    pub fn required_ms(&self, wire_len: usize, long_preamble: bool) -> u32 {
        let bits = (wire_len as u32) * 8;
        if long_preamble {
            bits + self.long_preamble_ms
        } else {
            bits
        }
    }

    /// Deduct `required_ms` if it fits.  On refusal the balance is left
    /// untouched.
    pub fn try_take(&mut self, required_ms: u32) -> bool {
        if self.remaining_ms >= required_ms {
            self.remaining_ms -= required_ms;
            true
        } else {
            false
        }
    }

    /// Reset to the full quota at the start of a window.
    pub fn replenish(&mut self) {
        self.remaining_ms = self.quota_ms;
    }

    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    pub fn quota_ms(&self) -> u32 {
        self.quota_ms
    }
}
