//! Health supervisor.
//!
//! Runs once per tick after the inbound frame has been handled and keeps a
//! bitmask of [`HealthFault`]s:
//!
//! - **RadioSilent**: nothing received for the silence window.  The gateway
//!   reinitialises the radio and the window restarts, so a dead receiver
//!   is retried once per window rather than on every tick.
//! - **UptimeExceeded**: the process has run past the forced-restart bound.
//!   Latched; only a restart clears it.

use log::{error, info, warn};

use crate::config::GatewayConfig;
use crate::error::HealthFault;

pub struct Supervisor {
    silence_ms: u64,
    max_uptime_ms: u64,
    started_ms: u64,
    last_frame_ms: u64,
    /// Latched fault bitmask.
    faults: u8,
}

impl Supervisor {
    pub fn new(config: &GatewayConfig, now_ms: u64) -> Self {
        Self {
            silence_ms: u64::from(config.radio_silence_secs) * 1000,
            max_uptime_ms: u64::from(config.max_uptime_secs) * 1000,
            started_ms: now_ms,
            last_frame_ms: now_ms,
            faults: 0,
        }
    }

    /// A frame passed the length check.
    pub fn frame_received(&mut self, now_ms: u64) {
        self.last_frame_ms = now_ms;
        self.clear_fault(HealthFault::RadioSilent);
    }

    /// The radio was reinitialised; restart the silence window.
    pub fn radio_reinitialised(&mut self, now_ms: u64) {
        self.last_frame_ms = now_ms;
        self.clear_fault(HealthFault::RadioSilent);
    }

    /// Evaluate both conditions.  Returns the updated bitmask.
    pub fn evaluate(&mut self, now_ms: u64) -> u8 {
        if now_ms.saturating_sub(self.last_frame_ms) >= self.silence_ms {
            self.set_fault(HealthFault::RadioSilent);
        }
        if now_ms.saturating_sub(self.started_ms) >= self.max_uptime_ms {
            self.set_fault(HealthFault::UptimeExceeded);
        }
        self.faults
    }

    pub fn faults(&self) -> u8 {
        self.faults
    }

    pub fn has_fault(&self, fault: HealthFault) -> bool {
        self.faults & fault.mask() != 0
    }

    // ── Internal ──────────────────────────────────────────────────

    fn set_fault(&mut self, fault: HealthFault) {
        if self.faults & fault.mask() == 0 {
            match fault {
                HealthFault::RadioSilent => warn!("HEALTH FAULT SET: {fault}"),
                HealthFault::UptimeExceeded => error!("HEALTH FAULT SET: {fault}"),
            }
        }
        self.faults |= fault.mask();
    }

    fn clear_fault(&mut self, fault: HealthFault) {
        if self.faults & fault.mask() != 0 {
            info!("HEALTH FAULT CLEARED: {fault}");
        }
        self.faults &= !fault.mask();
    }
}
