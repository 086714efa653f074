//! Gateway configuration parameters
//!
//! [`GatewayConfig`] holds the tunables fixed at construction time.
//! [`PersistedState`] is what survives a restart: the gateway identity,
//! the auto-create flag and the configuration half of every device record.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::protocol::message::MAX_BREAKPOINTS;
use crate::protocol::Address;
use crate::registry::DeviceConfig;

/// Core gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    // --- Identity ---
    /// Topic namespace on the message bus
    pub namespace: String,
    /// Radio address used until a persisted one is loaded
    pub address: Address,
    /// Create records for unknown senders
    pub autocreate: bool,

    // --- Duty cycle ---
    /// Airtime quota per credit window (milliseconds)
    pub credit_quota_ms: u32,
    /// Credit window length (seconds)
    pub credit_window_secs: u32,
    /// Pause after each transmission (milliseconds)
    pub post_transmit_delay_ms: u32,
    /// Airtime charged for a long preamble (milliseconds)
    pub long_preamble_ms: u32,
    /// Retransmissions of an unacknowledged frame after the first attempt
    pub max_retries: u8,

    // --- Freshness & persistence ---
    /// Readings older than this are ignored by the heating engine (seconds)
    pub stale_after_secs: u32,
    /// Minimum age of a configuration change before it is saved (seconds)
    pub config_save_debounce_secs: u32,

    // --- Time sync ---
    /// Interval between time broadcasts (seconds)
    pub time_broadcast_interval_secs: u32,
    /// Number of device slices the broadcasts rotate through
    pub time_broadcast_chunks: u8,

    // --- Supervision ---
    /// Reinitialise the radio after this long without a frame (seconds)
    pub radio_silence_secs: u32,
    /// Request a restart after this uptime (seconds)
    pub max_uptime_secs: u32,

    // --- Heating ---
    /// Valve opening (%) above which a room counts as demanding heat
    pub min_valve_position_to_heat: u8,
    /// Run the burner at `measured <= desired - start/10`
    pub heat_start_offset_tenths: u8,
    /// Stop the burner at `measured >= desired - end/10`
    pub heat_end_offset_tenths: u8,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            namespace: "max".into(),
            address: Address::new(0x12, 0x34, 0x56),
            autocreate: true,

            // 36 s per hour, in four windows
            credit_quota_ms: 9_000,
            credit_window_secs: 15 * 60,
            post_transmit_delay_ms: 200,
            long_preamble_ms: 1_000,
            max_retries: 4,

            stale_after_secs: 10 * 60,
            config_save_debounce_secs: 60,

            time_broadcast_interval_secs: 60 * 60,
            time_broadcast_chunks: 6,

            radio_silence_secs: 5 * 60,
            max_uptime_secs: 10 * 24 * 60 * 60,

            min_valve_position_to_heat: 53,
            heat_start_offset_tenths: 4,
            heat_end_offset_tenths: 2,
        }
    }
}

impl GatewayConfig {
    /// Range-check the tunables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() || self.namespace.contains(['/', '+', '#']) {
            return Err(ConfigError::ValidationFailed(
                "namespace must be a single non-empty topic level",
            ));
        }
        if self.credit_quota_ms == 0 || self.credit_window_secs == 0 {
            return Err(ConfigError::ValidationFailed("credit quota and window must be > 0"));
        }
        if self.time_broadcast_chunks == 0 {
            return Err(ConfigError::ValidationFailed("time_broadcast_chunks must be > 0"));
        }
        if self.min_valve_position_to_heat > 100 {
            return Err(ConfigError::ValidationFailed(
                "min_valve_position_to_heat must be 0–100",
            ));
        }
        if self.heat_start_offset_tenths <= self.heat_end_offset_tenths {
            return Err(ConfigError::ValidationFailed(
                "heat start offset must exceed end offset",
            ));
        }
        Ok(())
    }

    pub fn stale_after_ms(&self) -> u64 {
        u64::from(self.stale_after_secs) * 1000
    }
}

/// Everything written to persistent storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub address: Address,
    pub autocreate: bool,
    pub devices: Vec<DeviceConfig>,
}

impl PersistedState {
    pub fn new(address: Address, autocreate: bool) -> Self {
        Self {
            address,
            autocreate,
            devices: Vec::new(),
        }
    }

    /// Reject state that could not have been produced by the gateway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, device) in self.devices.iter().enumerate() {
            if self.devices[..i].iter().any(|d| d.address == device.address) {
                return Err(ConfigError::ValidationFailed("duplicate device address"));
            }
            if device.name.is_empty() {
                return Err(ConfigError::ValidationFailed("device name must not be empty"));
            }
            if device.schedule.iter().any(|day| day.len() > MAX_BREAKPOINTS) {
                return Err(ConfigError::ValidationFailed("more than 13 breakpoints in a day"));
            }
            if device.valve.boost_chunks > 7 || device.valve.decalc_hour > 23 {
                return Err(ConfigError::ValidationFailed("valve settings out of range"));
            }
        }
        Ok(())
    }
}
