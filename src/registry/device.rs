//! One device record: persisted configuration plus live readings.

use serde::{Deserialize, Serialize};

use crate::protocol::fields::{Breakpoint, DeviceKind, Mode};
use crate::protocol::message::{TemperatureThresholds, ValveSettings};
use crate::protocol::Address;

/// Week profile: per weekday (Saturday first), breakpoints sorted by time.
pub type WeekSchedule = [Vec<Breakpoint>; 7];

/// The part of a record that survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub address: Address,
    pub name: String,
    pub room: String,
    pub kind: Option<DeviceKind>,
    pub group: u8,
    pub display_actual_temperature: Option<bool>,
    pub thresholds: TemperatureThresholds,
    pub valve: ValveSettings,
    pub schedule: WeekSchedule,
    pub associations: Vec<Address>,
}

impl DeviceConfig {
    /// Defaults for a device seen for the first time; the name is the
    /// address in hex.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            name: address.to_string(),
            room: String::new(),
            kind: None,
            group: 0,
            display_actual_temperature: None,
            thresholds: TemperatureThresholds::default(),
            valve: ValveSettings::default(),
            schedule: Default::default(),
            associations: Vec::new(),
        }
    }
}

/// A value with the time it was observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading<T> {
    pub value: T,
    pub at_ms: u64,
}

impl<T: Copy> Reading<T> {
    pub fn new(value: T, at_ms: u64) -> Self {
        Self { value, at_ms }
    }

    pub fn is_fresh(&self, now_ms: u64, max_age_ms: u64) -> bool {
        is_fresh(self.at_ms, now_ms, max_age_ms)
    }
}

/// `now - at <= max_age`.
pub fn is_fresh(at_ms: u64, now_ms: u64, max_age_ms: u64) -> bool {
    now_ms.saturating_sub(at_ms) <= max_age_ms
}

/// Last-known state as decoded from radio traffic.  Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveState {
    pub last_seen_ms: Option<u64>,
    pub mode: Option<Reading<Mode>>,
    /// When the mode last took a different value.
    pub mode_changed_ms: Option<u64>,
    pub desired_temperature: Option<Reading<f32>>,
    pub measured_temperature: Option<Reading<f32>>,
    pub valve_position: Option<Reading<u8>>,
    pub open: Option<bool>,
    pub rf_error: Option<bool>,
    pub low_battery: Option<bool>,
    pub rssi_dbm: Option<i16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub config: DeviceConfig,
    pub state: LiveState,
}

impl DeviceRecord {
    pub fn new(address: Address) -> Self {
        Self::from_config(DeviceConfig::new(address))
    }

    pub fn from_config(config: DeviceConfig) -> Self {
        Self {
            config,
            state: LiveState::default(),
        }
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn room(&self) -> &str {
        &self.config.room
    }

    pub fn kind(&self) -> Option<DeviceKind> {
        self.config.kind
    }

    pub fn mode(&self) -> Option<Mode> {
        self.state.mode.map(|r| r.value)
    }

    pub fn is_linked_to(&self, other: Address) -> bool {
        self.config.associations.contains(&other)
    }

    // ── Configuration setters ────────────────────────────────────
    //
    // Each returns whether the stored value changed.

    pub fn set_name(&mut self, name: &str) -> bool {
        replace(&mut self.config.name, name.to_owned())
    }

    pub fn set_room(&mut self, room: &str) -> bool {
        replace(&mut self.config.room, room.to_owned())
    }

    pub fn set_kind(&mut self, kind: DeviceKind) -> bool {
        replace(&mut self.config.kind, Some(kind))
    }

    pub fn set_group(&mut self, group: u8) -> bool {
        replace(&mut self.config.group, group)
    }

    pub fn set_display_actual_temperature(&mut self, show: bool) -> bool {
        replace(&mut self.config.display_actual_temperature, Some(show))
    }

    pub fn set_thresholds(&mut self, thresholds: TemperatureThresholds) -> bool {
        replace(&mut self.config.thresholds, thresholds)
    }

    pub fn set_valve_settings(&mut self, valve: ValveSettings) -> bool {
        replace(&mut self.config.valve, valve)
    }

    /// Store a day of the week profile, sorted by time.
    pub fn set_schedule(&mut self, day: usize, mut points: Vec<Breakpoint>) -> bool {
        points.sort_by_key(|p| p.until_minutes());
        match self.config.schedule.get_mut(day) {
            Some(slot) => replace(slot, points),
            None => false,
        }
    }

    pub fn add_association(&mut self, other: Address) -> bool {
        if self.is_linked_to(other) {
            return false;
        }
        self.config.associations.push(other);
        true
    }

    // ── Live state ───────────────────────────────────────────────

    pub fn touch(&mut self, now_ms: u64) {
        self.state.last_seen_ms = Some(now_ms);
    }

    /// Record a reported mode.  Returns true when it differs from the last
    /// one, which also restarts the boost window.
    pub fn set_mode(&mut self, mode: Mode, now_ms: u64) -> bool {
        let changed = self.mode() != Some(mode);
        if changed {
            self.state.mode_changed_ms = Some(now_ms);
        }
        self.state.mode = Some(Reading::new(mode, now_ms));
        changed
    }

    pub fn set_desired_temperature(&mut self, celsius: f32, now_ms: u64) {
        self.state.desired_temperature = Some(Reading::new(celsius, now_ms));
    }

    pub fn set_measured_temperature(&mut self, celsius: f32, now_ms: u64) {
        self.state.measured_temperature = Some(Reading::new(celsius, now_ms));
    }

    pub fn set_valve_position(&mut self, percent: u8, now_ms: u64) {
        self.state.valve_position = Some(Reading::new(percent, now_ms));
    }

    pub fn set_battery_flags(&mut self, rf_error: bool, low_battery: bool) {
        self.state.rf_error = Some(rf_error);
        self.state.low_battery = Some(low_battery);
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
