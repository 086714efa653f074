//! Heating decision engine.
//!
//! Two passes per tick over the registry:
//!
//! 1. **Valve sync**: a wall thermostat takes the highest fresh valve
//!    position among the radiator thermostats in its room.
//! 2. **Demand**: fold every fresh, mode-known device into a
//!    [`HeatingDemand`]; the most urgent wins and boost short-circuits.
//!
//! ```text
//!   measured ≤ desired − 0.4  ──▶ Run
//!   measured ≥ desired − 0.2  ──▶ Stop
//!   otherwise                 ──▶ Keep   (relay left as is)
//! ```
//!
//! Temperatures are compared in whole tenths of a degree so the
//! thresholds do not depend on float rounding.

use log::debug;

use crate::config::GatewayConfig;
use crate::protocol::fields::{boost_duration_ms, DeviceKind, Mode};
use crate::registry::{is_fresh, DeviceRecord, Reading, Registry};

/// Boost stops counting as demand this long before the window closes.
const BOOST_TAIL_MS: u64 = 2 * 60 * 1000;

/// Burner command, ordered by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeatingDemand {
    Stop,
    Keep,
    Run,
}

/// Thresholds the engine works with.
#[derive(Debug, Clone, Copy)]
pub struct HeatingPolicy {
    pub stale_after_ms: u64,
    pub min_valve_position: u8,
    pub start_offset_tenths: i32,
    pub end_offset_tenths: i32,
}

impl From<&GatewayConfig> for HeatingPolicy {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            stale_after_ms: config.stale_after_ms(),
            min_valve_position: config.min_valve_position_to_heat,
            start_offset_tenths: i32::from(config.heat_start_offset_tenths),
            end_offset_tenths: i32::from(config.heat_end_offset_tenths),
        }
    }
}

impl Default for HeatingPolicy {
    fn default() -> Self {
        Self::from(&GatewayConfig::default())
    }
}

impl HeatingPolicy {
    /// Hysteresis comparison for one device.
    pub fn compare(&self, measured: f32, desired: f32) -> HeatingDemand {
        let m = tenths(measured);
        let d = tenths(desired);
        if m <= d - self.start_offset_tenths {
            HeatingDemand::Run
        } else if m >= d - self.end_offset_tenths {
            HeatingDemand::Stop
        } else {
            HeatingDemand::Keep
        }
    }
}

fn tenths(celsius: f32) -> i32 {
    (celsius * 10.0).round() as i32
}

// ── Pass 1 ──────────────────────────────────────────────────────

/// Copy the highest fresh radiator valve position in each room onto the
/// room's wall thermostat.
pub fn sync_valves(registry: &mut Registry, now_ms: u64, stale_after_ms: u64) {
    for record in registry.records_mut() {
        if record.kind() == Some(DeviceKind::WallThermostat) {
            record.state.valve_position = None;
        }
    }

    let updates: Vec<(usize, Reading<u8>)> = registry
        .iter()
        .filter(|r| r.kind() == Some(DeviceKind::HeatingThermostat))
        .filter_map(|r| {
            let valve = r.state.valve_position?;
            if !valve.is_fresh(now_ms, stale_after_ms) {
                return None;
            }
            let wall = registry.position_by_room_and_kind(r.room(), DeviceKind::WallThermostat)?;
            Some((wall, valve))
        })
        .collect();

    for (wall, valve) in updates {
        registry.update_state(wall, |w| {
            let higher = w
                .state
                .valve_position
                .is_none_or(|current| valve.value > current.value);
            if higher {
                w.state.valve_position = Some(valve);
            }
        });
    }
}

// ── Pass 2 ──────────────────────────────────────────────────────

/// Fold the registry into one burner command.
pub fn evaluate(registry: &Registry, now_ms: u64, policy: &HeatingPolicy) -> HeatingDemand {
    let mut result = HeatingDemand::Stop;

    for device in registry.iter() {
        let seen_fresh = device
            .state
            .last_seen_ms
            .is_some_and(|t| is_fresh(t, now_ms, policy.stale_after_ms));
        let Some(mode) = device.mode() else { continue };
        if !seen_fresh {
            continue;
        }

        let kind = device.kind();
        if kind == Some(DeviceKind::HeatingThermostat)
            && registry
                .find_by_room_and_kind(device.room(), DeviceKind::WallThermostat)
                .is_some()
        {
            continue;
        }

        if mode == Mode::Boost && boost_active(device, now_ms) {
            debug!("Heating: {} boosting", device.name());
            return HeatingDemand::Run;
        }

        let (Some(desired), Some(measured)) = (
            device.state.desired_temperature,
            device.state.measured_temperature,
        ) else {
            continue;
        };
        if !desired.is_fresh(now_ms, policy.stale_after_ms)
            || !measured.is_fresh(now_ms, policy.stale_after_ms)
        {
            continue;
        }

        let governs = kind == Some(DeviceKind::WallThermostat)
            || (kind == Some(DeviceKind::HeatingThermostat) && mode == Mode::Manual);
        let valve_open = device
            .state
            .valve_position
            .is_some_and(|v| v.value > policy.min_valve_position);
        if governs && valve_open {
            let demand = policy.compare(measured.value, desired.value);
            debug!(
                "Heating: {} measured {} desired {} -> {:?}",
                device.name(),
                measured.value,
                desired.value,
                demand
            );
            result = result.max(demand);
        }
    }

    result
}

/// Still inside the boost window, short of its last two minutes.
fn boost_active(device: &DeviceRecord, now_ms: u64) -> bool {
    let Some(since) = device.state.mode_changed_ms else {
        return false;
    };
    let window = boost_duration_ms(device.config.valve.boost_chunks).saturating_sub(BOOST_TAIL_MS);
    now_ms.saturating_sub(since) < window
}
