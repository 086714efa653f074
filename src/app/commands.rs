//! Operator commands arriving over the message bus.
//!
//! A bus message is a topic plus a JSON payload.  [`OperatorCommand::parse`]
//! turns it into a typed command that the
//! [`Gateway`](super::service::Gateway) interprets.
//!
//! ```text
//!   <ns>/rename        {"address": "ABCDEF", "to": "kitchen"}
//!   <ns>/format
//!   <ns>/reset
//!   <ns>/set           {"address": "123456", "pair": true, "autocreate": false}
//!   <ns>/<name>/set    {"room": "Office", "temperature": 21.5, ...}
//! ```
//!
//! The namespace and the fixed topic levels match case-insensitively;
//! device names match exactly.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::CommandError;

/// Commands that the bus can send into the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    /// Give the device at `address` a new name.
    Rename(RenameRequest),

    /// Erase persisted configuration.
    Format,

    /// Restart the process.
    Reset,

    /// Gateway-level settings.
    Configure(GatewaySettings),

    /// Per-device settings for the device called `name`.
    Device { name: String, settings: DeviceSettings },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenameRequest {
    pub address: String,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GatewaySettings {
    pub address: Option<String>,
    pub pair: Option<bool>,
    pub autocreate: Option<bool>,
}

/// Flat key/value settings for one device.  Absent keys leave the device
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceSettings {
    pub room: Option<String>,
    pub group: Option<u8>,

    /// Weekday the `schedule` applies to.
    pub day: Option<String>,
    /// `"HH:MM"` → temperature held until that time.
    pub schedule: Option<BTreeMap<String, f32>>,

    pub temperature: Option<f32>,
    pub desired_temperature: Option<f32>,
    pub mode: Option<String>,

    /// Name of a device to link with.
    pub associate: Option<String>,
    pub display_actual_temperature: Option<bool>,

    // --- Temperature thresholds ---
    pub comfort_temperature: Option<f32>,
    pub eco_temperature: Option<f32>,
    pub max_temperature: Option<f32>,
    pub min_temperature: Option<f32>,
    pub window_open_temperature: Option<f32>,

    // --- Valve functions ---
    pub decalc_weekday: Option<String>,
    pub decalc_hour: Option<u8>,
    /// Minutes; stored as 5-minute chunks.
    pub boost_duration: Option<u16>,
    pub boost_valve_position: Option<u8>,
    pub max_valve_setting: Option<u8>,
    pub valve_offset: Option<u8>,
}

impl DeviceSettings {
    /// `temperature` wins over `desired_temperature`.
    pub fn target_temperature(&self) -> Option<f32> {
        self.temperature.or(self.desired_temperature)
    }

    pub fn touches_thresholds(&self) -> bool {
        self.comfort_temperature.is_some()
            || self.eco_temperature.is_some()
            || self.max_temperature.is_some()
            || self.min_temperature.is_some()
            || self.window_open_temperature.is_some()
    }

    pub fn touches_valve(&self) -> bool {
        self.decalc_weekday.is_some()
            || self.decalc_hour.is_some()
            || self.boost_duration.is_some()
            || self.boost_valve_position.is_some()
            || self.max_valve_setting.is_some()
            || self.valve_offset.is_some()
    }
}

/// `"HH:MM"` → minutes since midnight.
pub fn parse_time_of_day(text: &str) -> Result<u16, CommandError> {
    let (h, m) = text.trim().split_once(':').ok_or(CommandError::InvalidTime)?;
    let hours: u16 = h.trim().parse().map_err(|_| CommandError::InvalidTime)?;
    let minutes: u16 = m.trim().parse().map_err(|_| CommandError::InvalidTime)?;
    if minutes > 59 || hours > 24 || (hours == 24 && minutes != 0) {
        return Err(CommandError::InvalidTime);
    }
    Ok(hours * 60 + minutes)
}

/// Boost minutes to 5-minute chunks, capped at 7 (one hour).
pub fn boost_minutes_to_chunks(minutes: u16) -> u8 {
    (minutes / 5).min(7) as u8
}

impl OperatorCommand {
    /// Decode a bus message under `namespace`.
    pub fn parse(namespace: &str, topic: &str, payload: &[u8]) -> Result<Self, CommandError> {
        let rest = strip_prefix_ignore_case(topic, namespace)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or(CommandError::UnknownTopic)?;

        if rest.eq_ignore_ascii_case("rename") {
            return Ok(Self::Rename(serde_json::from_slice(payload)?));
        }
        if rest.eq_ignore_ascii_case("format") {
            return Ok(Self::Format);
        }
        if rest.eq_ignore_ascii_case("reset") {
            return Ok(Self::Reset);
        }
        if rest.eq_ignore_ascii_case("set") {
            return Ok(Self::Configure(serde_json::from_slice(payload)?));
        }

        let name = strip_suffix_ignore_case(rest, "/set").ok_or(CommandError::UnknownTopic)?;
        if name.is_empty() {
            return Err(CommandError::UnknownTopic);
        }
        Ok(Self::Device {
            name: name.to_owned(),
            settings: serde_json::from_slice(payload)?,
        })
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    let tail = text.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &text[..split])
}
