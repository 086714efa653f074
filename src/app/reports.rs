//! Structured publications.
//!
//! The gateway hands these to the [`BusPort`](super::ports::BusPort); the
//! adapter on the other side decides how they are encoded.  Unknown values
//! are `None` and left out of the encoded form.

use serde::Serialize;

use crate::registry::DeviceRecord;

/// Decoded attributes of one device, published on `<namespace>/<name>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceReport {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measured_temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valve_position: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_battery: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rf_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,
}

impl From<&DeviceRecord> for DeviceReport {
    fn from(device: &DeviceRecord) -> Self {
        let state = &device.state;
        Self {
            kind: device.kind().map(|k| k.as_str()),
            room: (!device.room().is_empty()).then(|| device.room().to_owned()),
            mode: device.mode().map(|m| m.as_str()),
            measured_temperature: state.measured_temperature.map(|r| r.value),
            desired_temperature: state.desired_temperature.map(|r| r.value),
            valve_position: state.valve_position.map(|r| r.value),
            open: state.open,
            low_battery: state.low_battery,
            rf_error: state.rf_error,
            rssi: state.rssi_dbm,
        }
    }
}

/// The gateway's own status, published retained on `<namespace>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayStatus {
    pub availability: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booted_at: Option<String>,
    pub pairing_enabled: bool,
    pub autocreate: bool,
    pub furnace_running: bool,
}
