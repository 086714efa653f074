//! Typed views of command payloads, and builders for outbound frames.
//!
//! Decoders take a received [`Frame`] and check the payload length before
//! touching any field.  Builders take the gateway's own address as `from`
//! and return a ready-to-queue frame; the delivery policy (ack, preamble)
//! is chosen by the caller.

use serde::{Deserialize, Serialize};

use super::command::Command;
use super::fields::{
    Breakpoint, DeviceKind, Mode, StatusFlags, UntilDate, WallTime, Weekday, decode_measured,
    decode_mode_temperature, decode_temperature, encode_boost, encode_decalcification,
    encode_mode_temperature, encode_temperature, percent_to_byte,
};
use super::frame::{Address, FLAG_GROUP, Frame, Payload};
use crate::error::{FrameError, PayloadError};

/// Most breakpoints a single week-profile day can carry.
pub const MAX_BREAKPOINTS: usize = 13;

/// Ack status byte for an accepted command.
pub const ACK_OK: u8 = 0x01;
/// Ack status byte for a rejected command.
pub const ACK_INVALID: u8 = 0x81;

// ═══════════════════════════════════════════════════════════════
//  Inbound
// ═══════════════════════════════════════════════════════════════

/// Body shared by thermostat-state and wall-thermostat-state reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceState {
    pub flags: StatusFlags,
    /// Valve position for radiator thermostats, display mode for wall
    /// thermostats.
    pub detail: u8,
    pub desired_temperature: f32,
    pub measured_temperature: Option<f32>,
    /// Present instead of a measurement while in temporary mode.
    pub until: Option<UntilDate>,
}

/// `[flags, detail, desired, measured_hi | until.., measured_lo | until..]`
pub fn decode_state(frame: &Frame) -> Result<DeviceState, PayloadError> {
    let p = frame.payload_at_least(3)?;
    let flags = StatusFlags::from_byte(p[0]);
    let mut state = DeviceState {
        flags,
        detail: p[1],
        desired_temperature: decode_temperature(p[2]),
        measured_temperature: None,
        until: None,
    };
    if flags.mode == Mode::Temporary && p.len() >= 6 {
        state.until = Some(UntilDate::decode([p[3], p[4], p[5]]));
    } else if p.len() >= 5 {
        state.measured_temperature = Some(decode_measured(p[3] & 0x01 != 0, p[4]));
    }
    Ok(state)
}

/// Acknowledgement from a device.  Only the status byte is guaranteed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AckReport {
    pub status: u8,
    pub flags: Option<StatusFlags>,
    pub detail: Option<u8>,
    pub desired_temperature: Option<f32>,
}

impl AckReport {
    pub fn is_ok(&self) -> bool {
        self.status == ACK_OK
    }
}

pub fn decode_ack(frame: &Frame) -> Result<AckReport, PayloadError> {
    let p = frame.payload_at_least(1)?;
    Ok(AckReport {
        status: p[0],
        flags: p.get(1).map(|&b| StatusFlags::from_byte(b)),
        detail: p.get(2).copied(),
        desired_temperature: p.get(3).map(|&b| decode_temperature(b)),
    })
}

/// Wall thermostat broadcasting its reading to linked valves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlReport {
    pub desired_temperature: f32,
    pub measured_temperature: f32,
}

/// `[desired | measured_bit8 << 7, measured_lo]`
pub fn decode_wall_control(frame: &Frame) -> Result<ControlReport, PayloadError> {
    let p = frame.payload_at_least(2)?;
    Ok(ControlReport {
        desired_temperature: decode_temperature(p[0]),
        measured_temperature: decode_measured(p[0] & 0x80 != 0, p[1]),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactReport {
    pub open: bool,
    pub rf_error: bool,
    pub low_battery: bool,
}

pub fn decode_shutter_contact(frame: &Frame) -> Result<ContactReport, PayloadError> {
    let p = frame.payload_at_least(1)?;
    Ok(ContactReport {
        open: p[0] & 0x02 != 0,
        rf_error: p[0] & 0x40 != 0,
        low_battery: p[0] & 0x80 != 0,
    })
}

/// Set-temperature as sent by a wall thermostat or the cube.
pub fn decode_set_temperature(frame: &Frame) -> Result<(Mode, f32), PayloadError> {
    let p = frame.payload_at_least(1)?;
    Ok(decode_mode_temperature(p[0]))
}

/// A device asking for the time sends an empty time-information frame.
pub fn is_time_request(frame: &Frame) -> bool {
    frame.command == Command::TimeInformation && frame.payload.is_empty()
}

// ═══════════════════════════════════════════════════════════════
//  Device configuration carried by outbound frames
// ═══════════════════════════════════════════════════════════════

/// Temperature thresholds programmed into a thermostat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureThresholds {
    pub comfort: f32,
    pub eco: f32,
    pub max: f32,
    pub min: f32,
    pub window_open: f32,
}

impl Default for TemperatureThresholds {
    fn default() -> Self {
        Self {
            comfort: 21.0,
            eco: 17.0,
            max: 30.5,
            min: 4.5,
            window_open: 4.5,
        }
    }
}

/// Valve behaviour programmed into a radiator thermostat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveSettings {
    pub decalc_weekday: Weekday,
    pub decalc_hour: u8,
    /// Boost length in 5-minute chunks, 0..=7.
    pub boost_chunks: u8,
    /// Percent, multiple of 5.
    pub boost_valve_position: u8,
    pub max_valve_setting: u8,
    pub valve_offset: u8,
}

impl Default for ValveSettings {
    fn default() -> Self {
        Self {
            decalc_weekday: Weekday::Saturday,
            decalc_hour: 12,
            boost_chunks: 6,
            boost_valve_position: 100,
            max_valve_setting: 100,
            valve_offset: 0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Outbound builders
// ═══════════════════════════════════════════════════════════════

/// Group-addressing flag for a device with `group` (0 = none).
fn group_flags(group: u8) -> u8 {
    if group == 0 { 0 } else { FLAG_GROUP }
}

pub fn ack(counter: u8, from: Address, to: Address) -> Result<Frame, FrameError> {
    Frame::new(counter, Command::Ack, from, to).with_payload(&[ACK_OK])
}

pub fn pair_pong(counter: u8, from: Address, to: Address, group: u8) -> Result<Frame, FrameError> {
    Frame::new(counter, Command::PairPong, from, to)
        .with_group(group)
        .with_payload(&[0x00])
}

pub fn time_information(
    counter: u8,
    from: Address,
    to: Address,
    group: u8,
    now: &WallTime,
) -> Result<Frame, FrameError> {
    Frame::new(counter, Command::TimeInformation, from, to)
        .with_flags(FLAG_GROUP)
        .with_group(group)
        .with_payload(&now.encode())
}

pub fn set_group_id(counter: u8, from: Address, to: Address, group: u8) -> Result<Frame, FrameError> {
    Frame::new(counter, Command::SetGroupId, from, to).with_payload(&[group])
}

pub fn set_temperature(
    counter: u8,
    from: Address,
    to: Address,
    group: u8,
    mode: Mode,
    celsius: f32,
) -> Result<Frame, FrameError> {
    Frame::new(counter, Command::SetTemperature, from, to)
        .with_flags(group_flags(group))
        .with_group(group)
        .with_payload(&[encode_mode_temperature(mode, celsius)])
}

/// One day of a week profile.  More than [`MAX_BREAKPOINTS`] points do not
/// fit a frame.
pub fn week_profile(
    counter: u8,
    from: Address,
    to: Address,
    group: u8,
    day: Weekday,
    points: &[Breakpoint],
) -> Result<Frame, FrameError> {
    if points.len() > MAX_BREAKPOINTS {
        return Err(FrameError::TooLong {
            payload: 1 + points.len() * 2,
        });
    }
    let mut payload = Payload::new();
    let _ = payload.push(day.index());
    for point in points {
        let _ = payload.extend_from_slice(&point.to_bytes());
    }
    Frame::new(counter, Command::ConfigWeekProfile, from, to)
        .with_flags(group_flags(group))
        .with_group(group)
        .with_payload(&payload)
}

pub fn add_link_partner(
    counter: u8,
    from: Address,
    to: Address,
    partner: Address,
    partner_kind: DeviceKind,
) -> Result<Frame, FrameError> {
    let [a, b, c] = partner.bytes();
    Frame::new(counter, Command::AddLinkPartner, from, to).with_payload(&[
        a,
        b,
        c,
        partner_kind.code(),
    ])
}

/// `[comfort, eco, max, min, offset, window_open, window_duration]`.
/// Offset is fixed at 0 °C (encoded 7) and the window duration at 15
/// minutes (encoded 3).
pub fn config_temperatures(
    counter: u8,
    from: Address,
    to: Address,
    t: &TemperatureThresholds,
) -> Result<Frame, FrameError> {
    Frame::new(counter, Command::ConfigTemperatures, from, to).with_payload(&[
        encode_temperature(t.comfort),
        encode_temperature(t.eco),
        encode_temperature(t.max),
        encode_temperature(t.min),
        7,
        encode_temperature(t.window_open),
        3,
    ])
}

pub fn config_valve(
    counter: u8,
    from: Address,
    to: Address,
    v: &ValveSettings,
) -> Result<Frame, FrameError> {
    Frame::new(counter, Command::ConfigValve, from, to).with_payload(&[
        encode_boost(v.boost_chunks, v.boost_valve_position),
        encode_decalcification(v.decalc_weekday, v.decalc_hour),
        percent_to_byte(v.max_valve_setting),
        percent_to_byte(v.valve_offset),
    ])
}

pub fn display_actual_temperature(
    counter: u8,
    from: Address,
    to: Address,
    show: bool,
) -> Result<Frame, FrameError> {
    Frame::new(counter, Command::SetDisplayActualTemperature, from, to)
        .with_payload(&[if show { 0x04 } else { 0x00 }])
}
