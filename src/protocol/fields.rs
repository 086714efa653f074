//! Bit-packed payload fields.
//!
//! Temperatures travel as half-degree steps in the low 6 or 7 bits of a
//! byte; the spare top bits carry a mode or the high bit of a measured
//! temperature depending on the command.  Measured temperatures use
//! tenth-degree steps over 9 bits.

use core::fmt;

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════
//  Enumerated fields
// ═══════════════════════════════════════════════════════════════

/// Operating mode, two bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    Auto = 0,
    Manual = 1,
    Temporary = 2,
    Boost = 3,
}

impl Mode {
    /// Decode the low two bits of `raw`.
    pub const fn from_bits(raw: u8) -> Self {
        match raw & 0x03 {
            0 => Self::Auto,
            1 => Self::Manual,
            2 => Self::Temporary,
            _ => Self::Boost,
        }
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Temporary => "temporary",
            Self::Boost => "boost",
        }
    }

    /// Operator spelling; anything unrecognised means manual.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "auto" => Self::Auto,
            "temporary" => Self::Temporary,
            "boost" => Self::Boost,
            _ => Self::Manual,
        }
    }
}

/// Device family, as carried in add-link-partner payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceKind {
    Cube = 0x0,
    HeatingThermostat = 0x1,
    WallThermostat = 0x3,
    ShutterContact = 0x4,
}

impl DeviceKind {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x0 => Some(Self::Cube),
            0x1 => Some(Self::HeatingThermostat),
            0x3 => Some(Self::WallThermostat),
            0x4 => Some(Self::ShutterContact),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::HeatingThermostat => "heater",
            Self::WallThermostat => "thermostat",
            Self::ShutterContact => "shutter_contact",
        }
    }
}

/// Day index used by week profiles and decalcification.  The protocol
/// week starts on Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Weekday {
    Saturday = 0,
    Sunday = 1,
    Monday = 2,
    Tuesday = 3,
    Wednesday = 4,
    Thursday = 5,
    Friday = 6,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Self::Saturday,
        Self::Sunday,
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
    ];

    /// Case-insensitive English day name.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }

    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 7 {
            Some(Self::ALL[index as usize])
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Temperatures
// ═══════════════════════════════════════════════════════════════

/// `round(t * 2)` in 7 bits.
pub fn encode_temperature(celsius: f32) -> u8 {
    (celsius * 2.0).round().clamp(0.0, 127.0) as u8
}

/// Low 7 bits as half degrees.
pub fn decode_temperature(raw: u8) -> f32 {
    f32::from(raw & 0x7F) / 2.0
}

/// Set-temperature byte: 6-bit temperature, mode in the top two bits.
pub fn encode_mode_temperature(mode: Mode, celsius: f32) -> u8 {
    (encode_temperature(celsius) & 0x3F) | (mode.bits() << 6)
}

pub fn decode_mode_temperature(raw: u8) -> (Mode, f32) {
    (Mode::from_bits(raw >> 6), f32::from(raw & 0x3F) / 2.0)
}

/// 9-bit measured temperature in tenths of a degree.
pub fn decode_measured(high_bit: bool, low: u8) -> f32 {
    let tenths = (u16::from(high_bit) << 8) | u16::from(low);
    f32::from(tenths) / 10.0
}

// ═══════════════════════════════════════════════════════════════
//  Valve configuration
// ═══════════════════════════════════════════════════════════════

/// `(boost_chunks << 5) | (boost_valve_position / 5)`.
pub fn encode_boost(boost_chunks: u8, boost_valve_position: u8) -> u8 {
    ((boost_chunks & 0x07) << 5) | ((boost_valve_position / 5) & 0x1F)
}

/// Inverse of [`encode_boost`]: `(chunks, valve_position_percent)`.
pub fn decode_boost(raw: u8) -> (u8, u8) {
    (raw >> 5, (raw & 0x1F) * 5)
}

/// `(weekday << 5) | hour`.
pub fn encode_decalcification(weekday: Weekday, hour: u8) -> u8 {
    (weekday.index() << 5) | (hour & 0x1F)
}

pub fn decode_decalcification(raw: u8) -> (Option<Weekday>, u8) {
    (Weekday::from_index(raw >> 5), raw & 0x1F)
}

/// Percentage scaled onto a full byte.
pub fn percent_to_byte(percent: u8) -> u8 {
    (u16::from(percent.min(100)) * 255 / 100) as u8
}

/// Boost window length.  Chunk 7 is special-cased to a full hour.
pub fn boost_duration_ms(chunks: u8) -> u64 {
    let minutes = if chunks == 7 { 60 } else { u64::from(chunks) * 5 };
    minutes * 60 * 1000
}

// ═══════════════════════════════════════════════════════════════
//  Week profile
// ═══════════════════════════════════════════════════════════════

/// One schedule point: hold `temperature` until `minutes` past midnight.
///
/// Packed big-endian as `(round(t*2) << 9) | minutes / 5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint(u16);

impl Breakpoint {
    pub fn new(temperature: f32, until_minutes: u16) -> Self {
        let temp = u16::from(encode_temperature(temperature));
        Self((temp << 9) | ((until_minutes / 5) & 0x1FF))
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub fn temperature(self) -> f32 {
        f32::from(self.0 >> 9) / 2.0
    }

    pub fn until_minutes(self) -> u16 {
        (self.0 & 0x1FF) * 5
    }
}

// ═══════════════════════════════════════════════════════════════
//  Dates and times
// ═══════════════════════════════════════════════════════════════

/// Three-byte "until" date carried by temporary-mode reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UntilDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl UntilDate {
    pub fn decode(bytes: [u8; 3]) -> Self {
        let chunks = bytes[2] & 0x3F;
        Self {
            day: bytes[0] & 0x1F,
            month: ((bytes[0] & 0xE0) >> 4) | (bytes[1] >> 7),
            year: u16::from(bytes[1] & 0x3F) + 2000,
            hour: chunks / 2,
            minute: if chunks % 2 == 1 { 30 } else { 0 },
        }
    }

    pub fn encode(&self) -> [u8; 3] {
        let chunks = self.hour * 2 + u8::from(self.minute >= 30);
        [
            (self.day & 0x1F) | ((self.month & 0x0E) << 4),
            ((self.month & 0x01) << 7) | ((self.year.saturating_sub(2000) as u8) & 0x3F),
            chunks & 0x3F,
        ]
    }
}

impl fmt::Display for UntilDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}.{:02}.{} {:02}:{:02}",
            self.day, self.month, self.year, self.hour, self.minute
        )
    }
}

/// Local civil time as sent in time-information frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl WallTime {
    /// Five-byte time-information payload.  The month is split across the
    /// spare top bits of the minute and second bytes.
    pub fn encode(&self) -> [u8; 5] {
        [
            self.year.saturating_sub(2000) as u8,
            self.day,
            self.hour,
            (self.minute & 0x3F) | ((self.month & 0x0C) << 4),
            (self.second & 0x3F) | ((self.month & 0x03) << 6),
        ]
    }

    pub fn decode(bytes: [u8; 5]) -> Self {
        Self {
            year: u16::from(bytes[0]) + 2000,
            day: bytes[1],
            hour: bytes[2],
            minute: bytes[3] & 0x3F,
            second: bytes[4] & 0x3F,
            month: ((bytes[3] & 0xC0) >> 4) | (bytes[4] >> 6),
        }
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

// ═══════════════════════════════════════════════════════════════
//  Status bits and signal quality
// ═══════════════════════════════════════════════════════════════

/// Flag byte shared by thermostat state, wall thermostat state and acks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    pub mode: Mode,
    /// Automatic daylight-saving switch enabled.
    pub dst_auto: bool,
    pub gateway_known: bool,
    /// Buttons on the device are locked.
    pub panel_locked: bool,
    pub rf_error: bool,
    pub low_battery: bool,
}

impl StatusFlags {
    pub fn from_byte(raw: u8) -> Self {
        Self {
            mode: Mode::from_bits(raw),
            dst_auto: raw & 0x08 != 0,
            gateway_known: raw & 0x10 != 0,
            panel_locked: raw & 0x20 != 0,
            rf_error: raw & 0x40 != 0,
            low_battery: raw & 0x80 != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        self.mode.bits()
            | u8::from(self.dst_auto) << 3
            | u8::from(self.gateway_known) << 4
            | u8::from(self.panel_locked) << 5
            | u8::from(self.rf_error) << 6
            | u8::from(self.low_battery) << 7
    }
}

/// Transceiver RSSI byte to dBm.
pub fn decode_rssi(raw: u8) -> i16 {
    let raw = i16::from(raw);
    if raw >= 128 {
        (raw - 256) / 2 - 74
    } else {
        raw / 2 - 74
    }
}
