//! Command codes of the radio protocol.

use core::fmt;

/// Every command byte the gateway knows about.  Anything else decodes to
/// [`Command::Other`] and is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    PairPing,
    PairPong,
    Ack,
    TimeInformation,
    ConfigWeekProfile,
    /// Comfort / eco / max / min / window-open thresholds.
    ConfigTemperatures,
    ConfigValve,
    AddLinkPartner,
    RemoveLinkPartner,
    SetGroupId,
    RemoveGroupId,
    ShutterContactState,
    /// Sent to a thermostat; also sent by wall thermostats and the cube.
    SetTemperature,
    /// Sent by a wall thermostat to its paired valves.
    WallThermostatControl,
    SetComfortTemperature,
    SetEcoTemperature,
    PushButtonState,
    /// Reported by a heating thermostat (radiator valve).
    ThermostatState,
    WallThermostatState,
    SetDisplayActualTemperature,
    Reset,
    WakeUp,
    Other(u8),
}

impl Command {
    /// Decode a command byte.
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::PairPing,
            0x01 => Self::PairPong,
            0x02 => Self::Ack,
            0x03 => Self::TimeInformation,
            0x10 => Self::ConfigWeekProfile,
            0x11 => Self::ConfigTemperatures,
            0x12 => Self::ConfigValve,
            0x20 => Self::AddLinkPartner,
            0x21 => Self::RemoveLinkPartner,
            0x22 => Self::SetGroupId,
            0x23 => Self::RemoveGroupId,
            0x30 => Self::ShutterContactState,
            0x40 => Self::SetTemperature,
            0x42 => Self::WallThermostatControl,
            0x43 => Self::SetComfortTemperature,
            0x44 => Self::SetEcoTemperature,
            0x50 => Self::PushButtonState,
            0x60 => Self::ThermostatState,
            0x70 => Self::WallThermostatState,
            0x82 => Self::SetDisplayActualTemperature,
            0xF0 => Self::Reset,
            0xF1 => Self::WakeUp,
            other => Self::Other(other),
        }
    }

    /// The wire byte for this command.
    pub const fn code(self) -> u8 {
        match self {
            Self::PairPing => 0x00,
            Self::PairPong => 0x01,
            Self::Ack => 0x02,
            Self::TimeInformation => 0x03,
            Self::ConfigWeekProfile => 0x10,
            Self::ConfigTemperatures => 0x11,
            Self::ConfigValve => 0x12,
            Self::AddLinkPartner => 0x20,
            Self::RemoveLinkPartner => 0x21,
            Self::SetGroupId => 0x22,
            Self::RemoveGroupId => 0x23,
            Self::ShutterContactState => 0x30,
            Self::SetTemperature => 0x40,
            Self::WallThermostatControl => 0x42,
            Self::SetComfortTemperature => 0x43,
            Self::SetEcoTemperature => 0x44,
            Self::PushButtonState => 0x50,
            Self::ThermostatState => 0x60,
            Self::WallThermostatState => 0x70,
            Self::SetDisplayActualTemperature => 0x82,
            Self::Reset => 0xF0,
            Self::WakeUp => 0xF1,
            Self::Other(code) => code,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::PairPing => "PairPing",
            Self::PairPong => "PairPong",
            Self::Ack => "Ack",
            Self::TimeInformation => "TimeInformation",
            Self::ConfigWeekProfile => "ConfigWeekProfile",
            Self::ConfigTemperatures => "ConfigTemperatures",
            Self::ConfigValve => "ConfigValve",
            Self::AddLinkPartner => "AddLinkPartner",
            Self::RemoveLinkPartner => "RemoveLinkPartner",
            Self::SetGroupId => "SetGroupId",
            Self::RemoveGroupId => "RemoveGroupId",
            Self::ShutterContactState => "ShutterContactState",
            Self::SetTemperature => "SetTemperature",
            Self::WallThermostatControl => "WallThermostatControl",
            Self::SetComfortTemperature => "SetComfortTemperature",
            Self::SetEcoTemperature => "SetEcoTemperature",
            Self::PushButtonState => "PushButtonState",
            Self::ThermostatState => "ThermostatState",
            Self::WallThermostatState => "WallThermostatState",
            Self::SetDisplayActualTemperature => "SetDisplayActualTemperature",
            Self::Reset => "Reset",
            Self::WakeUp => "WakeUp",
            Self::Other(_) => "Other",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "Other(0x{code:02X})"),
            known => f.write_str(known.name()),
        }
    }
}
