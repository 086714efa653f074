//! Unified error types for the gateway core.
//!
//! Every fallible layer has its own small enum so the control loop can
//! decide per category whether to drop, log, or retry.  None of these
//! is ever fatal: the tick logs and carries on.

use core::fmt;

use crate::protocol::Command;

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

/// A raw radio frame failed the length plausibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than a header plus the two trailing quality bytes.
    TooShort { received: usize },
    /// The length byte disagrees with the number of bytes received.
    LengthMismatch { declared: u8, received: usize },
    /// The frame does not fit the transmit buffer.
    TooLong { payload: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { received } => write!(f, "frame too short ({received} bytes)"),
            Self::LengthMismatch { declared, received } => {
                write!(f, "length byte {declared} does not match {received} received bytes")
            }
            Self::TooLong { payload } => write!(f, "payload of {payload} bytes too long"),
        }
    }
}

impl std::error::Error for FrameError {}

// ---------------------------------------------------------------------------
// Payload errors
// ---------------------------------------------------------------------------

/// A command payload was shorter than its fixed fields require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    TooShort {
        command: Command,
        needed: usize,
        actual: usize,
    },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort {
                command,
                needed,
                actual,
            } => write!(f, "{command} payload needs {needed} bytes, got {actual}"),
        }
    }
}

impl std::error::Error for PayloadError {}

// ---------------------------------------------------------------------------
// Operator command errors
// ---------------------------------------------------------------------------

/// An operator message on the bus could not be turned into an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Topic is outside the gateway namespace or has no handler.
    UnknownTopic,
    /// Payload was not a valid JSON object of the expected shape.
    Malformed(String),
    /// An address was not exactly six hex digits.
    InvalidAddress,
    /// A weekday name was not recognised.
    InvalidDay,
    /// A schedule key was not `HH:MM` within one day.
    InvalidTime,
    /// No device carries the given name.
    UnknownDevice,
    /// A device name was blank or not usable as a single topic level.
    InvalidName,
    /// Another device already carries the requested name.
    NameTaken,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTopic => write!(f, "unknown topic"),
            Self::Malformed(msg) => write!(f, "malformed payload: {msg}"),
            Self::InvalidAddress => write!(f, "address must be 6 hex digits"),
            Self::InvalidDay => write!(f, "unknown weekday"),
            Self::InvalidTime => write!(f, "schedule time must be HH:MM"),
            Self::UnknownDevice => write!(f, "no such device"),
            Self::InvalidName => write!(f, "name must be a non-empty topic level"),
            Self::NameTaken => write!(f, "name already in use"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health faults
// ---------------------------------------------------------------------------

/// Faults raised by the supervisor.  Accumulated in a bitmask so both can
/// be reported in the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HealthFault {
    /// No frame has been received for the silence window.
    RadioSilent = 0b0000_0001,
    /// Uptime passed the forced-restart bound.
    UptimeExceeded = 0b0000_0010,
}

impl HealthFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for HealthFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RadioSilent => write!(f, "radio silent"),
            Self::UptimeExceeded => write!(f, "uptime exceeded"),
        }
    }
}
