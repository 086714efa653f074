//! Port traits: the hexagonal boundary between the gateway core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Gateway (domain)
//! ```
//!
//! The radio, the burner relay, the message bus, the clock and persistent
//! storage are all reached through these traits.  The
//! [`Gateway`](super::service::Gateway) consumes them via generics, so the
//! core never touches hardware or the network directly.

use crate::config::PersistedState;
use crate::intake::RawFrame;
use crate::protocol::fields::WallTime;

use super::reports::{DeviceReport, GatewayStatus};

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain ↔ transceiver)
// ───────────────────────────────────────────────────────────────

/// The 868 MHz transceiver.  FIFO handling, calibration and recovery from
/// RX overflow / TX underflow all live behind this trait.
pub trait RadioPort {
    /// Put `bytes` on air.  With `long_preamble` the transceiver sends the
    /// extended wake-up preamble first; the call blocks until done.
    fn transmit(&mut self, bytes: &[u8], long_preamble: bool);

    /// Fetch one received frame, trailing RSSI/LQI bytes included.
    fn receive(&mut self) -> Option<RawFrame>;

    /// Reset and reinitialise the transceiver, then return to receive.
    fn reinit(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → burner)
// ───────────────────────────────────────────────────────────────

pub trait RelayPort {
    fn set_burner(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Bus port (driven adapter: domain → message bus)
// ───────────────────────────────────────────────────────────────

/// Structured payloads the gateway publishes.  Encoding them is the
/// adapter's job.
#[derive(Debug, Clone, Copy)]
pub enum Publication<'a> {
    Device(&'a DeviceReport),
    Status(&'a GatewayStatus),
    /// Free-text notice, e.g. radio re-initialisation.
    Notice(&'a str),
}

/// Publish/subscribe transport.  Inbound messages are delivered to
/// [`Gateway::handle_bus_message`](super::service::Gateway::handle_bus_message)
/// by the embedding binary.
pub trait BusPort {
    /// Fire-and-forget publish.  Returns whether the transport accepted it.
    fn publish(&mut self, topic: &str, message: Publication<'_>, retain: bool) -> bool;

    fn subscribe(&mut self, topic: &str);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&self) -> u64;

    /// Local civil time, or `None` until synchronised.
    fn wall_time(&self) -> Option<WallTime>;

    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent storage)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the device registry and gateway identity.
///
/// Implementations MUST validate before persisting and reject invalid
/// state with [`ConfigError::ValidationFailed`].
pub trait ConfigPort {
    /// Returns [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<PersistedState, ConfigError>;

    fn save(&self, state: &PersistedState) -> Result<(), ConfigError>;

    /// Remove everything stored.  Succeeds when nothing was stored.
    fn erase(&self) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Nothing stored yet (first boot).
    NotFound,
    /// Stored state failed deserialisation.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
