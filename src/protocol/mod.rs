//! MAX! radio protocol codec.
//!
//! ```text
//! ┌────────┬────────┬───────┬─────────┬───────┬───────┬───────┬───────────┬──────┬─────┐
//! │ length │ msgcnt │ flags │ command │ src 3 │ dst 3 │ group │ payload   │ RSSI │ LQI │
//! │ 1 B    │ 1 B    │ 1 B   │ 1 B     │       │       │ 1 B   │ 0..27 B   │ rx only    │
//! └────────┴────────┴───────┴─────────┴───────┴───────┴───────┴───────────┴──────┴─────┘
//! ```
//!
//! `length` counts every byte after itself up to the end of the payload.
//! The two trailing bytes are appended by the transceiver on receipt and
//! are not part of the logical message.
//!
//! Layers, leaves first:
//!
//! - [`fields`]: bit-packed field encoders/decoders (temperatures,
//!   schedule words, dates, signal strength).
//! - [`command`]: command codes.
//! - [`frame`]: header layout, the length plausibility check, encode.
//! - [`message`]: per-command payload decoders and outbound builders.

pub mod command;
pub mod fields;
pub mod frame;
pub mod message;

pub use command::Command;
pub use frame::{Address, Frame, ReceivedFrame};
