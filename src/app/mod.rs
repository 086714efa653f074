//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the gateway's orchestration: the inbound dispatcher,
//! operator command handling and the control-loop tick.  All interaction
//! with the radio, the burner relay, the message bus, the clock and
//! storage happens through **port traits** defined in [`ports`], so this
//! layer runs unchanged against mock adapters.

pub mod commands;
mod dispatch;
mod operator;
pub mod ports;
pub mod reports;
pub mod service;

pub use service::{Gateway, LoopAction};
