//! MAX! heating gateway library.
//!
//! Speaks the 868 MHz MAX! radio protocol to radiator and wall thermostats,
//! keeps a registry of paired devices, meters outbound airtime against the
//! duty-cycle budget and switches the burner relay.  Hardware, the message
//! bus and storage sit behind the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod intake;
pub mod outbound;
pub mod protocol;
pub mod registry;
pub mod scheduler;
pub mod supervisor;
