//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements  | Connects to                     |
//! |------------|-------------|---------------------------------|
//! | `clock`    | ClockPort   | `Instant` + local wall clock    |
//! | `flash`    | ConfigPort  | postcard blob in a flash region |
//! | `json_bus` | BusPort     | MQTT client via `BusTransport`  |
//! | `relay`    | RelayPort   | `embedded-hal` output pin       |
//!
//! The radio adapter lives with the transceiver driver in the embedding
//! binary; it only has to implement [`RadioPort`](crate::app::ports::RadioPort).

pub mod clock;
pub mod flash;
pub mod json_bus;
pub mod relay;
