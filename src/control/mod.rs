//! Burner control.

pub mod heating;

pub use heating::{HeatingDemand, HeatingPolicy};
