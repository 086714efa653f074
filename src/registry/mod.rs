//! Device registry.
//!
//! Records are keyed by hardware address and created on first sight when
//! the caller allows it.  Nothing is ever evicted; callers use the
//! freshness of each reading instead.  Any configuration change raises the
//! `changed` flag so the persistence layer knows to rewrite storage.

pub mod device;

use log::info;

use crate::protocol::fields::DeviceKind;
use crate::protocol::Address;

pub use device::{is_fresh, DeviceConfig, DeviceRecord, LiveState, Reading, WeekSchedule};

/// Result of resolving the sender of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Known(usize),
    Created(usize),
    /// Unknown sender and creation not allowed.
    Rejected,
}

impl Upsert {
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Known(i) | Self::Created(i) => Some(i),
            Self::Rejected => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    devices: Vec<DeviceRecord>,
    changed: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted configuration.  Duplicate addresses keep the
    /// first entry.
    pub fn from_configs(configs: Vec<DeviceConfig>) -> Self {
        let mut registry = Self::new();
        for config in configs {
            if registry.position(config.address).is_none() {
                registry.devices.push(DeviceRecord::from_config(config));
            }
        }
        registry
    }

    pub fn configs(&self) -> Vec<DeviceConfig> {
        self.devices.iter().map(|d| d.config.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.iter()
    }

    pub fn get(&self, index: usize) -> Option<&DeviceRecord> {
        self.devices.get(index)
    }

    // ── Lookups ──────────────────────────────────────────────────

    pub fn position(&self, address: Address) -> Option<usize> {
        self.devices.iter().position(|d| d.address() == address)
    }

    pub fn find_by_address(&self, address: Address) -> Option<&DeviceRecord> {
        self.position(address).map(|i| &self.devices[i])
    }

    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.name() == name)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&DeviceRecord> {
        self.position_by_name(name).map(|i| &self.devices[i])
    }

    /// First device of `kind` in `room`.  An empty room matches nothing.
    pub fn position_by_room_and_kind(&self, room: &str, kind: DeviceKind) -> Option<usize> {
        if room.is_empty() {
            return None;
        }
        self.devices
            .iter()
            .position(|d| d.room() == room && d.kind() == Some(kind))
    }

    pub fn find_by_room_and_kind(&self, room: &str, kind: DeviceKind) -> Option<&DeviceRecord> {
        self.position_by_room_and_kind(room, kind)
            .map(|i| &self.devices[i])
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Resolve the sender of a frame, creating a record when allowed.
    pub fn upsert_on_receipt(&mut self, address: Address, allow_create: bool) -> Upsert {
        if let Some(i) = self.position(address) {
            return Upsert::Known(i);
        }
        if !allow_create {
            return Upsert::Rejected;
        }
        self.devices.push(DeviceRecord::new(address));
        self.changed = true;
        info!("Registry: created device {}", address);
        Upsert::Created(self.devices.len() - 1)
    }

    /// Run a mutation against one record.  `f` returns whether persisted
    /// configuration changed; if so the registry's flag is raised.
    pub fn apply(&mut self, index: usize, f: impl FnOnce(&mut DeviceRecord) -> bool) -> Option<bool> {
        let record = self.devices.get_mut(index)?;
        let changed = f(record);
        if changed {
            self.changed = true;
        }
        Some(changed)
    }

    /// Mutation of live state only; never raises the flag.
    pub fn update_state(&mut self, index: usize, f: impl FnOnce(&mut DeviceRecord)) {
        if let Some(record) = self.devices.get_mut(index) {
            f(record);
        }
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut DeviceRecord> {
        self.devices.iter_mut()
    }

    // ── Change flag ──────────────────────────────────────────────

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
    }
}
