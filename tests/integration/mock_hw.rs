//! Mock adapters for integration tests.
//!
//! Records every radio, relay, bus and storage call so tests can assert on
//! the full history without a transceiver, a broker or flash.

use std::cell::Cell;
use std::collections::VecDeque;

use maxgate::adapters::json_bus::{BusTransport, JsonBus};
use maxgate::app::ports::{ClockPort, ConfigError, ConfigPort, RadioPort, RelayPort};
use maxgate::config::PersistedState;
use maxgate::intake::{IntakeProducer, RawFrame, raw_frame};
use maxgate::protocol::fields::WallTime;
use maxgate::protocol::{Address, Command, Frame};

pub const GW: Address = Address::new(0x12, 0x34, 0x56);
pub const VALVE: Address = Address::new(0x0A, 0x0B, 0x0C);
pub const WALL: Address = Address::new(0x1A, 0x1B, 0x1C);
pub const STRANGER: Address = Address::new(0x2A, 0x2B, 0x2C);
pub const BROADCAST: Address = Address::new(0, 0, 0);

// ── Radio + relay ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    pub bytes: Vec<u8>,
    pub long_preamble: bool,
}

impl Transmission {
    pub fn frame(&self) -> Frame {
        Frame::decode(&self.bytes)
    }
}

pub struct MockHardware {
    pub transmitted: Vec<Transmission>,
    pub inbox: VecDeque<RawFrame>,
    pub reinit_count: u32,
    pub burner_calls: Vec<bool>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            transmitted: Vec::new(),
            inbox: VecDeque::new(),
            reinit_count: 0,
            burner_calls: Vec::new(),
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.transmitted.iter().map(|t| t.frame().command).collect()
    }

    pub fn burner_on(&self) -> bool {
        self.burner_calls.last().copied().unwrap_or(false)
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioPort for MockHardware {
    fn transmit(&mut self, bytes: &[u8], long_preamble: bool) {
        self.transmitted.push(Transmission {
            bytes: bytes.to_vec(),
            long_preamble,
        });
    }

    fn receive(&mut self) -> Option<RawFrame> {
        self.inbox.pop_front()
    }

    fn reinit(&mut self) {
        self.reinit_count += 1;
    }
}

impl RelayPort for MockHardware {
    fn set_burner(&mut self, on: bool) {
        self.burner_calls.push(on);
    }
}

// ── Message bus ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

pub struct MockTransport {
    pub published: Vec<Published>,
    pub subscriptions: Vec<String>,
    /// When false every publish is refused, as with a disconnected client.
    pub online: bool,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn to(&self, topic: &str) -> Vec<&Published> {
        self.published.iter().filter(|p| p.topic == topic).collect()
    }

    pub fn clear(&mut self) {
        self.published.clear();
    }
}

impl BusTransport for MockTransport {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> bool {
        if !self.online {
            return false;
        }
        self.published.push(Published {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
            retain,
        });
        true
    }

    fn subscribe(&mut self, topic: &str) {
        self.subscriptions.push(topic.to_owned());
    }
}

pub type MockBus = JsonBus<MockTransport>;

pub fn mock_bus() -> MockBus {
    JsonBus::new(MockTransport {
        published: Vec::new(),
        subscriptions: Vec::new(),
        online: true,
    })
}

// ── Clock ─────────────────────────────────────────────────────

pub struct MockClock {
    pub now_ms: u64,
    pub wall: Option<WallTime>,
    pub delays: Vec<u32>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now_ms,
            wall: None,
            delays: Vec::new(),
        }
    }

    pub fn synced(now_ms: u64) -> Self {
        Self {
            wall: Some(WallTime {
                year: 2024,
                month: 11,
                day: 3,
                hour: 7,
                minute: 45,
                second: 12,
            }),
            ..Self::at(now_ms)
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }
}

impl ClockPort for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn wall_time(&self) -> Option<WallTime> {
        self.wall
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }
}

// ── Storage that always fails ─────────────────────────────────

/// Loads return `load_error`; saves fail with an I/O error and are counted.
pub struct BrokenStore {
    pub load_error: fn() -> ConfigError,
    pub save_attempts: Cell<u32>,
}

#[allow(dead_code)]
impl BrokenStore {
    pub fn new() -> Self {
        Self {
            load_error: || ConfigError::IoError,
            save_attempts: Cell::new(0),
        }
    }
}

impl ConfigPort for BrokenStore {
    fn load(&self) -> Result<PersistedState, ConfigError> {
        Err((self.load_error)())
    }

    fn save(&self, _state: &PersistedState) -> Result<(), ConfigError> {
        self.save_attempts.set(self.save_attempts.get() + 1);
        Err(ConfigError::IoError)
    }

    fn erase(&self) -> Result<(), ConfigError> {
        Err(ConfigError::IoError)
    }
}

// ── Inbound frames ────────────────────────────────────────────

/// Radio output for `frame`: encoded bytes plus RSSI and LQI.
pub fn on_air(frame: &Frame) -> RawFrame {
    let mut bytes = frame.encode().to_vec();
    bytes.extend_from_slice(&[0x40, 0x30]);
    raw_frame(&bytes).unwrap_or_default()
}

/// Hand a frame to the control loop the way the receive interrupt does.
pub fn deliver(producer: &mut IntakeProducer<'_>, frame: &Frame) {
    assert!(producer.enqueue(on_air(frame)).is_ok(), "intake ring full");
}

/// Thermostat state report: `[flags, valve, desired, measured_hi, measured_lo]`.
#[allow(dead_code)]
pub fn thermostat_state(counter: u8, from: Address, flags: u8, valve: u8, desired_half: u8, measured_tenths: u16) -> Frame {
    Frame::new(counter, Command::ThermostatState, from, GW)
        .with_payload(&[
            flags,
            valve,
            desired_half,
            (measured_tenths >> 8) as u8,
            measured_tenths as u8,
        ])
        .unwrap()
}
