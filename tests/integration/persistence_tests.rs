//! Integration tests for boot, debounced saving and restart persistence.

use crate::mock_hw::{
    BrokenStore, GW, MockClock, MockHardware, STRANGER, VALVE, deliver, mock_bus, thermostat_state,
};

use maxgate::adapters::flash::FlashConfigStore;
use maxgate::app::ports::{ConfigError, ConfigPort};
use maxgate::app::{Gateway, LoopAction};
use maxgate::config::{GatewayConfig, PersistedState};
use maxgate::intake::IntakeQueue;
use maxgate::protocol::{Command, Frame};
use maxgate::registry::DeviceConfig;

fn stored_office() -> FlashConfigStore {
    let mut state = PersistedState::new(GW, true);
    let mut office = DeviceConfig::new(VALVE);
    office.name = "office".into();
    office.room = "Office".into();
    state.devices.push(office);

    let store = FlashConfigStore::new();
    store.save(&state).unwrap();
    store
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_restores_stored_registry() {
    let store = stored_office();
    let mut gw = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();

    assert_eq!(gw.registry().len(), 1);
    let office = gw.registry().find_by_name("office").unwrap();
    assert_eq!(office.address(), VALVE);
    assert_eq!(office.room(), "Office");
    assert!(office.state.last_seen_ms.is_none(), "live state is never persisted");
    assert!(!gw.registry().is_changed());

    let mut bus = mock_bus();
    gw.start(&mut MockHardware::new(), &mut bus, &MockClock::at(0));
    assert!(bus.transport().subscriptions.iter().any(|s| s == "max/office/set"));
}

#[test]
fn boot_survives_blob_copied_off_the_medium() {
    let original = stored_office();
    let copy = FlashConfigStore::from_blob(original.blob().unwrap());

    let gw = Gateway::boot(GatewayConfig::default(), &copy, &MockClock::at(0)).unwrap();
    assert!(gw.registry().find_by_address(VALVE).is_some());
}

#[test]
fn first_boot_starts_empty() {
    let store = FlashConfigStore::new();
    let gw = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();

    assert!(gw.registry().is_empty());
    assert_eq!(gw.address(), GW);
    assert!(gw.autocreate());
}

#[test]
fn corrupted_blob_falls_back_to_defaults() {
    let store = FlashConfigStore::from_blob(vec![0xFF, 0xFF, 0xFF]);
    let gw = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();

    assert!(gw.registry().is_empty());
}

#[test]
fn storage_failure_aborts_boot() {
    let store = BrokenStore::new();
    let result = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0));
    assert!(result.is_err(), "I/O errors are not silently replaced by defaults");

    let store = BrokenStore {
        load_error: || ConfigError::NotFound,
        ..BrokenStore::new()
    };
    assert!(Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).is_ok());
}

#[test]
fn invalid_tunables_abort_boot() {
    let config = GatewayConfig {
        namespace: String::new(),
        ..GatewayConfig::default()
    };
    let err = Gateway::boot(config, &FlashConfigStore::new(), &MockClock::at(0))
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("namespace"), "context chain: {err:#}");
}

// ── Debounced saving ──────────────────────────────────────────

#[test]
fn new_device_saved_after_debounce_window() {
    let store = FlashConfigStore::new();
    let mut gw = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();
    let mut hw = MockHardware::new();
    let mut bus = mock_bus();
    let mut queue = IntakeQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let mut clock = MockClock::at(1_000);

    deliver(&mut producer, &thermostat_state(1, STRANGER, 0x01, 20, 40, 200));
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    assert!(gw.registry().is_changed());
    assert!(matches!(store.load(), Err(ConfigError::NotFound)));

    clock.now_ms = 60_999;
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    assert!(store.load().is_err(), "still inside the debounce window");

    clock.now_ms = 61_000;
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    let saved = store.load().unwrap();
    assert_eq!(saved.devices.len(), 1);
    assert_eq!(saved.devices[0].address, STRANGER);
    assert!(!gw.registry().is_changed());
}

#[test]
fn live_state_alone_never_triggers_a_save() {
    let store = stored_office();
    let mut gw = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();
    store.erase().unwrap();

    let mut hw = MockHardware::new();
    let mut bus = mock_bus();
    let mut queue = IntakeQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let mut clock = MockClock::at(1_000);

    // A push button only touches live state.
    let press = Frame::new(1, Command::PushButtonState, VALVE, GW)
        .with_payload(&[0x00, 0x01])
        .unwrap();
    deliver(&mut producer, &press);
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);

    clock.now_ms = 120_000;
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    assert!(matches!(store.load(), Err(ConfigError::NotFound)));
}

#[test]
fn failed_save_retried_after_another_window() {
    let store = BrokenStore {
        load_error: || ConfigError::NotFound,
        ..BrokenStore::new()
    };
    let mut gw = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();
    let mut hw = MockHardware::new();
    let mut bus = mock_bus();
    let mut queue = IntakeQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let mut clock = MockClock::at(0);

    deliver(&mut producer, &thermostat_state(1, STRANGER, 0x01, 20, 40, 200));
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);

    clock.now_ms = 60_000;
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    assert_eq!(store.save_attempts.get(), 1);
    assert!(gw.registry().is_changed(), "still dirty after a failed save");

    clock.now_ms = 119_999;
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    assert_eq!(store.save_attempts.get(), 1);

    clock.now_ms = 120_000;
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    assert_eq!(store.save_attempts.get(), 2);
}

#[test]
fn blank_name_cannot_block_later_saves() {
    let store = stored_office();
    let mut gw = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();
    let mut bus = mock_bus();
    gw.handle_bus_message("max/rename", br#"{"address": "0A0B0C", "to": ""}"#, &mut bus, &store);
    assert_eq!(gw.registry().find_by_address(VALVE).map(|d| d.name()), Some("office"));

    let mut hw = MockHardware::new();
    let mut queue = IntakeQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let mut clock = MockClock::at(1_000);
    deliver(&mut producer, &thermostat_state(1, STRANGER, 0x01, 20, 40, 200));
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);

    clock.now_ms = 61_000;
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    assert_eq!(store.load().unwrap().devices.len(), 2);
    assert!(!gw.registry().is_changed());
}

#[test]
fn unnamed_record_named_after_its_address_on_receipt() {
    let mut state = PersistedState::new(GW, false);
    state.devices.push(DeviceConfig {
        name: String::new(),
        ..DeviceConfig::new(VALVE)
    });
    let store = FlashConfigStore::new();
    let mut gw = Gateway::new(GatewayConfig::default(), state, 0);
    let mut hw = MockHardware::new();
    let mut bus = mock_bus();
    let mut queue = IntakeQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let mut clock = MockClock::at(1_000);

    deliver(&mut producer, &thermostat_state(1, VALVE, 0x01, 20, 40, 200));
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);

    assert_eq!(gw.registry().find_by_address(VALVE).map(|d| d.name()), Some("0A0B0C"));
    assert!(gw.registry().is_changed());
    assert_eq!(bus.transport().to("max/0A0B0C").len(), 1);
    assert!(bus.transport().to("max/").is_empty());

    clock.now_ms = 61_000;
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    assert_eq!(store.load().unwrap().devices[0].name, "0A0B0C");
}

#[test]
fn restart_saves_pending_changes_immediately() {
    let store = FlashConfigStore::new();
    let mut gw = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();
    let mut hw = MockHardware::new();
    let mut bus = mock_bus();
    let mut queue = IntakeQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let mut clock = MockClock::at(1_000);

    deliver(&mut producer, &thermostat_state(1, STRANGER, 0x01, 20, 40, 200));
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);
    gw.handle_bus_message("max/reset", b"", &mut bus, &store);

    clock.advance(10);
    assert_eq!(
        gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store),
        LoopAction::Restart
    );
    assert_eq!(store.load().unwrap().devices.len(), 1, "saved without waiting for the window");
}

#[test]
fn saved_state_round_trips_through_a_restart() {
    let store = FlashConfigStore::new();
    let mut gw = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();
    let mut bus = mock_bus();

    let mut hw = MockHardware::new();
    let mut queue = IntakeQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let mut clock = MockClock::at(1_000);
    deliver(&mut producer, &thermostat_state(1, STRANGER, 0x01, 20, 40, 200));
    gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store);

    gw.handle_bus_message("max/rename", br#"{"address": "2A2B2C", "to": "bedroom"}"#, &mut bus, &store);
    gw.handle_bus_message(
        "max/bedroom/set",
        br#"{"room": "Bedroom", "day": "sunday", "schedule": {"08:00": 18.0, "24:00": 20.5}}"#,
        &mut bus,
        &store,
    );
    gw.handle_bus_message("max/set", br#"{"autocreate": false}"#, &mut bus, &store);
    gw.handle_bus_message("max/reset", b"", &mut bus, &store);
    assert_eq!(
        gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store),
        LoopAction::Restart
    );

    let reborn = Gateway::boot(GatewayConfig::default(), &store, &MockClock::at(0)).unwrap();
    assert!(!reborn.autocreate());
    assert_eq!(reborn.persisted_state(), gw.persisted_state());
    let bedroom = reborn.registry().find_by_name("bedroom").unwrap();
    assert_eq!(bedroom.room(), "Bedroom");
    assert_eq!(bedroom.config.schedule[1].len(), 2);
}
