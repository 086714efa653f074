//! Integration tests for operator commands arriving over the bus.

use crate::mock_hw::{GW, MockBus, MockClock, MockHardware, VALVE, WALL, mock_bus};

use maxgate::adapters::flash::FlashConfigStore;
use maxgate::app::ports::ConfigPort;
use maxgate::app::{Gateway, LoopAction};
use maxgate::config::{GatewayConfig, PersistedState};
use maxgate::intake::IntakeQueue;
use maxgate::protocol::fields::{DeviceKind, Mode, Weekday, encode_mode_temperature};
use maxgate::protocol::frame::FLAG_GROUP;
use maxgate::protocol::{Address, Command};
use maxgate::registry::DeviceConfig;

fn two_rooms() -> PersistedState {
    let mut state = PersistedState::new(GW, false);

    let mut office = DeviceConfig::new(VALVE);
    office.name = "office".into();
    office.room = "Office".into();
    office.kind = Some(DeviceKind::HeatingThermostat);
    state.devices.push(office);

    let mut hallway = DeviceConfig::new(WALL);
    hallway.name = "hallway".into();
    hallway.room = "Hall".into();
    hallway.kind = Some(DeviceKind::WallThermostat);
    state.devices.push(hallway);

    state
}

fn make_gateway() -> (Gateway, MockBus, FlashConfigStore) {
    let mut gw = Gateway::new(GatewayConfig::default(), two_rooms(), 0);
    let mut bus = mock_bus();
    gw.start(&mut MockHardware::new(), &mut bus, &MockClock::at(0));
    bus.transport_mut().clear();
    (gw, bus, FlashConfigStore::new())
}

fn queued(gw: &Gateway) -> Vec<Command> {
    gw.outbound().iter().map(|m| m.frame.command).collect()
}

// ── Rename ────────────────────────────────────────────────────

#[test]
fn rename_moves_device_to_new_topic() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message(
        "max/rename",
        br#"{"address": "0a0b0c", "to": "kitchen"}"#,
        &mut bus,
        &store,
    );

    assert_eq!(gw.registry().find_by_name("kitchen").map(|d| d.address()), Some(VALVE));
    assert!(gw.registry().find_by_name("office").is_none());
    assert!(gw.registry().is_changed(), "rename is persisted");
    assert!(bus.transport().subscriptions.iter().any(|s| s == "max/kitchen/set"));

    gw.handle_bus_message("max/kitchen/set", br#"{"temperature": 20.0}"#, &mut bus, &store);
    assert_eq!(queued(&gw), vec![Command::SetTemperature]);
}

#[test]
fn rename_of_unknown_address_changes_nothing() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/rename", br#"{"address": "FFFFFF", "to": "x"}"#, &mut bus, &store);
    gw.handle_bus_message("max/rename", br#"{"address": "nothex", "to": "x"}"#, &mut bus, &store);

    assert!(gw.registry().find_by_name("x").is_none());
    assert!(!gw.registry().is_changed());
    assert!(!bus.transport().subscriptions.iter().any(|s| s == "max/x/set"));
}

#[test]
fn rename_to_blank_or_wildcard_name_rejected() {
    let (mut gw, mut bus, store) = make_gateway();
    let subscribed = bus.transport().subscriptions.len();

    for to in ["", "   ", "a/b", "room+", "#"] {
        let payload = format!(r#"{{"address": "0A0B0C", "to": "{to}"}}"#);
        gw.handle_bus_message("max/rename", payload.as_bytes(), &mut bus, &store);
    }

    assert_eq!(gw.registry().find_by_address(VALVE).map(|d| d.name()), Some("office"));
    assert!(!gw.registry().is_changed());
    assert_eq!(bus.transport().subscriptions.len(), subscribed);
}

#[test]
fn rename_to_name_of_another_device_rejected() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/rename", br#"{"address": "0A0B0C", "to": "hallway"}"#, &mut bus, &store);
    assert_eq!(gw.registry().find_by_address(VALVE).map(|d| d.name()), Some("office"));
    assert!(!gw.registry().is_changed());

    // Keeping its own name is a no-op, not a clash.
    gw.handle_bus_message("max/rename", br#"{"address": "0A0B0C", "to": "office"}"#, &mut bus, &store);
    assert!(!gw.registry().is_changed());

    gw.handle_bus_message("max/hallway/set", br#"{"display_actual_temperature": true}"#, &mut bus, &store);
    assert_eq!(
        gw.outbound().iter().map(|m| m.frame.dst).collect::<Vec<_>>(),
        vec![WALL],
        "the hallway topic still reaches the wall thermostat"
    );
}

// ── Gateway settings ──────────────────────────────────────────

#[test]
fn gateway_settings_match_topic_case_insensitively() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("MAX/Set", br#"{"autocreate": true, "pair": true}"#, &mut bus, &store);

    assert!(gw.autocreate());
    assert!(gw.pairing_enabled());
    let last = bus.transport().to("max").last().map(|p| p.payload.clone()).unwrap();
    assert!(last.contains(r#""pairing_enabled":true"#));
    assert!(last.contains(r#""autocreate":true"#));
}

#[test]
fn invalid_gateway_address_does_not_block_other_keys() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/set", br#"{"address": "12345", "pair": true}"#, &mut bus, &store);

    assert_eq!(gw.address(), GW);
    assert!(gw.pairing_enabled());
}

#[test]
fn gateway_address_change_is_persisted() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/set", br#"{"address": "abcdef"}"#, &mut bus, &store);

    assert_eq!(gw.address(), Address::new(0xAB, 0xCD, 0xEF));
    assert!(gw.registry().is_changed());
    assert_eq!(gw.persisted_state().address, Address::new(0xAB, 0xCD, 0xEF));
}

// ── Device settings ───────────────────────────────────────────

#[test]
fn temperature_and_mode_queue_set_temperature() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message(
        "max/office/set",
        br#"{"mode": "auto", "temperature": 22.5}"#,
        &mut bus,
        &store,
    );

    let head = &gw.outbound().head().unwrap().frame;
    assert_eq!(head.command, Command::SetTemperature);
    assert_eq!(head.dst, VALVE);
    assert_eq!(head.src, GW);
    assert_eq!(&head.payload[..], &[encode_mode_temperature(Mode::Auto, 22.5)]);
    assert!(head.flags & FLAG_GROUP == 0, "no group assigned");
}

#[test]
fn mode_without_known_temperature_is_skipped() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/office/set", br#"{"mode": "boost"}"#, &mut bus, &store);

    assert!(gw.outbound().is_empty());
}

#[test]
fn group_applies_to_following_temperature() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message(
        "max/office/set",
        br#"{"group": 3, "temperature": 21.0}"#,
        &mut bus,
        &store,
    );

    assert_eq!(queued(&gw), vec![Command::SetGroupId, Command::SetTemperature]);
    let set = &gw.outbound().iter().nth(1).unwrap().frame;
    assert_eq!(set.group, 3);
    assert!(set.flags & FLAG_GROUP != 0);
    assert_eq!(gw.registry().find_by_name("office").unwrap().config.group, 3);
}

#[test]
fn schedule_is_stored_sorted_and_sent() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message(
        "max/office/set",
        br#"{"day": "Monday", "schedule": {"6:30": 21.0, "22:00": 17.0, "24:00": 17.0}}"#,
        &mut bus,
        &store,
    );

    let office = gw.registry().find_by_name("office").unwrap();
    let monday = &office.config.schedule[usize::from(Weekday::Monday.index())];
    let times: Vec<u16> = monday.iter().map(|p| p.until_minutes()).collect();
    assert_eq!(times, vec![390, 1320, 1440]);

    let frame = &gw.outbound().head().unwrap().frame;
    assert_eq!(frame.command, Command::ConfigWeekProfile);
    assert_eq!(frame.payload[0], Weekday::Monday.index());
    assert_eq!(frame.payload.len(), 1 + 3 * 2);
    assert_eq!(&frame.payload[1..3], &monday[0].to_bytes());
}

#[test]
fn bad_schedule_time_skips_the_whole_message() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message(
        "max/office/set",
        br#"{"room": "Lounge", "temperature": 22.0, "day": "monday", "schedule": {"25:00": 20.0}}"#,
        &mut bus,
        &store,
    );

    assert!(gw.outbound().is_empty());
    assert_eq!(gw.registry().find_by_name("office").unwrap().room(), "Office");
    assert!(!gw.registry().is_changed());
}

#[test]
fn more_than_thirteen_breakpoints_rejected() {
    let (mut gw, mut bus, store) = make_gateway();

    let entries: Vec<String> = (0..14).map(|h| format!(r#""{h:02}:00": 20.0"#)).collect();
    let payload = format!(r#"{{"day": "friday", "schedule": {{{}}}}}"#, entries.join(", "));
    gw.handle_bus_message("max/office/set", payload.as_bytes(), &mut bus, &store);

    assert!(gw.outbound().is_empty());
    let office = gw.registry().find_by_name("office").unwrap();
    assert!(office.config.schedule.iter().all(Vec::is_empty));
}

#[test]
fn thresholds_merge_with_stored_values() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/office/set", br#"{"comfort_temperature": 22.0}"#, &mut bus, &store);

    let office = gw.registry().find_by_name("office").unwrap();
    assert_eq!(office.config.thresholds.comfort, 22.0);
    assert_eq!(office.config.thresholds.eco, 17.0, "untouched keys keep their value");

    let frame = &gw.outbound().head().unwrap().frame;
    assert_eq!(frame.command, Command::ConfigTemperatures);
    assert_eq!(&frame.payload[..], &[44, 34, 61, 9, 7, 9, 3]);
}

#[test]
fn valve_settings_convert_boost_minutes() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message(
        "max/office/set",
        br#"{"boost_duration": 10, "decalc_weekday": "sunday"}"#,
        &mut bus,
        &store,
    );

    let valve = gw.registry().find_by_name("office").unwrap().config.valve;
    assert_eq!(valve.boost_chunks, 2);
    assert_eq!(valve.decalc_weekday, Weekday::Sunday);
    assert_eq!(valve.decalc_hour, 12);
    assert_eq!(queued(&gw), vec![Command::ConfigValve]);
}

#[test]
fn unknown_decalc_day_rejected() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/office/set", br#"{"decalc_weekday": "someday"}"#, &mut bus, &store);

    assert!(gw.outbound().is_empty());
}

#[test]
fn associate_links_both_devices() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/office/set", br#"{"associate": "hallway"}"#, &mut bus, &store);

    let frames: Vec<_> = gw.outbound().iter().map(|m| m.frame.clone()).collect();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f.command == Command::AddLinkPartner));

    let to_valve = frames.iter().find(|f| f.dst == VALVE).unwrap();
    assert_eq!(&to_valve.payload[..], &[0x1A, 0x1B, 0x1C, DeviceKind::WallThermostat.code()]);
    let to_wall = frames.iter().find(|f| f.dst == WALL).unwrap();
    assert_eq!(&to_wall.payload[..], &[0x0A, 0x0B, 0x0C, DeviceKind::HeatingThermostat.code()]);

    let registry = gw.registry();
    assert!(registry.find_by_name("office").unwrap().is_linked_to(WALL));
    assert!(registry.find_by_name("hallway").unwrap().is_linked_to(VALVE));
}

#[test]
fn display_setting_sent_to_wall_thermostat() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message(
        "max/hallway/set",
        br#"{"display_actual_temperature": true}"#,
        &mut bus,
        &store,
    );

    let frame = &gw.outbound().head().unwrap().frame;
    assert_eq!(frame.command, Command::SetDisplayActualTemperature);
    assert_eq!(&frame.payload[..], &[0x04]);
    let hallway = gw.registry().find_by_name("hallway").unwrap();
    assert_eq!(hallway.config.display_actual_temperature, Some(true));
}

#[test]
fn unknown_device_and_topic_are_ignored() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/cellar/set", br#"{"temperature": 20.0}"#, &mut bus, &store);
    gw.handle_bus_message("max/office/get", br#"{}"#, &mut bus, &store);
    gw.handle_bus_message("other/office/set", br#"{"temperature": 20.0}"#, &mut bus, &store);
    gw.handle_bus_message("max/office/set", b"not json", &mut bus, &store);

    assert!(gw.outbound().is_empty());
    assert!(!gw.registry().is_changed());
}

#[test]
fn device_names_match_exactly() {
    let (mut gw, mut bus, store) = make_gateway();

    gw.handle_bus_message("max/OFFICE/set", br#"{"temperature": 20.0}"#, &mut bus, &store);

    assert!(gw.outbound().is_empty());
}

// ── Format and reset ──────────────────────────────────────────

#[test]
fn format_erases_stored_configuration() {
    let (mut gw, mut bus, store) = make_gateway();
    store.save(&gw.persisted_state()).unwrap();
    assert!(store.load().is_ok());

    gw.handle_bus_message("max/format", b"", &mut bus, &store);

    assert!(store.load().is_err(), "stored blob must be gone");
    assert_eq!(gw.registry().len(), 2, "live registry is untouched");
}

#[test]
fn reset_restarts_on_next_tick() {
    let (mut gw, mut bus, store) = make_gateway();
    let mut hw = MockHardware::new();
    let mut queue = IntakeQueue::new();
    let (_producer, mut consumer) = queue.split();
    let mut clock = MockClock::at(1_000);

    assert_eq!(
        gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store),
        LoopAction::Continue
    );
    gw.handle_bus_message("max/reset", b"", &mut bus, &store);
    assert_eq!(
        gw.tick(&mut consumer, &mut hw, &mut bus, &mut clock, &store),
        LoopAction::Restart
    );
}
