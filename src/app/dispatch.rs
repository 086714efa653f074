//! Inbound dispatcher.
//!
//! Every accepted frame resolves (or creates) the sender's record, names it
//! after its address if it has no name, refreshes its last-seen time and
//! signal strength, then branches on the command.
//! Afterwards the valve sync pass runs and the sender's report is published.
//!
//! | Command                 | Effect                                         |
//! |-------------------------|------------------------------------------------|
//! | time-information        | reply with the wall time when asked            |
//! | thermostat-state        | heater kind, valve position, shared state      |
//! | wall-thermostat-state   | wall kind if unknown, shared state             |
//! | ack                     | flags, queue head match, kind-specific detail  |
//! | wall-thermostat-control | wall kind, desired/measured temperature        |
//! | shutter-contact-state   | contact kind, open/battery flags, ack          |
//! | set-temperature         | mode and desired temperature, ack              |
//! | push-button-state       | ack                                            |
//! | pair-ping               | pair-pong, replay configuration when pairing   |

use log::{debug, info};

use crate::control::heating::sync_valves;
use crate::outbound::Delivery;
use crate::protocol::fields::{DeviceKind, Weekday};
use crate::protocol::frame::ReceivedFrame;
use crate::protocol::message::{self, decode_state};
use crate::protocol::{Address, Command, Frame};

use super::ports::{BusPort, ClockPort, Publication};
use super::reports::DeviceReport;
use super::service::Gateway;

impl Gateway {
    /// Apply one accepted frame to the registry and queue any replies.
    pub(super) fn handle_frame(
        &mut self,
        received: &ReceivedFrame,
        bus: &mut impl BusPort,
        clock: &impl ClockPort,
    ) {
        let now = clock.now_ms();
        let frame = &received.frame;
        let to_me = frame.dst == self.address;

        let allow_create = self.autocreate || self.pairing_enabled;
        let Some(idx) = self.registry.upsert_on_receipt(frame.src, allow_create).index() else {
            debug!("Ignoring frame from unknown device {}", frame.src);
            return;
        };
        self.registry.apply(idx, |d| {
            let fallback = d.address().to_string();
            d.name().is_empty() && d.set_name(&fallback)
        });
        self.registry.update_state(idx, |d| {
            d.touch(now);
            d.state.rssi_dbm = Some(received.rssi_dbm);
        });
        debug!("{} (rssi {} dBm, to me: {})", frame, received.rssi_dbm, to_me);

        match frame.command {
            Command::TimeInformation => {
                if to_me && message::is_time_request(frame) {
                    self.queue_time(frame.src, Some(frame.msg_counter), frame.group, clock);
                }
            }
            Command::ThermostatState => {
                self.registry.apply(idx, |d| d.set_kind(DeviceKind::HeatingThermostat));
                self.record_state(idx, frame, now, true);
            }
            Command::WallThermostatState => {
                self.registry.apply(idx, |d| {
                    d.kind().is_none() && d.set_kind(DeviceKind::WallThermostat)
                });
                self.record_state(idx, frame, now, false);
            }
            Command::Ack => self.record_ack(idx, frame, now, to_me),
            Command::WallThermostatControl => {
                self.registry.apply(idx, |d| d.set_kind(DeviceKind::WallThermostat));
                match message::decode_wall_control(frame) {
                    Ok(report) => self.registry.update_state(idx, |d| {
                        d.set_desired_temperature(report.desired_temperature, now);
                        d.set_measured_temperature(report.measured_temperature, now);
                    }),
                    Err(e) => debug!("{}", e),
                }
            }
            Command::ShutterContactState => {
                self.registry.apply(idx, |d| d.set_kind(DeviceKind::ShutterContact));
                match message::decode_shutter_contact(frame) {
                    Ok(report) => self.registry.update_state(idx, |d| {
                        d.state.open = Some(report.open);
                        d.set_battery_flags(report.rf_error, report.low_battery);
                    }),
                    Err(e) => debug!("{}", e),
                }
                if to_me {
                    self.acknowledge(frame);
                }
            }
            Command::SetTemperature => {
                match message::decode_set_temperature(frame) {
                    Ok((mode, desired)) => self.registry.update_state(idx, |d| {
                        d.set_mode(mode, now);
                        d.set_desired_temperature(desired, now);
                    }),
                    Err(e) => debug!("{}", e),
                }
                if to_me {
                    self.acknowledge(frame);
                }
            }
            Command::PushButtonState => {
                if to_me {
                    self.acknowledge(frame);
                }
            }
            Command::PairPing => {
                if to_me || self.pairing_enabled {
                    let pong = message::pair_pong(frame.msg_counter, self.address, frame.src, frame.group);
                    self.enqueue(pong, Delivery::Reply);
                    // A broadcast ping comes from a new or factory-reset device.
                    if !to_me {
                        self.replay_configuration(idx, clock);
                    }
                }
            }
            other => debug!("Unhandled command {}", other),
        }

        sync_valves(&mut self.registry, now, self.config.stale_after_ms());
        self.publish_device(idx, bus);
    }

    /// Publish the decoded attributes of the device at `idx`, retained.
    pub(super) fn publish_device(&self, idx: usize, bus: &mut impl BusPort) -> bool {
        let Some(device) = self.registry.get(idx) else {
            return false;
        };
        let report = DeviceReport::from(device);
        let topic = format!("{}/{}", self.config.namespace, device.name());
        bus.publish(&topic, Publication::Device(&report), true)
    }

    // ── Shared decoders ───────────────────────────────────────

    /// Body shared by thermostat-state and wall-thermostat-state.  Only
    /// radiator thermostats report a valve position in the detail byte.
    fn record_state(&mut self, idx: usize, frame: &Frame, now: u64, reports_valve: bool) {
        let state = match decode_state(frame) {
            Ok(state) => state,
            Err(e) => {
                debug!("{}", e);
                return;
            }
        };
        self.registry.update_state(idx, |d| {
            if reports_valve {
                d.set_valve_position(state.detail, now);
            }
            d.set_mode(state.flags.mode, now);
            d.set_battery_flags(state.flags.rf_error, state.flags.low_battery);
            d.set_desired_temperature(state.desired_temperature, now);
            if let Some(measured) = state.measured_temperature {
                d.set_measured_temperature(measured, now);
            }
        });
        if let Some(until) = state.until {
            debug!("{} temporary until {}", frame.src, until);
        }
    }

    fn record_ack(&mut self, idx: usize, frame: &Frame, now: u64, to_me: bool) {
        let report = match message::decode_ack(frame) {
            Ok(report) => report,
            Err(e) => {
                debug!("{}", e);
                return;
            }
        };
        if !report.is_ok() {
            info!("{} rejected a command (status 0x{:02X})", frame.src, report.status);
        }
        if to_me {
            self.outbound.acknowledge(frame.msg_counter);
        }

        let kind = self.registry.get(idx).and_then(|d| d.kind());
        self.registry.update_state(idx, |d| {
            if let Some(flags) = report.flags {
                d.set_mode(flags.mode, now);
                d.set_battery_flags(flags.rf_error, flags.low_battery);
            }
            if kind == Some(DeviceKind::HeatingThermostat) {
                if let Some(valve) = report.detail {
                    d.set_valve_position(valve, now);
                }
            }
            if matches!(kind, Some(DeviceKind::HeatingThermostat | DeviceKind::WallThermostat)) {
                if let Some(desired) = report.desired_temperature {
                    d.set_desired_temperature(desired, now);
                }
            }
        });
        if kind == Some(DeviceKind::WallThermostat) {
            if let Some(display) = report.detail {
                self.registry.apply(idx, |d| d.set_display_actual_temperature(display != 0));
            }
        }
    }

    fn acknowledge(&mut self, frame: &Frame) {
        let ack = message::ack(frame.msg_counter, self.address, frame.src);
        self.enqueue(ack, Delivery::Reply);
    }

    // ── Pairing replay ────────────────────────────────────────

    /// Re-send everything remembered about a device: time, display mode,
    /// valve and temperature settings, links and the week profile.
    fn replay_configuration(&mut self, idx: usize, clock: &impl ClockPort) {
        let Some(device) = self.registry.get(idx).cloned() else {
            return;
        };
        info!("Restoring configuration for {}", device.name());
        let gw = self.address;
        let to = device.address();
        let config = &device.config;

        self.queue_time(to, None, config.group, clock);

        if let Some(show) = config.display_actual_temperature {
            let counter = self.next_counter();
            self.enqueue(
                message::display_actual_temperature(counter, gw, to, show),
                Delivery::Confirmed,
            );
        }

        let counter = self.next_counter();
        self.enqueue(message::config_valve(counter, gw, to, &config.valve), Delivery::Confirmed);
        let counter = self.next_counter();
        self.enqueue(
            message::config_temperatures(counter, gw, to, &config.thresholds),
            Delivery::Confirmed,
        );

        for partner in &config.associations {
            let partner_kind = self.registry.find_by_address(*partner).map(|p| p.kind());
            if let Some(partner_kind) = partner_kind {
                self.link_pair((to, device.kind()), (*partner, partner_kind));
            }
        }

        for (day, points) in Weekday::ALL.iter().zip(&config.schedule) {
            if points.is_empty() {
                continue;
            }
            let counter = self.next_counter();
            self.enqueue(
                message::week_profile(counter, gw, to, config.group, *day, points),
                Delivery::Confirmed,
            );
        }
    }

    /// Tell each of two devices about the other.  A side whose partner's
    /// kind is unknown is skipped.
    pub(super) fn link_pair(
        &mut self,
        (a, a_kind): (Address, Option<DeviceKind>),
        (b, b_kind): (Address, Option<DeviceKind>),
    ) {
        if let Some(kind) = b_kind {
            let counter = self.next_counter();
            self.enqueue(message::add_link_partner(counter, self.address, a, b, kind), Delivery::Confirmed);
        }
        if let Some(kind) = a_kind {
            let counter = self.next_counter();
            self.enqueue(message::add_link_partner(counter, self.address, b, a, kind), Delivery::Confirmed);
        }
    }
}
