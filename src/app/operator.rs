//! Operator command handlers.
//!
//! Every payload is validated before anything is changed, so a bad key
//! skips the whole message rather than applying half of it.

use log::{debug, info, warn};

use crate::error::CommandError;
use crate::outbound::Delivery;
use crate::protocol::fields::{Breakpoint, Mode, Weekday};
use crate::protocol::message::{self, TemperatureThresholds, ValveSettings, MAX_BREAKPOINTS};
use crate::protocol::Address;

use super::commands::{
    boost_minutes_to_chunks, parse_time_of_day, DeviceSettings, GatewaySettings, OperatorCommand,
    RenameRequest,
};
use super::ports::{BusPort, ConfigPort};
use super::service::Gateway;

/// A device command after validation.
struct DevicePlan {
    idx: usize,
    mode: Mode,
    schedule: Option<(Weekday, Vec<Breakpoint>)>,
    thresholds: Option<TemperatureThresholds>,
    valve: Option<ValveSettings>,
    partner: Option<usize>,
}

impl Gateway {
    pub(super) fn handle_operator(
        &mut self,
        topic: &str,
        payload: &[u8],
        bus: &mut impl BusPort,
        store: &impl ConfigPort,
    ) {
        let result = OperatorCommand::parse(&self.config.namespace, topic, payload)
            .and_then(|cmd| self.apply_command(cmd, bus, store));
        match result {
            Ok(()) => {}
            Err(CommandError::UnknownTopic) => debug!("No handler for {}", topic),
            Err(e) => warn!("Operator message on {} skipped: {}", topic, e),
        }
    }

    fn apply_command(
        &mut self,
        cmd: OperatorCommand,
        bus: &mut impl BusPort,
        store: &impl ConfigPort,
    ) -> Result<(), CommandError> {
        match cmd {
            OperatorCommand::Rename(request) => self.rename(&request, bus),
            OperatorCommand::Format => {
                match store.erase() {
                    Ok(()) => info!("Persisted configuration erased"),
                    Err(e) => warn!("Erasing configuration failed: {}", e),
                }
                Ok(())
            }
            OperatorCommand::Reset => {
                self.restart_requested = true;
                Ok(())
            }
            OperatorCommand::Configure(settings) => {
                self.configure(&settings, bus);
                Ok(())
            }
            OperatorCommand::Device { name, settings } => {
                let plan = self.plan_device(&name, &settings)?;
                self.apply_device(&plan, &settings);
                Ok(())
            }
        }
    }

    fn rename(&mut self, request: &RenameRequest, bus: &mut impl BusPort) -> Result<(), CommandError> {
        let address: Address = request.address.parse()?;
        let idx = self.registry.position(address).ok_or(CommandError::UnknownDevice)?;
        let Some(to) = request.to.as_deref() else {
            return Ok(());
        };
        if to.trim().is_empty() || to.contains(['/', '+', '#']) {
            return Err(CommandError::InvalidName);
        }
        if self.registry.position_by_name(to).is_some_and(|other| other != idx) {
            return Err(CommandError::NameTaken);
        }
        if self.registry.apply(idx, |d| d.set_name(to)) == Some(true) {
            info!("Renamed {} to {}", address, to);
            bus.subscribe(&format!("{}/{}/set", self.config.namespace, to));
        }
        Ok(())
    }

    /// Gateway-level keys.  An invalid address is logged and the other keys
    /// still apply.
    fn configure(&mut self, settings: &GatewaySettings, bus: &mut impl BusPort) {
        if let Some(text) = settings.address.as_deref() {
            match text.parse::<Address>() {
                Ok(address) if address != self.address => {
                    info!("Changing address to {}", address);
                    self.address = address;
                    self.registry.mark_changed();
                }
                Ok(_) => {}
                Err(e) => warn!("Address {:?} rejected: {}", text, e),
            }
        }
        if let Some(pair) = settings.pair {
            info!("Pairing {}", if pair { "enabled" } else { "disabled" });
            self.pairing_enabled = pair;
            self.publish_status(bus);
        }
        if let Some(autocreate) = settings.autocreate {
            info!("Autocreate {}", if autocreate { "enabled" } else { "disabled" });
            if self.autocreate != autocreate {
                self.autocreate = autocreate;
                self.registry.mark_changed();
            }
            self.publish_status(bus);
        }
    }

    // ── Device settings ───────────────────────────────────────

    fn plan_device(&self, name: &str, s: &DeviceSettings) -> Result<DevicePlan, CommandError> {
        let idx = self.registry.position_by_name(name).ok_or(CommandError::UnknownDevice)?;
        let device = self.registry.get(idx).ok_or(CommandError::UnknownDevice)?;

        let mode = match s.mode.as_deref() {
            Some(text) => Mode::parse(text),
            None => device.mode().unwrap_or(Mode::Manual),
        };

        let schedule = match (&s.schedule, s.day.as_deref()) {
            (Some(entries), Some(day)) => {
                let day = Weekday::parse(day).ok_or(CommandError::InvalidDay)?;
                if entries.len() > MAX_BREAKPOINTS {
                    return Err(CommandError::Malformed(format!(
                        "at most {} schedule entries per day",
                        MAX_BREAKPOINTS
                    )));
                }
                let points = entries
                    .iter()
                    .map(|(time, t)| parse_time_of_day(time).map(|m| Breakpoint::new(*t, m)))
                    .collect::<Result<Vec<_>, _>>()?;
                Some((day, points))
            }
            _ => None,
        };

        let current = &device.config.thresholds;
        let thresholds = s.touches_thresholds().then(|| TemperatureThresholds {
            comfort: s.comfort_temperature.unwrap_or(current.comfort),
            eco: s.eco_temperature.unwrap_or(current.eco),
            max: s.max_temperature.unwrap_or(current.max),
            min: s.min_temperature.unwrap_or(current.min),
            window_open: s.window_open_temperature.unwrap_or(current.window_open),
        });

        let valve = if s.touches_valve() {
            let current = &device.config.valve;
            let decalc_weekday = match s.decalc_weekday.as_deref() {
                Some(day) => Weekday::parse(day).ok_or(CommandError::InvalidDay)?,
                None => current.decalc_weekday,
            };
            Some(ValveSettings {
                decalc_weekday,
                decalc_hour: s.decalc_hour.unwrap_or(current.decalc_hour).min(23),
                boost_chunks: s
                    .boost_duration
                    .map_or(current.boost_chunks, boost_minutes_to_chunks),
                boost_valve_position: s
                    .boost_valve_position
                    .unwrap_or(current.boost_valve_position)
                    .min(100),
                max_valve_setting: s.max_valve_setting.unwrap_or(current.max_valve_setting).min(100),
                valve_offset: s.valve_offset.unwrap_or(current.valve_offset).min(100),
            })
        } else {
            None
        };

        let partner = match s.associate.as_deref() {
            Some(other) => Some(
                self.registry
                    .position_by_name(other)
                    .filter(|&p| p != idx)
                    .ok_or(CommandError::UnknownDevice)?,
            ),
            None => None,
        };

        Ok(DevicePlan {
            idx,
            mode,
            schedule,
            thresholds,
            valve,
            partner,
        })
    }

    fn apply_device(&mut self, plan: &DevicePlan, s: &DeviceSettings) {
        let idx = plan.idx;
        let gw = self.address;
        let Some(device) = self.registry.get(idx) else {
            return;
        };
        let to = device.address();
        let known_desired = device.state.desired_temperature.map(|r| r.value);

        if let Some(thresholds) = plan.thresholds {
            self.registry.apply(idx, |d| d.set_thresholds(thresholds));
            let counter = self.next_counter();
            self.enqueue(message::config_temperatures(counter, gw, to, &thresholds), Delivery::Confirmed);
        }

        if let Some(valve) = plan.valve {
            self.registry.apply(idx, |d| d.set_valve_settings(valve));
            let counter = self.next_counter();
            self.enqueue(message::config_valve(counter, gw, to, &valve), Delivery::Confirmed);
        }

        if let Some(room) = s.room.as_deref() {
            if self.registry.apply(idx, |d| d.set_room(room)) == Some(true) {
                info!("Assigning {} to room {}", to, room);
            }
        }

        if let Some(group) = s.group {
            self.registry.apply(idx, |d| d.set_group(group));
            let counter = self.next_counter();
            self.enqueue(message::set_group_id(counter, gw, to, group), Delivery::Confirmed);
        }
        let group = self.registry.get(idx).map_or(0, |d| d.config.group);

        if let Some((day, points)) = &plan.schedule {
            self.registry.apply(idx, |d| d.set_schedule(usize::from(day.index()), points.clone()));
            // Stored sorted; send what was stored.
            let sorted = self
                .registry
                .get(idx)
                .and_then(|d| d.config.schedule.get(usize::from(day.index())).cloned())
                .unwrap_or_default();
            let counter = self.next_counter();
            self.enqueue(
                message::week_profile(counter, gw, to, group, *day, &sorted),
                Delivery::Confirmed,
            );
        }

        let desired = match (s.target_temperature(), s.mode.is_some()) {
            (Some(t), _) => Some(t),
            (None, true) => {
                if known_desired.is_none() {
                    warn!("Mode change for {} skipped, desired temperature unknown", to);
                }
                known_desired
            }
            (None, false) => None,
        };
        if let Some(t) = desired {
            info!("Setting {} to {} {}", to, plan.mode.as_str(), t);
            let counter = self.next_counter();
            self.enqueue(
                message::set_temperature(counter, gw, to, group, plan.mode, t),
                Delivery::Confirmed,
            );
        }

        if let Some(partner_idx) = plan.partner {
            self.associate(idx, partner_idx);
        }

        if let Some(show) = s.display_actual_temperature {
            self.registry.apply(idx, |d| d.set_display_actual_temperature(show));
            let counter = self.next_counter();
            self.enqueue(message::display_actual_temperature(counter, gw, to, show), Delivery::Confirmed);
        }
    }

    /// Link two devices over the air and remember the link on both records.
    fn associate(&mut self, a: usize, b: usize) {
        let (Some(first), Some(second)) = (self.registry.get(a), self.registry.get(b)) else {
            return;
        };
        let first = (first.address(), first.kind());
        let second = (second.address(), second.kind());
        info!("Associating {} with {}", first.0, second.0);
        self.link_pair(first, second);
        self.registry.apply(a, |d| d.add_association(second.0));
        self.registry.apply(b, |d| d.add_association(first.0));
    }
}
