//! Gateway service: the hexagonal core.
//!
//! [`Gateway`] owns every piece of mutable domain state: the device
//! registry, the outbound queue and its airtime credit, the scheduler and
//! the health supervisor.  Nothing is global.  All I/O flows through port
//! traits passed in at call sites, so the whole service runs against mock
//! adapters in tests.
//!
//! ```text
//!  IntakeConsumer ──▶ ┌─────────────────────────────┐ ──▶ RadioPort
//!                     │           Gateway            │ ──▶ RelayPort
//!  bus messages   ──▶ │ Registry · Queue · Heating   │ ──▶ BusPort
//!                     └─────────────────────────────┘ ◀─▶ ConfigPort
//! ```
//!
//! One [`tick`](Gateway::tick) runs, in order: the uptime guard, at most one
//! inbound frame, one outbound queue step, due periodic tasks, debounced
//! persistence, the status retry, the two heating passes and the radio
//! silence watchdog.

use anyhow::Context;
use heapless::Vec as StackVec;
use log::{debug, info, warn};

use crate::config::{GatewayConfig, PersistedState};
use crate::control::heating::{evaluate, sync_valves};
use crate::control::{HeatingDemand, HeatingPolicy};
use crate::error::{FrameError, HealthFault};
use crate::intake::IntakeConsumer;
use crate::outbound::{CreditBudget, Delivery, OutboundQueue};
use crate::protocol::fields::{DeviceKind, WallTime};
use crate::protocol::frame::accept;
use crate::protocol::{message, Address, Frame};
use crate::registry::Registry;
use crate::scheduler::{Schedule, Scheduler, SchedulerDelegate, Task, TimeSyncRotation};
use crate::supervisor::Supervisor;

use super::ports::{BusPort, ClockPort, ConfigError, ConfigPort, Publication, RadioPort, RelayPort};
use super::reports::GatewayStatus;

/// What the embedding loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    /// Restart the process (operator reset or uptime limit).
    Restart,
}

// ───────────────────────────────────────────────────────────────
// Gateway
// ───────────────────────────────────────────────────────────────

pub struct Gateway {
    pub(super) config: GatewayConfig,
    pub(super) address: Address,
    pub(super) registry: Registry,
    pub(super) outbound: OutboundQueue,
    credit: CreditBudget,
    msg_counter: u8,
    pub(super) pairing_enabled: bool,
    pub(super) autocreate: bool,
    furnace_running: bool,
    status_published: bool,
    booted_at: Option<WallTime>,
    policy: HeatingPolicy,
    supervisor: Supervisor,
    scheduler: Scheduler,
    rotation: TimeSyncRotation,
    /// When the registry first became dirty since the last save.
    dirty_since_ms: Option<u64>,
    pub(super) restart_requested: bool,
}

impl Gateway {
    /// Build the service from tunables and previously persisted state.
    pub fn new(config: GatewayConfig, persisted: PersistedState, now_ms: u64) -> Self {
        let mut scheduler = Scheduler::new();
        scheduler.add(
            Schedule {
                label: "credit",
                task: Task::ReplenishCredit,
                interval_ms: u64::from(config.credit_window_secs) * 1000,
            },
            now_ms,
        );
        scheduler.add(
            Schedule {
                label: "time sync",
                task: Task::BroadcastTime,
                interval_ms: u64::from(config.time_broadcast_interval_secs) * 1000,
            },
            now_ms,
        );

        Self {
            address: persisted.address,
            autocreate: persisted.autocreate,
            registry: Registry::from_configs(persisted.devices),
            outbound: OutboundQueue::new(config.max_retries),
            credit: CreditBudget::new(config.credit_quota_ms, config.long_preamble_ms),
            msg_counter: 0,
            pairing_enabled: false,
            furnace_running: false,
            status_published: false,
            booted_at: None,
            policy: HeatingPolicy::from(&config),
            supervisor: Supervisor::new(&config, now_ms),
            rotation: TimeSyncRotation::new(config.time_broadcast_chunks),
            scheduler,
            dirty_since_ms: None,
            restart_requested: false,
            config,
        }
    }

    /// Validate the tunables and load persisted state.  A first boot, or
    /// unreadable stored state, starts with an empty registry.
    pub fn boot(config: GatewayConfig, store: &impl ConfigPort, clock: &impl ClockPort) -> anyhow::Result<Self> {
        config.validate().context("invalid gateway configuration")?;

        let persisted = match store.load() {
            Ok(state) => {
                info!("Configuration loaded ({} devices)", state.devices.len());
                state
            }
            Err(ConfigError::NotFound) => {
                info!("No stored configuration, starting empty");
                PersistedState::new(config.address, config.autocreate)
            }
            Err(ConfigError::Corrupted) => {
                warn!("Stored configuration corrupted, using defaults");
                PersistedState::new(config.address, config.autocreate)
            }
            Err(e) => return Err(e).context("loading persisted configuration"),
        };

        Ok(Self::new(config, persisted, clock.now_ms()))
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Record the boot time, release the burner, subscribe to every
    /// operator topic and announce the gateway.
    pub fn start(&mut self, relay: &mut impl RelayPort, bus: &mut impl BusPort, clock: &impl ClockPort) {
        self.booted_at = clock.wall_time();
        relay.set_burner(false);

        let ns = &self.config.namespace;
        for level in ["set", "rename", "format", "reset"] {
            bus.subscribe(&format!("{ns}/{level}"));
        }
        for device in self.registry.iter() {
            bus.subscribe(&format!("{ns}/{}/set", device.name()));
        }

        self.publish_status(bus);
        info!("Gateway {} started with {} devices", self.address, self.registry.len());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle.
    ///
    /// The `hw` parameter satisfies **both** [`RadioPort`] and
    /// [`RelayPort`], which keeps the port boundary explicit without a
    /// double mutable borrow.
    pub fn tick(
        &mut self,
        intake: &mut IntakeConsumer<'_>,
        hw: &mut (impl RadioPort + RelayPort),
        bus: &mut impl BusPort,
        clock: &mut impl ClockPort,
        store: &impl ConfigPort,
    ) -> LoopAction {
        let now = clock.now_ms();

        if self.restart_requested {
            info!("Restart requested by operator");
            self.force_save_if_dirty(now, store);
            return LoopAction::Restart;
        }

        // 1. Uptime guard
        self.supervisor.evaluate(now);
        if self.supervisor.has_fault(HealthFault::UptimeExceeded) {
            warn!("Uptime limit reached, requesting restart");
            self.force_save_if_dirty(now, store);
            return LoopAction::Restart;
        }

        // 2. At most one inbound frame
        if let Some(raw) = intake.dequeue() {
            match accept(&raw) {
                Ok(received) => {
                    self.supervisor.frame_received(now);
                    self.handle_frame(&received, bus, &*clock);
                }
                Err(e) => debug!("Frame discarded: {}", e),
            }
        }

        // 3. One outbound step
        let outcome = self.outbound.service(&mut self.credit, &mut *hw);
        if outcome.transmitted() {
            clock.delay_ms(self.config.post_transmit_delay_ms);
        }

        // 4. Periodic tasks
        let mut due = DueTasks::default();
        self.scheduler.tick(now, &mut due);
        for task in due.0 {
            match task {
                Task::ReplenishCredit => {
                    self.credit.replenish();
                    debug!("Credit replenished to {} ms", self.credit.quota_ms());
                }
                Task::BroadcastTime => self.broadcast_time(&*clock),
            }
        }

        // 5. Debounced persistence
        self.auto_save_if_needed(now, store);

        // 6. Status retry
        if !self.status_published {
            self.publish_status(bus);
        }

        // 7. Heating
        self.run_heating(now, &mut *hw, bus);

        // 8. Silence watchdog
        if self.supervisor.has_fault(HealthFault::RadioSilent) {
            warn!("No frames received, reinitialising radio");
            hw.reinit();
            self.supervisor.radio_reinitialised(now);
            let topic = format!("{}/init", self.config.namespace);
            bus.publish(&topic, Publication::Notice("RF init"), false);
        }

        LoopAction::Continue
    }

    /// Decode and apply one operator message from the bus.
    pub fn handle_bus_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        bus: &mut impl BusPort,
        store: &impl ConfigPort,
    ) {
        self.handle_operator(topic, payload, bus, store);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    pub fn credit(&self) -> &CreditBudget {
        &self.credit
    }

    pub fn pairing_enabled(&self) -> bool {
        self.pairing_enabled
    }

    pub fn autocreate(&self) -> bool {
        self.autocreate
    }

    pub fn furnace_running(&self) -> bool {
        self.furnace_running
    }

    /// Current active health fault bitmask (0 = healthy).
    pub fn fault_flags(&self) -> u8 {
        self.supervisor.faults()
    }

    /// Snapshot of everything that survives a restart.
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            address: self.address,
            autocreate: self.autocreate,
            devices: self.registry.configs(),
        }
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            availability: "online",
            booted_at: self.booted_at.map(|t| t.to_string()),
            pairing_enabled: self.pairing_enabled,
            autocreate: self.autocreate,
            furnace_running: self.furnace_running,
        }
    }

    // ── Outbound helpers (shared with dispatch and operator) ──

    pub(super) fn next_counter(&mut self) -> u8 {
        let counter = self.msg_counter;
        self.msg_counter = self.msg_counter.wrapping_add(1);
        counter
    }

    /// Queue a built frame.  Returns `false` if it could not be built or
    /// the queue is full.
    pub(super) fn enqueue(&mut self, built: Result<Frame, FrameError>, delivery: Delivery) -> bool {
        match built {
            Ok(frame) => self.outbound.push(frame, delivery),
            Err(e) => {
                warn!("Frame not queued: {}", e);
                false
            }
        }
    }

    /// Queue the current wall time for `to`.  `reply_to` reuses an incoming
    /// counter with a short preamble; otherwise a fresh counter and the long
    /// preamble are used.  Skipped until the clock is synchronised.
    pub(super) fn queue_time(
        &mut self,
        to: Address,
        reply_to: Option<u8>,
        group: u8,
        clock: &impl ClockPort,
    ) -> bool {
        let Some(now) = clock.wall_time() else {
            debug!("Wall time not synchronised, time for {} skipped", to);
            return false;
        };
        let (counter, delivery) = match reply_to {
            Some(counter) => (counter, Delivery::Reply),
            None => (self.next_counter(), Delivery::Broadcast),
        };
        let built = message::time_information(counter, self.address, to, group, &now);
        self.enqueue(built, delivery)
    }

    /// Publish the gateway status, retained.  Remembers success so the
    /// tick can retry until the first publish gets through.
    pub(super) fn publish_status(&mut self, bus: &mut impl BusPort) -> bool {
        let status = self.status();
        let ok = bus.publish(&self.config.namespace, Publication::Status(&status), true);
        if ok {
            self.status_published = true;
        }
        ok
    }

    // ── Internal ──────────────────────────────────────────────

    /// Send the time to the next slice of thermostats.
    fn broadcast_time(&mut self, clock: &impl ClockPort) {
        let slice = self.rotation.advance();
        let targets: Vec<Address> = self
            .registry
            .iter()
            .enumerate()
            .filter(|(i, d)| {
                self.rotation.includes(slice, *i)
                    && matches!(
                        d.kind(),
                        Some(DeviceKind::HeatingThermostat | DeviceKind::WallThermostat)
                    )
            })
            .map(|(_, d)| d.address())
            .collect();

        debug!("Time sync: slice {} ({} devices)", slice, targets.len());
        for address in targets {
            self.queue_time(address, None, 0, clock);
        }
    }

    fn run_heating(&mut self, now_ms: u64, relay: &mut impl RelayPort, bus: &mut impl BusPort) {
        sync_valves(&mut self.registry, now_ms, self.policy.stale_after_ms);

        match evaluate(&self.registry, now_ms, &self.policy) {
            HeatingDemand::Run => {
                relay.set_burner(true);
                if !self.furnace_running {
                    info!("Furnace run");
                    self.furnace_running = true;
                    self.publish_status(bus);
                }
            }
            HeatingDemand::Stop => {
                relay.set_burner(false);
                if self.furnace_running {
                    info!("Furnace stop");
                    self.furnace_running = false;
                    self.publish_status(bus);
                }
            }
            HeatingDemand::Keep => {}
        }
    }

    // ── Config dirty tracking ─────────────────────────────────

    /// Save once the registry has been dirty for the debounce window.
    /// Returns `true` if the configuration was saved.
    fn auto_save_if_needed(&mut self, now_ms: u64, store: &impl ConfigPort) -> bool {
        if !self.registry.is_changed() {
            self.dirty_since_ms = None;
            return false;
        }
        let since = *self.dirty_since_ms.get_or_insert(now_ms);
        let debounce_ms = u64::from(self.config.config_save_debounce_secs) * 1000;
        if now_ms.saturating_sub(since) < debounce_ms {
            return false;
        }
        self.save(now_ms, store)
    }

    /// Save immediately if anything changed (before a restart).
    fn force_save_if_dirty(&mut self, now_ms: u64, store: &impl ConfigPort) {
        if self.registry.is_changed() {
            self.save(now_ms, store);
        }
    }

    fn save(&mut self, now_ms: u64, store: &impl ConfigPort) -> bool {
        match store.save(&self.persisted_state()) {
            Ok(()) => {
                self.registry.clear_changed();
                self.dirty_since_ms = None;
                info!("Configuration saved ({} devices)", self.registry.len());
                true
            }
            Err(e) => {
                // Retry after another debounce window.
                self.dirty_since_ms = Some(now_ms);
                warn!("Configuration save failed: {}", e);
                false
            }
        }
    }
}

/// Collects due tasks so they run after the scheduler borrow ends.
#[derive(Default)]
struct DueTasks(StackVec<Task, 4>);

impl SchedulerDelegate for DueTasks {
    fn on_task_due(&mut self, task: Task) {
        let _ = self.0.push(task);
    }
}
