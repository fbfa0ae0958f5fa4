//! Orchestrator: the hexagonal core.
//!
//! [`Orchestrator`] owns the domain services, phase detector, phase gate,
//! safety supervisor and diagnostics.  All I/O flows through port traits
//! injected at call sites, making the whole control loop testable with
//! mock adapters.
//!
//! ```text
//!  PlanMailbox ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                  │        Orchestrator          │
//! SimulatorPort ◀─▶│ Detector · Gate · Services   │
//! AutomationPort ─▶│ Safety · Diagnostics         │
//!                  └─────────────────────────────┘
//! ```
//!
//! Lifecycle: `WaitingForPlan → Active → Terminated`.  Phase detection and
//! gating run from the first tick; domains only step once a plan exists.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::diagnostics::Diagnostics;
use crate::domain::cargo::CargoService;
use crate::domain::door::DoorService;
use crate::domain::fuel::FuelService;
use crate::domain::passenger::PassengerService;
use crate::domain::{Domain, DomainState, GroundService, ServiceEvent, StepInput};
use crate::error::{Error, PortError, Result};
use crate::fsm::context::{Arming, GateContext};
use crate::fsm::states::build_phase_table;
use crate::fsm::PhaseGate;
use crate::phase::{FlightPhase, PhaseChange, PhaseDetector, PhaseSignals};
use crate::plan::{is_new_plan, FlightPlan, LoaderNotice, PlanMailbox};
use crate::safety::{FailureVerdict, SafetySupervisor};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{AutomationPort, ClockPort, ConfigPort, EventSink, SimulatorPort};

// ───────────────────────────────────────────────────────────────
// ServiceSet
// ───────────────────────────────────────────────────────────────

/// The four domain services, indexed by [`Domain`].
pub struct ServiceSet {
    services: [Box<dyn GroundService>; Domain::COUNT],
}

impl ServiceSet {
    /// Explicit services, in [`Domain::ORDER`].
    pub fn new(
        fuel: Box<dyn GroundService>,
        cargo: Box<dyn GroundService>,
        passenger: Box<dyn GroundService>,
        door: Box<dyn GroundService>,
    ) -> Self {
        Self {
            services: [fuel, cargo, passenger, door],
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(
            Box::new(FuelService::new(config.fuel.clone())),
            Box::new(CargoService::new(config.cargo.clone())),
            Box::new(PassengerService::new(config.passenger.clone())),
            Box::new(DoorService::new(config.door.clone())),
        )
    }

    pub fn get(&self, domain: Domain) -> &dyn GroundService {
        self.services[domain.index()].as_ref()
    }

    pub fn get_mut(&mut self, domain: Domain) -> &mut dyn GroundService {
        self.services[domain.index()].as_mut()
    }
}

// ───────────────────────────────────────────────────────────────
// Orchestrator
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    WaitingForPlan,
    Active,
    Terminated,
}

pub struct Orchestrator {
    config: SystemConfig,
    services: ServiceSet,
    mailbox: Arc<PlanMailbox>,
    clock: Box<dyn ClockPort + Send>,
    detector: PhaseDetector,
    gate: PhaseGate,
    gate_ctx: GateContext,
    safety: SafetySupervisor,
    diagnostics: Diagnostics,
    lifecycle: Lifecycle,
    plan: Option<Arc<FlightPlan>>,
    /// Events produced this tick, flushed in order at the end.
    pending: Vec<AppEvent>,
    tick_count: u64,
    config_dirty: bool,
    /// Services were built from an older config; rebuilt on the next plan.
    services_stale: bool,
}

impl Orchestrator {
    /// Does **not** start the gate; call [`start`](Self::start) next.
    pub fn new(
        config: SystemConfig,
        services: ServiceSet,
        mailbox: Arc<PlanMailbox>,
        clock: Box<dyn ClockPort + Send>,
    ) -> Self {
        let detector = PhaseDetector::new(config.phase.clone());
        let safety = SafetySupervisor::new(&config.retry);
        let diagnostics = Diagnostics::new(config.event_history);
        let gate = PhaseGate::new(build_phase_table(), detector.current());

        Self {
            config,
            services,
            mailbox,
            clock,
            detector,
            gate,
            gate_ctx: GateContext::new(),
            safety,
            diagnostics,
            lifecycle: Lifecycle::WaitingForPlan,
            plan: None,
            pending: Vec::new(),
            tick_count: 0,
            config_dirty: false,
            services_stale: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let now = self.clock.now_ms();
        self.gate.start(&mut self.gate_ctx);
        self.apply_targets(now);
        let phase = self.gate.current_phase();
        self.pending.push(AppEvent::Started(phase));
        info!("orchestrator started in {phase}, waiting for a flight plan");
        self.flush(sink, now);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One control cycle: plan → phase → domains → events.
    pub fn tick(
        &mut self,
        sim: &mut dyn SimulatorPort,
        automation: &mut dyn AutomationPort,
        sink: &mut impl EventSink,
    ) {
        if self.lifecycle == Lifecycle::Terminated {
            return;
        }
        self.tick_count += 1;
        self.diagnostics.count_tick();
        self.gate.tick(&mut self.gate_ctx);
        let now = self.clock.now_ms();

        // 0. Plan hand-off
        self.drain_notices();
        if let Some(plan) = self.mailbox.try_take() {
            self.adopt_plan(plan, sim, now);
        }

        // 1. Phase detection and gating
        match PhaseSignals::sample(sim, automation, &self.config.phase) {
            Ok(signals) => {
                let change = self.detector.update(&signals);
                self.apply_phase_change(change, now);
            }
            Err(e) => debug!("phase signals unavailable: {e}"),
        }

        // 2. Domains, in fixed order
        if self.lifecycle == Lifecycle::Active {
            for domain in Domain::ORDER {
                self.step_domain(domain, sim, automation, now);
            }
        }

        // 3. Notify
        self.flush(sink, now);
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) -> Result<()> {
        if self.lifecycle == Lifecycle::Terminated {
            return Err(Error::Port(PortError::Unavailable));
        }
        let now = self.clock.now_ms();
        let outcome = match cmd {
            AppCommand::StartService(domain) => {
                if self.lifecycle != Lifecycle::Active || !self.gate_ctx.arming.boarding_writes {
                    warn!("start {domain} refused in {}", self.gate.current_phase());
                    Err(Error::Port(PortError::Rejected))
                } else {
                    let ev = self.services.get_mut(domain).start(now);
                    self.push_service(ev);
                    Ok(())
                }
            }
            AppCommand::StopService(domain) => {
                let ev = self.services.get_mut(domain).stop(now);
                self.push_service(ev);
                Ok(())
            }
            AppCommand::ForcePhase(phase) => {
                info!("forcing phase {phase}");
                let change = self.detector.force(phase);
                self.apply_phase_change(change, now);
                Ok(())
            }
            AppCommand::UpdateConfig(config) => self.update_config(config),
            AppCommand::Shutdown => {
                self.shutdown(now);
                Ok(())
            }
        };
        self.flush(sink, now);
        outcome
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn phase(&self) -> FlightPhase {
        self.gate.current_phase()
    }

    pub fn plan(&self) -> Option<&FlightPlan> {
        self.plan.as_deref()
    }

    pub fn domain_state(&self, domain: Domain) -> &DomainState {
        self.services.get(domain).state()
    }

    pub fn arming(&self) -> Arming {
        self.gate_ctx.arming
    }

    pub fn is_held(&self, domain: Domain) -> bool {
        self.safety.is_held(domain)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn current_config(&self) -> &SystemConfig {
        &self.config
    }

    // ── Internal: plans ───────────────────────────────────────

    fn drain_notices(&mut self) {
        while let Some(notice) = self.mailbox.try_notice() {
            self.pending.push(match notice {
                LoaderNotice::FetchFailed {
                    error,
                    attempt,
                    retry_in_ms,
                } => AppEvent::PlanFetchFailed {
                    error,
                    attempt,
                    retry_in_ms,
                },
                LoaderNotice::Rejected(e) => AppEvent::PlanRejected(e),
            });
        }
    }

    fn adopt_plan(&mut self, plan: Arc<FlightPlan>, sim: &mut dyn SimulatorPort, now: u64) {
        if !is_new_plan(&plan, self.plan.as_deref()) {
            debug!("plan {} already active", plan.id);
            return;
        }
        if self.services_stale {
            info!("rebuilding services from updated configuration");
            self.services = ServiceSet::from_config(&self.config);
            self.services_stale = false;
        }

        info!("adopting {plan}");
        self.pending.push(AppEvent::PlanLoaded {
            id: plan.id.clone(),
            fuel_kg: plan.fuel_kg,
            cargo_kg: plan.cargo_kg,
            passengers: plan.passengers,
        });
        let first = self.lifecycle == Lifecycle::WaitingForPlan;
        self.plan = Some(plan);

        if self.detector.current() >= FlightPhase::Arrival {
            let change = self.detector.rearm();
            self.apply_phase_change(change, now);
        } else {
            self.reset_domains(now);
        }

        if first {
            self.lifecycle = Lifecycle::Active;
            if self.config.cold_start_sync {
                self.cold_start_sync(sim, now);
            }
        }
    }

    /// Snap every plan-driven domain straight to its target.
    fn cold_start_sync(&mut self, sim: &mut dyn SimulatorPort, now: u64) {
        let Some(plan) = self.plan.clone() else {
            return;
        };
        for domain in [Domain::Fuel, Domain::Cargo, Domain::Passenger] {
            let result = self
                .services
                .get_mut(domain)
                .update_from_plan(&plan, true, sim);
            match result {
                Ok(()) => info!("cold start: {domain} synced to plan"),
                Err(e) => self.on_failure(domain, e, now),
            }
        }
    }

    /// Every domain back to Idle with the active plan's targets.
    fn reset_domains(&mut self, now: u64) {
        let Some(plan) = self.plan.clone() else {
            return;
        };
        for domain in Domain::ORDER {
            self.safety.clear(domain);
            let ev = self.services.get_mut(domain).reset(&plan, now);
            self.push_service(ev);
        }
        self.apply_targets(now);
    }

    // ── Internal: phases ──────────────────────────────────────

    fn apply_phase_change(&mut self, change: PhaseChange, now: u64) {
        match change {
            PhaseChange::None => {}
            PhaseChange::Advanced { from, to } => {
                self.pending.push(AppEvent::PhaseChanged { from, to });
                let prev = self.gate_ctx.arming;
                self.gate.transition(to, &mut self.gate_ctx);
                self.apply_arming(prev, now);
            }
            PhaseChange::Reset { from, to } => {
                self.pending.push(AppEvent::PhaseReset { from, to });
                self.gate.transition(to, &mut self.gate_ctx);
                self.reset_domains(now);
            }
        }
    }

    /// Stop what the new phase disarmed, then retarget.
    fn apply_arming(&mut self, prev: Arming, now: u64) {
        let arming = self.gate_ctx.arming;
        for domain in Domain::ORDER {
            if prev.is_armed(domain) && !arming.is_armed(domain) {
                self.safety.clear(domain);
                let ev = self.services.get_mut(domain).stop(now);
                self.push_service(ev);
            }
        }
        self.apply_targets(now);
    }

    /// Door follows the gate; unloading drives cargo and passengers to 0.
    fn apply_targets(&mut self, now: u64) {
        let arming = self.gate_ctx.arming;
        let door_target = arming.door.percent();
        let door = self.services.get_mut(Domain::Door);
        if door.state().planned != door_target {
            let ev = door.retarget(door_target, now);
            self.push_service(ev);
        }
        if arming.unload {
            for domain in [Domain::Cargo, Domain::Passenger] {
                let svc = self.services.get_mut(domain);
                if svc.state().planned != 0.0 {
                    let ev = svc.retarget(0.0, now);
                    self.push_service(ev);
                }
            }
        }
    }

    // ── Internal: domains ─────────────────────────────────────

    fn step_domain(
        &mut self,
        domain: Domain,
        sim: &mut dyn SimulatorPort,
        automation: &mut dyn AutomationPort,
        now: u64,
    ) {
        if self.safety.is_held(domain) {
            if !self.safety.probe_due(domain) {
                return;
            }
            match self.services.get_mut(domain).probe(sim) {
                Ok(()) => {
                    self.safety.mark_recovered(domain);
                    let ev = self.services.get_mut(domain).resume(now);
                    self.push_service(ev);
                    self.pending.push(AppEvent::DomainRecovered(domain));
                }
                Err(e) => {
                    debug!("{domain} probe failed: {e}");
                    return;
                }
            }
        }

        if !self.gate_ctx.arming.is_armed(domain) {
            return;
        }

        let triggers = automation
            .service_requested(domain)
            .and_then(|req| Ok((req, automation.service_completed(domain)?)));
        let (requested, completed) = match triggers {
            Ok(t) => t,
            Err(e) => {
                self.on_failure(domain, e, now);
                return;
            }
        };

        if requested || self.config.auto_start_on_arm {
            let ev = self.services.get_mut(domain).start(now);
            self.push_service(ev);
        }

        let input = StepInput {
            now_ms: now,
            stop_requested: completed,
        };
        match self.services.get_mut(domain).step(sim, &input) {
            Ok(report) => {
                self.safety.record_success(domain);
                if let Some(v) = report.clamped {
                    self.pending.push(AppEvent::RangeClamped(v));
                }
                for ev in report.events {
                    self.pending.push(AppEvent::Service(ev));
                }
            }
            Err(e) => self.on_failure(domain, e, now),
        }
    }

    fn on_failure(&mut self, domain: Domain, error: PortError, now: u64) {
        match self.safety.record_failure(domain, error) {
            FailureVerdict::Retry { .. } | FailureVerdict::StillHeld => {}
            FailureVerdict::Hold { consecutive } => {
                let ev = self.services.get_mut(domain).hold(now);
                self.push_service(ev);
                self.pending.push(AppEvent::DomainDegraded {
                    domain,
                    error,
                    consecutive,
                });
            }
        }
    }

    fn push_service(&mut self, event: Option<ServiceEvent>) {
        if let Some(ev) = event {
            self.pending.push(AppEvent::Service(ev));
        }
    }

    fn flush(&mut self, sink: &mut impl EventSink, now: u64) {
        for ev in std::mem::take(&mut self.pending) {
            self.diagnostics.record(self.tick_count, now, &ev);
            sink.emit(&ev);
        }
    }

    // ── Internal: commands ────────────────────────────────────

    fn update_config(&mut self, config: SystemConfig) -> Result<()> {
        config.validate()?;
        self.detector.reconfigure(config.phase.clone());
        self.safety.reconfigure(&config.retry);
        self.diagnostics.set_keep(config.event_history);
        self.mailbox.update_config(config.plan.clone());
        self.config = config;
        self.services_stale = true;
        self.mark_config_dirty();
        info!("configuration updated at runtime");
        Ok(())
    }

    fn shutdown(&mut self, now: u64) {
        for domain in Domain::ORDER {
            let ev = self.services.get_mut(domain).stop(now);
            self.push_service(ev);
        }
        self.mailbox.request_shutdown();
        self.lifecycle = Lifecycle::Terminated;
        self.pending.push(AppEvent::Terminated);
        info!("orchestrator terminated after {} ticks", self.tick_count);
    }

    // ── Config dirty-flag management ──────────────────────────

    pub fn mark_config_dirty(&mut self) {
        self.config_dirty = true;
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    /// Persist the config if it changed.  Returns `true` if it was saved.
    pub fn save_config_if_dirty(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("config saved");
                true
            }
            Err(e) => {
                warn!("config save failed: {e}");
                false
            }
        }
    }
}
