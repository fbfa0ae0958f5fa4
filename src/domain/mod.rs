//! Per-domain ground-service state machines.
//!
//! Every resource category (fuel, cargo, passengers, doors) runs the same
//! lifecycle, implemented once in [`Convergence`]:
//!
//! ```text
//!            start()            first write          target reached
//!   IDLE ───────────▶ STARTED ────────────▶ IN_PROGRESS ─────────▶ STOPPED
//!    ▲                  │  ▲                   │  ▲                 │
//!    │                  │  └──── resume() ─────┤  │                 │
//!    │                  └──▶ HELD ◀── hold() ──┘  │                 │
//!    │                                            │                 │
//!    └────────────── reset(plan) / retarget() ◀───┴─────────────────┘
//! ```
//!
//! The domain-specific part of each service is only the simulator
//! boundary: which keys to read and write, which unit they use, and how an
//! amount is quantized (whole passengers, whole kilograms of cargo).

pub mod cargo;
pub mod door;
pub mod fuel;
pub mod passenger;

pub use cargo::{CargoService, split_cargo};
pub use door::DoorService;
pub use fuel::FuelService;
pub use passenger::PassengerService;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::SimulatorPort;
use crate::config::RateSource;
use crate::error::{PortError, RangeViolation};
use crate::plan::FlightPlan;
use crate::units::{approach, within};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Resource category managed by its own state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Domain {
    Fuel = 0,
    Cargo = 1,
    Passenger = 2,
    Door = 3,
}

impl Domain {
    pub const COUNT: usize = 4;

    /// Fixed stepping and event order.
    pub const ORDER: [Domain; Domain::COUNT] =
        [Domain::Fuel, Domain::Cargo, Domain::Passenger, Domain::Door];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fuel => "fuel",
            Self::Cargo => "cargo",
            Self::Passenger => "passenger",
            Self::Door => "door",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operation status of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpStatus {
    #[default]
    Idle,
    Started,
    InProgress,
    Stopped,
    /// Degraded after repeated boundary failures.
    Held,
}

impl OpStatus {
    /// Started or InProgress: the service issues writes on `step`.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Started | Self::InProgress)
    }
}

/// Unit a domain amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Kilograms,
    Passengers,
    Percent,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kilograms => write!(f, "kg"),
            Self::Passengers => write!(f, "pax"),
            Self::Percent => write!(f, "%"),
        }
    }
}

// ---------------------------------------------------------------------------
// State and events
// ---------------------------------------------------------------------------

/// Snapshot of one domain, owned by its service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainState {
    pub planned: f64,
    pub current: f64,
    /// Amount observed when the current operation started.
    pub origin: f64,
    pub status: OpStatus,
    pub unit: Unit,
}

impl DomainState {
    pub fn new(unit: Unit) -> Self {
        Self {
            planned: 0.0,
            current: 0.0,
            origin: 0.0,
            status: OpStatus::Idle,
            unit,
        }
    }

    pub fn operation(&self) -> Operation {
        Operation::between(self.origin, self.planned)
    }

    /// Progress of the current operation from its origin to the target,
    /// 0..=100.  Works for loading and unloading alike.
    pub fn percent_complete(&self) -> f64 {
        let span = self.planned - self.origin;
        if span.abs() < f64::EPSILON {
            return if self.status == OpStatus::Idle { 0.0 } else { 100.0 };
        }
        ((self.current - self.origin) / span).clamp(0.0, 1.0) * 100.0
    }
}

/// Direction of an operation: refuel/board/load or defuel/deboard/unload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Load,
    Unload,
}

impl Operation {
    /// Unload when the target lies below where the operation started.
    pub fn between(origin: f64, planned: f64) -> Self {
        if planned < origin { Self::Unload } else { Self::Load }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Unload => f.write_str("unload"),
        }
    }
}

/// Status transition record.  Emitted on transitions only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceEvent {
    pub domain: Domain,
    pub operation: Operation,
    pub from: OpStatus,
    pub to: OpStatus,
    pub current: f64,
    pub planned: f64,
    pub unit: Unit,
    pub timestamp_ms: u64,
}

/// Per-tick input shared by every service.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepInput {
    pub now_ms: u64,
    /// External completion signal (automation reports the service done).
    pub stop_requested: bool,
}

/// What one `step` produced.
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// At most Started→InProgress followed by InProgress→Stopped.
    pub events: heapless::Vec<ServiceEvent, 2>,
    pub clamped: Option<RangeViolation>,
}

impl StepReport {
    fn push(&mut self, event: Option<ServiceEvent>) {
        if let Some(ev) = event {
            let _ = self.events.push(ev);
        }
    }
}

// ---------------------------------------------------------------------------
// Convergence core
// ---------------------------------------------------------------------------

/// Smallest change that counts as movement.
const MIN_MOVEMENT: f64 = 1e-9;

/// Per-tick step for domains counted in whole units: rounded down with a
/// floor of one unit.  A zero rate stays zero.
pub fn whole_unit_rate(rate: f64) -> f64 {
    if rate > 0.0 { rate.floor().max(1.0) } else { 0.0 }
}

/// Shared lifecycle and convergence arithmetic for every domain.
#[derive(Debug, Clone)]
pub struct Convergence {
    domain: Domain,
    state: DomainState,
    tolerance: f64,
    rate: RateSource,
    /// Status to return to when a hold is lifted.
    held_from: Option<OpStatus>,
}

impl Convergence {
    pub fn new(domain: Domain, unit: Unit, rate: RateSource, tolerance: f64) -> Self {
        Self {
            domain,
            state: DomainState::new(unit),
            tolerance: tolerance.max(0.0),
            rate,
            held_from: None,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn state(&self) -> &DomainState {
        &self.state
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Per-tick rate, read from the simulator when so configured.
    pub fn rate(&self, sim: &mut dyn SimulatorPort) -> Result<f64, PortError> {
        match &self.rate {
            RateSource::Fixed { per_tick } => Ok(*per_tick),
            RateSource::Simulator { key, scale } => {
                let raw = sim.read_value(key)?;
                if !raw.is_finite() {
                    return Err(PortError::InvalidValue);
                }
                Ok(raw.max(0.0) * scale)
            }
        }
    }

    /// Set the target without touching status.  Negative targets read as 0.
    pub fn set_planned(&mut self, planned: f64) {
        self.state.planned = planned.max(0.0);
    }

    /// Cold-start sync: current jumps straight to the target.
    pub fn snap_to_planned(&mut self) {
        self.state.current = self.state.planned;
        self.state.origin = self.state.planned;
    }

    pub fn start(&mut self, now_ms: u64) -> Option<ServiceEvent> {
        if self.state.status != OpStatus::Idle {
            return None;
        }
        self.transition(OpStatus::Started, now_ms)
    }

    pub fn stop(&mut self, now_ms: u64) -> Option<ServiceEvent> {
        match self.state.status {
            OpStatus::Started | OpStatus::InProgress | OpStatus::Held => {
                self.held_from = None;
                self.transition(OpStatus::Stopped, now_ms)
            }
            _ => None,
        }
    }

    /// Back to Idle with a new target.  The current amount is kept; it is
    /// re-synced from the simulator on the next start.
    pub fn reset_to(&mut self, planned: f64, now_ms: u64) -> Option<ServiceEvent> {
        self.set_planned(planned);
        self.state.origin = self.state.current;
        self.held_from = None;
        self.transition(OpStatus::Idle, now_ms)
    }

    pub fn hold(&mut self, now_ms: u64) -> Option<ServiceEvent> {
        if !self.state.status.is_running() {
            return None;
        }
        self.held_from = Some(self.state.status);
        self.transition(OpStatus::Held, now_ms)
    }

    pub fn resume(&mut self, now_ms: u64) -> Option<ServiceEvent> {
        if self.state.status != OpStatus::Held {
            return None;
        }
        let to = self.held_from.take().unwrap_or(OpStatus::Started);
        self.transition(to, now_ms)
    }

    /// First half of a step: sync from the observation when the operation
    /// just started, honour the stop signal, and decide the next amount.
    ///
    /// Returns `None` when nothing must be written.  While InProgress the
    /// last committed amount is authoritative; the simulator is eventually
    /// consistent and may not reflect the previous write yet.
    pub fn advance(
        &mut self,
        observed: f64,
        rate: f64,
        input: &StepInput,
        report: &mut StepReport,
    ) -> Option<f64> {
        match self.state.status {
            OpStatus::Started => {
                self.state.current = observed;
                self.state.origin = observed;
            }
            OpStatus::InProgress => {}
            _ => return None,
        }

        if input.stop_requested {
            report.push(self.transition(OpStatus::Stopped, input.now_ms));
            return None;
        }
        if within(self.state.current, self.state.planned, self.tolerance) {
            report.push(self.transition(OpStatus::Stopped, input.now_ms));
            return None;
        }
        let next = approach(self.state.current, self.state.planned, rate);
        if (next - self.state.current).abs() <= MIN_MOVEMENT {
            // no flow this tick
            return None;
        }
        Some(next)
    }

    /// Second half of a step, after the write succeeded.
    pub fn commit(&mut self, next: f64, now_ms: u64, report: &mut StepReport) {
        self.state.current = next;
        if self.state.status == OpStatus::Started
            && (next - self.state.origin).abs() > MIN_MOVEMENT
        {
            report.push(self.transition(OpStatus::InProgress, now_ms));
        }
        if within(next, self.state.planned, self.tolerance) {
            report.push(self.transition(OpStatus::Stopped, now_ms));
        }
    }

    fn transition(&mut self, to: OpStatus, now_ms: u64) -> Option<ServiceEvent> {
        let from = self.state.status;
        if from == to {
            return None;
        }
        self.state.status = to;
        Some(ServiceEvent {
            domain: self.domain,
            operation: self.state.operation(),
            from,
            to,
            current: self.state.current,
            planned: self.state.planned,
            unit: self.state.unit,
            timestamp_ms: now_ms,
        })
    }
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

/// One ground service.  The orchestrator holds these as trait objects and
/// steps them in [`Domain::ORDER`].
///
/// Lifecycle operations delegate to the [`Convergence`] core; implementors
/// provide the simulator boundary (`update_from_plan`, `step`, `probe`).
pub trait GroundService: Send {
    fn core(&self) -> &Convergence;
    fn core_mut(&mut self) -> &mut Convergence;

    /// Target for this domain under `plan`.
    fn planned_from(&self, plan: &FlightPlan) -> f64;

    /// Read the simulator, converge by one bounded step, write back.
    fn step(
        &mut self,
        sim: &mut dyn SimulatorPort,
        input: &StepInput,
    ) -> Result<StepReport, PortError>;

    /// Minimal boundary round-trip used to test a held domain.
    fn probe(&mut self, sim: &mut dyn SimulatorPort) -> Result<(), PortError>;

    /// Write `amount` to the simulator in one go.
    fn write_amount(&mut self, sim: &mut dyn SimulatorPort, amount: f64) -> Result<(), PortError>;

    fn domain(&self) -> Domain {
        self.core().domain()
    }

    fn state(&self) -> &DomainState {
        self.core().state()
    }

    /// Take the target from `plan`.  With `force_current_sync` the
    /// simulator amount is snapped to the target immediately (cold start);
    /// otherwise it converges on subsequent steps.
    fn update_from_plan(
        &mut self,
        plan: &FlightPlan,
        force_current_sync: bool,
        sim: &mut dyn SimulatorPort,
    ) -> Result<(), PortError> {
        let planned = self.planned_from(plan);
        self.core_mut().set_planned(planned);
        if force_current_sync {
            let target = self.state().planned;
            self.write_amount(sim, target)?;
            self.core_mut().snap_to_planned();
        }
        Ok(())
    }

    /// Idle → Started.  No-op in every other status.
    fn start(&mut self, now_ms: u64) -> Option<ServiceEvent> {
        self.core_mut().start(now_ms)
    }

    /// Force-terminate early.  Idempotent.
    fn stop(&mut self, now_ms: u64) -> Option<ServiceEvent> {
        self.core_mut().stop(now_ms)
    }

    /// Back to Idle with the target from `plan`.
    fn reset(&mut self, plan: &FlightPlan, now_ms: u64) -> Option<ServiceEvent> {
        let planned = self.planned_from(plan);
        self.core_mut().reset_to(planned, now_ms)
    }

    /// Back to Idle with an explicit target (unloading, door gate).
    fn retarget(&mut self, planned: f64, now_ms: u64) -> Option<ServiceEvent> {
        self.core_mut().reset_to(planned, now_ms)
    }

    fn hold(&mut self, now_ms: u64) -> Option<ServiceEvent> {
        self.core_mut().hold(now_ms)
    }

    fn resume(&mut self, now_ms: u64) -> Option<ServiceEvent> {
        self.core_mut().resume(now_ms)
    }
}
