//! Outbound application events.
//!
//! The [`Orchestrator`](super::service::Orchestrator) emits these through
//! the [`EventSink`](super::ports::EventSink) port, in the order they
//! happened within a tick.

use crate::domain::{Domain, ServiceEvent};
use crate::error::{FetchError, ParseError, PortError, RangeViolation};
use crate::phase::FlightPhase;
use crate::plan::PlanId;

/// Structured events emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The orchestrator started (carries the initial phase).
    Started(FlightPhase),

    /// A domain changed operation status.
    Service(ServiceEvent),

    /// A new flight plan was adopted.
    PlanLoaded {
        id: PlanId,
        fuel_kg: f64,
        cargo_kg: f64,
        passengers: u32,
    },

    /// A plan payload was refused; the previous plan stays in force.
    PlanRejected(ParseError),

    /// The plan source could not be reached; the loader is backing off.
    PlanFetchFailed {
        error: FetchError,
        attempt: u32,
        retry_in_ms: u64,
    },

    /// The confirmed flight phase moved forward.
    PhaseChanged { from: FlightPhase, to: FlightPhase },

    /// The lifecycle restarted (flight reload, return to gate).
    PhaseReset { from: FlightPhase, to: FlightPhase },

    /// A domain was held after repeated boundary failures.
    DomainDegraded {
        domain: Domain,
        error: PortError,
        consecutive: u8,
    },

    /// A held domain answered a probe and resumed.
    DomainRecovered(Domain),

    /// An observed value was outside plausible bounds and was clamped.
    RangeClamped(RangeViolation),

    /// The orchestrator shut down.
    Terminated,
}

impl AppEvent {
    /// The domain this event concerns, if any.
    pub fn domain(&self) -> Option<Domain> {
        match self {
            Self::Service(e) => Some(e.domain),
            Self::DomainDegraded { domain, .. } | Self::DomainRecovered(domain) => Some(*domain),
            Self::RangeClamped(r) => Some(r.domain),
            _ => None,
        }
    }
}
