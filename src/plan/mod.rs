//! Flight plan acquisition.
//!
//! ```text
//!  PlanSource ──bytes──▶ parse_plan ──▶ PlanProvider ──▶ PlanLoader ──▶ PlanMailbox ──▶ Orchestrator
//!  (file, net)           (hardened)     (new-plan        (own thread,    (latest plan +
//!                                        detection)       backoff)        loader notices)
//! ```
//!
//! A [`FlightPlan`] is immutable once loaded and shared as
//! `Arc<FlightPlan>`; a newer plan replaces it wholesale.

pub mod loader;
pub mod parser;
pub mod provider;

pub use loader::{Backoff, LoaderNotice, PlanLoader, PlanMailbox};
pub use parser::{PlanLimits, parse_plan};
pub use provider::{PlanProvider, is_new_plan};

use core::fmt;

/// Stable identifier of a plan document.  Two fetches of the same document
/// carry the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanId(pub String);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Route metadata.  Informational only; no service depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteInfo {
    pub origin: String,
    pub destination: String,
    pub callsign: String,
    pub aircraft_type: String,
}

/// Target quantities for one flight.  Masses are kilograms.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightPlan {
    pub id: PlanId,
    pub fuel_kg: f64,
    pub cargo_kg: f64,
    pub passengers: u32,
    pub route: RouteInfo,
}

impl FlightPlan {
    /// Plan with targets only and empty route metadata.
    pub fn with_targets(id: &str, fuel_kg: f64, cargo_kg: f64, passengers: u32) -> Self {
        Self {
            id: PlanId(id.to_owned()),
            fuel_kg,
            cargo_kg,
            passengers,
            route: RouteInfo::default(),
        }
    }
}

impl fmt::Display for FlightPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}->{} ({}) fuel={:.0}kg cargo={:.0}kg pax={}",
            self.id,
            self.route.callsign,
            self.route.origin,
            self.route.destination,
            self.route.aircraft_type,
            self.fuel_kg,
            self.cargo_kg,
            self.passengers
        )
    }
}
