//! Inbound commands to the orchestrator.
//!
//! These represent actions requested by the outside world (EFB, operator
//! console, tests) that the [`Orchestrator`](super::service::Orchestrator)
//! interprets and acts upon.

use crate::config::SystemConfig;
use crate::domain::Domain;
use crate::phase::FlightPhase;

/// Commands that external adapters can send into the engine.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Start a domain's service now, bypassing the automation trigger.
    /// Refused while the phase forbids ground-service writes.
    StartService(Domain),

    /// Stop a domain's service early.
    StopService(Domain),

    /// Force the confirmed phase (debug / recovery).
    ForcePhase(FlightPhase),

    /// Hot-reload configuration.  Rejected if it fails validation.
    UpdateConfig(SystemConfig),

    /// Stop every service and terminate.
    Shutdown,
}
