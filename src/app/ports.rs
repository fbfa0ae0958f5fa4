//! Port traits: the hexagonal boundary between the engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator (domain)
//! ```
//!
//! Driven adapters (simulator bridge, automation tool, plan source, event
//! sinks, config storage, clock) implement these traits.  The
//! [`Orchestrator`](super::service::Orchestrator) consumes them at call
//! sites, so the domain core never talks to a concrete endpoint.
//!
//! ## Contract notes
//!
//! - **SimulatorPort** and **AutomationPort** implementations MUST bound
//!   every call; an endpoint that does not answer in time reports
//!   [`PortError::Timeout`].
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::config::SystemConfig;
use crate::domain::Domain;
use crate::error::{ConfigError, FetchError, PortError};

// ───────────────────────────────────────────────────────────────
// Simulator port (driven adapter: domain ↔ simulator data store)
// ───────────────────────────────────────────────────────────────

/// Key/value access to the simulator's variables.
///
/// Eventually consistent: a value written in one tick is not guaranteed to
/// be visible to a read in the same or the next tick.
pub trait SimulatorPort {
    fn read_value(&mut self, key: &str) -> Result<f64, PortError>;
    fn write_value(&mut self, key: &str, value: f64) -> Result<(), PortError>;
}

// ───────────────────────────────────────────────────────────────
// Automation port (driven adapter: ground-handling tool → domain)
// ───────────────────────────────────────────────────────────────

/// Polled view of the ground-handling automation tool.
pub trait AutomationPort {
    /// The tool asks for `domain`'s service to begin.
    fn service_requested(&mut self, domain: Domain) -> Result<bool, PortError>;

    /// The tool reports `domain`'s service finished on its side.
    fn service_completed(&mut self, domain: Domain) -> Result<bool, PortError>;

    fn boarding_active(&mut self) -> Result<bool, PortError>;
    fn pushback_active(&mut self) -> Result<bool, PortError>;
    fn deboarding_complete(&mut self) -> Result<bool, PortError>;
}

// ───────────────────────────────────────────────────────────────
// Plan source (driven adapter: plan service / file drop → domain)
// ───────────────────────────────────────────────────────────────

/// Raw flight plan bytes.  Transport is the adapter's business.
pub trait PlanSource {
    fn fetch(&mut self) -> Result<Vec<u8>, FetchError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / UI)
// ───────────────────────────────────────────────────────────────

/// The engine emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log, channel to a
/// UI thread, etc.).  Implementations must not block.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds.  Injected so tests control time.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}
