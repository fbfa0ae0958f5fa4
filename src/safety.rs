//! Fault supervisor.
//!
//! Boundary failures (simulator or automation reads and writes) are scoped
//! to the domain that hit them.  The supervisor keeps one health slot per
//! domain and decides what the orchestrator does next.
//!
//! ## Fault lifecycle
//!
//! 1. A step fails: the consecutive-failure counter goes up and the domain
//!    is retried on the next tick.
//! 2. When the counter reaches `max_consecutive_failures` the domain is
//!    held.  The orchestrator moves it to `Held` and emits `DomainDegraded`.
//! 3. While held, a probe is due every `held_probe_interval_ticks`.  A
//!    successful probe clears the slot; the orchestrator resumes the domain
//!    and emits `DomainRecovered`.
//! 4. Any successful step resets the counter.
//!
//! Other domains are never affected: each slot is independent.
//!
//! Range checks on observed values live here as well
//! ([`clamp_observed`]): a corrupted reading is clamped before it reaches
//! any state machine.

use log::{error, info, warn};

use crate::config::RetryConfig;
use crate::domain::Domain;
use crate::error::{PortError, RangeViolation};

/// Clamp an observation into `0..=max`.
///
/// Non-finite values are not clampable and surface as
/// [`PortError::InvalidValue`], a regular boundary failure.
pub fn clamp_observed(
    domain: Domain,
    observed: f64,
    max: f64,
) -> Result<(f64, Option<RangeViolation>), PortError> {
    if !observed.is_finite() {
        return Err(PortError::InvalidValue);
    }
    let clamped = observed.clamp(0.0, max.max(0.0));
    if clamped == observed {
        return Ok((observed, None));
    }
    let violation = RangeViolation {
        domain,
        observed,
        clamped,
    };
    warn!("RANGE | {violation}");
    Ok((clamped, Some(violation)))
}

/// What the orchestrator should do after a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureVerdict {
    /// Try again next tick.
    Retry { consecutive: u8 },
    /// Threshold just crossed: hold the domain.
    Hold { consecutive: u8 },
    /// Already held; nothing new to report.
    StillHeld,
}

#[derive(Debug, Clone, Copy, Default)]
struct DomainHealth {
    consecutive_failures: u8,
    held: bool,
    ticks_since_probe: u32,
    last_error: Option<PortError>,
}

/// Per-domain retry and hold bookkeeping.
pub struct SafetySupervisor {
    max_failures: u8,
    probe_interval: u32,
    slots: [DomainHealth; Domain::COUNT],
}

impl SafetySupervisor {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_failures: config.max_consecutive_failures.max(1),
            probe_interval: config.held_probe_interval_ticks.max(1),
            slots: [DomainHealth::default(); Domain::COUNT],
        }
    }

    /// Apply new limits.  Current counters are kept.
    pub fn reconfigure(&mut self, config: &RetryConfig) {
        self.max_failures = config.max_consecutive_failures.max(1);
        self.probe_interval = config.held_probe_interval_ticks.max(1);
    }

    pub fn record_failure(&mut self, domain: Domain, err: PortError) -> FailureVerdict {
        let slot = &mut self.slots[domain.index()];
        slot.last_error = Some(err);
        if slot.held {
            return FailureVerdict::StillHeld;
        }
        slot.consecutive_failures = slot.consecutive_failures.saturating_add(1);
        if slot.consecutive_failures >= self.max_failures {
            slot.held = true;
            slot.ticks_since_probe = 0;
            error!(
                "SAFETY HOLD: {domain} after {} consecutive failures ({err})",
                slot.consecutive_failures
            );
            FailureVerdict::Hold {
                consecutive: slot.consecutive_failures,
            }
        } else {
            warn!(
                "{domain} boundary failure {}/{}: {err}",
                slot.consecutive_failures, self.max_failures
            );
            FailureVerdict::Retry {
                consecutive: slot.consecutive_failures,
            }
        }
    }

    pub fn record_success(&mut self, domain: Domain) {
        let slot = &mut self.slots[domain.index()];
        if !slot.held {
            slot.consecutive_failures = 0;
            slot.last_error = None;
        }
    }

    /// Advance the probe timer of a held domain.  Returns `true` when a
    /// probe is due this tick.
    pub fn probe_due(&mut self, domain: Domain) -> bool {
        let slot = &mut self.slots[domain.index()];
        if !slot.held {
            return false;
        }
        slot.ticks_since_probe = slot.ticks_since_probe.saturating_add(1);
        if slot.ticks_since_probe >= self.probe_interval {
            slot.ticks_since_probe = 0;
            true
        } else {
            false
        }
    }

    /// A probe succeeded: release the hold.
    pub fn mark_recovered(&mut self, domain: Domain) {
        let slot = &mut self.slots[domain.index()];
        if slot.held {
            info!("SAFETY HOLD CLEARED: {domain}");
        }
        *slot = DomainHealth::default();
    }

    /// Forget everything about `domain` (new plan, phase reset).
    pub fn clear(&mut self, domain: Domain) {
        self.slots[domain.index()] = DomainHealth::default();
    }

    pub fn is_held(&self, domain: Domain) -> bool {
        self.slots[domain.index()].held
    }

    pub fn consecutive_failures(&self, domain: Domain) -> u8 {
        self.slots[domain.index()].consecutive_failures
    }

    pub fn last_error(&self, domain: Domain) -> Option<PortError> {
        self.slots[domain.index()].last_error
    }
}
