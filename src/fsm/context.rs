//! Shared mutable context threaded through every phase-gate handler.
//!
//! `GateContext` is the blackboard the per-phase enter/exit actions write
//! to.  The orchestrator reads the resulting [`Arming`] after each
//! transition and applies it to the domain services.

use crate::domain::Domain;
use crate::domain::door::{DOOR_CLOSED, DOOR_OPEN};

/// Where the doors should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoorTarget {
    #[default]
    Open,
    Closed,
}

impl DoorTarget {
    pub fn percent(self) -> f64 {
        match self {
            Self::Open => DOOR_OPEN,
            Self::Closed => DOOR_CLOSED,
        }
    }
}

/// Which domains the current phase allows to run, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Arming {
    /// Bit n set = `Domain` with index n is armed.
    armed: u8,
    pub door: DoorTarget,
    /// Ground-service writes are permitted at all (manual starts included).
    pub boarding_writes: bool,
    /// Cargo and passenger targets are zero (deboarding / unloading).
    pub unload: bool,
}

impl Arming {
    pub fn is_armed(&self, domain: Domain) -> bool {
        self.armed & (1 << domain.index()) != 0
    }

    pub fn arm(&mut self, domain: Domain) {
        self.armed |= 1 << domain.index();
    }

    pub fn disarm(&mut self, domain: Domain) {
        self.armed &= !(1 << domain.index());
    }

    pub fn disarm_all(&mut self) {
        self.armed = 0;
    }

    /// Raw arming mask, bit n = `Domain::ORDER[n]`.
    pub fn mask(&self) -> u8 {
        self.armed
    }
}

/// The shared context passed to every gate handler.
#[derive(Debug, Clone, Default)]
pub struct GateContext {
    pub arming: Arming,
    /// Ticks since the current phase was entered.
    pub ticks_in_phase: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
}

impl GateContext {
    pub fn new() -> Self {
        Self::default()
    }
}
