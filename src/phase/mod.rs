//! Flight phase model and classification.
//!
//! ```text
//!  PREFLIGHT ─▶ BOARDING ─▶ PUSHBACK ─▶ TAXI_OUT ─▶ FLIGHT ─▶ TAXI_IN ─▶ ARRIVAL ─▶ TURNAROUND
//!      ▲                        │           │
//!      └────── regression ──────┴───────────┘   (simulator reload, or back at the
//!                                                gate before ever leaving the ground)
//! ```
//!
//! [`classify`] is a pure function of one signal sample.  Confirmation,
//! monotonicity and regression handling live in [`PhaseDetector`].

pub mod detector;

pub use detector::PhaseDetector;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::{AutomationPort, SimulatorPort};
use crate::config::PhaseConfig;
use crate::error::PortError;

/// Discrete flight-lifecycle stage, ordered by rank.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum FlightPhase {
    #[default]
    Preflight = 0,
    Boarding = 1,
    Pushback = 2,
    TaxiOut = 3,
    Flight = 4,
    TaxiIn = 5,
    Arrival = 6,
    Turnaround = 7,
}

impl FlightPhase {
    pub const COUNT: usize = 8;

    pub const ALL: [FlightPhase; FlightPhase::COUNT] = [
        FlightPhase::Preflight,
        FlightPhase::Boarding,
        FlightPhase::Pushback,
        FlightPhase::TaxiOut,
        FlightPhase::Flight,
        FlightPhase::TaxiIn,
        FlightPhase::Arrival,
        FlightPhase::Turnaround,
    ];

    /// Convert an index back to a phase.  Out-of-range indices fall back to
    /// `Preflight` (debug builds assert).
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(p) => *p,
            None => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::Preflight
            }
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Before the aircraft leaves the stand.
    pub fn is_pre_departure(self) -> bool {
        self < Self::Pushback
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Preflight => "Preflight",
            Self::Boarding => "Boarding",
            Self::Pushback => "Pushback",
            Self::TaxiOut => "TaxiOut",
            Self::Flight => "Flight",
            Self::TaxiIn => "TaxiIn",
            Self::Arrival => "Arrival",
            Self::Turnaround => "Turnaround",
        };
        f.write_str(s)
    }
}

/// Result of feeding one sample to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseChange {
    None,
    Advanced { from: FlightPhase, to: FlightPhase },
    /// Regression: the lifecycle restarted (flight reload, return to gate).
    Reset { from: FlightPhase, to: FlightPhase },
}

/// One sample of everything phase detection looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseSignals {
    pub on_ground: bool,
    pub altitude_agl_ft: f32,
    pub ground_speed_kt: f32,
    pub engines_running: bool,
    pub parking_brake: bool,
    /// Changes whenever the simulator reloads the flight.
    pub session_id: u32,
    pub boarding_active: bool,
    pub pushback_active: bool,
    pub deboarding_complete: bool,
}

impl PhaseSignals {
    /// Read one sample from both sides of the integration.
    pub fn sample(
        sim: &mut dyn SimulatorPort,
        automation: &mut dyn AutomationPort,
        cfg: &PhaseConfig,
    ) -> Result<Self, PortError> {
        let k = &cfg.keys;
        let flag = |v: f64| v > 0.5;
        let number = |v: f64| if v.is_finite() { Ok(v) } else { Err(PortError::InvalidValue) };

        Ok(Self {
            on_ground: flag(sim.read_value(&k.on_ground)?),
            altitude_agl_ft: number(sim.read_value(&k.altitude_agl_ft)?)? as f32,
            ground_speed_kt: number(sim.read_value(&k.ground_speed_kt)?)?.abs() as f32,
            engines_running: flag(sim.read_value(&k.engines_running)?),
            parking_brake: flag(sim.read_value(&k.parking_brake)?),
            session_id: number(sim.read_value(&k.session)?)?.max(0.0) as u32,
            boarding_active: automation.boarding_active()?,
            pushback_active: automation.pushback_active()?,
            deboarding_complete: automation.deboarding_complete()?,
        })
    }
}

/// Phase a single sample points at.
///
/// `has_flown` separates the departure half of the lifecycle from the
/// arrival half; on the ground the same signals mean different phases.
pub fn classify(s: &PhaseSignals, has_flown: bool, cfg: &PhaseConfig) -> FlightPhase {
    if !s.on_ground || s.altitude_agl_ft > cfg.airborne_agl_ft {
        return FlightPhase::Flight;
    }
    let moving = s.ground_speed_kt > cfg.taxi_speed_kt;

    if has_flown {
        return if s.deboarding_complete {
            FlightPhase::Turnaround
        } else if moving || s.engines_running {
            FlightPhase::TaxiIn
        } else {
            FlightPhase::Arrival
        };
    }

    if s.pushback_active {
        FlightPhase::Pushback
    } else if moving {
        if s.engines_running {
            FlightPhase::TaxiOut
        } else {
            FlightPhase::Pushback
        }
    } else if s.engines_running {
        if s.parking_brake {
            FlightPhase::Pushback
        } else {
            FlightPhase::TaxiOut
        }
    } else if s.boarding_active {
        FlightPhase::Boarding
    } else {
        FlightPhase::Preflight
    }
}
