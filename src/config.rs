//! System configuration parameters
//!
//! All tunable parameters for the ground-service engine.  Values are loaded
//! through a [`ConfigPort`](crate::app::ports::ConfigPort) (a JSON file on
//! the host) and fall back to [`SystemConfig::default`].  Every section uses
//! `#[serde(default)]` so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::units::MassUnit;

/// Maximum number of cargo compartments a split can address.
pub const MAX_COMPARTMENTS: usize = 4;

/// Where a domain gets its per-tick convergence rate from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RateSource {
    /// Fixed increment per tick, in the domain's unit.
    Fixed { per_tick: f64 },
    /// Read from a simulator variable every tick and multiplied by `scale`
    /// (e.g. a refuel-truck flow rate in kg/s times the tick length).
    Simulator { key: String, scale: f64 },
}

impl RateSource {
    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        match self {
            Self::Fixed { per_tick } if !(per_tick.is_finite() && *per_tick > 0.0) => {
                Err(ConfigError::ValidationFailed(field))
            }
            Self::Simulator { key, scale } if key.is_empty() || !(scale.is_finite() && *scale > 0.0) => {
                Err(ConfigError::ValidationFailed(field))
            }
            _ => Ok(()),
        }
    }
}

// --- Domains ---------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelConfig {
    /// Simulator variable holding total fuel mass.
    pub key: String,
    /// Unit the simulator variable is expressed in.
    pub sim_unit: MassUnit,
    /// Convergence rate in kg per tick.
    pub rate: RateSource,
    /// Allowed deviation from the target once stopped (kg).
    pub tolerance_kg: f64,
    /// Anything above this is treated as a corrupted reading (kg).
    pub max_plausible_kg: f64,
}

impl Default for FuelConfig {
    fn default() -> Self {
        Self {
            key: "FUEL TOTAL QUANTITY WEIGHT".into(),
            sim_unit: MassUnit::Pounds,
            rate: RateSource::Fixed { per_tick: 25.0 },
            tolerance_kg: 1.0,
            max_plausible_kg: 400_000.0,
        }
    }
}

/// One cargo compartment and its share of the planned total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompartmentConfig {
    pub key: String,
    pub ratio: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CargoConfig {
    /// Compartments in split order.  The first one receives the rounding
    /// remainder.
    pub compartments: heapless::Vec<CompartmentConfig, MAX_COMPARTMENTS>,
    pub sim_unit: MassUnit,
    /// Convergence rate in kg per tick.
    pub rate: RateSource,
    pub tolerance_kg: f64,
    pub max_plausible_kg: f64,
}

impl Default for CargoConfig {
    fn default() -> Self {
        let mut compartments = heapless::Vec::new();
        let _ = compartments.push(CompartmentConfig {
            key: "PAYLOAD STATION WEIGHT:5".into(),
            ratio: 80,
        });
        let _ = compartments.push(CompartmentConfig {
            key: "PAYLOAD STATION WEIGHT:6".into(),
            ratio: 20,
        });
        Self {
            compartments,
            sim_unit: MassUnit::Pounds,
            rate: RateSource::Fixed { per_tick: 50.0 },
            tolerance_kg: 1.0,
            max_plausible_kg: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassengerConfig {
    pub key: String,
    /// Passengers per tick.  Fractional rates are rounded down, minimum 1.
    pub rate: RateSource,
    pub max_plausible: f64,
}

impl Default for PassengerConfig {
    fn default() -> Self {
        Self {
            key: "PAX COUNT".into(),
            rate: RateSource::Fixed { per_tick: 2.0 },
            max_plausible: 900.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    /// Door position variables (0 = closed, 100 = open).
    pub keys: Vec<String>,
    /// Percent of travel per tick.
    pub rate: RateSource,
    pub tolerance_percent: f64,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            keys: vec!["EXIT OPEN:0".into(), "EXIT OPEN:2".into()],
            rate: RateSource::Fixed { per_tick: 25.0 },
            tolerance_percent: 0.5,
        }
    }
}

// --- Phase detection ---------------------------------------------------------

/// Simulator variables sampled for phase detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalKeys {
    pub on_ground: String,
    pub altitude_agl_ft: String,
    pub ground_speed_kt: String,
    pub engines_running: String,
    pub parking_brake: String,
    /// Counter the simulator bridge bumps whenever a flight is (re)loaded.
    pub session: String,
}

impl Default for SignalKeys {
    fn default() -> Self {
        Self {
            on_ground: "SIM ON GROUND".into(),
            altitude_agl_ft: "PLANE ALT ABOVE GROUND".into(),
            ground_speed_kt: "GROUND VELOCITY".into(),
            engines_running: "ENG COMBUSTION:1".into(),
            parking_brake: "BRAKE PARKING POSITION".into(),
            session: "FLIGHT SESSION".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Consecutive identical samples required before a phase change is
    /// confirmed.
    pub confirm_samples: u8,
    /// Above this height the aircraft counts as airborne.
    pub airborne_agl_ft: f32,
    /// Above this ground speed the aircraft counts as taxiing.
    pub taxi_speed_kt: f32,
    pub keys: SignalKeys,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            confirm_samples: 3,
            airborne_agl_ft: 50.0,
            taxi_speed_kt: 3.0,
            keys: SignalKeys::default(),
        }
    }
}

// --- Retry / plan loading ----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Consecutive boundary failures before a domain is held.
    pub max_consecutive_failures: u8,
    /// While held, a recovery probe is attempted every this many ticks.
    pub held_probe_interval_ticks: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 5,
            held_probe_interval_ticks: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Interval between successful polls of the plan source.
    pub poll_interval_ms: u64,
    /// First retry delay after a fetch failure.
    pub backoff_base_ms: u64,
    /// Retry delay ceiling.
    pub backoff_max_ms: u64,
    /// Larger payloads are rejected without parsing.
    pub max_payload_bytes: usize,
    pub max_passengers: u32,
    pub max_fuel_kg: f64,
    pub max_cargo_kg: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30_000,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
            max_payload_bytes: 4 * 1024 * 1024,
            max_passengers: 900,
            max_fuel_kg: 400_000.0,
            max_cargo_kg: 100_000.0,
        }
    }
}

// --- Root ----------------------------------------------------------------------

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Control loop interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Start armed services without waiting for an automation request.
    pub auto_start_on_arm: bool,
    /// Snap simulator amounts to the first plan instead of converging.
    pub cold_start_sync: bool,
    /// Recent events kept for diagnostics (capped by the history buffer).
    pub event_history: usize,

    pub fuel: FuelConfig,
    pub cargo: CargoConfig,
    pub passenger: PassengerConfig,
    pub door: DoorConfig,
    pub phase: PhaseConfig,
    pub retry: RetryConfig,
    pub plan: PlanConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000, // 1 Hz
            auto_start_on_arm: false,
            cold_start_sync: false,
            event_history: crate::diagnostics::HISTORY_CAP,
            fuel: FuelConfig::default(),
            cargo: CargoConfig::default(),
            passenger: PassengerConfig::default(),
            door: DoorConfig::default(),
            phase: PhaseConfig::default(),
            retry: RetryConfig::default(),
            plan: PlanConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Reject configurations that would make the control loop misbehave.
    ///
    /// Invalid values are reported, never silently clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be > 0"));
        }
        self.fuel.rate.validate("fuel.rate must be positive")?;
        self.cargo.rate.validate("cargo.rate must be positive")?;
        self.passenger.rate.validate("passenger.rate must be positive")?;
        self.door.rate.validate("door.rate must be positive")?;

        if self.fuel.key.is_empty() || self.passenger.key.is_empty() {
            return Err(ConfigError::ValidationFailed("simulator keys must not be empty"));
        }
        if !(self.fuel.tolerance_kg >= 0.0 && self.cargo.tolerance_kg >= 0.0)
            || !(self.door.tolerance_percent >= 0.0)
        {
            return Err(ConfigError::ValidationFailed("tolerances must be >= 0"));
        }
        if self.cargo.compartments.is_empty()
            || self.cargo.compartments.iter().map(|c| c.ratio as u64).sum::<u64>() == 0
        {
            return Err(ConfigError::ValidationFailed(
                "cargo.compartments needs at least one non-zero ratio",
            ));
        }
        if self.door.keys.is_empty() {
            return Err(ConfigError::ValidationFailed("door.keys must not be empty"));
        }
        if self.phase.confirm_samples == 0 {
            return Err(ConfigError::ValidationFailed("phase.confirm_samples must be >= 1"));
        }
        if self.retry.max_consecutive_failures == 0 || self.retry.held_probe_interval_ticks == 0 {
            return Err(ConfigError::ValidationFailed("retry limits must be >= 1"));
        }
        if self.plan.backoff_base_ms == 0 || self.plan.backoff_base_ms > self.plan.backoff_max_ms {
            return Err(ConfigError::ValidationFailed(
                "plan backoff needs 0 < backoff_base_ms <= backoff_max_ms",
            ));
        }
        if self.plan.max_payload_bytes == 0 {
            return Err(ConfigError::ValidationFailed("plan.max_payload_bytes must be > 0"));
        }
        Ok(())
    }

    /// Seconds per control tick.
    pub fn tick_secs(&self) -> f64 {
        f64::from(self.tick_interval_ms) / 1000.0
    }
}
