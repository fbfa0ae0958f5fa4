//! Mass unit conversions and convergence arithmetic.
//!
//! Everything here is a pure function: no state, no globals beyond the
//! conversion constant.  Domain services and the plan parser share it.

use serde::{Deserialize, Serialize};

/// Pounds per kilogram (exact by the 1959 international pound definition).
pub const LBS_PER_KG: f64 = 2.204_622_621_848_776;

/// Convert kilograms to pounds.
pub fn kg_to_lbs(kg: f64) -> f64 {
    kg * LBS_PER_KG
}

/// Convert pounds to kilograms.
pub fn lbs_to_kg(lbs: f64) -> f64 {
    lbs / LBS_PER_KG
}

/// Mass unit used by an external boundary (simulator variable, plan file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MassUnit {
    #[default]
    Kilograms,
    Pounds,
}

impl MassUnit {
    /// Parse the unit tag used by flight-plan payloads (`"kgs"`, `"lbs"`, ...).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "kg" | "kgs" | "kilograms" => Some(Self::Kilograms),
            "lb" | "lbs" | "pounds" => Some(Self::Pounds),
            _ => None,
        }
    }

    /// Convert a value expressed in `self` into kilograms.
    pub fn to_kg(self, value: f64) -> f64 {
        match self {
            Self::Kilograms => value,
            Self::Pounds => lbs_to_kg(value),
        }
    }

    /// Convert kilograms into a value expressed in `self`.
    pub fn from_kg(self, kg: f64) -> f64 {
        match self {
            Self::Kilograms => kg,
            Self::Pounds => kg_to_lbs(kg),
        }
    }
}

impl core::fmt::Display for MassUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Kilograms => write!(f, "kg"),
            Self::Pounds => write!(f, "lbs"),
        }
    }
}

/// Move `current` toward `target` by at most `step`.
///
/// Never overshoots the target and never returns a negative amount.  A
/// non-positive or non-finite `step` leaves `current` unchanged.
pub fn approach(current: f64, target: f64, step: f64) -> f64 {
    if !step.is_finite() || step <= 0.0 {
        return current.max(0.0);
    }
    let next = if current < target {
        (current + step).min(target)
    } else {
        (current - step).max(target)
    };
    next.max(0.0)
}

/// Absolute closeness check used by convergence tolerance.
pub fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
