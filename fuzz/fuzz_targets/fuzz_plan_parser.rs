//! Fuzz target: `parse_plan`
//!
//! Feeds arbitrary bytes to the plan parser and checks that it never
//! panics, never accepts markup declarations, and never yields a plan
//! outside the configured limits.
//!
//! cargo fuzz run fuzz_plan_parser

#![no_main]

use groundcrew::plan::{PlanLimits, parse_plan};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let limits = PlanLimits::default();
    let Ok(plan) = parse_plan(data, &limits) else {
        return;
    };

    let text = String::from_utf8_lossy(data).to_ascii_uppercase();
    assert!(!text.contains("<!DOCTYPE"), "DOCTYPE payload accepted");
    assert!(!text.contains("<!ENTITY"), "ENTITY payload accepted");

    assert!(plan.fuel_kg.is_finite() && plan.fuel_kg >= 0.0);
    assert!(plan.fuel_kg <= limits.max_fuel_kg);
    assert!(plan.cargo_kg.is_finite() && plan.cargo_kg >= 0.0);
    assert!(plan.cargo_kg <= limits.max_cargo_kg);
    assert!(plan.passengers <= limits.max_passengers);
    assert!(!plan.id.0.is_empty());
});
