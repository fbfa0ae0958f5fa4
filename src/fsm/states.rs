//! Per-phase enter/exit actions and the table builder.
//!
//! Each phase is two plain `fn` pointers that rewrite the arming in the
//! shared context.  No closures, no heap.
//!
//! ```text
//!  PREFLIGHT ──▶ BOARDING ──▶ PUSHBACK ──▶ TAXI_OUT ──▶ FLIGHT
//!   fuel,door     all four      door          -            -
//!   doors open                  doors shut
//!                                                          │
//!  TURNAROUND ◀── ARRIVAL ◀──────────── TAXI_IN ◀──────────┘
//!   door           door, cargo, pax       -
//!   doors open     unload, doors open
//! ```

use super::context::{DoorTarget, GateContext};
use super::PhaseDescriptor;
use crate::domain::Domain;
use crate::phase::FlightPhase;
use log::debug;

/// Build the static phase table.  Called once at startup.
pub fn build_phase_table() -> [PhaseDescriptor; FlightPhase::COUNT] {
    [
        PhaseDescriptor {
            phase: FlightPhase::Preflight,
            on_enter: Some(preflight_enter),
            on_exit: None,
        },
        PhaseDescriptor {
            phase: FlightPhase::Boarding,
            on_enter: Some(boarding_enter),
            on_exit: Some(boarding_exit),
        },
        PhaseDescriptor {
            phase: FlightPhase::Pushback,
            on_enter: Some(pushback_enter),
            on_exit: None,
        },
        PhaseDescriptor {
            phase: FlightPhase::TaxiOut,
            on_enter: Some(sealed_enter),
            on_exit: None,
        },
        PhaseDescriptor {
            phase: FlightPhase::Flight,
            on_enter: Some(sealed_enter),
            on_exit: None,
        },
        PhaseDescriptor {
            phase: FlightPhase::TaxiIn,
            on_enter: Some(sealed_enter),
            on_exit: None,
        },
        PhaseDescriptor {
            phase: FlightPhase::Arrival,
            on_enter: Some(arrival_enter),
            on_exit: Some(arrival_exit),
        },
        PhaseDescriptor {
            phase: FlightPhase::Turnaround,
            on_enter: Some(turnaround_enter),
            on_exit: None,
        },
    ]
}

// ── Preflight ─────────────────────────────────────────────────

fn preflight_enter(ctx: &mut GateContext) {
    let a = &mut ctx.arming;
    a.disarm_all();
    a.arm(Domain::Fuel);
    a.arm(Domain::Door);
    a.door = DoorTarget::Open;
    a.boarding_writes = true;
    a.unload = false;
    debug!("gate: preflight armed fuel and doors");
}

// ── Boarding ──────────────────────────────────────────────────

fn boarding_enter(ctx: &mut GateContext) {
    let a = &mut ctx.arming;
    for d in Domain::ORDER {
        a.arm(d);
    }
    a.door = DoorTarget::Open;
    a.boarding_writes = true;
    a.unload = false;
    debug!("gate: boarding armed all domains");
}

fn boarding_exit(ctx: &mut GateContext) {
    debug!(
        "gate: boarding finished after {} ticks",
        ctx.ticks_in_phase
    );
}

// ── Pushback ──────────────────────────────────────────────────

fn pushback_enter(ctx: &mut GateContext) {
    let a = &mut ctx.arming;
    a.disarm_all();
    a.arm(Domain::Door);
    a.door = DoorTarget::Closed;
    a.boarding_writes = false;
    a.unload = false;
    debug!("gate: pushback closing doors");
}

// ── TaxiOut / Flight / TaxiIn ─────────────────────────────────

fn sealed_enter(ctx: &mut GateContext) {
    let a = &mut ctx.arming;
    a.disarm_all();
    a.door = DoorTarget::Closed;
    a.boarding_writes = false;
    a.unload = false;
}

// ── Arrival ───────────────────────────────────────────────────

fn arrival_enter(ctx: &mut GateContext) {
    let a = &mut ctx.arming;
    a.disarm_all();
    a.arm(Domain::Door);
    a.arm(Domain::Cargo);
    a.arm(Domain::Passenger);
    a.door = DoorTarget::Open;
    a.boarding_writes = true;
    a.unload = true;
    debug!("gate: arrival unloading cargo and passengers");
}

fn arrival_exit(ctx: &mut GateContext) {
    ctx.arming.unload = false;
}

// ── Turnaround ────────────────────────────────────────────────

fn turnaround_enter(ctx: &mut GateContext) {
    let a = &mut ctx.arming;
    a.disarm_all();
    a.arm(Domain::Door);
    a.door = DoorTarget::Open;
    a.boarding_writes = true;
    a.unload = false;
}
