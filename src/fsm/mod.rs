//! Function-pointer phase gate.
//!
//! Classic embedded FSM table, indexed by [`FlightPhase`]:
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │  PhaseTable                                    │
//! │  ┌────────────┬────────────┬────────────┐      │
//! │  │ Phase      │ on_enter   │ on_exit    │      │
//! │  ├────────────┼────────────┼────────────┤      │
//! │  │ Preflight  │ fn(ctx)    │ -          │      │
//! │  │ Boarding   │ fn(ctx)    │ fn(ctx)    │      │
//! │  │ Pushback   │ fn(ctx)    │ -          │      │
//! │  │ ...        │            │            │      │
//! │  │ Arrival    │ fn(ctx)    │ fn(ctx)    │      │
//! │  │ Turnaround │ fn(ctx)    │ -          │      │
//! │  └────────────┴────────────┴────────────┘      │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! Unlike a self-driving FSM there is no per-state update handler: the
//! [`PhaseDetector`](crate::phase::PhaseDetector) decides when the phase
//! changes and the orchestrator calls [`PhaseGate::transition`].  The
//! actions only rewrite the [`Arming`](context::Arming) in the shared
//! [`GateContext`].

pub mod context;
pub mod states;

use context::GateContext;
use log::info;

use crate::phase::FlightPhase;

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each phase transition.
pub type GateActionFn = fn(&mut GateContext);

/// Static descriptor for a single phase.
pub struct PhaseDescriptor {
    pub phase: FlightPhase,
    pub on_enter: Option<GateActionFn>,
    pub on_exit: Option<GateActionFn>,
}

/// The phase gate engine.
pub struct PhaseGate {
    /// Fixed-size table indexed by `FlightPhase as usize`.
    table: [PhaseDescriptor; FlightPhase::COUNT],
    current: usize,
    tick_count: u64,
    phase_entry_tick: u64,
}

impl PhaseGate {
    pub fn new(table: [PhaseDescriptor; FlightPhase::COUNT], initial: FlightPhase) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            phase_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first tick.
    pub fn start(&mut self, ctx: &mut GateContext) {
        info!("phase gate starting in {}", self.table[self.current].phase);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Count one control tick.
    pub fn tick(&mut self, ctx: &mut GateContext) {
        self.tick_count += 1;
        ctx.total_ticks = self.tick_count;
        ctx.ticks_in_phase = self.tick_count - self.phase_entry_tick;
    }

    /// `on_exit(current)`, move, `on_enter(next)`.  Re-entering the current
    /// phase runs both actions again (used after a reset).
    pub fn transition(&mut self, next: FlightPhase, ctx: &mut GateContext) {
        let next_idx = next as usize;
        info!(
            "gate transition: {} -> {}",
            self.table[self.current].phase, self.table[next_idx].phase
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.phase_entry_tick = self.tick_count;
        ctx.ticks_in_phase = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    pub fn current_phase(&self) -> FlightPhase {
        FlightPhase::from_index(self.current)
    }

    pub fn ticks_in_current_phase(&self) -> u64 {
        self.tick_count - self.phase_entry_tick
    }
}

#[cfg(test)]
mod tests {
    use super::context::DoorTarget;
    use super::*;
    use crate::domain::Domain;

    fn make_gate() -> (PhaseGate, GateContext) {
        let mut gate = PhaseGate::new(states::build_phase_table(), FlightPhase::Preflight);
        let mut ctx = GateContext::new();
        gate.start(&mut ctx);
        (gate, ctx)
    }

    #[test]
    fn start_runs_on_enter() {
        let (_, ctx) = make_gate();
        assert!(ctx.arming.is_armed(Domain::Fuel));
        assert!(ctx.arming.is_armed(Domain::Door));
        assert!(!ctx.arming.is_armed(Domain::Cargo));
        assert_eq!(ctx.arming.door, DoorTarget::Open);
    }

    #[test]
    fn boarding_arms_everything() {
        let (mut gate, mut ctx) = make_gate();
        gate.transition(FlightPhase::Boarding, &mut ctx);
        for d in Domain::ORDER {
            assert!(ctx.arming.is_armed(d), "{d} should be armed");
        }
        assert!(ctx.arming.boarding_writes);
    }

    #[test]
    fn pushback_closes_doors_and_disarms_loading() {
        let (mut gate, mut ctx) = make_gate();
        gate.transition(FlightPhase::Boarding, &mut ctx);
        gate.transition(FlightPhase::Pushback, &mut ctx);
        assert_eq!(ctx.arming.door, DoorTarget::Closed);
        assert!(ctx.arming.is_armed(Domain::Door));
        assert!(!ctx.arming.is_armed(Domain::Fuel));
        assert!(!ctx.arming.is_armed(Domain::Passenger));
        assert!(!ctx.arming.boarding_writes);
    }

    #[test]
    fn flight_disarms_everything() {
        let (mut gate, mut ctx) = make_gate();
        for p in [FlightPhase::TaxiOut, FlightPhase::Flight, FlightPhase::TaxiIn] {
            gate.transition(p, &mut ctx);
            assert_eq!(ctx.arming.mask(), 0, "{p}");
            assert!(!ctx.arming.boarding_writes);
        }
    }

    #[test]
    fn arrival_unloads_and_turnaround_clears_unload() {
        let (mut gate, mut ctx) = make_gate();
        gate.transition(FlightPhase::Arrival, &mut ctx);
        assert!(ctx.arming.unload);
        assert!(ctx.arming.is_armed(Domain::Cargo));
        assert!(ctx.arming.is_armed(Domain::Passenger));
        assert!(!ctx.arming.is_armed(Domain::Fuel));
        assert_eq!(ctx.arming.door, DoorTarget::Open);

        gate.transition(FlightPhase::Turnaround, &mut ctx);
        assert!(!ctx.arming.unload);
        assert_eq!(ctx.arming.mask(), 1 << Domain::Door.index());
    }

    #[test]
    fn tick_counts_time_in_phase() {
        let (mut gate, mut ctx) = make_gate();
        gate.tick(&mut ctx);
        gate.tick(&mut ctx);
        assert_eq!(gate.ticks_in_current_phase(), 2);
        gate.transition(FlightPhase::Boarding, &mut ctx);
        assert_eq!(gate.ticks_in_current_phase(), 0);
        gate.tick(&mut ctx);
        assert_eq!(ctx.ticks_in_phase, 1);
        assert_eq!(ctx.total_ticks, 3);
    }

    #[test]
    fn table_rows_match_their_index() {
        for (i, row) in states::build_phase_table().iter().enumerate() {
            assert_eq!(row.phase as usize, i);
        }
    }
}
