//! Orchestrator integration tests.
//!
//! Exercise the full tick pipeline (plan hand-off, phase detection,
//! gating, domain stepping, fault handling) against `MockSim`.

use groundcrew::app::commands::AppCommand;
use groundcrew::app::events::AppEvent;
use groundcrew::app::service::Lifecycle;
use groundcrew::domain::{Domain, OpStatus, Operation};
use groundcrew::error::PortError;
use groundcrew::phase::FlightPhase;
use groundcrew::plan::FlightPlan;

use crate::mock_sim::{Harness, test_config};

const FUEL: &str = "FUEL TOTAL QUANTITY WEIGHT";
const CARGO_MAIN: &str = "PAYLOAD STATION WEIGHT:5";
const CARGO_BULK: &str = "PAYLOAD STATION WEIGHT:6";
const PAX: &str = "PAX COUNT";

fn force(h: &mut Harness, phase: FlightPhase) {
    h.orch
        .handle_command(AppCommand::ForcePhase(phase), &mut h.sink)
        .unwrap();
}

// ── Convergence ───────────────────────────────────────────────

#[test]
fn fuel_converges_in_exactly_ten_ticks() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 1000.0, 0.0, 0));
    h.auto.request(Domain::Fuel);

    h.ticks(9);
    assert_eq!(h.orch.domain_state(Domain::Fuel).status, OpStatus::InProgress);
    assert_eq!(h.sim.get(FUEL), 900.0);

    h.tick();
    let fuel = h.orch.domain_state(Domain::Fuel);
    assert_eq!(fuel.status, OpStatus::Stopped);
    assert_eq!(fuel.current, 1000.0);
    assert_eq!(h.sim.get(FUEL), 1000.0);

    let before = h.sink.events.len();
    let writes = h.sim.writes_to(FUEL);
    h.tick();
    assert_eq!(h.sink.events.len(), before, "11th tick must be silent");
    assert_eq!(h.sim.writes_to(FUEL), writes);

    let statuses: Vec<OpStatus> = h
        .sink
        .service_events(Domain::Fuel)
        .iter()
        .map(|e| e.to)
        .collect();
    assert_eq!(
        statuses,
        vec![OpStatus::Started, OpStatus::InProgress, OpStatus::Stopped]
    );
}

#[test]
fn cargo_split_lands_in_compartments() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 0.0, 137.0, 0));
    h.tick();
    force(&mut h, FlightPhase::Boarding);
    h.auto.request(Domain::Cargo);
    h.ticks(2);

    assert_eq!(h.orch.domain_state(Domain::Cargo).status, OpStatus::Stopped);
    assert_eq!(h.sim.get(CARGO_MAIN), 110.0);
    assert_eq!(h.sim.get(CARGO_BULK), 27.0);
}

// ── Idempotence ───────────────────────────────────────────────

#[test]
fn double_start_emits_one_started_event() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 1000.0, 0.0, 0));
    h.tick();
    for _ in 0..2 {
        h.orch
            .handle_command(AppCommand::StartService(Domain::Fuel), &mut h.sink)
            .unwrap();
    }
    assert_eq!(h.sink.count_to(Domain::Fuel, OpStatus::Started), 1);

    for _ in 0..2 {
        h.orch
            .handle_command(AppCommand::StopService(Domain::Fuel), &mut h.sink)
            .unwrap();
    }
    assert_eq!(h.sink.count_to(Domain::Fuel, OpStatus::Stopped), 1);
}

// ── Reset isolation ───────────────────────────────────────────

#[test]
fn new_plan_resets_before_next_step() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 1000.0, 0.0, 0));
    h.auto.request(Domain::Fuel);
    h.ticks(3);
    assert_eq!(h.orch.domain_state(Domain::Fuel).status, OpStatus::InProgress);
    assert_eq!(h.sim.get(FUEL), 300.0);

    h.auto.clear_requests();
    h.publish(FlightPlan::with_targets("OFP2", 450.0, 0.0, 0));
    h.tick();
    let fuel = h.orch.domain_state(Domain::Fuel);
    assert_eq!(fuel.status, OpStatus::Idle);
    assert_eq!(fuel.planned, 450.0);
    assert_eq!(h.sim.get(FUEL), 300.0, "no write after the reset");

    h.auto.request(Domain::Fuel);
    h.ticks(2);
    let fuel = h.orch.domain_state(Domain::Fuel);
    assert_eq!(fuel.status, OpStatus::Stopped);
    assert_eq!(fuel.current, 450.0);
    assert_eq!(h.sim.get(FUEL), 450.0);
    assert!(h.sim.writes.iter().all(|(_, v)| *v <= 1000.0));
}

#[test]
fn plan_loaded_reported_once_per_plan() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 100.0, 0.0, 0));
    h.tick();
    h.publish(FlightPlan::with_targets("OFP1", 100.0, 0.0, 0));
    h.publish(FlightPlan::with_targets("OFP2", 200.0, 0.0, 0));
    h.tick();
    let ids: Vec<String> = h
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::PlanLoaded { id, .. } => Some(id.0.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec!["OFP1".to_owned(), "OFP2".to_owned()]);
}

// ── Fault isolation ───────────────────────────────────────────

#[test]
fn cargo_failures_do_not_delay_fuel() {
    let mut config = test_config();
    config.retry.max_consecutive_failures = 10;
    let mut h = Harness::new(config);
    h.publish(FlightPlan::with_targets("OFP1", 1000.0, 500.0, 0));
    h.tick();
    force(&mut h, FlightPhase::Boarding);
    h.auto.request(Domain::Fuel);
    h.auto.request(Domain::Cargo);
    h.sim.fail(CARGO_MAIN, 5, PortError::Rejected);

    h.ticks(10);
    assert_eq!(h.orch.domain_state(Domain::Fuel).status, OpStatus::Stopped);
    assert_eq!(h.sim.get(FUEL), 1000.0);

    // Cargo lost five ticks, then caught up.
    assert_eq!(h.orch.domain_state(Domain::Cargo).status, OpStatus::Stopped);
    assert_eq!(h.sim.get(CARGO_MAIN) + h.sim.get(CARGO_BULK), 500.0);
    assert!(!h.orch.is_held(Domain::Cargo));
    assert!(
        !h.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::DomainDegraded { .. }))
    );
}

#[test]
fn persistent_failure_holds_then_recovers() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 1000.0, 500.0, 0));
    h.tick();
    force(&mut h, FlightPhase::Boarding);
    h.auto.request(Domain::Fuel);
    h.auto.request(Domain::Cargo);
    h.sim.fail(CARGO_MAIN, 5, PortError::Timeout);

    h.ticks(5);
    assert!(h.orch.is_held(Domain::Cargo));
    assert_eq!(h.orch.domain_state(Domain::Cargo).status, OpStatus::Held);
    assert!(h.sink.events.contains(&AppEvent::DomainDegraded {
        domain: Domain::Cargo,
        error: PortError::Timeout,
        consecutive: 5,
    }));
    assert!(!h.orch.is_held(Domain::Fuel));

    // Probe every 10 ticks while held.
    h.ticks(9);
    assert!(h.orch.is_held(Domain::Cargo));
    h.tick();
    assert!(!h.orch.is_held(Domain::Cargo));
    assert!(h.sink.events.contains(&AppEvent::DomainRecovered(Domain::Cargo)));

    h.ticks(5);
    assert_eq!(h.orch.domain_state(Domain::Cargo).status, OpStatus::Stopped);
    assert_eq!(h.orch.domain_state(Domain::Fuel).status, OpStatus::Stopped);
}

#[test]
fn implausible_reading_is_clamped_and_reported() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 1000.0, 0.0, 0));
    h.auto.request(Domain::Fuel);
    h.sim.set(FUEL, -50.0);
    h.tick();
    assert!(
        h.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::RangeClamped(v) if v.domain == Domain::Fuel && v.clamped == 0.0))
    );
    assert_eq!(h.sim.get(FUEL), 100.0);
}

// ── Phases ────────────────────────────────────────────────────

#[test]
fn taxi_out_back_to_preflight_resets_services() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 0.0, 1000.0, 0));
    h.auto.set_boarding(true);
    h.auto.request(Domain::Cargo);
    h.ticks(2);
    assert_eq!(h.orch.phase(), FlightPhase::Boarding);
    h.ticks(2);
    assert_eq!(h.orch.domain_state(Domain::Cargo).status, OpStatus::InProgress);

    h.auto.set_boarding(false);
    h.taxiing();
    h.ticks(2);
    assert_eq!(h.orch.phase(), FlightPhase::TaxiOut);
    assert_eq!(h.orch.domain_state(Domain::Cargo).status, OpStatus::Stopped);

    // Simulator repositioned to the gate.
    h.parked(1);
    h.ticks(2);
    assert_eq!(h.orch.phase(), FlightPhase::Preflight);
    assert!(h.sink.events.contains(&AppEvent::PhaseReset {
        from: FlightPhase::TaxiOut,
        to: FlightPhase::Preflight,
    }));
    let cargo = h.orch.domain_state(Domain::Cargo);
    assert_eq!(cargo.status, OpStatus::Idle);
    assert_eq!(cargo.planned, 1000.0);

    // Boarding again picks cargo up where the simulator left it.
    h.auto.set_boarding(true);
    h.ticks(2);
    assert_eq!(h.orch.phase(), FlightPhase::Boarding);
    assert!(h.orch.domain_state(Domain::Cargo).status.is_running());
    h.ticks(10);
    assert_eq!(h.orch.domain_state(Domain::Cargo).status, OpStatus::Stopped);
    assert_eq!(h.sim.get(CARGO_MAIN) + h.sim.get(CARGO_BULK), 1000.0);
    assert_eq!(h.orch.lifecycle(), Lifecycle::Active);
}

#[test]
fn session_change_resets_immediately() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 1000.0, 0.0, 0));
    h.auto.request(Domain::Fuel);
    h.ticks(2);
    h.auto.clear_requests();
    h.parked(2);
    h.tick();
    assert!(
        h.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::PhaseReset { .. }))
    );
    assert_eq!(h.orch.domain_state(Domain::Fuel).status, OpStatus::Idle);
}

#[test]
fn full_flight_cycle() {
    let mut config = test_config();
    config.auto_start_on_arm = true;
    let mut h = Harness::new(config);
    h.publish(FlightPlan::with_targets("OFP1", 0.0, 200.0, 20));
    h.tick();
    assert_eq!(h.orch.phase(), FlightPhase::Preflight);

    h.auto.set_boarding(true);
    h.ticks(5);
    assert_eq!(h.orch.phase(), FlightPhase::Boarding);
    assert_eq!(h.sim.get(PAX), 20.0);
    assert_eq!(h.sim.get(CARGO_MAIN) + h.sim.get(CARGO_BULK), 200.0);
    assert_eq!(h.sim.get("EXIT OPEN:0"), 100.0);

    h.auto.set_boarding(false);
    h.auto.set_pushback(true);
    h.ticks(4);
    assert_eq!(h.orch.phase(), FlightPhase::Pushback);
    assert_eq!(h.sim.get("EXIT OPEN:0"), 0.0);
    assert!(!h.orch.arming().boarding_writes);

    h.auto.set_pushback(false);
    h.taxiing();
    h.ticks(2);
    assert_eq!(h.orch.phase(), FlightPhase::TaxiOut);

    h.airborne();
    h.ticks(2);
    assert_eq!(h.orch.phase(), FlightPhase::Flight);

    h.landed_at_gate();
    h.taxiing();
    h.ticks(2);
    assert_eq!(h.orch.phase(), FlightPhase::TaxiIn);

    h.landed_at_gate();
    h.ticks(2);
    assert_eq!(h.orch.phase(), FlightPhase::Arrival);
    h.ticks(3);
    assert_eq!(h.sim.get(PAX), 0.0);
    assert_eq!(h.sim.get(CARGO_MAIN) + h.sim.get(CARGO_BULK), 0.0);
    assert_eq!(h.sim.get("EXIT OPEN:0"), 100.0);

    for domain in [Domain::Cargo, Domain::Passenger] {
        let stops: Vec<Operation> = h
            .sink
            .service_events(domain)
            .iter()
            .filter(|e| e.to == OpStatus::Stopped)
            .map(|e| e.operation)
            .collect();
        assert_eq!(stops, vec![Operation::Load, Operation::Unload], "{domain}");
    }

    h.auto.set_deboarding_complete(true);
    h.ticks(2);
    assert_eq!(h.orch.phase(), FlightPhase::Turnaround);

    // Next leg.
    h.auto.set_deboarding_complete(false);
    h.publish(FlightPlan::with_targets("OFP2", 0.0, 100.0, 10));
    h.tick();
    assert_eq!(h.orch.phase(), FlightPhase::Preflight);
    assert!(h.sink.events.contains(&AppEvent::PhaseReset {
        from: FlightPhase::Turnaround,
        to: FlightPhase::Preflight,
    }));
    assert_eq!(h.orch.domain_state(Domain::Passenger).planned, 10.0);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn writes_refused_in_flight() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 1000.0, 0.0, 0));
    h.tick();
    force(&mut h, FlightPhase::Flight);
    assert!(
        h.orch
            .handle_command(AppCommand::StartService(Domain::Fuel), &mut h.sink)
            .is_err()
    );
    h.auto.request(Domain::Fuel);
    h.airborne();
    h.ticks(3);
    assert_eq!(h.orch.domain_state(Domain::Fuel).status, OpStatus::Idle);
    assert_eq!(h.sim.writes_to(FUEL), 0);
}

#[test]
fn shutdown_stops_everything() {
    let mut h = Harness::new(test_config());
    h.publish(FlightPlan::with_targets("OFP1", 1000.0, 0.0, 0));
    h.auto.request(Domain::Fuel);
    h.ticks(2);
    h.orch
        .handle_command(AppCommand::Shutdown, &mut h.sink)
        .unwrap();
    assert_eq!(h.orch.lifecycle(), Lifecycle::Terminated);
    assert_eq!(h.sink.events.last(), Some(&AppEvent::Terminated));
    let writes = h.sim.writes.len();
    h.ticks(3);
    assert_eq!(h.sim.writes.len(), writes);
}
