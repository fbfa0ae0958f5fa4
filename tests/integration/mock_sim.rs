//! Mock adapters for integration tests.
//!
//! `MockSim` records every write and can fail a key for a fixed number of
//! calls, so tests can assert on the full boundary history.

use std::collections::HashMap;
use std::sync::Arc;

use groundcrew::adapters::automation::ScriptedAutomation;
use groundcrew::adapters::time::ManualClock;
use groundcrew::app::events::AppEvent;
use groundcrew::app::ports::{EventSink, SimulatorPort};
use groundcrew::app::service::{Orchestrator, ServiceSet};
use groundcrew::config::{RateSource, SystemConfig};
use groundcrew::domain::{Domain, OpStatus, ServiceEvent};
use groundcrew::error::PortError;
use groundcrew::plan::{FlightPlan, PlanMailbox};
use groundcrew::units::MassUnit;

// ── MockSim ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockSim {
    values: HashMap<String, f64>,
    /// key -> (remaining failures, error)
    failures: HashMap<String, (u32, PortError)>,
    pub writes: Vec<(String, f64)>,
}

#[allow(dead_code)]
impl MockSim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_owned(), value);
    }

    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(f64::NAN)
    }

    /// The next `times` reads and writes of `key` fail with `err`.
    pub fn fail(&mut self, key: &str, times: u32, err: PortError) {
        self.failures.insert(key.to_owned(), (times, err));
    }

    pub fn writes_to(&self, key: &str) -> usize {
        self.writes.iter().filter(|(k, _)| k == key).count()
    }

    fn check(&mut self, key: &str) -> Result<(), PortError> {
        if let Some((left, err)) = self.failures.get_mut(key)
            && *left > 0
        {
            *left -= 1;
            return Err(*err);
        }
        Ok(())
    }
}

impl SimulatorPort for MockSim {
    fn read_value(&mut self, key: &str) -> Result<f64, PortError> {
        self.check(key)?;
        self.values.get(key).copied().ok_or(PortError::Unavailable)
    }

    fn write_value(&mut self, key: &str, value: f64) -> Result<(), PortError> {
        self.check(key)?;
        self.values.insert(key.to_owned(), value);
        self.writes.push((key.to_owned(), value));
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn service_events(&self, domain: Domain) -> Vec<ServiceEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Service(s) if s.domain == domain => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count_to(&self, domain: Domain, status: OpStatus) -> usize {
        self.service_events(domain)
            .iter()
            .filter(|e| e.to == status)
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

/// Config with kilogram simulator units and round rates.
pub fn test_config() -> SystemConfig {
    let mut c = SystemConfig::default();
    c.fuel.sim_unit = MassUnit::Kilograms;
    c.fuel.rate = RateSource::Fixed { per_tick: 100.0 };
    c.cargo.sim_unit = MassUnit::Kilograms;
    c.cargo.rate = RateSource::Fixed { per_tick: 100.0 };
    c.passenger.rate = RateSource::Fixed { per_tick: 10.0 };
    c.door.rate = RateSource::Fixed { per_tick: 50.0 };
    c.phase.confirm_samples = 2;
    c
}

pub struct Harness {
    pub orch: Orchestrator,
    pub sim: MockSim,
    pub auto: ScriptedAutomation,
    pub clock: ManualClock,
    pub mailbox: Arc<PlanMailbox>,
    pub sink: RecordingSink,
    pub config: SystemConfig,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(config: SystemConfig) -> Self {
        let mut sim = MockSim::new();
        sim.set(&config.fuel.key, 0.0);
        for c in &config.cargo.compartments {
            sim.set(&c.key, 0.0);
        }
        sim.set(&config.passenger.key, 0.0);
        for k in &config.door.keys {
            sim.set(k, 0.0);
        }
        let mailbox = Arc::new(PlanMailbox::new());
        let clock = ManualClock::new(0);
        let services = ServiceSet::from_config(&config);
        let mut orch = Orchestrator::new(
            config.clone(),
            services,
            mailbox.clone(),
            Box::new(clock.clone()),
        );
        let mut sink = RecordingSink::default();
        orch.start(&mut sink);

        let mut h = Self {
            orch,
            sim,
            auto: ScriptedAutomation::new(),
            clock,
            mailbox,
            sink,
            config,
        };
        h.parked(1);
        h
    }

    /// On the ground, engines off, brake set.
    pub fn parked(&mut self, session: u32) {
        let k = self.config.phase.keys.clone();
        self.sim.set(&k.on_ground, 1.0);
        self.sim.set(&k.altitude_agl_ft, 0.0);
        self.sim.set(&k.ground_speed_kt, 0.0);
        self.sim.set(&k.engines_running, 0.0);
        self.sim.set(&k.parking_brake, 1.0);
        self.sim.set(&k.session, f64::from(session));
    }

    pub fn taxiing(&mut self) {
        let k = self.config.phase.keys.clone();
        self.sim.set(&k.engines_running, 1.0);
        self.sim.set(&k.parking_brake, 0.0);
        self.sim.set(&k.ground_speed_kt, 12.0);
    }

    pub fn airborne(&mut self) {
        let k = self.config.phase.keys.clone();
        self.sim.set(&k.on_ground, 0.0);
        self.sim.set(&k.altitude_agl_ft, 3000.0);
        self.sim.set(&k.ground_speed_kt, 250.0);
    }

    pub fn landed_at_gate(&mut self) {
        let k = self.config.phase.keys.clone();
        self.sim.set(&k.on_ground, 1.0);
        self.sim.set(&k.altitude_agl_ft, 0.0);
        self.sim.set(&k.ground_speed_kt, 0.0);
        self.sim.set(&k.engines_running, 0.0);
        self.sim.set(&k.parking_brake, 1.0);
    }

    pub fn publish(&self, plan: FlightPlan) {
        self.mailbox.publish(Arc::new(plan));
    }

    pub fn tick(&mut self) {
        self.clock.advance(1000);
        self.orch.tick(&mut self.sim, &mut self.auto, &mut self.sink);
    }

    pub fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }
}
