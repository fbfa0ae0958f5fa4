//! Passenger service.  Counts are whole passengers; the per-tick rate is
//! rounded down with a floor of one passenger; a zero simulator rate
//! leaves the cabin as it is.

use crate::app::ports::SimulatorPort;
use crate::config::PassengerConfig;
use crate::error::PortError;
use crate::plan::FlightPlan;
use crate::safety::clamp_observed;

use super::{Convergence, Domain, GroundService, StepInput, StepReport, Unit, whole_unit_rate};

pub struct PassengerService {
    core: Convergence,
    cfg: PassengerConfig,
}

impl PassengerService {
    pub fn new(cfg: PassengerConfig) -> Self {
        Self {
            core: Convergence::new(Domain::Passenger, Unit::Passengers, cfg.rate.clone(), 0.0),
            cfg,
        }
    }

    fn read_count(&self, sim: &mut dyn SimulatorPort, report: &mut StepReport) -> Result<f64, PortError> {
        let raw = sim.read_value(&self.cfg.key)?;
        let (count, clamped) = clamp_observed(Domain::Passenger, raw, self.cfg.max_plausible)?;
        report.clamped = clamped;
        Ok(count.round())
    }
}

impl GroundService for PassengerService {
    fn core(&self) -> &Convergence {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Convergence {
        &mut self.core
    }

    fn planned_from(&self, plan: &FlightPlan) -> f64 {
        f64::from(plan.passengers)
    }

    fn step(
        &mut self,
        sim: &mut dyn SimulatorPort,
        input: &StepInput,
    ) -> Result<StepReport, PortError> {
        let mut report = StepReport::default();
        if !self.core.state().status.is_running() {
            return Ok(report);
        }

        let observed = self.read_count(sim, &mut report)?;
        let rate = whole_unit_rate(self.core.rate(sim)?);
        if let Some(next) = self.core.advance(observed, rate, input, &mut report) {
            self.write_amount(sim, next)?;
            self.core.commit(next, input.now_ms, &mut report);
        }
        Ok(report)
    }

    fn probe(&mut self, sim: &mut dyn SimulatorPort) -> Result<(), PortError> {
        let mut scratch = StepReport::default();
        self.read_count(sim, &mut scratch).map(|_| ())
    }

    fn write_amount(&mut self, sim: &mut dyn SimulatorPort, count: f64) -> Result<(), PortError> {
        sim.write_value(&self.cfg.key, count.round())
    }
}
