//! Fuel service.
//!
//! Mass is kept in kilograms internally.  The simulator variable may use a
//! different unit (`fuel.sim_unit`); every read and write converts through
//! [`MassUnit`](crate::units::MassUnit).

use crate::app::ports::SimulatorPort;
use crate::config::FuelConfig;
use crate::error::PortError;
use crate::plan::FlightPlan;
use crate::safety::clamp_observed;

use super::{Convergence, Domain, GroundService, StepInput, StepReport, Unit};

pub struct FuelService {
    core: Convergence,
    cfg: FuelConfig,
}

impl FuelService {
    pub fn new(cfg: FuelConfig) -> Self {
        Self {
            core: Convergence::new(Domain::Fuel, Unit::Kilograms, cfg.rate.clone(), cfg.tolerance_kg),
            cfg,
        }
    }

    fn read_kg(&self, sim: &mut dyn SimulatorPort) -> Result<f64, PortError> {
        let raw = sim.read_value(&self.cfg.key)?;
        Ok(self.cfg.sim_unit.to_kg(raw))
    }
}

impl GroundService for FuelService {
    fn core(&self) -> &Convergence {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Convergence {
        &mut self.core
    }

    fn planned_from(&self, plan: &FlightPlan) -> f64 {
        plan.fuel_kg
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

        let observed = self.read_kg(sim)?;
        let (observed, clamped) = clamp_observed(Domain::Fuel, observed, self.cfg.max_plausible_kg)?;
        report.clamped = clamped;

        let rate = self.core.rate(sim)?;
        if let Some(next) = self.core.advance(observed, rate, input, &mut report) {
            self.write_amount(sim, next)?;
            self.core.commit(next, input.now_ms, &mut report);
        }
        Ok(report)
    }

    fn probe(&mut self, sim: &mut dyn SimulatorPort) -> Result<(), PortError> {
        let kg = self.read_kg(sim)?;
        clamp_observed(Domain::Fuel, kg, self.cfg.max_plausible_kg).map(|_| ())
    }

    fn write_amount(&mut self, sim: &mut dyn SimulatorPort, kg: f64) -> Result<(), PortError> {
        sim.write_value(&self.cfg.key, self.cfg.sim_unit.from_kg(kg))
    }
}
