//! Door service.
//!
//! Doors are positions in percent (0 closed, 100 open).  All configured
//! doors move together; the observed position is their mean.  The target
//! does not come from the flight plan but from the phase gate, which
//! retargets the service to open or closed.

use crate::app::ports::SimulatorPort;
use crate::config::DoorConfig;
use crate::error::PortError;
use crate::plan::FlightPlan;
use crate::safety::clamp_observed;

use super::{Convergence, Domain, GroundService, StepInput, StepReport, Unit};

pub const DOOR_OPEN: f64 = 100.0;
pub const DOOR_CLOSED: f64 = 0.0;

pub struct DoorService {
    core: Convergence,
    cfg: DoorConfig,
}

impl DoorService {
    pub fn new(cfg: DoorConfig) -> Self {
        Self {
            core: Convergence::new(Domain::Door, Unit::Percent, cfg.rate.clone(), cfg.tolerance_percent),
            cfg,
        }
    }

    fn read_position(
        &self,
        sim: &mut dyn SimulatorPort,
        report: &mut StepReport,
    ) -> Result<f64, PortError> {
        let mut sum = 0.0;
        for key in &self.cfg.keys {
            let (pos, clamped) = clamp_observed(Domain::Door, sim.read_value(key)?, DOOR_OPEN)?;
            if report.clamped.is_none() {
                report.clamped = clamped;
            }
            sum += pos;
        }
        Ok(sum / self.cfg.keys.len().max(1) as f64)
    }
}

impl GroundService for DoorService {
    fn core(&self) -> &Convergence {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Convergence {
        &mut self.core
    }

    /// A new plan keeps whatever the gate last asked for.
    fn planned_from(&self, _plan: &FlightPlan) -> f64 {
        self.core.state().planned
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

        let observed = self.read_position(sim, &mut report)?;
        let rate = self.core.rate(sim)?;
        if let Some(next) = self.core.advance(observed, rate, input, &mut report) {
            self.write_amount(sim, next)?;
            self.core.commit(next, input.now_ms, &mut report);
        }
        Ok(report)
    }

    fn probe(&mut self, sim: &mut dyn SimulatorPort) -> Result<(), PortError> {
        let mut scratch = StepReport::default();
        self.read_position(sim, &mut scratch).map(|_| ())
    }

    fn write_amount(&mut self, sim: &mut dyn SimulatorPort, percent: f64) -> Result<(), PortError> {
        let percent = percent.clamp(DOOR_CLOSED, DOOR_OPEN);
        for key in &self.cfg.keys {
            sim.write_value(key, percent)?;
        }
        Ok(())
    }
}
