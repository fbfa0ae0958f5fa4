//! Cargo service.
//!
//! The planned total is split across compartments by fixed integer ratios
//! (e.g. main/bulk 80:20).  Amounts are whole kilograms so the split is
//! exact: the compartment writes always sum to the converged total.  The
//! per-tick rate is rounded down with a floor of one kilogram.

use log::debug;

use crate::app::ports::SimulatorPort;
use crate::config::{CargoConfig, MAX_COMPARTMENTS};
use crate::error::PortError;
use crate::plan::FlightPlan;
use crate::safety::clamp_observed;

use super::{Convergence, Domain, GroundService, StepInput, StepReport, Unit, whole_unit_rate};

/// Split `total` across compartments weighted by `ratios`.
///
/// Every compartment except the first receives `round(total * ratio / Σ)`
/// bounded by what is left; the first takes the remainder.  The result
/// always sums to `total`.  With no usable ratio everything goes to the
/// first compartment.
///
/// ```
/// use groundcrew::domain::split_cargo;
/// assert_eq!(split_cargo(137, &[80, 20]).as_slice(), &[110, 27]);
/// ```
pub fn split_cargo(total: u64, ratios: &[u32]) -> heapless::Vec<u64, MAX_COMPARTMENTS> {
    let mut out = heapless::Vec::new();
    let n = ratios.len().min(MAX_COMPARTMENTS);
    if n == 0 {
        return out;
    }
    let _ = out.resize(n, 0);

    let sum: u128 = ratios[..n].iter().map(|&r| u128::from(r)).sum();
    if sum == 0 {
        out[0] = total;
        return out;
    }

    let mut remaining = total;
    for i in 1..n {
        // round half up: (2·t·r + Σ) / 2Σ
        let share = (2 * u128::from(total) * u128::from(ratios[i]) + sum) / (2 * sum);
        let share = (share as u64).min(remaining);
        out[i] = share;
        remaining -= share;
    }
    out[0] = remaining;
    out
}

pub struct CargoService {
    core: Convergence,
    cfg: CargoConfig,
    ratios: heapless::Vec<u32, MAX_COMPARTMENTS>,
}

impl CargoService {
    pub fn new(cfg: CargoConfig) -> Self {
        let ratios = cfg.compartments.iter().map(|c| c.ratio).collect();
        Self {
            core: Convergence::new(Domain::Cargo, Unit::Kilograms, cfg.rate.clone(), cfg.tolerance_kg),
            cfg,
            ratios,
        }
    }

    /// Sum of all compartments in kg, each reading range-checked.
    fn read_total(
        &self,
        sim: &mut dyn SimulatorPort,
        report: &mut StepReport,
    ) -> Result<f64, PortError> {
        let mut total = 0.0;
        for c in &self.cfg.compartments {
            let kg = self.cfg.sim_unit.to_kg(sim.read_value(&c.key)?);
            let (kg, clamped) = clamp_observed(Domain::Cargo, kg, self.cfg.max_plausible_kg)?;
            if report.clamped.is_none() {
                report.clamped = clamped;
            }
            total += kg;
        }
        Ok(total)
    }
}

impl GroundService for CargoService {
    fn core(&self) -> &Convergence {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Convergence {
        &mut self.core
    }

    fn planned_from(&self, plan: &FlightPlan) -> f64 {
        plan.cargo_kg.round()
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

        let observed = self.read_total(sim, &mut report)?;
        let rate = whole_unit_rate(self.core.rate(sim)?);
        if let Some(next) = self.core.advance(observed, rate, input, &mut report) {
            // planned is whole, so rounding never passes it
            let next = next.round();
            self.write_amount(sim, next)?;
            self.core.commit(next, input.now_ms, &mut report);
        }
        Ok(report)
    }

    fn probe(&mut self, sim: &mut dyn SimulatorPort) -> Result<(), PortError> {
        let mut scratch = StepReport::default();
        self.read_total(sim, &mut scratch).map(|_| ())
    }

    fn write_amount(&mut self, sim: &mut dyn SimulatorPort, kg: f64) -> Result<(), PortError> {
        let shares = split_cargo(kg.max(0.0).round() as u64, &self.ratios);
        debug!("cargo split {kg:.0} kg -> {:?}", shares.as_slice());
        for (c, share) in self.cfg.compartments.iter().zip(shares.iter()) {
            sim.write_value(&c.key, self.cfg.sim_unit.from_kg(*share as f64))?;
        }
        Ok(())
    }
}
