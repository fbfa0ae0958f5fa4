//! Fetch + parse + new-plan detection.

use std::sync::Arc;

use log::{debug, info};

use crate::app::ports::PlanSource;
use crate::error::PlanError;

use super::{FlightPlan, PlanLimits, parse_plan};

/// `true` when `candidate` is a different document than `previous`.
/// Only the plan id is compared; a re-fetch of the same document is not new.
pub fn is_new_plan(candidate: &FlightPlan, previous: Option<&FlightPlan>) -> bool {
    previous.is_none_or(|p| p.id != candidate.id)
}

/// Loads plans from a [`PlanSource`] and remembers the last one delivered.
pub struct PlanProvider<S> {
    source: S,
    limits: PlanLimits,
    last: Option<Arc<FlightPlan>>,
}

impl<S: PlanSource> PlanProvider<S> {
    pub fn new(source: S, limits: PlanLimits) -> Self {
        Self {
            source,
            limits,
            last: None,
        }
    }

    /// One fetch and parse.  Does not touch the remembered plan.
    pub fn load(&mut self) -> Result<FlightPlan, PlanError> {
        let bytes = self.source.fetch()?;
        Ok(parse_plan(&bytes, &self.limits)?)
    }

    /// Load and return the plan only if it differs from the last delivered
    /// one.  Each distinct plan is returned exactly once.
    pub fn poll(&mut self) -> Result<Option<Arc<FlightPlan>>, PlanError> {
        let plan = self.load()?;
        if !is_new_plan(&plan, self.last.as_deref()) {
            debug!("plan {} unchanged", plan.id);
            return Ok(None);
        }
        info!("new flight plan: {plan}");
        let plan = Arc::new(plan);
        self.last = Some(Arc::clone(&plan));
        Ok(Some(plan))
    }

    pub fn last(&self) -> Option<&Arc<FlightPlan>> {
        self.last.as_ref()
    }

    pub fn set_limits(&mut self, limits: PlanLimits) {
        self.limits = limits;
    }
}
