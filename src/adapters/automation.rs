//! Scripted automation adapter.
//!
//! Stands in for the ground-handling tool: flags are set by the caller
//! (host runner, tests) and polled by the orchestrator.  Flags stay set
//! until cleared, matching how the real tool reports a running request.

use crate::app::ports::AutomationPort;
use crate::domain::Domain;
use crate::error::PortError;

#[derive(Debug, Default, Clone)]
pub struct ScriptedAutomation {
    requested: [bool; Domain::COUNT],
    completed: [bool; Domain::COUNT],
    boarding: bool,
    pushback: bool,
    deboarding_complete: bool,
    failure: Option<PortError>,
}

impl ScriptedAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, domain: Domain) {
        self.requested[domain.index()] = true;
    }

    pub fn complete(&mut self, domain: Domain) {
        self.completed[domain.index()] = true;
    }

    pub fn clear_requests(&mut self) {
        self.requested = [false; Domain::COUNT];
        self.completed = [false; Domain::COUNT];
    }

    pub fn set_boarding(&mut self, on: bool) {
        self.boarding = on;
    }

    pub fn set_pushback(&mut self, on: bool) {
        self.pushback = on;
    }

    pub fn set_deboarding_complete(&mut self, on: bool) {
        self.deboarding_complete = on;
    }

    /// Every poll fails with `err` until set back to `None`.
    pub fn fail_with(&mut self, err: Option<PortError>) {
        self.failure = err;
    }

    fn poll(&self, flag: bool) -> Result<bool, PortError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(flag),
        }
    }
}

impl AutomationPort for ScriptedAutomation {
    fn service_requested(&mut self, domain: Domain) -> Result<bool, PortError> {
        self.poll(self.requested[domain.index()])
    }

    fn service_completed(&mut self, domain: Domain) -> Result<bool, PortError> {
        self.poll(self.completed[domain.index()])
    }

    fn boarding_active(&mut self) -> Result<bool, PortError> {
        self.poll(self.boarding)
    }

    fn pushback_active(&mut self) -> Result<bool, PortError> {
        self.poll(self.pushback)
    }

    fn deboarding_complete(&mut self) -> Result<bool, PortError> {
        self.poll(self.deboarding_complete)
    }
}
