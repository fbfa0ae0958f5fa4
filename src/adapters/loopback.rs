//! In-memory simulator.
//!
//! A key/value store implementing [`SimulatorPort`].  Used by the host
//! runner when no simulator bridge is attached, and by tests.  Individual
//! keys can be made to fail to exercise the retry and hold paths.

use std::collections::HashMap;

use crate::app::ports::SimulatorPort;
use crate::error::PortError;

#[derive(Debug, Default, Clone)]
pub struct LoopbackSimulator {
    values: HashMap<String, f64>,
    failing: HashMap<String, PortError>,
    writes: u64,
}

impl LoopbackSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_owned(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Every read and write of `key` fails with `err` until healed.
    pub fn fail_key(&mut self, key: &str, err: PortError) {
        self.failing.insert(key.to_owned(), err);
    }

    pub fn heal_key(&mut self, key: &str) {
        self.failing.remove(key);
    }

    /// Successful writes since construction.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn check(&self, key: &str) -> Result<(), PortError> {
        match self.failing.get(key) {
            Some(err) => Err(*err),
            None => Ok(()),
        }
    }
}

impl SimulatorPort for LoopbackSimulator {
    fn read_value(&mut self, key: &str) -> Result<f64, PortError> {
        self.check(key)?;
        self.values.get(key).copied().ok_or(PortError::Unavailable)
    }

    fn write_value(&mut self, key: &str, value: f64) -> Result<(), PortError> {
        self.check(key)?;
        if !value.is_finite() {
            return Err(PortError::InvalidValue);
        }
        self.values.insert(key.to_owned(), value);
        self.writes += 1;
        Ok(())
    }
}
