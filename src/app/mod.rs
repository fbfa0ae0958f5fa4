//! Application core: pure orchestration logic, zero I/O.
//!
//! This module holds the control loop of the ground-service engine: plan
//! adoption, phase gating, domain stepping and fault handling.  All
//! interaction with the simulator, the automation tool and the UI happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable with mock adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
