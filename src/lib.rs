//! Groundcrew ground-service engine.
//!
//! Keeps a simulated aircraft's fuel, cargo, passengers and doors
//! converging to the active flight plan, gated by the detected flight
//! phase.  The engine core is pure logic behind port traits; the host
//! binary wires concrete adapters around it.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod fsm;
pub mod phase;
pub mod plan;
pub mod safety;
pub mod units;
