//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  Everything runs on the host with no simulator
//! attached.

mod mock_sim;
mod orchestrator_tests;
mod plan_tests;
