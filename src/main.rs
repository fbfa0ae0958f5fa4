//! Groundcrew host runner.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LoopbackSimulator  ScriptedAutomation  LogEventSink           │
//! │  (SimulatorPort)    (AutomationPort)    (EventSink)            │
//! │  JsonConfigFile     FilePlanSource      MonotonicClock         │
//! │  (ConfigPort)       (PlanSource)        (ClockPort)            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Orchestrator (pure logic)                 │    │
//! │  │  Detector · Gate · Services · Safety                   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  PlanLoader thread ──(PlanMailbox)──▶ tick loop                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Environment:
//! - `GROUNDCREW_CONFIG`: config file (default `groundcrew.json`)
//! - `GROUNDCREW_PLAN`: OFP JSON file (default `ofp.json`)
//! - `GROUNDCREW_MAX_TICKS`: stop after this many ticks (default: run forever)
//! - `RUST_LOG`: log filter (default `info`)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use groundcrew::adapters::automation::ScriptedAutomation;
use groundcrew::adapters::config_file::JsonConfigFile;
use groundcrew::adapters::log_sink::LogEventSink;
use groundcrew::adapters::loopback::LoopbackSimulator;
use groundcrew::adapters::plan_file::FilePlanSource;
use groundcrew::adapters::time::MonotonicClock;
use groundcrew::app::commands::AppCommand;
use groundcrew::app::ports::ConfigPort;
use groundcrew::app::service::{Lifecycle, Orchestrator, ServiceSet};
use groundcrew::config::SystemConfig;
use groundcrew::diagnostics;
use groundcrew::plan::{PlanLimits, PlanLoader, PlanMailbox, PlanProvider};

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    diagnostics::install_panic_handler();
    info!("groundcrew v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config (or defaults) ───────────────────────────────
    let config_path =
        std::env::var("GROUNDCREW_CONFIG").unwrap_or_else(|_| "groundcrew.json".into());
    let config_port = JsonConfigFile::new(&config_path);
    let config = match config_port.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config load from {config_path} failed ({e}), using defaults");
            SystemConfig::default()
        }
    };
    let max_ticks = match std::env::var("GROUNDCREW_MAX_TICKS") {
        Ok(v) => Some(v.parse::<u64>().context("GROUNDCREW_MAX_TICKS")?),
        Err(_) => None,
    };

    // ── 3. Plan loader thread ─────────────────────────────────
    let plan_path = std::env::var("GROUNDCREW_PLAN").unwrap_or_else(|_| "ofp.json".into());
    info!("watching {plan_path} for flight plans");
    let mailbox = Arc::new(PlanMailbox::new());
    let provider = PlanProvider::new(FilePlanSource::new(&plan_path), PlanLimits::from(&config.plan));
    let loader = PlanLoader::new(provider, mailbox.clone(), &config.plan);
    let loader_handle = groundcrew::plan::loader::spawn(loader).context("spawning plan loader")?;

    // ── 4. Adapters ───────────────────────────────────────────
    let mut sim = seeded_simulator(&config);
    let mut automation = ScriptedAutomation::new();
    let mut sink = LogEventSink::new();
    if !config.auto_start_on_arm {
        info!("no automation bridge attached; set auto_start_on_arm to drive services");
    }

    // ── 5. Control loop ───────────────────────────────────────
    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));
    let services = ServiceSet::from_config(&config);
    let mut orch = Orchestrator::new(config, services, mailbox, Box::new(MonotonicClock::new()));
    orch.start(&mut sink);

    while orch.lifecycle() != Lifecycle::Terminated {
        orch.tick(&mut sim, &mut automation, &mut sink);
        orch.save_config_if_dirty(&config_port);
        if max_ticks.is_some_and(|max| orch.tick_count() >= max) {
            orch.handle_command(AppCommand::Shutdown, &mut sink)?;
            break;
        }
        std::thread::sleep(tick);
    }

    if loader_handle.join().is_err() {
        warn!("plan loader thread panicked");
    }
    let c = orch.diagnostics().counters();
    info!(
        "done: {} ticks, {} events, {} plans, {} holds",
        c.ticks, c.events, c.plans_loaded, c.degradations
    );
    Ok(())
}

/// A parked aircraft, doors shut, tanks and cabin empty.
fn seeded_simulator(config: &SystemConfig) -> LoopbackSimulator {
    let mut sim = LoopbackSimulator::new();
    sim.set(&config.fuel.key, 0.0);
    for c in &config.cargo.compartments {
        sim.set(&c.key, 0.0);
    }
    sim.set(&config.passenger.key, 0.0);
    for k in &config.door.keys {
        sim.set(k, 0.0);
    }
    let k = &config.phase.keys;
    sim.set(&k.on_ground, 1.0);
    sim.set(&k.altitude_agl_ft, 0.0);
    sim.set(&k.ground_speed_kt, 0.0);
    sim.set(&k.engines_running, 0.0);
    sim.set(&k.parking_brake, 1.0);
    sim.set(&k.session, 1.0);
    sim
}
