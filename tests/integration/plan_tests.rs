//! Plan loading integration tests: file source → loader → mailbox →
//! orchestrator, including hostile payloads.

use std::fs;
use std::time::Duration;

use groundcrew::adapters::plan_file::FilePlanSource;
use groundcrew::app::commands::AppCommand;
use groundcrew::app::events::AppEvent;
use groundcrew::app::service::Lifecycle;
use groundcrew::config::PlanConfig;
use groundcrew::error::{FetchError, ParseError};
use groundcrew::plan::{PlanLimits, PlanLoader, PlanProvider, parse_plan};

use crate::mock_sim::{Harness, test_config};

const OFP: &str = r#"{
    "params": { "request_id": "778899", "units": "lbs" },
    "general": { "icao_airline": "BAW", "flight_number": "117" },
    "origin": { "icao_code": "EGLL" },
    "destination": { "icao_code": "KJFK" },
    "aircraft": { "icaocode": "B77W" },
    "fuel": { "plan_ramp": 220462 },
    "weights": { "cargo": "22046", "pax_count": 300 }
}"#;

fn loader_for(path: &std::path::Path, h: &Harness) -> PlanLoader<FilePlanSource> {
    let cfg = PlanConfig {
        backoff_base_ms: 100,
        backoff_max_ms: 400,
        ..PlanConfig::default()
    };
    let provider = PlanProvider::new(FilePlanSource::new(path), PlanLimits::from(&cfg));
    PlanLoader::new(provider, h.mailbox.clone(), &cfg)
}

#[test]
fn file_plan_reaches_orchestrator() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ofp.json");
    fs::write(&path, OFP).unwrap();

    let mut h = Harness::new(test_config());
    let mut loader = loader_for(&path, &h);
    loader.poll_once();
    h.tick();

    assert_eq!(h.orch.lifecycle(), Lifecycle::Active);
    let plan = h.orch.plan().unwrap();
    assert_eq!(plan.id.0, "778899");
    assert!((plan.fuel_kg - 100_000.0).abs() < 1.0);
    assert!((plan.cargo_kg - 10_000.0).abs() < 1.0);
    assert_eq!(plan.passengers, 300);
    assert_eq!(plan.route.callsign, "BAW117");
}

#[test]
fn runtime_config_update_reaches_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ofp.json");
    fs::write(&path, OFP).unwrap();

    let mut h = Harness::new(test_config());
    let mut loader = loader_for(&path, &h);
    let mut cfg = h.config.clone();
    cfg.plan.max_payload_bytes = 64;
    cfg.plan.poll_interval_ms = 3000;
    h.orch
        .handle_command(AppCommand::UpdateConfig(cfg), &mut h.sink)
        .unwrap();

    assert_eq!(loader.poll_once(), Duration::from_millis(3000));
    h.tick();
    assert_eq!(h.orch.lifecycle(), Lifecycle::WaitingForPlan);
    assert!(h.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::PlanRejected(ParseError::TooLarge { max: 64, .. })
    )));
}

#[test]
fn missing_file_keeps_waiting_and_backs_off() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new(test_config());
    let mut loader = loader_for(&dir.path().join("absent.json"), &h);

    assert_eq!(loader.poll_once(), Duration::from_millis(100));
    assert_eq!(loader.poll_once(), Duration::from_millis(200));
    assert_eq!(loader.poll_once(), Duration::from_millis(400));
    assert_eq!(loader.poll_once(), Duration::from_millis(400));
    h.tick();

    assert_eq!(h.orch.lifecycle(), Lifecycle::WaitingForPlan);
    let failures: Vec<u32> = h
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::PlanFetchFailed {
                error: FetchError::Unavailable,
                attempt,
                ..
            } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![1, 2, 3, 4]);
}

#[test]
fn hostile_payload_keeps_previous_plan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ofp.json");
    fs::write(&path, OFP).unwrap();

    let mut h = Harness::new(test_config());
    let mut loader = loader_for(&path, &h);
    loader.poll_once();
    h.tick();

    let hostile = format!(
        "<!DOCTYPE ofp [<!ENTITY xxe SYSTEM \"file:///etc/passwd\">]>{}",
        OFP.replace("778899", "&xxe;")
    );
    fs::write(&path, hostile).unwrap();
    loader.poll_once();
    h.tick();

    assert_eq!(h.orch.plan().map(|p| p.id.0.as_str()), Some("778899"));
    assert!(
        h.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::PlanRejected(ParseError::ForbiddenMarkup(_))))
    );
}

#[test]
fn markup_declarations_rejected_in_any_case() {
    let limits = PlanLimits::default();
    for payload in [
        "<!DOCTYPE x>{}",
        "<!doctype x>{}",
        "{\"a\":\"<!ENTITY e 'boom'>\"}",
        "<!Entity % p SYSTEM 'http://evil'>",
        "<!ATTLIST x y CDATA #IMPLIED>",
        "<!X PUBLIC '-//evil//'>",
    ] {
        assert!(
            matches!(
                parse_plan(payload.as_bytes(), &limits),
                Err(ParseError::ForbiddenMarkup(_))
            ),
            "accepted: {payload}"
        );
    }
}

#[test]
fn oversized_payload_rejected_before_parsing() {
    let limits = PlanLimits {
        max_payload_bytes: 64,
        ..PlanLimits::default()
    };
    let err = parse_plan(OFP.as_bytes(), &limits).unwrap_err();
    assert!(matches!(err, ParseError::TooLarge { max: 64, .. }));
}

#[test]
fn spawned_loader_publishes_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ofp.json");
    fs::write(&path, OFP).unwrap();

    let mut h = Harness::new(test_config());
    let loader = loader_for(&path, &h);
    let handle = groundcrew::plan::loader::spawn(loader).unwrap();

    let mut adopted = false;
    for _ in 0..200 {
        h.tick();
        if h.orch.plan().is_some() {
            adopted = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(adopted, "loader never delivered the plan");

    h.orch
        .handle_command(groundcrew::app::commands::AppCommand::Shutdown, &mut h.sink)
        .unwrap();
    handle.join().unwrap();
}
