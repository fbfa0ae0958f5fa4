//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every application event as one
//! structured log line.  The prefix names the subsystem so the output can
//! be grepped (`PLAN`, `PHASE`, `SVC`, `SAFETY`, `RANGE`).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(phase) => {
                info!("START | phase={phase}");
            }
            AppEvent::Service(e) => {
                info!(
                    "SVC | {} {} {:?} -> {:?} | {:.1}/{:.1} {} | t={}ms",
                    e.domain, e.operation, e.from, e.to, e.current, e.planned, e.unit, e.timestamp_ms
                );
            }
            AppEvent::PlanLoaded {
                id,
                fuel_kg,
                cargo_kg,
                passengers,
            } => {
                info!(
                    "PLAN | loaded {id} | fuel={fuel_kg:.0}kg cargo={cargo_kg:.0}kg pax={passengers}"
                );
            }
            AppEvent::PlanRejected(e) => {
                warn!("PLAN | rejected: {e}");
            }
            AppEvent::PlanFetchFailed {
                error,
                attempt,
                retry_in_ms,
            } => {
                warn!("PLAN | fetch failed: {error} | attempt={attempt} retry_in={retry_in_ms}ms");
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {from} -> {to}");
            }
            AppEvent::PhaseReset { from, to } => {
                warn!("PHASE | reset {from} -> {to}");
            }
            AppEvent::DomainDegraded {
                domain,
                error,
                consecutive,
            } => {
                warn!("SAFETY | {domain} held after {consecutive} failures ({error})");
            }
            AppEvent::DomainRecovered(domain) => {
                info!("SAFETY | {domain} recovered");
            }
            AppEvent::RangeClamped(v) => {
                warn!("RANGE | {v}");
            }
            AppEvent::Terminated => {
                info!("STOP | terminated");
            }
        }
    }
}
