//! Phase detector with hysteresis and regression detection.

use log::{debug, info, warn};

use crate::config::PhaseConfig;

use super::{FlightPhase, PhaseChange, PhaseSignals, classify};

/// Tracks the confirmed flight phase across samples.
///
/// A candidate phase has to be seen `confirm_samples` times in a row before
/// it is adopted.  Forward moves are reported as `Advanced`.  Backward
/// candidates are dropped unless they are a regression:
///
/// - the simulator session id changed (flight reloaded), reported on the
///   first sample that carries the new id, or
/// - the aircraft had begun departure (`current >= Pushback`) and is back
///   at a pre-departure phase without having flown.
pub struct PhaseDetector {
    cfg: PhaseConfig,
    current: FlightPhase,
    candidate: Option<FlightPhase>,
    candidate_samples: u8,
    has_flown: bool,
    session: Option<u32>,
}

impl PhaseDetector {
    pub fn new(cfg: PhaseConfig) -> Self {
        Self {
            cfg,
            current: FlightPhase::Preflight,
            candidate: None,
            candidate_samples: 0,
            has_flown: false,
            session: None,
        }
    }

    pub fn current(&self) -> FlightPhase {
        self.current
    }

    pub fn has_flown(&self) -> bool {
        self.has_flown
    }

    pub fn reconfigure(&mut self, cfg: PhaseConfig) {
        self.cfg = cfg;
    }

    /// Feed one sample.
    pub fn update(&mut self, signals: &PhaseSignals) -> PhaseChange {
        if let Some(prev) = self.session
            && prev != signals.session_id
        {
            self.session = Some(signals.session_id);
            let to = classify(signals, false, &self.cfg);
            warn!("simulator session {} -> {}: phase reset", prev, signals.session_id);
            return self.reset_to(to);
        }
        self.session = Some(signals.session_id);

        let seen = classify(signals, self.has_flown, &self.cfg);
        if seen == self.current {
            self.candidate = None;
            self.candidate_samples = 0;
            return PhaseChange::None;
        }

        if self.candidate == Some(seen) {
            self.candidate_samples = self.candidate_samples.saturating_add(1);
        } else {
            self.candidate = Some(seen);
            self.candidate_samples = 1;
        }
        if self.candidate_samples < self.cfg.confirm_samples.max(1) {
            debug!(
                "phase candidate {} ({}/{})",
                seen, self.candidate_samples, self.cfg.confirm_samples
            );
            return PhaseChange::None;
        }
        self.candidate = None;
        self.candidate_samples = 0;

        let from = self.current;
        if seen > from {
            self.current = seen;
            if seen >= FlightPhase::Flight {
                self.has_flown = true;
            }
            info!("phase {} -> {}", from, seen);
            PhaseChange::Advanced { from, to: seen }
        } else if from >= FlightPhase::Pushback && seen.is_pre_departure() && !self.has_flown {
            warn!("phase regression {} -> {}", from, seen);
            self.reset_to(seen)
        } else {
            debug!("ignoring backward phase candidate {} (current {})", seen, from);
            PhaseChange::None
        }
    }

    /// Restart the lifecycle at Preflight (a new plan after arrival).
    pub fn rearm(&mut self) -> PhaseChange {
        if self.current == FlightPhase::Preflight && !self.has_flown {
            return PhaseChange::None;
        }
        self.reset_to(FlightPhase::Preflight)
    }

    /// Jump to `phase` unconditionally (operator command).
    pub fn force(&mut self, phase: FlightPhase) -> PhaseChange {
        let from = self.current;
        self.candidate = None;
        self.candidate_samples = 0;
        self.current = phase;
        self.has_flown = phase >= FlightPhase::Flight;
        if phase > from {
            PhaseChange::Advanced { from, to: phase }
        } else if phase < from {
            PhaseChange::Reset { from, to: phase }
        } else {
            PhaseChange::None
        }
    }

    fn reset_to(&mut self, to: FlightPhase) -> PhaseChange {
        let from = self.current;
        self.current = to;
        self.has_flown = to >= FlightPhase::Flight;
        self.candidate = None;
        self.candidate_samples = 0;
        PhaseChange::Reset { from, to }
    }
}
