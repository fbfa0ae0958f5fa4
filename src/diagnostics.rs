//! Runtime diagnostics.
//!
//! Keeps the most recent [`AppEvent`]s in a fixed-size ring
//! (`heapless::HistoryBuffer`) together with monotonic counters, so an
//! operator console can ask "what just happened" without scraping logs.
//! A custom panic hook logs the reason before the default handler runs.

use crate::app::events::AppEvent;

/// Events kept in the history ring.
pub const HISTORY_CAP: usize = 32;

/// One history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub tick: u64,
    pub timestamp_ms: u64,
    pub event: AppEvent,
}

/// Counters since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeCounters {
    pub ticks: u64,
    pub events: u64,
    pub plans_loaded: u32,
    pub plans_rejected: u32,
    pub fetch_failures: u32,
    pub phase_resets: u32,
    pub degradations: u32,
    pub recoveries: u32,
    pub range_clamps: u32,
}

pub struct Diagnostics {
    history: heapless::HistoryBuffer<EventRecord, HISTORY_CAP>,
    /// How many of the ring's slots `recent()` exposes.
    keep: usize,
    counters: RuntimeCounters,
}

impl Diagnostics {
    /// `keep` is clamped to `1..=HISTORY_CAP`.
    pub fn new(keep: usize) -> Self {
        Self {
            history: heapless::HistoryBuffer::new(),
            keep: keep.clamp(1, HISTORY_CAP),
            counters: RuntimeCounters::default(),
        }
    }

    pub fn set_keep(&mut self, keep: usize) {
        self.keep = keep.clamp(1, HISTORY_CAP);
    }

    pub fn count_tick(&mut self) {
        self.counters.ticks += 1;
    }

    pub fn record(&mut self, tick: u64, timestamp_ms: u64, event: &AppEvent) {
        let c = &mut self.counters;
        c.events += 1;
        match event {
            AppEvent::PlanLoaded { .. } => c.plans_loaded += 1,
            AppEvent::PlanRejected(_) => c.plans_rejected += 1,
            AppEvent::PlanFetchFailed { .. } => c.fetch_failures += 1,
            AppEvent::PhaseReset { .. } => c.phase_resets += 1,
            AppEvent::DomainDegraded { .. } => c.degradations += 1,
            AppEvent::DomainRecovered(_) => c.recoveries += 1,
            AppEvent::RangeClamped(_) => c.range_clamps += 1,
            _ => {}
        }
        self.history.write(EventRecord {
            tick,
            timestamp_ms,
            event: event.clone(),
        });
    }

    /// Most recent events, oldest first.
    pub fn recent(&self) -> Vec<EventRecord> {
        let all: Vec<&EventRecord> = self.history.oldest_ordered().collect();
        let skip = all.len().saturating_sub(self.keep);
        all.into_iter().skip(skip).cloned().collect()
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.history.recent()
    }

    pub fn counters(&self) -> RuntimeCounters {
        self.counters
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.counters = RuntimeCounters::default();
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(HISTORY_CAP)
    }
}

// ───────────────────────────────────────────────────────────────
// Panic hook
// ───────────────────────────────────────────────────────────────

/// Install a panic hook that logs the reason through `log`.
///
/// Call once during init, after the logger is up.
pub fn install_panic_handler() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        match info.location() {
            Some(loc) => log::error!("PANIC: {} at {}:{}", reason, loc.file(), loc.line()),
            None => log::error!("PANIC: {}", reason),
        }
        default_hook(info);
    }));
}
