//! Background plan loader and the mailbox it publishes through.
//!
//! The loader runs in a dedicated thread using `edge-executor` with
//! `async-io-mini` timers for its poll and retry delays.  The control loop
//! never waits on it: it only `try_take`s from the [`PlanMailbox`].
//!
//! ```text
//!  ┌───────────────────────────────┐                ┌───────────────────┐
//!  │  Loader thread                │  latest plan   │   Control loop    │
//!  │  LocalExecutor                │──(Signal)─────▶│   (sync, ticks)   │
//!  │   poll ─▶ Timer::after(..) ───│  notices       │                   │
//!  │     ▲          │              │──(Channel)────▶│                   │
//!  │     └──────────┘ or shutdown ◀│──(Signal)──────│                   │
//!  └───────────────────────────────┘                └───────────────────┘
//! ```
//!
//! The plan slot is a `Signal`: a newer plan overwrites one the control
//! loop has not consumed yet, so concurrent reloads coalesce to the latest.
//! Failures travel on a separate bounded channel and never displace a
//! pending plan.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::{info, warn};

use crate::app::ports::PlanSource;
use crate::config::PlanConfig;
use crate::error::{FetchError, ParseError, PlanError};

use super::{FlightPlan, PlanLimits, PlanProvider};

/// Loader notices buffered for the control loop.
pub const NOTICE_DEPTH: usize = 8;

/// Something the control loop should report about plan loading.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderNotice {
    FetchFailed {
        error: FetchError,
        attempt: u32,
        retry_in_ms: u64,
    },
    Rejected(ParseError),
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

/// Shared hand-off point between the loader thread and the control loop.
pub struct PlanMailbox {
    latest: Signal<CriticalSectionRawMutex, Arc<FlightPlan>>,
    notices: Channel<CriticalSectionRawMutex, LoaderNotice, NOTICE_DEPTH>,
    shutdown: Signal<CriticalSectionRawMutex, ()>,
    reconfigure: Signal<CriticalSectionRawMutex, PlanConfig>,
    dropped_notices: AtomicU32,
}

impl Default for PlanMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanMailbox {
    pub const fn new() -> Self {
        Self {
            latest: Signal::new(),
            notices: Channel::new(),
            shutdown: Signal::new(),
            reconfigure: Signal::new(),
            dropped_notices: AtomicU32::new(0),
        }
    }

    /// Offer a plan.  Replaces any plan not yet taken.
    pub fn publish(&self, plan: Arc<FlightPlan>) {
        self.latest.signal(plan);
    }

    /// Latest unconsumed plan, if any.  Never blocks.
    pub fn try_take(&self) -> Option<Arc<FlightPlan>> {
        self.latest.try_take()
    }

    /// Queue a notice.  Dropped and counted when the queue is full.
    pub fn notify(&self, notice: LoaderNotice) {
        if self.notices.try_send(notice).is_err() {
            self.dropped_notices.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn try_notice(&self) -> Option<LoaderNotice> {
        self.notices.try_receive().ok()
    }

    pub fn dropped_notices(&self) -> u32 {
        self.dropped_notices.load(Ordering::Relaxed)
    }

    /// Hand new plan settings to the loader.  Taken before its next poll;
    /// a newer config replaces one not yet applied.
    pub fn update_config(&self, cfg: PlanConfig) {
        self.reconfigure.signal(cfg);
    }

    /// Ask the loader to stop after its current wait.
    pub fn request_shutdown(&self) {
        self.shutdown.signal(());
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Exponential retry delay: `base * 2^attempt`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms: base_ms.max(1),
            max_ms: max_ms.max(base_ms),
            attempt: 0,
        }
    }

    /// Delay before the next retry; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u64.checked_shl(self.attempt).unwrap_or(u64::MAX);
        let ms = self.base_ms.saturating_mul(factor).min(self.max_ms);
        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(ms)
    }

    /// Failed attempts since the last success.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

pub struct PlanLoader<S> {
    provider: PlanProvider<S>,
    mailbox: Arc<PlanMailbox>,
    poll_interval: Duration,
    backoff: Backoff,
}

impl<S: PlanSource> PlanLoader<S> {
    pub fn new(provider: PlanProvider<S>, mailbox: Arc<PlanMailbox>, cfg: &PlanConfig) -> Self {
        Self {
            provider,
            mailbox,
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            backoff: Backoff::new(cfg.backoff_base_ms, cfg.backoff_max_ms),
        }
    }

    /// Apply new limits and timing.  The retry sequence starts over.
    pub fn reconfigure(&mut self, cfg: &PlanConfig) {
        self.provider.set_limits(PlanLimits::from(cfg));
        self.poll_interval = Duration::from_millis(cfg.poll_interval_ms);
        self.backoff = Backoff::new(cfg.backoff_base_ms, cfg.backoff_max_ms);
        info!("plan loader reconfigured");
    }

    /// Run one poll and publish the outcome.  Returns how long to wait
    /// before the next poll.
    pub fn poll_once(&mut self) -> Duration {
        if let Some(cfg) = self.mailbox.reconfigure.try_take() {
            self.reconfigure(&cfg);
        }
        match self.provider.poll() {
            Ok(Some(plan)) => {
                self.backoff.reset();
                self.mailbox.publish(plan);
                self.poll_interval
            }
            Ok(None) => {
                self.backoff.reset();
                self.poll_interval
            }
            Err(PlanError::Fetch(error)) => {
                let attempt = self.backoff.attempt() + 1;
                let delay = self.backoff.next_delay();
                warn!(
                    "plan fetch failed ({error}), attempt {attempt}, retrying in {} ms",
                    delay.as_millis()
                );
                self.mailbox.notify(LoaderNotice::FetchFailed {
                    error,
                    attempt,
                    retry_in_ms: delay.as_millis() as u64,
                });
                delay
            }
            Err(PlanError::Parse(error)) => {
                self.backoff.reset();
                warn!("plan rejected: {error}");
                self.mailbox.notify(LoaderNotice::Rejected(error));
                self.poll_interval
            }
        }
    }

    /// Poll until the mailbox's shutdown signal fires.
    pub async fn run(mut self) {
        info!(
            "plan loader started (poll every {} ms)",
            self.poll_interval.as_millis()
        );
        loop {
            let delay = self.poll_once();
            let shutdown = futures_lite::future::or(
                async {
                    self.mailbox.shutdown.wait().await;
                    true
                },
                async {
                    async_io_mini::Timer::after(delay).await;
                    false
                },
            )
            .await;
            if shutdown {
                break;
            }
        }
        info!("plan loader stopped");
    }
}

/// Spawn the loader on its own thread.
pub fn spawn<S>(loader: PlanLoader<S>) -> std::io::Result<std::thread::JoinHandle<()>>
where
    S: PlanSource + Send + 'static,
{
    std::thread::Builder::new()
        .name("plan-loader".into())
        .spawn(move || {
            let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
            let task = executor.spawn(loader.run());
            futures_lite::future::block_on(executor.run(task));
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Vec<Result<Vec<u8>, FetchError>>);

    impl PlanSource for Scripted {
        fn fetch(&mut self) -> Result<Vec<u8>, FetchError> {
            if self.0.is_empty() {
                Err(FetchError::Unavailable)
            } else {
                self.0.remove(0)
            }
        }
    }

    fn doc(id: &str) -> Vec<u8> {
        format!(
            r#"{{"params":{{"request_id":"{id}"}},"fuel":{{"plan_ramp":1000}},"weights":{{"cargo":100,"pax_count":10}}}}"#
        )
        .into_bytes()
    }

    fn make_loader(script: Vec<Result<Vec<u8>, FetchError>>) -> (PlanLoader<Scripted>, Arc<PlanMailbox>) {
        let mailbox = Arc::new(PlanMailbox::new());
        let cfg = PlanConfig {
            poll_interval_ms: 500,
            backoff_base_ms: 100,
            backoff_max_ms: 350,
            ..PlanConfig::default()
        };
        let provider = PlanProvider::new(Scripted(script), PlanLimits::default());
        (PlanLoader::new(provider, Arc::clone(&mailbox), &cfg), mailbox)
    }

    #[test]
    fn config_update_applies_before_next_poll() {
        let (mut loader, mailbox) = make_loader(vec![Ok(doc("1"))]);
        mailbox.update_config(PlanConfig {
            poll_interval_ms: 2000,
            max_payload_bytes: 16,
            ..PlanConfig::default()
        });
        assert_eq!(loader.poll_once(), Duration::from_millis(2000));
        assert!(mailbox.try_take().is_none());
        assert!(matches!(
            mailbox.try_notice(),
            Some(LoaderNotice::Rejected(ParseError::TooLarge { max: 16, .. }))
        ));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut b = Backoff::new(100, 350);
        let delays: Vec<u64> = (0..4).map(|_| b.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 350, 350]);
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn backoff_survives_huge_attempt_counts() {
        let mut b = Backoff::new(1000, 60_000);
        for _ in 0..200 {
            assert!(b.next_delay() <= Duration::from_millis(60_000));
        }
    }

    #[test]
    fn mailbox_coalesces_to_latest() {
        let mailbox = PlanMailbox::new();
        mailbox.publish(Arc::new(FlightPlan::with_targets("1", 0.0, 0.0, 0)));
        mailbox.publish(Arc::new(FlightPlan::with_targets("2", 0.0, 0.0, 0)));
        assert_eq!(mailbox.try_take().unwrap().id.0, "2");
        assert!(mailbox.try_take().is_none());
    }

    #[test]
    fn notices_overflow_is_counted() {
        let mailbox = PlanMailbox::new();
        for _ in 0..NOTICE_DEPTH + 3 {
            mailbox.notify(LoaderNotice::Rejected(ParseError::MissingField("x")));
        }
        assert_eq!(mailbox.dropped_notices(), 3);
    }

    #[test]
    fn fetch_failure_backs_off_and_keeps_plan() {
        let (mut loader, mailbox) = make_loader(vec![
            Ok(doc("1")),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
        ]);
        assert_eq!(loader.poll_once(), Duration::from_millis(500));
        assert_eq!(loader.poll_once(), Duration::from_millis(100));
        assert_eq!(loader.poll_once(), Duration::from_millis(200));

        assert_eq!(mailbox.try_take().unwrap().id.0, "1");
        assert!(matches!(
            mailbox.try_notice(),
            Some(LoaderNotice::FetchFailed { attempt: 1, .. })
        ));
        assert!(matches!(
            mailbox.try_notice(),
            Some(LoaderNotice::FetchFailed { attempt: 2, retry_in_ms: 200, .. })
        ));
    }

    #[test]
    fn rejection_does_not_displace_pending_plan() {
        let (mut loader, mailbox) =
            make_loader(vec![Ok(doc("1")), Ok(b"<!ENTITY e \"x\">".to_vec())]);
        loader.poll_once();
        loader.poll_once();
        assert_eq!(mailbox.try_take().unwrap().id.0, "1");
        assert!(matches!(
            mailbox.try_notice(),
            Some(LoaderNotice::Rejected(ParseError::ForbiddenMarkup(_)))
        ));
    }

    #[test]
    fn spawned_loader_stops_on_shutdown() {
        let (loader, mailbox) = make_loader(vec![Ok(doc("7"))]);
        let handle = spawn(loader).unwrap();
        for _ in 0..200 {
            if let Some(plan) = mailbox.try_take() {
                assert_eq!(plan.id.0, "7");
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        mailbox.request_shutdown();
        handle.join().unwrap();
    }
}
