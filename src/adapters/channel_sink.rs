//! Bounded channel event sink.
//!
//! Hands events to another thread (UI, EFB bridge) through an
//! `embassy_sync` channel.  The tick loop never blocks: when the channel is
//! full the event is dropped and counted.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Events buffered between the control loop and the consumer.
pub const EVENT_QUEUE_DEPTH: usize = 32;

pub type EventChannel = Channel<CriticalSectionRawMutex, AppEvent, EVENT_QUEUE_DEPTH>;

/// Producer side, held by the control loop.
pub struct ChannelSink<'a> {
    channel: &'a EventChannel,
    dropped: &'a AtomicU32,
}

impl<'a> ChannelSink<'a> {
    pub fn new(channel: &'a EventChannel, dropped: &'a AtomicU32) -> Self {
        Self { channel, dropped }
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventSink for ChannelSink<'_> {
    fn emit(&mut self, event: &AppEvent) {
        if self.channel.try_send(event.clone()).is_err() {
            let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if n.is_power_of_two() {
                warn!("event queue full, {n} events dropped so far");
            }
        }
    }
}
