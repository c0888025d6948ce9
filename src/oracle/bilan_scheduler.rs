//! BilanScheduler - periodic counter summary
//!
//! Asks the RoundProcessor for an interval summary on a fixed period. The
//! summary itself is produced inside the processor so it stays ordered with
//! round events. The period can follow a watch channel and restarts whenever
//! a new value arrives.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval};
use tracing::info;

use crate::oracle::types::{RoundEvent, RoundEventSender};

pub const MIN_INTERVAL_MINUTES: u64 = 1;
pub const MAX_INTERVAL_MINUTES: u64 = 120;

pub fn clamp_interval_minutes(minutes: u64) -> u64 {
    minutes.clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES)
}

/// Summary period for an interval in minutes, after clamping
pub fn bilan_period(minutes: u64) -> Duration {
    Duration::from_secs(clamp_interval_minutes(minutes) * 60)
}

pub struct BilanScheduler {
    event_sender: RoundEventSender,
    period: Duration,
    updates: Option<watch::Receiver<Duration>>,
}

enum Wake {
    Tick,
    Period(Option<Duration>),
}

impl BilanScheduler {
    /// Create a scheduler firing every `interval_minutes`, clamped to 1..=120.
    pub fn new(event_sender: RoundEventSender, interval_minutes: u64) -> Self {
        Self::with_period(event_sender, bilan_period(interval_minutes))
    }

    /// Create a scheduler with an exact period (no clamping)
    pub fn with_period(event_sender: RoundEventSender, period: Duration) -> Self {
        Self {
            event_sender,
            period,
            updates: None,
        }
    }

    /// Create a scheduler whose period follows `updates`.
    pub fn from_updates(
        event_sender: RoundEventSender,
        mut updates: watch::Receiver<Duration>,
    ) -> Self {
        let period = *updates.borrow_and_update();
        Self {
            event_sender,
            period,
            updates: Some(updates),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Main execution loop - exits once the processor stops listening
    pub async fn run(mut self) {
        info!("BilanScheduler is running. Summary every {} seconds.", self.period.as_secs());

        let mut interval = Self::interval(self.period);
        loop {
            let wake = tokio::select! {
                _ = interval.tick() => Wake::Tick,
                period = next_period(&mut self.updates) => Wake::Period(period),
            };

            match wake {
                Wake::Tick => {
                    if self.event_sender.send(RoundEvent::Bilan).await.is_err() {
                        info!("RoundProcessor closed. BilanScheduler shutting down.");
                        break;
                    }
                }
                Wake::Period(Some(period)) => {
                    info!("Summary period changed to {} seconds", period.as_secs());
                    self.period = period;
                    interval = Self::interval(period);
                }
                // Nobody can change the period any more, keep the current one
                Wake::Period(None) => self.updates = None,
            }
        }
    }

    /// An interval whose first tick is one full period away
    fn interval(period: Duration) -> Interval {
        interval_at(Instant::now() + period, period)
    }
}

async fn next_period(updates: &mut Option<watch::Receiver<Duration>>) -> Option<Duration> {
    match updates {
        Some(receiver) => match receiver.changed().await {
            Ok(()) => Some(*receiver.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
