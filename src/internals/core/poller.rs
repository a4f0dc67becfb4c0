use std::time::Duration;

use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::models::TemperatureReading;

use super::{
    cache::ReadingCache,
    ports::{FetchError, NotificationSink, TemperatureSource},
};

/// Stand-in deadline for periods that overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Fetching,
}

/// Timer driven half of the bridge. Fetches, stores successful readings in
/// the cache and pushes them to the sink. Failures touch neither.
pub struct Poller<S: TemperatureSource, N: NotificationSink> {
    source: S,
    cache: ReadingCache,
    sink: N,
    state: watch::Sender<PollerState>,
}

impl<S: TemperatureSource, N: NotificationSink> Poller<S, N> {
    pub fn new(source: S, cache: ReadingCache, sink: N) -> Self {
        let (state, _) = watch::channel(PollerState::Idle);
        Self {
            source,
            cache,
            sink,
            state,
        }
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    /// Watch state transitions from outside the polling task.
    pub fn subscribe_state(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    /// Run one fetch cycle. The returned result has already been logged
    /// and applied; callers are free to ignore it.
    #[tracing::instrument(skip_all)]
    pub async fn tick(&self) -> Result<TemperatureReading, FetchError> {
        trace!("Executing tick.");
        self.state.send_replace(PollerState::Fetching);
        let result = self.source.fetch().await;
        match &result {
            Ok(reading) => {
                self.cache.set(*reading).await;
                self.sink.on_value_changed(reading);
                debug!("Updated temperature: {}", reading.temperature);
            }
            Err(e) => {
                error!("Failed to update temperature. Error: {}", e);
            }
        }
        self.state.send_replace(PollerState::Idle);
        result
    }
}

/// Task: Runs a tick every `period`, first one a full period after start.
/// A tick never overlaps the previous one; ticks missed while a fetch is
/// slow are skipped. Can be cancelled, including mid fetch.
#[tracing::instrument(skip_all, fields(period = ?period))]
pub async fn task_poll_sensor<S: TemperatureSource, N: NotificationSink>(
    token: CancellationToken,
    poller: Poller<S, N>,
    period: Duration,
) {
    info!("Started.");
    let now = Instant::now();
    let first_tick = now.checked_add(period).unwrap_or_else(|| {
        warn!("Update interval too large to schedule. Polling effectively never.");
        now + FAR_FUTURE
    });
    let mut interval = tokio::time::interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            _ = interval.tick() => {}
        };

        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled while fetching.");
                break;
            },
            _ = poller.tick() => {}
        };
    }
}
