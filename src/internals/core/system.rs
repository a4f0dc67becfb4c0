use std::time::Duration;

use tokio::sync::watch;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::info;

use super::{
    cache::ReadingCache,
    poller::{task_poll_sensor, Poller, PollerState},
    ports::{NotificationSink, ReadRequestSource, TemperatureSource},
    query::{task_serve_read_requests, QueryHandler},
};

/// Handles to a running bridge.
pub struct CoreSystem {
    /// The poller's cache. Stays empty forever when polling is disabled.
    pub cache: ReadingCache,
    /// `None` when polling is disabled.
    pub poller_state: Option<watch::Receiver<PollerState>>,
}

/// Spawn the query task and, when `polling_interval` is set, the polling
/// task. Both share `source` but nothing else: only the poller writes the
/// cache and notifies `sink`.
pub fn spawn_core_system<S, N, R>(
    tracker: &TaskTracker,
    token: CancellationToken,
    source: S,
    sink: N,
    requests: R,
    polling_interval: Option<Duration>,
) -> CoreSystem
where
    S: TemperatureSource + Clone + 'static,
    N: NotificationSink + 'static,
    R: ReadRequestSource + 'static,
{
    let cache = ReadingCache::new();

    let poller_state = match polling_interval {
        Some(period) => {
            let poller = Poller::new(source.clone(), cache.clone(), sink);
            let poller_state = poller.subscribe_state();
            let token_clone = token.clone();
            tracker.spawn(async move { task_poll_sensor(token_clone, poller, period).await });
            Some(poller_state)
        }
        None => {
            info!("Update interval not set. Periodic polling disabled.");
            None
        }
    };

    let handler = QueryHandler::new(source);
    tracker.spawn(async move { task_serve_read_requests(token, handler, requests).await });

    CoreSystem {
        cache,
        poller_state,
    }
}
