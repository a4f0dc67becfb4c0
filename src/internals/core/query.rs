use std::sync::Arc;

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, trace, warn};

use crate::models::TemperatureReading;

use super::ports::{QueryError, ReadRequest, ReadRequestSource, TemperatureSource};

/// Serves on-demand reads by fetching fresh every time. Never looks at the
/// cache, so an interactive read is never older than the request itself.
pub struct QueryHandler<S: TemperatureSource> {
    source: S,
}

impl<S: TemperatureSource> QueryHandler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch once. Any fetch failure is logged in full and reported to the
    /// caller only as `CommunicationFailure`.
    #[tracing::instrument(skip_all)]
    pub async fn handle_get(&self) -> Result<TemperatureReading, QueryError> {
        debug!("Triggered GET current temperature.");
        match self.source.fetch().await {
            Ok(reading) => {
                debug!("Current temperature: {}", reading.temperature);
                Ok(reading)
            }
            Err(e) => {
                error!("Failed to get temperature. Error: {}", e);
                Err(QueryError::CommunicationFailure)
            }
        }
    }
}

/// Task: Answer read requests from the host as they arrive. Each request
/// runs on its own task, so a hung sensor delays no read by more than one
/// request timeout. Ends when cancelled or when the host stops sending
/// requests, after in-flight reads have been answered.
#[tracing::instrument(skip_all)]
pub async fn task_serve_read_requests<S, R>(
    token: CancellationToken,
    handler: QueryHandler<S>,
    mut requests: R,
) where
    S: TemperatureSource + 'static,
    R: ReadRequestSource,
{
    info!("Started.");
    let handler = Arc::new(handler);
    let in_flight = TaskTracker::new();

    loop {
        let request = tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            request = requests.next_request() => request,
        };

        let Some(request) = request else {
            info!("Read request source closed. Stopping.");
            break;
        };

        let token_clone = token.clone();
        let handler_clone = handler.clone();
        in_flight.spawn(async move {
            answer_read_request(token_clone, &handler_clone, request).await
        });
    }

    in_flight.close();
    in_flight.wait().await;
}

/// Fetch for a single request and deliver the outcome.
async fn answer_read_request<S: TemperatureSource>(
    token: CancellationToken,
    handler: &QueryHandler<S>,
    request: ReadRequest,
) {
    let result = tokio::select! {
        _ = token.cancelled() => {
            warn!("Cancelled while answering a read request.");
            request.respond(Err(QueryError::CommunicationFailure));
            return;
        },
        result = handler.handle_get() => result,
    };

    if request.respond(result) {
        trace!("Answered read request.");
    } else {
        warn!("Requester stopped waiting before the read completed.");
    }
}
