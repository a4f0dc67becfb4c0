use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace};

use crate::{
    internals::core::ports::{NotificationSink, QueryError, ReadRequest, ReadRequestSource},
    models::TemperatureReading,
};

/// Logs every value change under the sensor's display name.
pub struct EmitToLoggingAdapter {
    pub name: String,
}

impl NotificationSink for EmitToLoggingAdapter {
    fn on_value_changed(&self, reading: &TemperatureReading) {
        info!("[{}] Current temperature: {}", self.name, reading.temperature);
    }
}

/// Publishes value changes to every subscribed host listener.
#[derive(Clone)]
pub struct EmitToHostAdapter {
    tx_value_changed: broadcast::Sender<TemperatureReading>,
}

impl EmitToHostAdapter {
    pub fn new(tx_value_changed: broadcast::Sender<TemperatureReading>) -> Self {
        Self { tx_value_changed }
    }
}

impl NotificationSink for EmitToHostAdapter {
    fn on_value_changed(&self, reading: &TemperatureReading) {
        // No subscribers is fine: the host may only ever read on demand.
        match self.tx_value_changed.send(*reading) {
            Ok(count) => trace!("Sent value change to {} subscribers.", count),
            Err(_) => trace!("No subscribers for value change."),
        }
    }
}

/// Forwards each value change to several sinks in order.
pub struct FanOutSink {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanOutSink {
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanOutSink {
    fn on_value_changed(&self, reading: &TemperatureReading) {
        for sink in self.sinks.iter() {
            sink.on_value_changed(reading);
        }
    }
}

/// Read requests queued by a [`HostHandle`].
pub struct ChannelReadRequestSource {
    rx_read_requests: mpsc::Receiver<ReadRequest>,
}

impl ChannelReadRequestSource {
    pub fn new(rx_read_requests: mpsc::Receiver<ReadRequest>) -> Self {
        Self { rx_read_requests }
    }
}

impl ReadRequestSource for ChannelReadRequestSource {
    async fn next_request(&mut self) -> Option<ReadRequest> {
        self.rx_read_requests.recv().await
    }
}

/// What the host holds on to: on-demand reads and value change
/// subscriptions. Cheap to clone.
#[derive(Clone)]
pub struct HostHandle {
    tx_read_requests: mpsc::Sender<ReadRequest>,
    tx_value_changed: broadcast::Sender<TemperatureReading>,
}

impl HostHandle {
    pub fn new(
        tx_read_requests: mpsc::Sender<ReadRequest>,
        tx_value_changed: broadcast::Sender<TemperatureReading>,
    ) -> Self {
        Self {
            tx_read_requests,
            tx_value_changed,
        }
    }

    /// Ask the bridge for a fresh reading. If the bridge has stopped this
    /// fails the same way an unreachable sensor does.
    #[tracing::instrument(skip_all)]
    pub async fn on_demand_read(&self) -> Result<TemperatureReading, QueryError> {
        let (request, rx_answer) = ReadRequest::channel();
        if self.tx_read_requests.send(request).await.is_err() {
            debug!("Bridge is no longer serving read requests.");
            return Err(QueryError::CommunicationFailure);
        }
        match rx_answer.await {
            Ok(result) => result,
            Err(_) => {
                debug!("Bridge dropped the read request unanswered.");
                Err(QueryError::CommunicationFailure)
            }
        }
    }

    /// Receive every reading the poller stores from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TemperatureReading> {
        self.tx_value_changed.subscribe()
    }
}
