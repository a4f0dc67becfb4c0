use tokio::sync::{broadcast, mpsc};

use crate::internals::core::ports::NotificationSink;

use self::adapters::{
    ChannelReadRequestSource, EmitToHostAdapter, EmitToLoggingAdapter, FanOutSink, HostHandle,
};

pub mod adapters;

const VALUE_CHANGED_CAPACITY: usize = 32;
const READ_REQUEST_CAPACITY: usize = 32;

pub struct HostModule {
    pub notification_adapter: FanOutSink,
    pub read_request_adapter: ChannelReadRequestSource,
    pub host_handle: HostHandle,
}

impl HostModule {
    /// `name` is the sensor's display label, used only in log lines.
    pub fn initialize(name: &str) -> Self {
        let (tx_value_changed, _) = broadcast::channel(VALUE_CHANGED_CAPACITY);
        let (tx_read_requests, rx_read_requests) = mpsc::channel(READ_REQUEST_CAPACITY);

        Self {
            notification_adapter: FanOutSink::new(vec![
                Box::new(EmitToLoggingAdapter {
                    name: name.to_string(),
                }) as Box<dyn NotificationSink>,
                Box::new(EmitToHostAdapter::new(tx_value_changed.clone())),
            ]),
            read_request_adapter: ChannelReadRequestSource::new(rx_read_requests),
            host_handle: HostHandle::new(tx_read_requests, tx_value_changed),
        }
    }
}
