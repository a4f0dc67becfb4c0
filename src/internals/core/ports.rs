use std::future::Future;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::models::{TemperatureError, TemperatureReading};

/// Somewhere a temperature reading can be fetched from.
/// One call is one fetch: no retries, no caching.
pub trait TemperatureSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<TemperatureReading, FetchError>> + Send;
}

/// Host side receiver of value changes pushed by the poller.
pub trait NotificationSink: Send + Sync {
    fn on_value_changed(&self, reading: &TemperatureReading);
}

/// Host side producer of on-demand read requests.
/// Returns `None` once the host will send no more requests.
pub trait ReadRequestSource: Send {
    fn next_request(&mut self) -> impl Future<Output = Option<ReadRequest>> + Send;
}

/// Anything that can go wrong during one fetch. Callers treat every variant
/// the same way; the variants exist for logged diagnostics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, timeout or DNS level failure reaching the endpoint.
    #[error("Failed to reach sensor endpoint. Error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status.
    #[error("Sensor endpoint answered with status {0}.")]
    Status(u16),

    /// The body was not a finite number.
    #[error("Failed to parse sensor response. Error: {0}")]
    Parse(#[from] TemperatureError),
}

/// The single error the host sees when an on-demand read fails.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    #[error("Service communication failure.")]
    CommunicationFailure,
}

/// An on-demand read awaiting its answer.
#[derive(Debug)]
pub struct ReadRequest {
    responder: oneshot::Sender<Result<TemperatureReading, QueryError>>,
}

impl ReadRequest {
    /// Create a request along with the receiver its answer will arrive on.
    pub fn channel() -> (
        Self,
        oneshot::Receiver<Result<TemperatureReading, QueryError>>,
    ) {
        let (responder, rx) = oneshot::channel();
        (Self { responder }, rx)
    }

    /// Deliver the answer. Returns false if the requester stopped waiting.
    pub fn respond(self, result: Result<TemperatureReading, QueryError>) -> bool {
        self.responder.send(result).is_ok()
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for std::sync::Arc<T> {
    fn on_value_changed(&self, reading: &TemperatureReading) {
        (**self).on_value_changed(reading)
    }
}

impl<T: TemperatureSource> TemperatureSource for std::sync::Arc<T> {
    fn fetch(&self) -> impl Future<Output = Result<TemperatureReading, FetchError>> + Send {
        (**self).fetch()
    }
}
