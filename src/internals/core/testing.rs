//! Scripted ports for exercising the core without a network.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use crate::models::{Temperature, TemperatureReading};

use super::ports::{FetchError, NotificationSink, TemperatureSource};

/// Answers fetches from a script, repeating the final entry forever.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<TemperatureReading, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<TemperatureReading, FetchError>>) -> Self {
        assert!(!script.is_empty(), "script can't be empty");
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Script built from response bodies, parsed the way the HTTP fetcher
    /// parses them.
    pub fn bodies(bodies: &[&str]) -> Self {
        Self::new(bodies.iter().map(|b| Self::body(b)).collect())
    }

    pub fn body(body: &str) -> Result<TemperatureReading, FetchError> {
        body.parse::<Temperature>()
            .map(TemperatureReading::new)
            .map_err(FetchError::from)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TemperatureSource for ScriptedSource {
    async fn fetch(&self) -> Result<TemperatureReading, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

/// Remembers every value pushed to it.
#[derive(Default)]
pub struct RecordingSink {
    values: Mutex<Vec<f64>>,
}

impl RecordingSink {
    pub fn values(&self) -> Vec<f64> {
        self.values.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn on_value_changed(&self, reading: &TemperatureReading) {
        self.values.lock().unwrap().push(reading.value());
    }
}

/// Answers every fetch with the same body after a fixed delay.
pub struct DelayedSource {
    delay: Duration,
    body: &'static str,
}

impl DelayedSource {
    pub fn new(delay: Duration, body: &'static str) -> Self {
        Self { delay, body }
    }
}

impl TemperatureSource for DelayedSource {
    async fn fetch(&self) -> Result<TemperatureReading, FetchError> {
        tokio::time::sleep(self.delay).await;
        ScriptedSource::body(self.body)
    }
}
