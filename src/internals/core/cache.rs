use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::TemperatureReading;

/// Holds the last successfully polled reading, or nothing if no poll has
/// succeeded yet. Clones share the same slot.
///
/// Only the poller writes; readers take a copy so a reading is always seen
/// whole.
#[derive(Clone, Default)]
pub struct ReadingCache {
    inner: Arc<RwLock<Option<TemperatureReading>>>,
}

impl ReadingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held reading.
    pub async fn set(&self, reading: TemperatureReading) {
        *self.inner.write().await = Some(reading);
    }

    /// The most recently set reading, if any.
    pub async fn get(&self) -> Option<TemperatureReading> {
        *self.inner.read().await
    }
}
