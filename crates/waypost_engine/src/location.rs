use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A position sample from the live location source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LivePosition {
    pub lat: f64,
    pub lng: f64,
}

impl LivePosition {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<&LivePosition> for geo_types::Point {
    fn from(position: &LivePosition) -> Self {
        geo_types::Point::new(position.lng, position.lat)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LocationUpdate {
    Sample(LivePosition),

    /// The position source reported that it cannot deliver samples. Delivered
    /// at most once; the consumer keeps running without a position.
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("geolocation is not available: {0}")]
    Unavailable(String),
}

/// A continuous source of position samples.
pub trait LocationStream: Send + Sync {
    fn subscribe(&self) -> Result<LocationSubscription, LocationError>;
}

/// An active position subscription.
///
/// Owns the producing task; dropping the subscription aborts it, so the
/// source is released on every exit path.
pub struct LocationSubscription {
    rx: mpsc::Receiver<LocationUpdate>,
    producer: Option<JoinHandle<()>>,
}

impl LocationSubscription {
    pub fn new(rx: mpsc::Receiver<LocationUpdate>, producer: Option<JoinHandle<()>>) -> Self {
        Self { rx, producer }
    }

    /// The next update, or `None` once the source is exhausted.
    pub async fn next_update(&mut self) -> Option<LocationUpdate> {
        self.rx.recv().await
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

/// Replays a fixed sequence of updates on an interval.
///
/// Stands in for a device position source in tests and simulations, the same
/// way a recorded-data producer stands in for a live one.
#[derive(Clone)]
pub struct ScriptedLocationStream {
    updates: Vec<LocationUpdate>,
    interval: Duration,
}

impl ScriptedLocationStream {
    pub fn new(updates: Vec<LocationUpdate>, interval: Duration) -> Self {
        Self { updates, interval }
    }

    pub fn from_positions(positions: Vec<LivePosition>, interval: Duration) -> Self {
        Self::new(
            positions.into_iter().map(LocationUpdate::Sample).collect(),
            interval,
        )
    }
}

impl LocationStream for ScriptedLocationStream {
    fn subscribe(&self) -> Result<LocationSubscription, LocationError> {
        let (tx, rx) = mpsc::channel(16);
        let updates = self.updates.clone();
        let interval = self.interval;

        let producer = tokio::spawn(async move {
            for update in updates {
                if tx.send(update).await.is_err() {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        });

        Ok(LocationSubscription::new(rx, Some(producer)))
    }
}
