use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::location::LivePosition;
use crate::route::Waypoint;
use crate::routing::{RouteRequest, RoutingProvider};

/// Distance and travel time to the current target, from the first leg of the
/// provider's response.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EtaEstimate {
    pub distance_km: f64,
    pub duration_seconds: f64,
}

/// Computes distance/ETA between a live position and a target waypoint
/// through a `RoutingProvider`.
///
/// Each `estimate` call supersedes any in-flight request: position samples
/// arrive faster than a routing round-trip, so only the most recent call's
/// result may ever be published. Requests publish in issue order or not at
/// all; a superseded completion is discarded.
pub struct EtaEstimator {
    provider: Arc<dyn RoutingProvider>,
    /// Generation of the most recent `estimate` call. Publishing holds this
    /// lock so a stale completion can never overwrite a newer result.
    generation: Arc<Mutex<u64>>,
    tx: watch::Sender<Option<EtaEstimate>>,
    in_flight: Option<JoinHandle<()>>,
}

impl EtaEstimator {
    pub fn new(provider: Arc<dyn RoutingProvider>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            provider,
            generation: Arc::new(Mutex::new(0)),
            tx,
            in_flight: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<EtaEstimate>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<EtaEstimate> {
        *self.tx.borrow()
    }

    /// Issues a routing request for the origin/target pair.
    ///
    /// An absent origin or target publishes `None` immediately without a
    /// provider call. A provider failure publishes `None` as well; the next
    /// position sample is the natural retry.
    pub fn estimate(&mut self, origin: Option<LivePosition>, target: Option<&Waypoint>) {
        let generation = {
            let mut current = self.generation.lock();
            *current += 1;
            *current
        };

        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort();
        }

        let (Some(origin), Some(target)) = (origin, target) else {
            self.tx.send_replace(None);
            return;
        };

        let request = RouteRequest::direct((&origin).into(), target.into());
        let provider = Arc::clone(&self.provider);
        let generation_guard = Arc::clone(&self.generation);
        let tx = self.tx.clone();
        let target_name = target.name.clone();

        self.in_flight = Some(tokio::spawn(async move {
            let result = provider.route(request).await;

            let current = generation_guard.lock();
            if *current != generation {
                debug!("discarding superseded ETA result for {target_name}");
                return;
            }

            match result {
                Ok(path) => {
                    let estimate = path.first_leg().map(|leg| EtaEstimate {
                        distance_km: leg.distance_meters / 1000.0,
                        duration_seconds: leg.duration_seconds,
                    });
                    tx.send_replace(estimate);
                }
                Err(err) => {
                    warn!("ETA request towards {target_name} failed: {err}");
                    tx.send_replace(None);
                }
            }
        }));
    }

    /// Waits for the in-flight request, if any, to finish publishing.
    pub async fn drain(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            let _ = in_flight.await;
        }
    }
}

impl Drop for EtaEstimator {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort();
        }
    }
}
