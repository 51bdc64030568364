use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::eta::{EtaEstimate, EtaEstimator};
use crate::location::{
    LivePosition, LocationError, LocationStream, LocationSubscription, LocationUpdate,
};
use crate::progress::{
    DEFAULT_ARRIVAL_THRESHOLD_METERS, DistanceThreshold, ProgressState, ProgressTracker,
};
use crate::route::Route;
use crate::routing::RoutingProvider;

#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Haversine cutoff below which a target waypoint counts as reached.
    pub arrival_threshold_meters: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            arrival_threshold_meters: DEFAULT_ARRIVAL_THRESHOLD_METERS,
        }
    }
}

/// One fully-formed view of the trip. Consumers never observe partial
/// updates; every field belongs to the same pipeline pass.
#[derive(Clone, Debug, PartialEq)]
pub struct TripSnapshot {
    pub position: Option<LivePosition>,
    pub progress: ProgressState,
    pub eta: Option<EtaEstimate>,
}

/// Composition root for one trip: owns the position subscription, the
/// progress tracker and the ETA estimator, and publishes immutable snapshots.
///
/// Pipeline per sample: position → advance progress → estimate ETA towards
/// the (possibly just-advanced) target → publish. Position and progress are
/// strictly ordered and never dropped; ETA results may be superseded.
pub struct TripSession {
    snapshot_rx: watch::Receiver<TripSnapshot>,
    event_loop: JoinHandle<()>,
}

impl TripSession {
    /// Subscribes to the location stream and spawns the session event loop.
    pub fn start(
        route: Route,
        stream: &dyn LocationStream,
        provider: Arc<dyn RoutingProvider>,
        config: SessionConfig,
    ) -> Result<Self, LocationError> {
        let subscription = stream.subscribe()?;

        let (snapshot_tx, snapshot_rx) = watch::channel(TripSnapshot {
            position: None,
            progress: ProgressState {
                current_stop_index: 0,
            },
            eta: None,
        });

        let event_loop = tokio::spawn(run_session_loop(
            route,
            subscription,
            provider,
            config,
            snapshot_tx,
        ));

        Ok(Self {
            snapshot_rx,
            event_loop,
        })
    }

    pub fn snapshot(&self) -> TripSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TripSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Ends the session. The event loop task is aborted and the position
    /// subscription is released with it.
    pub fn end(&self) {
        self.event_loop.abort();
    }
}

impl Drop for TripSession {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

async fn run_session_loop(
    route: Route,
    mut subscription: LocationSubscription,
    provider: Arc<dyn RoutingProvider>,
    config: SessionConfig,
    snapshot_tx: watch::Sender<TripSnapshot>,
) {
    let mut tracker = ProgressTracker::new(route);
    let policy = DistanceThreshold::new(config.arrival_threshold_meters);
    let mut estimator = EtaEstimator::new(provider);
    let mut eta_rx = estimator.subscribe();
    let mut position: Option<LivePosition> = None;

    loop {
        tokio::select! {
            update = subscription.next_update() => {
                match update {
                    Some(LocationUpdate::Sample(sample)) => {
                        position = Some(sample);
                        let progress = tracker.advance(&sample, &policy);
                        estimator.estimate(position, Some(tracker.current_target()));
                        snapshot_tx.send_replace(TripSnapshot {
                            position,
                            progress,
                            eta: estimator.current(),
                        });
                    }
                    Some(LocationUpdate::Unavailable(reason)) => {
                        // Reported once; the trip continues without a position.
                        warn!("position source unavailable: {reason}");
                    }
                    None => {
                        debug!("position stream ended");
                        // Let the last in-flight estimate publish before the
                        // session closes.
                        estimator.drain().await;
                        if eta_rx.has_changed().unwrap_or(false) {
                            let eta = *eta_rx.borrow_and_update();
                            snapshot_tx.send_replace(TripSnapshot {
                                position,
                                progress: tracker.state(),
                                eta,
                            });
                        }
                        break;
                    }
                }
            }
            changed = eta_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let eta = *eta_rx.borrow_and_update();
                snapshot_tx.send_replace(TripSnapshot {
                    position,
                    progress: tracker.state(),
                    eta,
                });
            }
        }
    }
}
