use geo::{Distance, Haversine};
use serde::{Deserialize, Serialize};

use crate::location::LivePosition;
use crate::route::{Route, Waypoint};

pub const DEFAULT_ARRIVAL_THRESHOLD_METERS: f64 = 150.0;

/// Which waypoint is the active target.
///
/// `current_stop_index` ranges over `0..=stops.len()`; the upper bound is a
/// sentinel meaning all stops are exhausted and the route end is the target.
/// A route without stops starts at the sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub current_stop_index: usize,
}

/// Decides whether a position counts as having reached a target waypoint.
pub trait ArrivalPolicy: Send + Sync {
    fn has_arrived(&self, position: &LivePosition, target: &Waypoint) -> bool;
}

/// Arrival within a haversine distance cutoff of the target.
pub struct DistanceThreshold {
    threshold_meters: f64,
}

impl DistanceThreshold {
    pub fn new(threshold_meters: f64) -> Self {
        Self { threshold_meters }
    }
}

impl Default for DistanceThreshold {
    fn default() -> Self {
        Self::new(DEFAULT_ARRIVAL_THRESHOLD_METERS)
    }
}

impl ArrivalPolicy for DistanceThreshold {
    fn has_arrived(&self, position: &LivePosition, target: &Waypoint) -> bool {
        let position: geo_types::Point = position.into();
        let target: geo_types::Point = target.into();

        let haversine = Haversine;
        haversine.distance(position, target) <= self.threshold_meters
    }
}

/// Tracks the current stop along a route as live positions arrive.
///
/// The tracker owns only the monotonic index state; how arrival is measured
/// is the caller's `ArrivalPolicy`. No I/O.
pub struct ProgressTracker {
    route: Route,
    current_stop_index: usize,
}

impl ProgressTracker {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            current_stop_index: 0,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn state(&self) -> ProgressState {
        ProgressState {
            current_stop_index: self.current_stop_index,
        }
    }

    /// Whether every stop has been reached and the route end is the target.
    pub fn stops_exhausted(&self) -> bool {
        self.current_stop_index >= self.route.stops.len()
    }

    /// The stop at the current index, or the route end at the sentinel.
    pub fn current_target(&self) -> &Waypoint {
        self.route
            .stops
            .get(self.current_stop_index)
            .unwrap_or(&self.route.end)
    }

    /// Advances the index by at most one if the policy says the current
    /// target is reached. The index never decreases and never exceeds the
    /// sentinel.
    pub fn advance(&mut self, position: &LivePosition, policy: &dyn ArrivalPolicy) -> ProgressState {
        if !self.stops_exhausted() && policy.has_arrived(position, self.current_target()) {
            self.current_stop_index += 1;
        }
        self.state()
    }

    /// Replaces the tracked route and resets progress. Must be called when
    /// the route's waypoints are edited; old indices are meaningless against
    /// a new stop list.
    pub fn reset(&mut self, route: Route) {
        self.route = route;
        self.current_stop_index = 0;
    }
}
