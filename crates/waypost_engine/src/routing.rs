use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("routing request failed: {0}")]
    Request(String),

    #[error("provider API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("no route found between the requested points")]
    NoRoute,

    #[error("deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// A routing request: origin and destination, with optional intermediate
/// waypoints in traversal order.
#[derive(Clone, Debug)]
pub struct RouteRequest {
    pub origin: geo_types::Point,
    pub destination: geo_types::Point,
    pub waypoints: Vec<geo_types::Point>,
}

impl RouteRequest {
    pub fn direct(origin: geo_types::Point, destination: geo_types::Point) -> Self {
        Self {
            origin,
            destination,
            waypoints: Vec::new(),
        }
    }

    /// All request points in traversal order: origin, waypoints, destination.
    pub fn points(&self) -> impl Iterator<Item = &geo_types::Point> {
        std::iter::once(&self.origin)
            .chain(self.waypoints.iter())
            .chain(std::iter::once(&self.destination))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    /// Meters
    pub distance_meters: f64,

    /// Seconds
    pub duration_seconds: f64,
}

/// A computed path with one leg per consecutive pair of request points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutedPath {
    /// Polyline-encoded geometry of the full path.
    pub path_encoded: String,
    pub legs: Vec<RouteLeg>,
}

impl RoutedPath {
    pub fn first_leg(&self) -> Option<&RouteLeg> {
        self.legs.first()
    }

    pub fn total_distance_meters(&self) -> f64 {
        self.legs.iter().map(|leg| leg.distance_meters).sum()
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.legs.iter().map(|leg| leg.duration_seconds).sum()
    }
}

/// External routing service: computes a path, travel distance and duration
/// between points. Failures are transient and non-fatal for the engine.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(&self, request: RouteRequest) -> Result<RoutedPath, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_points_order() {
        let request = RouteRequest {
            origin: geo_types::Point::new(30.0445, -1.9398),
            destination: geo_types::Point::new(30.1302, -1.9366),
            waypoints: vec![geo_types::Point::new(30.0602, -1.9355)],
        };

        let xs: Vec<f64> = request.points().map(|p| p.x()).collect();
        assert_eq!(xs, [30.0445, 30.0602, 30.1302]);
    }

    #[test]
    fn test_routed_path_totals() {
        let path = RoutedPath {
            path_encoded: String::new(),
            legs: vec![
                RouteLeg {
                    distance_meters: 1_200.0,
                    duration_seconds: 90.0,
                },
                RouteLeg {
                    distance_meters: 800.0,
                    duration_seconds: 60.0,
                },
            ],
        };

        assert_eq!(path.total_distance_meters(), 2_000.0);
        assert_eq!(path.total_duration_seconds(), 150.0);
        assert_eq!(path.first_leg().unwrap().distance_meters, 1_200.0);
    }
}
