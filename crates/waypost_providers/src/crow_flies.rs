use async_trait::async_trait;
use geo::{Distance, Haversine};

use waypost_engine::routing::{
    ProviderError, RouteLeg, RouteRequest, RoutedPath, RoutingProvider,
};

/// Straight-line fallback provider: haversine distance at a fixed speed.
///
/// Useful offline and in simulations when no routing service is reachable.
/// The path is the request points themselves, polyline-encoded so it has the
/// same shape a routing service would return.
pub struct CrowFliesProvider {
    speed_kmh: f64,
}

impl CrowFliesProvider {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }
}

#[async_trait]
impl RoutingProvider for CrowFliesProvider {
    async fn route(&self, request: RouteRequest) -> Result<RoutedPath, ProviderError> {
        if self.speed_kmh <= 0.0 {
            return Err(ProviderError::NoRoute);
        }
        let speed_mps = self.speed_kmh / 3.6;

        let points: Vec<geo_types::Point> = request.points().copied().collect();
        let haversine = Haversine;

        let legs = points
            .windows(2)
            .map(|pair| {
                let distance_meters = haversine.distance(pair[0], pair[1]);
                RouteLeg {
                    distance_meters,
                    duration_seconds: distance_meters / speed_mps,
                }
            })
            .collect();

        Ok(RoutedPath {
            path_encoded: encode_polyline(&points),
            legs,
        })
    }
}

/// Google polyline5 encoding (the format OSRM returns for its geometry).
fn encode_polyline(points: &[geo_types::Point]) -> String {
    let mut encoded = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for point in points {
        let lat = (point.y() * 1e5).round() as i64;
        let lng = (point.x() * 1e5).round() as i64;
        encode_value(lat - prev_lat, &mut encoded);
        encode_value(lng - prev_lng, &mut encoded);
        prev_lat = lat;
        prev_lng = lng;
    }

    encoded
}

fn encode_value(value: i64, out: &mut String) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        out.push(((0x20 | (value & 0x1f)) as u8 + 63) as char);
        value >>= 5;
    }
    out.push((value as u8 + 63) as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_leg_per_consecutive_pair() {
        let provider = CrowFliesProvider::new(36.0);
        let request = RouteRequest {
            origin: geo_types::Point::new(30.0445, -1.9398),
            destination: geo_types::Point::new(30.1302, -1.9366),
            waypoints: vec![geo_types::Point::new(30.0602, -1.9355)],
        };

        let path = provider.route(request).await.unwrap();
        assert_eq!(path.legs.len(), 2);

        // 36 km/h is 10 m/s, so duration is a tenth of the distance.
        for leg in &path.legs {
            assert!((leg.duration_seconds - leg.distance_meters / 10.0).abs() < 1e-9);
            assert!(leg.distance_meters > 0.0);
        }
    }

    #[tokio::test]
    async fn test_direct_request_has_single_leg() {
        let provider = CrowFliesProvider::new(40.0);
        let request = RouteRequest::direct(
            geo_types::Point::new(30.0445, -1.9398),
            geo_types::Point::new(30.0602, -1.9355),
        );

        let path = provider.route(request).await.unwrap();
        assert_eq!(path.legs.len(), 1);
        // Roughly 1.8 km across town.
        let distance = path.first_leg().unwrap().distance_meters;
        assert!(distance > 1_500.0 && distance < 2_500.0, "{distance}");
    }

    #[tokio::test]
    async fn test_non_positive_speed_is_no_route() {
        let provider = CrowFliesProvider::new(0.0);
        let request = RouteRequest::direct(
            geo_types::Point::new(30.0445, -1.9398),
            geo_types::Point::new(30.0602, -1.9355),
        );

        assert!(matches!(
            provider.route(request).await,
            Err(ProviderError::NoRoute)
        ));
    }

    #[test]
    fn test_encode_polyline_reference_vector() {
        let points = vec![
            geo_types::Point::new(-120.2, 38.5),
            geo_types::Point::new(-120.95, 40.7),
            geo_types::Point::new(-126.453, 43.252),
        ];
        assert_eq!(encode_polyline(&points), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }
}
